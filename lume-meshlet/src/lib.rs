use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

pub mod asset;
pub mod error;
pub mod processor;

pub use asset::MeshAsset;
pub use error::{MeshletError, MeshletResult};
pub use processor::{
    process_mesh, process_meshes, MeshInput, MeshletConfig, MeshletLimits, MeshletOutput,
    MeshletStats, Meshletizer, MeshletizerType,
};

/// Upper bound on vertices per meshlet, matching mesh-shader hardware limits.
pub const MAX_VERTEX_COUNT: usize = 64;
/// Upper bound on primitives per meshlet.
pub const MAX_PRIMITIVE_COUNT: usize = 124;

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct MeshVertex {
    pub position: [f32; 3], // 12 bytes
    pub normal: [f32; 3],   // 12 bytes
    pub uv: [f32; 2],       // 8 bytes, 32 total
}

impl MeshVertex {
    pub fn from_position(position: [f32; 3]) -> Self {
        Self {
            position,
            normal: [0.0, 1.0, 0.0],
            uv: [0.0, 0.0],
        }
    }
}

/// Offsets and counts into the unique-vertex and packed-primitive arrays of one mesh.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Meshlet {
    pub vert_offset: u32,
    pub vert_count: u32,
    pub prim_offset: u32,
    pub prim_count: u32,
}

/// Per-meshlet culling volumes, derived once after assembly.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct CullData {
    /// xyz = center, w = radius
    pub bounding_sphere: [f32; 4],
    /// xyz = axis, w = cutoff (cos of the half angle plus 90 degrees)
    pub normal_cone: [f32; 4],
    pub cone_apex: [f32; 4], // w unused, keeps the struct 16-byte aligned
}

/// Packs three cache-local vertex indices into 10/10/10 bits.
#[inline]
pub fn pack_triangle(a: u32, b: u32, c: u32) -> u32 {
    debug_assert!(a < 1024 && b < 1024 && c < 1024);
    (a & 0x3ff) | ((b & 0x3ff) << 10) | ((c & 0x3ff) << 20)
}

#[inline]
pub fn unpack_triangle(packed: u32) -> [u32; 3] {
    [packed & 0x3ff, (packed >> 10) & 0x3ff, (packed >> 20) & 0x3ff]
}

#[inline]
pub(crate) fn is_degenerate(tri: [u32; 3]) -> bool {
    tri[0] == tri[1] || tri[0] == tri[2] || tri[1] == tri[2]
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pack_triangle_round_trip() {
        for &(x, y, z) in &[(0, 0, 0), (1, 2, 3), (63, 0, 17), (1023, 1023, 1023), (512, 7, 1000)] {
            assert_eq!(unpack_triangle(pack_triangle(x, y, z)), [x, y, z]);
        }
    }

    #[test]
    fn test_pack_triangle_layout() {
        let packed = pack_triangle(1, 2, 3);
        assert_eq!(packed & 0x3ff, 1);
        assert_eq!(packed >> 10 & 0x3ff, 2);
        assert_eq!(packed >> 20, 3);
        assert_eq!(packed >> 30, 0);
    }

    #[test]
    fn test_vertex_layout() {
        assert_eq!(std::mem::size_of::<MeshVertex>(), 32);
        assert_eq!(std::mem::size_of::<Meshlet>(), 16);
        assert_eq!(std::mem::size_of::<CullData>(), 48);
    }
}
