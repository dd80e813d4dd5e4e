use std::fmt;

use super::assembly::MeshletOutput;

/// Summary of a meshletization result, used for logging and benchmarking.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct MeshletStats {
    pub meshlet_count: usize,
    pub triangle_count: usize,
    pub avg_verts: f32,
    pub avg_prims: f32,
    /// Meshlet-local vertex references per unique vertex slot; higher means more reuse.
    pub vertex_reuse: f32,
}

impl MeshletStats {
    pub fn from_output(output: &MeshletOutput) -> Self {
        let meshlet_count = output.meshlets.len();
        let triangle_count = output.triangle_count();
        if meshlet_count == 0 {
            return Self::default();
        }

        let total_verts = output.unique_vertex_indices.len();

        Self {
            meshlet_count,
            triangle_count,
            avg_verts: total_verts as f32 / meshlet_count as f32,
            avg_prims: triangle_count as f32 / meshlet_count as f32,
            vertex_reuse: if total_verts == 0 { 0.0 } else { (triangle_count * 3) as f32 / total_verts as f32 },
        }
    }
}

impl fmt::Display for MeshletStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} meshlets, {} triangles, avg {:.1} verts / {:.1} prims, reuse {:.2}",
            self.meshlet_count, self.triangle_count, self.avg_verts, self.avg_prims, self.vertex_reuse
        )
    }
}
