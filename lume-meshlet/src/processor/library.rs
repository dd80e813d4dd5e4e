use meshopt::{build_meshlets, VertexDataAdapter};

use super::assembly::MeshletOutput;
use super::MeshletLimits;
use crate::{is_degenerate, pack_triangle, MeshVertex, MeshletError, MeshletResult};

pub(crate) fn position_adapter(vertices: &[MeshVertex]) -> MeshletResult<VertexDataAdapter<'_>> {
    VertexDataAdapter::new(bytemuck::cast_slice(vertices), std::mem::size_of::<MeshVertex>(), 0)
        .map_err(|e| MeshletError::Library(e.to_string()))
}

/// meshoptimizer only accepts triangle limits that are multiples of 4.
fn library_triangle_limit(limits: MeshletLimits) -> MeshletResult<usize> {
    if limits.max_prims < 4 {
        return Err(MeshletError::InvalidLimits {
            max_verts: limits.max_verts,
            max_prims: limits.max_prims,
        });
    }

    let rounded = limits.max_prims & !3;
    if rounded != limits.max_prims {
        log::warn!("Library meshletizer: rounding max primitives {} down to {}", limits.max_prims, rounded);
    }
    Ok(rounded)
}

/// Delegates clustering to meshoptimizer and repacks its `u8` micro-indices into 10/10/10 words.
pub fn build_meshlets_library(
    vertices: &[MeshVertex],
    indices: &[u32],
    limits: MeshletLimits,
) -> MeshletResult<MeshletOutput> {
    let filtered: Vec<u32> = indices
        .chunks_exact(3)
        .filter(|abc| !is_degenerate([abc[0], abc[1], abc[2]]))
        .flatten()
        .copied()
        .collect();

    let mut output = MeshletOutput::with_capacity(filtered.len() / 3);
    if filtered.is_empty() {
        return Ok(output);
    }

    let adapter = position_adapter(vertices)?;
    let max_triangles = library_triangle_limit(limits)?;
    let meshlets = build_meshlets(&filtered, &adapter, limits.max_verts, max_triangles, 0.0);

    for meshlet in meshlets.iter() {
        let local_tris = meshlet
            .triangles
            .chunks_exact(3)
            .map(|t| pack_triangle(t[0] as u32, t[1] as u32, t[2] as u32));

        output.push_meshlet(meshlet.vertices, local_tris);
    }

    log::debug!(
        "Library meshletizer: {} triangles -> {} meshlets",
        filtered.len() / 3,
        output.meshlets.len()
    );

    Ok(output)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_triangle_limit() {
        let limit = |max_prims| library_triangle_limit(MeshletLimits { max_verts: 64, max_prims });

        assert_eq!(limit(124), Ok(124));
        assert_eq!(limit(123), Ok(120));
        assert_eq!(limit(4), Ok(4));
        assert!(limit(3).is_err());
    }

    #[test]
    fn test_single_triangle() {
        let vertices = [
            MeshVertex::from_position([0.0, 0.0, 0.0]),
            MeshVertex::from_position([1.0, 0.0, 0.0]),
            MeshVertex::from_position([0.0, 1.0, 0.0]),
        ];
        let output = build_meshlets_library(&vertices, &[0, 1, 2, 0, 0, 1], MeshletLimits::default()).unwrap();

        assert_eq!(output.meshlets.len(), 1);
        assert_eq!(output.meshlets[0].vert_count, 3);
        assert_eq!(output.meshlets[0].prim_count, 1);
    }
}
