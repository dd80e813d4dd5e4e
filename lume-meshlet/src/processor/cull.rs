use meshopt::compute_cluster_bounds;

use super::assembly::MeshletOutput;
use super::library::position_adapter;
use crate::{CullData, MeshVertex, MeshletResult};

/// Bounding sphere and normal cone for every meshlet, in meshlet order.
pub fn compute_cull_data(vertices: &[MeshVertex], output: &MeshletOutput) -> MeshletResult<Vec<CullData>> {
    if output.meshlets.is_empty() {
        return Ok(Vec::new());
    }

    let adapter = position_adapter(vertices)?;
    let mut cull_data = Vec::with_capacity(output.meshlets.len());
    let mut indices = Vec::with_capacity(crate::MAX_PRIMITIVE_COUNT * 3);

    for meshlet in &output.meshlets {
        indices.clear();
        for tri in output.meshlet_triangles(*meshlet) {
            indices.extend_from_slice(&tri);
        }

        let bounds = compute_cluster_bounds(&indices, &adapter);

        cull_data.push(CullData {
            bounding_sphere: [bounds.center[0], bounds.center[1], bounds.center[2], bounds.radius],
            normal_cone: [bounds.cone_axis[0], bounds.cone_axis[1], bounds.cone_axis[2], bounds.cone_cutoff],
            cone_apex: [bounds.cone_apex[0], bounds.cone_apex[1], bounds.cone_apex[2], 0.0],
        });
    }

    Ok(cull_data)
}
