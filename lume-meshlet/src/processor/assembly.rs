use super::cache::PrimitiveCache;
use crate::{pack_triangle, unpack_triangle, Meshlet};

/// Result of one meshletization pass.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct MeshletOutput {
    pub meshlets: Vec<Meshlet>,
    pub unique_vertex_indices: Vec<u32>,
    pub packed_primitive_indices: Vec<u32>,
}

impl MeshletOutput {
    pub fn with_capacity(triangle_count: usize) -> Self {
        Self {
            meshlets: Vec::with_capacity(triangle_count / 64 + 1),
            unique_vertex_indices: Vec::with_capacity(triangle_count),
            packed_primitive_indices: Vec::with_capacity(triangle_count),
        }
    }

    /// Closes the meshlet staged in `cache`. The cache must not be empty.
    pub fn append(&mut self, cache: &PrimitiveCache) {
        assert!(!cache.is_empty());

        let local_tris = cache
            .primitives()
            .iter()
            .map(|tri| pack_triangle(tri[0], tri[1], tri[2]));

        self.push_meshlet(cache.vertices(), local_tris);
    }

    pub(crate) fn push_meshlet(&mut self, local_verts: &[u32], local_tris: impl Iterator<Item = u32>) {
        let (vert_offset, prim_offset) = match self.meshlets.last() {
            Some(prev) => (prev.vert_offset + prev.vert_count, prev.prim_offset + prev.prim_count),
            None => (0, 0),
        };

        self.unique_vertex_indices.extend_from_slice(local_verts);
        let before = self.packed_primitive_indices.len();
        self.packed_primitive_indices.extend(local_tris);

        self.meshlets.push(Meshlet {
            vert_offset,
            vert_count: local_verts.len() as u32,
            prim_offset,
            prim_count: (self.packed_primitive_indices.len() - before) as u32,
        });
    }

    pub fn triangle_count(&self) -> usize {
        self.packed_primitive_indices.len()
    }

    pub fn meshlet_vertices(&self, meshlet: &Meshlet) -> &[u32] {
        let start = meshlet.vert_offset as usize;
        &self.unique_vertex_indices[start..start + meshlet.vert_count as usize]
    }

    /// Triangles of one meshlet mapped back to global vertex indices.
    pub fn meshlet_triangles(&self, meshlet: Meshlet) -> impl Iterator<Item = [u32; 3]> + '_ {
        let verts = self.meshlet_vertices(&meshlet);
        let start = meshlet.prim_offset as usize;
        self.packed_primitive_indices[start..start + meshlet.prim_count as usize]
            .iter()
            .map(move |&packed| unpack_triangle(packed).map(|local| verts[local as usize]))
    }

    /// Decodes every meshlet back into a flat global index buffer, in meshlet order.
    pub fn to_index_buffer(&self) -> Vec<u32> {
        let mut indices = Vec::with_capacity(self.triangle_count() * 3);
        for meshlet in &self.meshlets {
            for tri in self.meshlet_triangles(*meshlet) {
                indices.extend_from_slice(&tri);
            }
        }
        indices
    }
}
