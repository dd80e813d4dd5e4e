use crate::{is_degenerate, MAX_PRIMITIVE_COUNT, MAX_VERTEX_COUNT};

const UNUSED: u32 = u32::MAX;

/// Staging area for one meshlet: the global vertices it references and its
/// triangles expressed as local indices into those vertices.
pub struct PrimitiveCache {
    vertices: [u32; MAX_VERTEX_COUNT],
    primitives: [[u32; 3]; MAX_PRIMITIVE_COUNT],
    num_vertices: usize,
    num_primitives: usize,
}

impl Default for PrimitiveCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PrimitiveCache {
    pub fn new() -> Self {
        Self {
            vertices: [UNUSED; MAX_VERTEX_COUNT],
            primitives: [[UNUSED; 3]; MAX_PRIMITIVE_COUNT],
            num_vertices: 0,
            num_primitives: 0,
        }
    }

    pub fn reset(&mut self) {
        self.vertices.fill(UNUSED);
        self.primitives.fill([UNUSED; 3]);
        self.num_vertices = 0;
        self.num_primitives = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.num_primitives == 0
    }

    pub fn vertex_count(&self) -> usize {
        self.num_vertices
    }

    pub fn primitive_count(&self) -> usize {
        self.num_primitives
    }

    pub fn vertices(&self) -> &[u32] {
        &self.vertices[..self.num_vertices]
    }

    pub fn primitives(&self) -> &[[u32; 3]] {
        &self.primitives[..self.num_primitives]
    }

    fn slot_of(&self, vertex: u32) -> Option<usize> {
        self.vertices().iter().position(|&v| v == vertex)
    }

    pub fn contains(&self, vertex: u32) -> bool {
        self.slot_of(vertex).is_some()
    }

    /// Number of the candidate's vertices already resident in the cache.
    pub fn shared_count(&self, candidate: [u32; 3]) -> usize {
        candidate.iter().filter(|&&v| self.contains(v)).count()
    }

    /// Degenerate triangles always "fit" since `insert` drops them.
    pub fn cannot_insert(&self, candidate: [u32; 3], max_verts: usize, max_prims: usize) -> bool {
        if is_degenerate(candidate) {
            return false;
        }

        let found = self.shared_count(candidate);

        self.num_vertices + 3 - found > max_verts || self.num_primitives + 1 > max_prims
    }

    pub fn insert(&mut self, candidate: [u32; 3]) {
        if is_degenerate(candidate) {
            return;
        }

        assert!(self.num_primitives < MAX_PRIMITIVE_COUNT);

        let mut local = [0u32; 3];
        for (slot, &vertex) in local.iter_mut().zip(candidate.iter()) {
            *slot = match self.slot_of(vertex) {
                Some(existing) => existing as u32,
                None => {
                    assert!(self.num_vertices < MAX_VERTEX_COUNT);
                    self.vertices[self.num_vertices] = vertex;
                    self.num_vertices += 1;
                    (self.num_vertices - 1) as u32
                }
            };
        }

        self.primitives[self.num_primitives] = local;
        self.num_primitives += 1;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_insert_reuses_slots() {
        let mut cache = PrimitiveCache::new();
        cache.insert([10, 11, 12]);
        cache.insert([12, 11, 13]);

        assert_eq!(cache.vertices(), &[10, 11, 12, 13]);
        assert_eq!(cache.primitives(), &[[0, 1, 2], [2, 1, 3]]);
    }

    #[test]
    fn test_degenerate_rejected() {
        let mut cache = PrimitiveCache::new();
        cache.insert([0, 1, 2]);

        for tri in [[5, 5, 6], [5, 6, 5], [6, 5, 5], [7, 7, 7]] {
            assert!(!cache.cannot_insert(tri, 3, 1));
            cache.insert(tri);
            assert_eq!(cache.vertex_count(), 3);
            assert_eq!(cache.primitive_count(), 1);
        }
    }

    #[test]
    fn test_cannot_insert_limits() {
        let mut cache = PrimitiveCache::new();
        cache.insert([0, 1, 2]);

        // one new vertex
        assert!(!cache.cannot_insert([1, 2, 3], 4, 2));
        assert!(cache.cannot_insert([1, 2, 3], 3, 2));
        // primitive limit
        assert!(cache.cannot_insert([0, 1, 2], 64, 1));
        // two new vertices
        assert!(cache.cannot_insert([2, 4, 5], 4, 124));
        assert!(!cache.cannot_insert([2, 4, 5], 5, 124));
    }

    #[test]
    fn test_reset() {
        let mut cache = PrimitiveCache::new();
        cache.insert([0, 1, 2]);
        cache.reset();

        assert!(cache.is_empty());
        assert_eq!(cache.vertex_count(), 0);
        assert!(!cache.contains(0));
        assert!(!cache.contains(UNUSED));
    }

    #[test]
    fn test_fills_to_capacity() {
        let mut cache = PrimitiveCache::new();
        let mut next = 0;
        while !cache.cannot_insert([next, next + 1, next + 2], MAX_VERTEX_COUNT, MAX_PRIMITIVE_COUNT) {
            cache.insert([next, next + 1, next + 2]);
            next += 3;
        }

        assert_eq!(cache.vertex_count(), 63);
        assert_eq!(cache.primitive_count(), 21);
    }
}
