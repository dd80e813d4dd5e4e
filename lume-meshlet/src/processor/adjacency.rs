use std::collections::HashMap;

/// Meshletization state of a triangle node.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UsedState {
    Unused,
    /// Sitting in a growth frontier, not yet committed.
    Queued,
    Consumed,
}

#[derive(Debug)]
pub struct TriangleNode {
    /// Position in the index stream.
    pub id: u32,
    /// Global vertex indices in winding order.
    pub indices: [u32; 3],
    /// Graph vertex node ids, parallel to `indices`.
    pub vertices: [u32; 3],
    /// Triangles sharing an edge with this one.
    pub neighbours: Vec<u32>,
    pub state: UsedState,
}

#[derive(Debug)]
pub struct VertexNode {
    pub index: u32,
    /// Incident triangles, in index-stream order.
    pub neighbours: Vec<u32>,
}

impl VertexNode {
    pub fn degree(&self) -> usize {
        self.neighbours.len()
    }
}

/// Triangle/vertex adjacency graph stored as two arenas; every link is an arena index.
pub struct MeshGraph {
    /// Vertex nodes in first-seen order of the index stream.
    pub vertices: Vec<VertexNode>,
    pub triangles: Vec<TriangleNode>,
    lookup: HashMap<u32, u32>,
}

impl MeshGraph {
    pub fn build(indices: &[u32]) -> Self {
        assert!(indices.len() % 3 == 0);

        let triangle_count = indices.len() / 3;
        let mut vertices: Vec<VertexNode> = Vec::new();
        let mut triangles = Vec::with_capacity(triangle_count);
        let mut lookup: HashMap<u32, u32> = HashMap::new();

        // 1. vertex -> triangle incidence
        for (t, abc) in indices.chunks_exact(3).enumerate() {
            let t = t as u32;
            let mut node_ids = [0u32; 3];

            for (slot, &index) in node_ids.iter_mut().zip(abc) {
                let node = *lookup.entry(index).or_insert_with(|| {
                    vertices.push(VertexNode { index, neighbours: Vec::new() });
                    (vertices.len() - 1) as u32
                });

                // degenerate triangles reference a vertex more than once
                let incident = &mut vertices[node as usize].neighbours;
                if incident.last() != Some(&t) {
                    incident.push(t);
                }
                *slot = node;
            }

            triangles.push(TriangleNode {
                id: t,
                indices: [abc[0], abc[1], abc[2]],
                vertices: node_ids,
                neighbours: Vec::new(),
                state: UsedState::Unused,
            });
        }

        // 2. edge neighbours: a triangle incident on vertex j that also holds vertex j+1
        for t in 0..triangle_count {
            let node_ids = triangles[t].vertices;
            let mut neighbours = Vec::new();

            for j in 0..3 {
                let current = node_ids[j];
                let next = node_ids[(j + 1) % 3];
                if current == next {
                    continue;
                }

                for &candidate in &vertices[current as usize].neighbours {
                    if candidate as usize == t || neighbours.contains(&candidate) {
                        continue;
                    }
                    if triangles[candidate as usize].vertices.contains(&next) {
                        neighbours.push(candidate);
                    }
                }
            }

            triangles[t].neighbours = neighbours;
        }

        log::debug!(
            "Adjacency graph: {} vertices, {} triangles",
            vertices.len(),
            triangles.len()
        );

        Self { vertices, triangles, lookup }
    }

    pub fn vertex_node(&self, index: u32) -> Option<u32> {
        self.lookup.get(&index).copied()
    }

    pub fn incident_triangles(&self, index: u32) -> &[u32] {
        match self.vertex_node(index) {
            Some(node) => &self.vertices[node as usize].neighbours,
            None => &[],
        }
    }
}

/// CSR vertex -> triangle lists over a raw index buffer.
#[derive(Default, Debug)]
pub struct TriangleAdjacency {
    pub counts: Vec<u32>,
    pub offsets: Vec<u32>,
    pub data: Vec<u32>,
}

impl TriangleAdjacency {
    pub fn get_neighbors(&self, vertex: u32) -> &[u32] {
        let start = self.offsets[vertex as usize] as usize;
        let end = start + self.counts[vertex as usize] as usize;
        &self.data[start..end]
    }
}

pub fn build_triangle_adjacency(indices: &[u32], vertex_count: usize) -> TriangleAdjacency {
    let face_count = indices.len() / 3;

    // 1. per-vertex triangle counts
    let mut counts = vec![0u32; vertex_count];
    for &index in indices {
        assert!((index as usize) < vertex_count);
        counts[index as usize] += 1;
    }

    // 2. prefix sum
    let mut offsets = vec![0u32; vertex_count];
    let mut offset = 0;
    for (o, &c) in offsets.iter_mut().zip(&counts) {
        *o = offset;
        offset += c;
    }
    assert!(offset as usize == indices.len());

    // 3. fill, using the offsets as write cursors
    let mut cursors = offsets.clone();
    let mut data = vec![0u32; indices.len()];
    for face in 0..face_count {
        for k in 0..3 {
            let v = indices[face * 3 + k] as usize;
            data[cursors[v] as usize] = face as u32;
            cursors[v] += 1;
        }
    }

    TriangleAdjacency { counts, offsets, data }
}

#[cfg(test)]
mod test {
    use super::*;

    // two quads sharing the 1-4 edge:
    // 0 - 1 - 2
    // | / | / |
    // 3 - 4 - 5
    const STRIP: [u32; 12] = [0, 3, 1, 1, 3, 4, 1, 4, 2, 2, 4, 5];

    #[test]
    fn test_graph_neighbours() {
        let graph = MeshGraph::build(&STRIP);

        assert_eq!(graph.triangles.len(), 4);
        assert_eq!(graph.vertices.len(), 6);
        assert_eq!(graph.triangles[0].neighbours, vec![1]);
        assert_eq!(graph.triangles[1].neighbours, vec![0, 2]);
        assert_eq!(graph.triangles[2].neighbours, vec![1, 3]);
        assert_eq!(graph.triangles[3].neighbours, vec![2]);
    }

    #[test]
    fn test_graph_vertex_nodes() {
        let graph = MeshGraph::build(&STRIP);

        let order: Vec<u32> = graph.vertices.iter().map(|v| v.index).collect();
        assert_eq!(order, vec![0, 3, 1, 4, 2, 5]);
        assert_eq!(graph.incident_triangles(4), &[1, 2, 3]);
        assert_eq!(graph.vertices[graph.vertex_node(1).unwrap() as usize].degree(), 3);
        assert!(graph.incident_triangles(42).is_empty());
    }

    #[test]
    fn test_graph_non_manifold_edge() {
        // three triangles fanned around the 0-1 edge
        let graph = MeshGraph::build(&[0, 1, 2, 1, 0, 3, 0, 1, 4]);

        assert_eq!(graph.triangles[0].neighbours, vec![1, 2]);
        assert_eq!(graph.triangles[1].neighbours, vec![0, 2]);
    }

    #[test]
    fn test_graph_degenerate() {
        let graph = MeshGraph::build(&[0, 0, 1, 0, 1, 2]);

        assert_eq!(graph.incident_triangles(0), &[0, 1]);
        assert_eq!(graph.triangles[1].neighbours, vec![0]);
    }

    #[test]
    fn test_triangle_adjacency() {
        let adjacency = build_triangle_adjacency(&STRIP, 6);

        assert_eq!(adjacency.counts, vec![1, 3, 2, 2, 3, 1]);
        assert_eq!(adjacency.get_neighbors(1), &[0, 1, 2]);
        assert_eq!(adjacency.get_neighbors(4), &[1, 2, 3]);
        assert_eq!(adjacency.get_neighbors(5), &[3]);
    }
}
