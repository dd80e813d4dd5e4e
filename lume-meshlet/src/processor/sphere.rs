use glam::Vec3;

use super::adjacency::{MeshGraph, UsedState};
use super::assembly::MeshletOutput;
use super::cache::PrimitiveCache;
use super::MeshletLimits;
use crate::MeshVertex;

/// Running bounding sphere of the meshlet being grown.
#[derive(Copy, Clone, Debug, PartialEq)]
struct Sphere {
    center: Vec3,
    radius: f32,
}

impl Sphere {
    /// Circumscribing extent of a triangle: centroid plus the farthest corner.
    fn from_triangle(points: [Vec3; 3]) -> Self {
        let center = (points[0] + points[1] + points[2]) / 3.0;
        let radius = points.iter().map(|p| center.distance(*p)).fold(0.0f32, f32::max);

        Self { center, radius }
    }

    /// Moves the sphere just enough to cover `p`, halving the overshoot.
    fn grow(self, p: Vec3) -> Self {
        let d = self.center.distance(p);
        if d <= self.radius {
            return self;
        }

        let k = 0.5 + (self.radius / d) / 2.0;
        Self {
            center: self.center * k + p * (1.0 - k),
            radius: (self.radius + d) / 2.0,
        }
    }
}

struct SphereBuilder<'a> {
    vertices: &'a [MeshVertex],
    limits: MeshletLimits,
    graph: MeshGraph,
    cache: PrimitiveCache,
    output: MeshletOutput,
    sphere: Sphere,
    /// Unconsumed triangles sharing an edge with the meshlet being grown.
    frontier: Vec<u32>,
    /// Per-triangle stamp so each vertex-incident candidate is scored once per step.
    visited: Vec<u32>,
    stamp: u32,
    /// Vertex nodes before this one have no unconsumed triangles left.
    seed_cursor: usize,
}

impl<'a> SphereBuilder<'a> {
    fn position(&self, index: u32) -> Vec3 {
        Vec3::from_array(self.vertices[index as usize].position)
    }

    fn triangle_points(&self, tri: usize) -> [Vec3; 3] {
        self.graph.triangles[tri].indices.map(|i| self.position(i))
    }

    fn tentative(&self, tri: usize) -> Sphere {
        let mut sphere = self.sphere;
        for &index in &self.graph.triangles[tri].indices {
            if !self.cache.contains(index) {
                sphere = sphere.grow(self.position(index));
            }
        }
        sphere
    }

    /// Ranking radius: every new vertex blends its distance from the current center
    /// into the radius, whether it lies inside the sphere or not.
    fn score_radius(&self, tri: usize) -> f32 {
        let mut radius = self.sphere.radius;
        for &index in &self.graph.triangles[tri].indices {
            if !self.cache.contains(index) {
                radius = 0.5 * (radius + self.sphere.center.distance(self.position(index)));
            }
        }
        radius
    }

    fn score(&self, tri: usize, best: &mut Option<(usize, usize, f32)>) {
        let shared = self.cache.shared_count(self.graph.triangles[tri].indices);
        let radius = self.score_radius(tri);

        let better = match *best {
            None => true,
            Some((_, best_shared, best_radius)) => shared > best_shared || (shared == best_shared && radius < best_radius),
        };
        if better {
            *best = Some((tri, shared, radius));
        }
    }

    /// Best candidate on the edge frontier: most shared vertices first, then the smallest radius.
    /// An empty frontier falls back to any unconsumed triangle touching a staged vertex.
    fn best_candidate(&mut self) -> Option<usize> {
        let triangles = &self.graph.triangles;
        self.frontier.retain(|&tri| triangles[tri as usize].state != UsedState::Consumed);

        let mut best: Option<(usize, usize, f32)> = None;

        if !self.frontier.is_empty() {
            for i in 0..self.frontier.len() {
                self.score(self.frontier[i] as usize, &mut best);
            }
            return best.map(|(tri, _, _)| tri);
        }

        self.stamp += 1;
        for slot in 0..self.cache.vertex_count() {
            let index = self.cache.vertices()[slot];
            let Some(node) = self.graph.vertex_node(index) else {
                continue;
            };

            for n in 0..self.graph.vertices[node as usize].degree() {
                let tri = self.graph.vertices[node as usize].neighbours[n] as usize;
                if self.graph.triangles[tri].state == UsedState::Consumed || self.visited[tri] == self.stamp {
                    continue;
                }
                self.visited[tri] = self.stamp;
                self.score(tri, &mut best);
            }
        }

        best.map(|(tri, _, _)| tri)
    }

    /// First unconsumed triangle around the next vertex, in vertex sequence order.
    fn next_seed(&mut self) -> Option<usize> {
        while self.seed_cursor < self.graph.vertices.len() {
            let node = &self.graph.vertices[self.seed_cursor];
            let found = node
                .neighbours
                .iter()
                .find(|&&tri| self.graph.triangles[tri as usize].state != UsedState::Consumed);

            if let Some(&tri) = found {
                return Some(tri as usize);
            }
            self.seed_cursor += 1;
        }
        None
    }

    fn consume(&mut self, tri: usize) {
        self.cache.insert(self.graph.triangles[tri].indices);
        self.graph.triangles[tri].state = UsedState::Consumed;

        for n in 0..self.graph.triangles[tri].neighbours.len() {
            let neighbour = self.graph.triangles[tri].neighbours[n];
            if self.graph.triangles[neighbour as usize].state == UsedState::Unused {
                self.graph.triangles[neighbour as usize].state = UsedState::Queued;
                self.frontier.push(neighbour);
            }
        }
    }

    fn start(&mut self, tri: usize) {
        self.sphere = Sphere::from_triangle(self.triangle_points(tri));
        self.consume(tri);
    }

    fn accept(&mut self, tri: usize) {
        self.sphere = self.tentative(tri);
        self.consume(tri);
    }

    /// Before closing a full meshlet, add any remaining triangles whose vertices are all staged.
    fn pack_remaining_primitives(&mut self) {
        let mut slot = 0;
        while slot < self.cache.vertex_count() {
            let index = self.cache.vertices()[slot];
            let incident = self.graph.incident_triangles(index).to_vec();

            for tri in incident {
                let tri = tri as usize;
                if self.graph.triangles[tri].state == UsedState::Consumed {
                    continue;
                }
                let indices = self.graph.triangles[tri].indices;
                if self.cache.shared_count(indices) == 3
                    && !self.cache.cannot_insert(indices, self.limits.max_verts, self.limits.max_prims)
                {
                    self.consume(tri);
                }
            }
            slot += 1;
        }
    }

    fn finalize(&mut self) {
        if !self.cache.is_empty() {
            self.output.append(&self.cache);
        }
        self.cache.reset();

        for &tri in &self.frontier {
            let node = &mut self.graph.triangles[tri as usize];
            if node.state == UsedState::Queued {
                node.state = UsedState::Unused;
            }
        }
        self.frontier.clear();
    }

    fn run(mut self) -> MeshletOutput {
        loop {
            let next = match self.best_candidate() {
                Some(tri) => tri,
                None => {
                    // locally exhausted: close the meshlet and seed a new component
                    self.finalize();
                    match self.next_seed() {
                        Some(seed) => {
                            self.start(seed);
                            continue;
                        }
                        None => break,
                    }
                }
            };

            let indices = self.graph.triangles[next].indices;
            if self.cache.cannot_insert(indices, self.limits.max_verts, self.limits.max_prims) {
                self.pack_remaining_primitives();
                self.finalize();
                self.start(next);
                continue;
            }

            self.accept(next);
        }

        self.finalize();

        log::debug!(
            "Bounding sphere meshletizer: {} triangles -> {} meshlets",
            self.graph.triangles.len(),
            self.output.meshlets.len()
        );

        self.output
    }
}

/// Graph growth that trades some vertex reuse for spatially compact meshlets.
pub fn build_meshlets_bounding_sphere(
    vertices: &[MeshVertex],
    indices: &[u32],
    limits: MeshletLimits,
) -> MeshletOutput {
    let graph = MeshGraph::build(indices);
    let triangle_count = graph.triangles.len();

    let builder = SphereBuilder {
        vertices,
        limits,
        graph,
        cache: PrimitiveCache::new(),
        output: MeshletOutput::with_capacity(triangle_count),
        sphere: Sphere { center: Vec3::ZERO, radius: 0.0 },
        frontier: Vec::new(),
        visited: vec![0; triangle_count],
        stamp: 0,
        seed_cursor: 0,
    };

    builder.run()
}

#[cfg(test)]
mod test {
    use super::*;

    fn grid(n: usize) -> (Vec<MeshVertex>, Vec<u32>) {
        let mut vertices = Vec::new();
        for y in 0..=n {
            for x in 0..=n {
                vertices.push(MeshVertex::from_position([x as f32, y as f32, 0.0]));
            }
        }

        let mut indices = Vec::new();
        let row = (n + 1) as u32;
        for y in 0..n as u32 {
            for x in 0..n as u32 {
                let i = y * row + x;
                indices.extend_from_slice(&[i, i + row, i + 1, i + 1, i + row, i + row + 1]);
            }
        }
        (vertices, indices)
    }

    #[test]
    fn test_sphere_grow() {
        let sphere = Sphere { center: Vec3::ZERO, radius: 1.0 };

        assert_eq!(sphere.grow(Vec3::new(0.5, 0.0, 0.0)), sphere);

        let grown = sphere.grow(Vec3::new(3.0, 0.0, 0.0));
        assert_eq!(grown.radius, 2.0);
        assert!((grown.center - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_sphere_from_triangle() {
        let sphere = Sphere::from_triangle([Vec3::ZERO, Vec3::new(3.0, 0.0, 0.0), Vec3::new(0.0, 3.0, 0.0)]);

        assert_eq!(sphere.center, Vec3::new(1.0, 1.0, 0.0));
        assert!((sphere.radius - 5.0f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_grid_coverage() {
        let (vertices, indices) = grid(12);
        let output = build_meshlets_bounding_sphere(&vertices, &indices, MeshletLimits { max_verts: 32, max_prims: 40 });

        let seen = output.to_index_buffer();
        assert_eq!(seen.len(), indices.len());

        let mut sorted: Vec<[u32; 3]> = seen
            .chunks_exact(3)
            .map(|t| {
                let mut t = [t[0], t[1], t[2]];
                t.sort();
                t
            })
            .collect();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), indices.len() / 3);

        for meshlet in &output.meshlets {
            assert!(meshlet.vert_count <= 32);
            assert!(meshlet.prim_count <= 40);
        }
    }

    #[test]
    fn test_tie_break_prefers_new_vertex_nearest_center() {
        let vertices = [
            MeshVertex::from_position([0.0, 0.0, 0.0]),
            MeshVertex::from_position([10.0, 0.0, 0.0]),
            MeshVertex::from_position([0.0, 10.0, 0.0]),
            MeshVertex::from_position([5.0, -1.0, 0.0]),
            MeshVertex::from_position([6.0, 6.0, 0.0]),
        ];
        // both candidates share an edge with the seed and add one vertex inside its sphere
        let indices = [0, 1, 2, 1, 0, 3, 2, 1, 4];
        let output = build_meshlets_bounding_sphere(&vertices, &indices, MeshletLimits { max_verts: 64, max_prims: 2 });

        assert_eq!(output.meshlets.len(), 2);
        assert_eq!(output.to_index_buffer()[..6], [0, 1, 2, 2, 1, 4]);
    }

    #[test]
    fn test_score_radius_blends_inner_vertex() {
        let vertices = [
            MeshVertex::from_position([0.0, 0.0, 0.0]),
            MeshVertex::from_position([3.0, 0.0, 0.0]),
            MeshVertex::from_position([0.0, 3.0, 0.0]),
            MeshVertex::from_position([1.0, 1.0, 0.0]),
        ];
        let indices = [0, 1, 2, 0, 1, 3];
        let graph = MeshGraph::build(&indices);
        let mut builder = SphereBuilder {
            vertices: &vertices,
            limits: MeshletLimits::default(),
            graph,
            cache: PrimitiveCache::new(),
            output: MeshletOutput::default(),
            sphere: Sphere { center: Vec3::ZERO, radius: 0.0 },
            frontier: Vec::new(),
            visited: vec![0; 2],
            stamp: 0,
            seed_cursor: 0,
        };
        builder.start(0);

        // vertex 3 sits on the center, so the radius halves
        let expected = 0.5 * builder.sphere.radius;
        assert!((builder.score_radius(1) - expected).abs() < 1e-6);
        assert_eq!(builder.tentative(1), builder.sphere);
    }

    #[test]
    fn test_overflow_packs_fully_staged_triangles() {
        let mut vertices = vec![MeshVertex::from_position([0.0, 0.0, 0.0])];
        for k in 1..=6 {
            let angle = k as f32 * 0.5;
            vertices.push(MeshVertex::from_position([angle.cos(), angle.sin(), 0.0]));
        }

        #[rustfmt::skip]
        let indices = [
            0, 1, 2, 0, 2, 3, 0, 3, 4, 0, 4, 5, // fan around vertex 0
            0, 5, 6, // needs a seventh vertex
            1, 3, 5, // only touches the fan at its corners
        ];
        let output = build_meshlets_bounding_sphere(&vertices, &indices, MeshletLimits { max_verts: 6, max_prims: 124 });

        assert_eq!(output.meshlets.len(), 2);
        assert_eq!(output.meshlets[0].vert_count, 6);
        assert_eq!(output.meshlets[0].prim_count, 5);

        let first: Vec<[u32; 3]> = output.meshlet_triangles(output.meshlets[0]).collect();
        assert!(first.contains(&[1, 3, 5]));
        assert_eq!(output.meshlet_triangles(output.meshlets[1]).collect::<Vec<_>>(), vec![[0, 5, 6]]);
    }

    #[test]
    fn test_disconnected_components_split() {
        let mut vertices = Vec::new();
        for i in 0..6 {
            vertices.push(MeshVertex::from_position([i as f32 * 10.0, 0.0, 0.0]));
        }
        let output = build_meshlets_bounding_sphere(&vertices, &[0, 1, 2, 3, 4, 5], MeshletLimits::default());

        assert_eq!(output.meshlets.len(), 2);
    }
}
