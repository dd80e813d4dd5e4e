//! Vertex cache reordering ("tipsify") followed by linear meshlet packing.

use super::adjacency::build_triangle_adjacency;
use super::assembly::MeshletOutput;
use super::cache::PrimitiveCache;
use super::MeshletLimits;

pub const DEFAULT_CACHE_SIZE: u32 = 32;
/// A triangle's three vertices must fit in the cache at once.
pub const MIN_CACHE_SIZE: u32 = 3;

const INVALID_VERTEX: u32 = u32::MAX;

#[derive(Default, Debug, Clone, PartialEq)]
pub struct VertexCacheStatistics {
    pub vertices_transformed: u32,
    /// Transformed vertices / triangle count. Best case 0.5, worst case 3.0.
    pub acmr: f32,
    /// Transformed vertices / vertex count. Optimum is 1.0.
    pub atvr: f32,
}

/// Simulates a FIFO post-transform cache over `indices`.
pub fn analyze_vertex_cache(indices: &[u32], vertex_count: usize, cache_size: u32) -> VertexCacheStatistics {
    assert!(indices.len() % 3 == 0);
    assert!(cache_size >= MIN_CACHE_SIZE);

    let mut result = VertexCacheStatistics::default();
    let mut cache_timestamps = vec![0u32; vertex_count];
    let mut timestamp = cache_size + 1;

    for &index in indices {
        let index = index as usize;
        if timestamp - cache_timestamps[index] > cache_size {
            cache_timestamps[index] = timestamp;
            timestamp += 1;
            result.vertices_transformed += 1;
        }
    }

    let unique_vertex_count = cache_timestamps.iter().filter(|t| **t > 0).count();

    if !indices.is_empty() {
        result.acmr = result.vertices_transformed as f32 / (indices.len() as f32 / 3.0);
    }
    if unique_vertex_count > 0 {
        result.atvr = result.vertices_transformed as f32 / unique_vertex_count as f32;
    }

    result
}

fn next_vertex_dead_end(
    dead_end: &[u32],
    dead_end_top: &mut usize,
    input_cursor: &mut usize,
    live_triangles: &[u32],
) -> u32 {
    // dead-end stack first
    while *dead_end_top != 0 {
        *dead_end_top -= 1;
        let vertex = dead_end[*dead_end_top];

        if live_triangles[vertex as usize] > 0 {
            return vertex;
        }
    }

    // then input order
    while *input_cursor < live_triangles.len() {
        if live_triangles[*input_cursor] > 0 {
            return *input_cursor as u32;
        }
        *input_cursor += 1;
    }

    INVALID_VERTEX
}

fn next_vertex_neighbour(
    candidates: &[u32],
    live_triangles: &[u32],
    cache_timestamps: &[u32],
    timestamp: u32,
    cache_size: u32,
) -> u32 {
    let mut best_candidate = INVALID_VERTEX;
    let mut best_priority = -1i64;

    for &vertex in candidates {
        let v = vertex as usize;
        if live_triangles[v] == 0 {
            continue;
        }

        // still resident after fanning out its remaining triangles?
        let age = timestamp - cache_timestamps[v];
        let priority = if age + 2 * live_triangles[v] <= cache_size { age as i64 } else { 0 };

        if priority > best_priority {
            best_candidate = vertex;
            best_priority = priority;
        }
    }

    best_candidate
}

/// Reorders triangles to raise the hit rate of a FIFO vertex cache of `cache_size` entries.
///
/// Deterministic: the traversal only walks arrays, starting from vertex 0.
pub fn optimize_vertex_cache_fifo(indices: &[u32], vertex_count: usize, cache_size: u32) -> Vec<u32> {
    assert!(indices.len() % 3 == 0);
    assert!(cache_size >= MIN_CACHE_SIZE);

    let mut destination = Vec::with_capacity(indices.len());
    if indices.is_empty() || vertex_count == 0 {
        return destination;
    }

    let face_count = indices.len() / 3;
    let adjacency = build_triangle_adjacency(indices, vertex_count);

    let mut live_triangles = adjacency.counts.clone();
    let mut cache_timestamps = vec![0u32; vertex_count];

    let mut dead_end = vec![0u32; indices.len()];
    let mut dead_end_top = 0;

    let mut emitted_flags = vec![false; face_count];

    let mut current_vertex = 0u32;
    let mut timestamp = cache_size + 1;
    let mut input_cursor = 1; // vertex to restart from on a dead end

    while current_vertex != INVALID_VERTEX {
        let next_candidates_begin = dead_end_top;

        // emit every live triangle around the current vertex
        for &triangle in adjacency.get_neighbors(current_vertex) {
            let triangle = triangle as usize;
            if emitted_flags[triangle] {
                continue;
            }

            let abc = &indices[triangle * 3..triangle * 3 + 3];
            destination.extend_from_slice(abc);

            dead_end[dead_end_top..dead_end_top + 3].copy_from_slice(abc);
            dead_end_top += 3;

            for &i in abc {
                let i = i as usize;
                live_triangles[i] -= 1;

                if timestamp - cache_timestamps[i] > cache_size {
                    cache_timestamps[i] = timestamp;
                    timestamp += 1;
                }
            }

            emitted_flags[triangle] = true;
        }

        // the one-ring just pushed onto the dead-end stack
        let next_candidates = &dead_end[next_candidates_begin..dead_end_top];

        current_vertex = next_vertex_neighbour(
            next_candidates,
            &live_triangles,
            &cache_timestamps,
            timestamp,
            cache_size,
        );

        if current_vertex == INVALID_VERTEX {
            current_vertex = next_vertex_dead_end(&dead_end, &mut dead_end_top, &mut input_cursor, &live_triangles);
        }
    }

    assert!(destination.len() == indices.len());

    destination
}

/// Packs triangles into meshlets strictly in stream order.
pub fn build_meshlets_linear(indices: &[u32], limits: MeshletLimits) -> MeshletOutput {
    let mut cache = PrimitiveCache::new();
    let mut output = MeshletOutput::with_capacity(indices.len() / 3);

    for abc in indices.chunks_exact(3) {
        let tri = [abc[0], abc[1], abc[2]];

        if cache.cannot_insert(tri, limits.max_verts, limits.max_prims) {
            output.append(&cache);
            cache.reset();
        }
        cache.insert(tri);
    }

    if !cache.is_empty() {
        output.append(&cache);
    }

    output
}

pub fn build_meshlets_tipsify(
    indices: &[u32],
    vertex_count: usize,
    limits: MeshletLimits,
    cache_size: u32,
) -> MeshletOutput {
    let reordered = optimize_vertex_cache_fifo(indices, vertex_count, cache_size);

    if log::log_enabled!(log::Level::Debug) {
        let before = analyze_vertex_cache(indices, vertex_count, cache_size);
        let after = analyze_vertex_cache(&reordered, vertex_count, cache_size);
        log::debug!("Tipsify ACMR {:.3} -> {:.3} (cache {})", before.acmr, after.acmr, cache_size);
    }

    let output = build_meshlets_linear(&reordered, limits);

    log::debug!(
        "Tipsify meshletizer: {} triangles -> {} meshlets",
        indices.len() / 3,
        output.meshlets.len()
    );

    output
}
