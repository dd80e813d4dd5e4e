use super::adjacency::{MeshGraph, UsedState};
use super::assembly::MeshletOutput;
use super::cache::PrimitiveCache;
use super::MeshletLimits;

/// Grows meshlets by breadth-first frontier expansion over the adjacency graph,
/// always taking the frontier triangle that reuses the most staged vertices.
pub fn build_meshlets_greedy(indices: &[u32], limits: MeshletLimits) -> MeshletOutput {
    let mut graph = MeshGraph::build(indices);
    let mut cache = PrimitiveCache::new();
    let mut output = MeshletOutput::with_capacity(graph.triangles.len());

    let mut frontier: Vec<u32> = Vec::new();

    for seed in 0..graph.triangles.len() {
        if graph.triangles[seed].state == UsedState::Consumed {
            continue;
        }

        frontier.clear();
        frontier.push(seed as u32);
        graph.triangles[seed].state = UsedState::Queued;

        let mut overflowed = false;

        while !frontier.is_empty() {
            // first maximum wins, so ties resolve in frontier order
            let mut best = 0;
            let mut best_score = 0;
            for (i, &candidate) in frontier.iter().enumerate() {
                let score = cache.shared_count(graph.triangles[candidate as usize].indices);
                if i == 0 || score > best_score {
                    best = i;
                    best_score = score;
                }
            }

            let candidate = frontier[best] as usize;
            let tri = graph.triangles[candidate].indices;

            if cache.cannot_insert(tri, limits.max_verts, limits.max_prims) {
                output.append(&cache);
                cache.reset();

                // stale frontier entries become seeds for later meshlets
                for &queued in &frontier {
                    graph.triangles[queued as usize].state = UsedState::Unused;
                }
                frontier.clear();
                overflowed = true;
                break;
            }

            frontier.remove(best);
            cache.insert(tri);
            graph.triangles[candidate].state = UsedState::Consumed;

            for n in 0..graph.triangles[candidate].neighbours.len() {
                let neighbour = graph.triangles[candidate].neighbours[n];
                if graph.triangles[neighbour as usize].state == UsedState::Unused {
                    graph.triangles[neighbour as usize].state = UsedState::Queued;
                    frontier.push(neighbour);
                }
            }
        }

        if !overflowed && !cache.is_empty() {
            output.append(&cache);
            cache.reset();
        }
    }

    log::debug!(
        "Greedy meshletizer: {} triangles -> {} meshlets",
        graph.triangles.len(),
        output.meshlets.len()
    );

    output
}
