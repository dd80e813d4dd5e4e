use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use lume_meshlet::processor::{clean_mesh, compute_cull_data, meshletize};
use lume_meshlet::{MeshVertex, MeshletConfig, MeshletizerType};

struct Mesh {
    vertices: Vec<MeshVertex>,
    indices: Vec<u32>,
}

/// Wavy grid of `n * n` quads so the bounding sphere path sees real curvature.
fn grid(n: u32) -> Mesh {
    let row = n + 1;
    let mut vertices = Vec::with_capacity((row * row) as usize);
    for y in 0..row {
        for x in 0..row {
            let (fx, fy) = (x as f32 / n as f32, y as f32 / n as f32);
            let z = (fx * 12.0).sin() * (fy * 9.0).cos() * 0.1;
            vertices.push(MeshVertex::from_position([fx, fy, z]));
        }
    }

    let mut indices = Vec::with_capacity((n * n * 6) as usize);
    for y in 0..n {
        for x in 0..n {
            let i = y * row + x;
            indices.extend_from_slice(&[i, i + 1, i + row, i + 1, i + row + 1, i + row]);
        }
    }

    let (vertices, indices) = clean_mesh(&vertices, &indices, &MeshletConfig::default());
    Mesh { vertices, indices }
}

fn meshletizers(c: &mut Criterion) {
    let mesh = grid(256);

    let mut group = c.benchmark_group("meshletize");
    group.throughput(Throughput::Elements((mesh.indices.len() / 3) as u64));
    group.sample_size(20);

    for kind in MeshletizerType::ALL {
        let config = MeshletConfig {
            meshletizer: kind,
            ..Default::default()
        };
        group.bench_with_input(BenchmarkId::new(kind.name(), "grid256"), &mesh, |b, mesh| {
            b.iter(|| meshletize(&mesh.vertices, &mesh.indices, &config));
        });
    }
    group.finish();

    let output = meshletize(&mesh.vertices, &mesh.indices, &MeshletConfig::default()).unwrap();
    c.bench_with_input(BenchmarkId::new("compute_cull_data", "grid256"), &mesh, |b, mesh| {
        b.iter(|| compute_cull_data(&mesh.vertices, &output));
    });
}

criterion_group!(benches, meshletizers);
criterion_main!(benches);
