pub mod adjacency;
pub mod assembly;
pub mod cache;
pub mod cull;
pub mod greedy;
pub mod library;
pub mod sphere;
pub mod stats;
pub mod tipsify;

use std::fmt;
use std::str::FromStr;

use meshopt::{generate_vertex_remap, remap_index_buffer, remap_vertex_buffer};
use rayon::prelude::*;

pub use assembly::MeshletOutput;
pub use cache::PrimitiveCache;
pub use cull::compute_cull_data;
pub use stats::MeshletStats;

use crate::{MeshAsset, MeshVertex, MeshletError, MeshletResult, MAX_PRIMITIVE_COUNT, MAX_VERTEX_COUNT};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MeshletLimits {
    pub max_verts: usize,
    pub max_prims: usize,
}

impl Default for MeshletLimits {
    fn default() -> Self {
        Self {
            max_verts: MAX_VERTEX_COUNT,
            max_prims: MAX_PRIMITIVE_COUNT,
        }
    }
}

impl MeshletLimits {
    pub fn new(max_verts: usize, max_prims: usize) -> MeshletResult<Self> {
        let limits = Self { max_verts, max_prims };
        limits.validate()?;
        Ok(limits)
    }

    pub fn validate(&self) -> MeshletResult<()> {
        if !(3..=MAX_VERTEX_COUNT).contains(&self.max_verts) || !(1..=MAX_PRIMITIVE_COUNT).contains(&self.max_prims) {
            return Err(MeshletError::InvalidLimits {
                max_verts: self.max_verts,
                max_prims: self.max_prims,
            });
        }
        Ok(())
    }
}

/// One function contract, four clustering strategies.
///
/// Every implementation checks the limits and the index buffer before touching vertex data.
pub trait Meshletizer {
    fn build(&self, vertices: &[MeshVertex], indices: &[u32], limits: MeshletLimits) -> MeshletResult<MeshletOutput>;
}

pub struct LibraryMeshletizer;
pub struct GreedyMeshletizer;
pub struct BoundingSphereMeshletizer;
pub struct TipsifyMeshletizer {
    pub cache_size: u32,
}

fn validate_mesh(vertices: &[MeshVertex], indices: &[u32], limits: MeshletLimits) -> MeshletResult<()> {
    limits.validate()?;
    validate_indices(indices, vertices.len())
}

impl Meshletizer for LibraryMeshletizer {
    fn build(&self, vertices: &[MeshVertex], indices: &[u32], limits: MeshletLimits) -> MeshletResult<MeshletOutput> {
        validate_mesh(vertices, indices, limits)?;
        library::build_meshlets_library(vertices, indices, limits)
    }
}

impl Meshletizer for GreedyMeshletizer {
    fn build(&self, vertices: &[MeshVertex], indices: &[u32], limits: MeshletLimits) -> MeshletResult<MeshletOutput> {
        validate_mesh(vertices, indices, limits)?;
        Ok(greedy::build_meshlets_greedy(indices, limits))
    }
}

impl Meshletizer for BoundingSphereMeshletizer {
    fn build(&self, vertices: &[MeshVertex], indices: &[u32], limits: MeshletLimits) -> MeshletResult<MeshletOutput> {
        validate_mesh(vertices, indices, limits)?;
        Ok(sphere::build_meshlets_bounding_sphere(vertices, indices, limits))
    }
}

impl Meshletizer for TipsifyMeshletizer {
    fn build(&self, vertices: &[MeshVertex], indices: &[u32], limits: MeshletLimits) -> MeshletResult<MeshletOutput> {
        validate_cache_size(self.cache_size)?;
        validate_mesh(vertices, indices, limits)?;
        Ok(tipsify::build_meshlets_tipsify(indices, vertices.len(), limits, self.cache_size))
    }
}

#[repr(i32)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum MeshletizerType {
    LibraryBased = 0,
    #[default]
    Greedy = 1,
    BoundingSphere = 2,
    Tipsify = 3,
}

impl MeshletizerType {
    pub const ALL: [MeshletizerType; 4] = [
        MeshletizerType::LibraryBased,
        MeshletizerType::Greedy,
        MeshletizerType::BoundingSphere,
        MeshletizerType::Tipsify,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MeshletizerType::LibraryBased => "library",
            MeshletizerType::Greedy => "greedy",
            MeshletizerType::BoundingSphere => "sphere",
            MeshletizerType::Tipsify => "tipsify",
        }
    }

    pub fn meshletize(
        self,
        vertices: &[MeshVertex],
        indices: &[u32],
        config: &MeshletConfig,
    ) -> MeshletResult<MeshletOutput> {
        match self {
            MeshletizerType::LibraryBased => LibraryMeshletizer.build(vertices, indices, config.limits),
            MeshletizerType::Greedy => GreedyMeshletizer.build(vertices, indices, config.limits),
            MeshletizerType::BoundingSphere => BoundingSphereMeshletizer.build(vertices, indices, config.limits),
            MeshletizerType::Tipsify => TipsifyMeshletizer {
                cache_size: config.tipsify_cache_size,
            }
            .build(vertices, indices, config.limits),
        }
    }
}

impl From<MeshletizerType> for i32 {
    fn from(kind: MeshletizerType) -> i32 {
        kind as i32
    }
}

impl TryFrom<i32> for MeshletizerType {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        MeshletizerType::ALL.into_iter().find(|kind| *kind as i32 == value).ok_or(value)
    }
}

impl FromStr for MeshletizerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MeshletizerType::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown meshletizer '{}', expected one of library, greedy, sphere, tipsify", s))
    }
}

impl fmt::Display for MeshletizerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything one meshletization run depends on; passed explicitly into [`process_mesh`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MeshletConfig {
    pub limits: MeshletLimits,
    pub meshletizer: MeshletizerType,
    pub tipsify_cache_size: u32,
    /// Merge bit-identical vertices before clustering.
    pub weld_vertices: bool,
    /// Renumber vertices in first-use order of the index buffer.
    pub optimize_vertex_fetch: bool,
}

impl MeshletConfig {
    pub fn validate(&self) -> MeshletResult<()> {
        self.limits.validate()?;
        validate_cache_size(self.tipsify_cache_size)
    }
}

impl Default for MeshletConfig {
    fn default() -> Self {
        Self {
            limits: MeshletLimits::default(),
            meshletizer: MeshletizerType::default(),
            tipsify_cache_size: tipsify::DEFAULT_CACHE_SIZE,
            weld_vertices: true,
            optimize_vertex_fetch: true,
        }
    }
}

#[derive(Default, Debug, Clone)]
pub struct MeshInput {
    pub name: String,
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
    /// One attribute id per triangle, or empty.
    pub attributes: Vec<u32>,
}

impl MeshInput {
    /// Builds an input from flat attribute streams; missing normals/uvs get defaults.
    pub fn from_flat(name: &str, positions: &[f32], normals: &[f32], uvs: &[f32], indices: &[u32]) -> Self {
        let vertex_count = positions.len() / 3;
        let mut vertices = Vec::with_capacity(vertex_count);

        for i in 0..vertex_count {
            vertices.push(MeshVertex {
                position: [positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]],
                normal: if normals.len() >= (i + 1) * 3 {
                    [normals[i * 3], normals[i * 3 + 1], normals[i * 3 + 2]]
                } else {
                    [0.0, 1.0, 0.0]
                },
                uv: if uvs.len() >= (i + 1) * 2 { [uvs[i * 2], uvs[i * 2 + 1]] } else { [0.0, 0.0] },
            });
        }

        Self {
            name: name.to_string(),
            vertices,
            indices: indices.to_vec(),
            attributes: Vec::new(),
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

fn validate_cache_size(cache_size: u32) -> MeshletResult<()> {
    if cache_size < tipsify::MIN_CACHE_SIZE {
        return Err(MeshletError::InvalidCacheSize(cache_size));
    }
    Ok(())
}

fn validate_indices(indices: &[u32], vertex_count: usize) -> MeshletResult<()> {
    if indices.is_empty() {
        return Err(MeshletError::EmptyIndexBuffer);
    }
    if indices.len() % 3 != 0 {
        return Err(MeshletError::IndexCountNotMultipleOfThree(indices.len()));
    }
    if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
        return Err(MeshletError::IndexOutOfRange { index, vertex_count });
    }
    Ok(())
}

pub fn validate_input(input: &MeshInput, config: &MeshletConfig) -> MeshletResult<()> {
    config.validate()?;
    validate_indices(&input.indices, input.vertices.len())?;

    if !input.attributes.is_empty() && input.attributes.len() != input.triangle_count() {
        return Err(MeshletError::AttributeCountMismatch {
            attributes: input.attributes.len(),
            triangles: input.triangle_count(),
        });
    }
    Ok(())
}

/// Validates and runs the configured meshletizer over an already prepared mesh.
pub fn meshletize(vertices: &[MeshVertex], indices: &[u32], config: &MeshletConfig) -> MeshletResult<MeshletOutput> {
    config.validate()?;
    config.meshletizer.meshletize(vertices, indices, config)
}

/// New index for each vertex in order of first reference; unreferenced vertices map to `u32::MAX`.
pub fn vertex_fetch_remap(indices: &[u32], vertex_count: usize) -> (usize, Vec<u32>) {
    let mut remap = vec![u32::MAX; vertex_count];
    let mut next = 0u32;

    for &index in indices {
        let slot = &mut remap[index as usize];
        if *slot == u32::MAX {
            *slot = next;
            next += 1;
        }
    }

    (next as usize, remap)
}

/// Welds duplicates and reorders vertices for fetch locality. Triangle order is preserved.
pub fn clean_mesh(vertices: &[MeshVertex], indices: &[u32], config: &MeshletConfig) -> (Vec<MeshVertex>, Vec<u32>) {
    let mut vertices = vertices.to_vec();
    let mut indices = indices.to_vec();

    if config.weld_vertices {
        let (vertex_count, remap) = generate_vertex_remap(vertices.as_slice(), Some(indices.as_slice()));
        log::debug!("Welded {} vertices into {}", vertices.len(), vertex_count);
        vertices = remap_vertex_buffer(vertices.as_slice(), vertex_count, &remap);
        indices = remap_index_buffer(Some(indices.as_slice()), vertex_count, &remap);
    }

    if config.optimize_vertex_fetch {
        let (vertex_count, remap) = vertex_fetch_remap(&indices, vertices.len());
        vertices = remap_vertex_buffer(vertices.as_slice(), vertex_count, &remap);
        indices = remap_index_buffer(Some(indices.as_slice()), vertex_count, &remap);
    }

    (vertices, indices)
}

/// Cleans, meshletizes and computes cull data for one mesh.
pub fn process_mesh(input: &MeshInput, config: &MeshletConfig) -> MeshletResult<MeshAsset> {
    validate_input(input, config)?;

    let (vertices, indices) = clean_mesh(&input.vertices, &input.indices, config);
    let output = config.meshletizer.meshletize(&vertices, &indices, config)?;
    let cull_data = compute_cull_data(&vertices, &output)?;

    log::info!(
        "{} [{}]: {}",
        input.name,
        config.meshletizer,
        MeshletStats::from_output(&output)
    );

    let attributes = if input.attributes.is_empty() {
        vec![0; input.triangle_count()]
    } else {
        input.attributes.clone()
    };

    Ok(MeshAsset::new(vertices, indices, attributes, output, cull_data, config))
}

/// Processes independent meshes in parallel; each mesh is still meshletized sequentially.
pub fn process_meshes(inputs: &[MeshInput], config: &MeshletConfig) -> Vec<MeshletResult<MeshAsset>> {
    inputs.par_iter().map(|input| process_mesh(input, config)).collect()
}
