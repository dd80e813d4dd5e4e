use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use memmap2::Mmap;
use serde::{Deserialize, Serialize};

use crate::processor::{MeshletConfig, MeshletOutput, MeshletizerType};
use crate::{CullData, MeshVertex, Meshlet};

pub const ASSET_MAGIC: [u8; 4] = *b"LMSH";
pub const ASSET_VERSION: u32 = 1;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssetHeader {
    pub magic: [u8; 4],
    pub version: u32,
}

/// A fully processed mesh: cleaned geometry, meshlets and culling data.
///
/// Field order is the on-disk order.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshAsset {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
    pub meshlets: Vec<Meshlet>,
    pub unique_vertex_indices: Vec<u32>,
    /// Packed 10/10/10 primitive indices.
    pub meshlet_triangles: Vec<u32>,
    /// Attribute id per triangle of `indices`.
    pub attributes: Vec<u32>,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub cull_data: Vec<CullData>,
    pub meshlet_max_verts: i32,
    pub meshlet_max_prims: i32,
    pub meshletizer_type: i32,
}

impl MeshAsset {
    pub fn new(
        vertices: Vec<MeshVertex>,
        indices: Vec<u32>,
        attributes: Vec<u32>,
        output: MeshletOutput,
        cull_data: Vec<CullData>,
        config: &MeshletConfig,
    ) -> Self {
        let positions = vertices.iter().map(|v| v.position).collect();
        let normals = vertices.iter().map(|v| v.normal).collect();
        let uvs = vertices.iter().map(|v| v.uv).collect();

        Self {
            vertices,
            indices,
            meshlets: output.meshlets,
            unique_vertex_indices: output.unique_vertex_indices,
            meshlet_triangles: output.packed_primitive_indices,
            attributes,
            positions,
            normals,
            uvs,
            cull_data,
            meshlet_max_verts: config.limits.max_verts as i32,
            meshlet_max_prims: config.limits.max_prims as i32,
            meshletizer_type: config.meshletizer.into(),
        }
    }

    pub fn meshletizer(&self) -> Option<MeshletizerType> {
        MeshletizerType::try_from(self.meshletizer_type).ok()
    }

    /// Whether this asset was built with the same limits and algorithm as `config`.
    pub fn matches(&self, config: &MeshletConfig) -> bool {
        self.meshlet_max_verts == config.limits.max_verts as i32
            && self.meshlet_max_prims == config.limits.max_prims as i32
            && self.meshletizer() == Some(config.meshletizer)
    }

    pub fn meshlet_output(&self) -> MeshletOutput {
        MeshletOutput {
            meshlets: self.meshlets.clone(),
            unique_vertex_indices: self.unique_vertex_indices.clone(),
            packed_primitive_indices: self.meshlet_triangles.clone(),
        }
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let header = AssetHeader {
            magic: ASSET_MAGIC,
            version: ASSET_VERSION,
        };
        bincode::serialize_into(&mut *writer, &header)?;
        bincode::serialize_into(&mut *writer, self)?;
        Ok(())
    }

    pub fn read_from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cursor = bytes;

        let header: AssetHeader = bincode::deserialize_from(&mut cursor).context("Failed to read asset header")?;
        if header.magic != ASSET_MAGIC {
            bail!("Invalid mesh asset magic header. Did you re-process the model?");
        }
        if header.version != ASSET_VERSION {
            bail!("Unsupported mesh asset version {} (expected {})", header.version, ASSET_VERSION);
        }

        let asset: MeshAsset = bincode::deserialize_from(&mut cursor).context("Failed to read asset body")?;
        if !cursor.is_empty() {
            bail!("Mesh asset has {} trailing bytes", cursor.len());
        }
        Ok(asset)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create asset file: {:?}", path.as_ref()))?;
        let mut writer = BufWriter::with_capacity(1024 * 1024, file);

        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())
            .with_context(|| format!("Failed to open asset file: {:?}", path.as_ref()))?;
        // SAFETY: the map is read-only and dropped before returning.
        let mmap = unsafe { Mmap::map(&file)? };

        Self::read_from_bytes(&mmap).with_context(|| format!("Failed to parse asset file: {:?}", path.as_ref()))
    }
}
