use std::env;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use lume_meshlet::processor::{clean_mesh, meshletize, MeshletStats};
use lume_meshlet::{process_meshes, MeshAsset, MeshInput, MeshletConfig, MeshletizerType};

const USAGE: &str = "Usage: lume-processor <input.obj> <output_dir> [--meshletizer=library|greedy|sphere|tipsify] \
[--max-verts=N] [--max-prims=N] [--cache-size=N] [--force] [--bench]";

struct Options {
    input: PathBuf,
    output_dir: PathBuf,
    config: MeshletConfig,
    force: bool,
    bench: bool,
}

fn parse_args(args: &[String]) -> Result<Options> {
    let mut positional = Vec::new();
    let mut config = MeshletConfig::default();
    let mut force = false;
    let mut bench = false;

    for arg in args {
        if let Some(value) = arg.strip_prefix("--meshletizer=") {
            config.meshletizer = value.parse::<MeshletizerType>().map_err(anyhow::Error::msg)?;
        } else if let Some(value) = arg.strip_prefix("--max-verts=") {
            config.limits.max_verts = value.parse().with_context(|| format!("Invalid --max-verts: {}", value))?;
        } else if let Some(value) = arg.strip_prefix("--max-prims=") {
            config.limits.max_prims = value.parse().with_context(|| format!("Invalid --max-prims: {}", value))?;
        } else if let Some(value) = arg.strip_prefix("--cache-size=") {
            config.tipsify_cache_size = value.parse().with_context(|| format!("Invalid --cache-size: {}", value))?;
        } else if arg == "--force" {
            force = true;
        } else if arg == "--bench" {
            bench = true;
        } else if arg.starts_with("--") {
            bail!("Unknown option {}\n{}", arg, USAGE);
        } else {
            positional.push(arg.clone());
        }
    }

    if positional.len() != 2 {
        bail!("{}", USAGE);
    }

    config.validate()?;

    Ok(Options {
        input: PathBuf::from(&positional[0]),
        output_dir: PathBuf::from(&positional[1]),
        config,
        force,
        bench,
    })
}

fn main() -> Result<()> {
    env_logger::init();
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        println!("{}", USAGE);
        return Ok(());
    }
    let options = parse_args(&args)?;

    log::info!("Processing {:?} with {}", options.input, options.config.meshletizer);
    let start_total = Instant::now();

    let inputs = load_obj(&options.input)?;
    log::info!("Loaded {} meshes in {:.2}s", inputs.len(), start_total.elapsed().as_secs_f32());

    if options.bench {
        for input in &inputs {
            bench_meshletizers(input, &options.config)?;
        }
        return Ok(());
    }

    std::fs::create_dir_all(&options.output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", options.output_dir))?;

    let pending: Vec<MeshInput> = inputs
        .into_iter()
        .filter(|input| options.force || !is_cached(&asset_path(&options.output_dir, &input.name), &options.config))
        .collect();

    let build_start = Instant::now();
    let results = process_meshes(&pending, &options.config);
    log::info!("Meshletized {} meshes in {:.2}s", pending.len(), build_start.elapsed().as_secs_f32());

    for (input, result) in pending.iter().zip(results) {
        let asset = result.with_context(|| format!("Failed to process mesh '{}'", input.name))?;
        let path = asset_path(&options.output_dir, &input.name);
        asset.save_to_file(&path)?;
        log::info!("Saved {:?}", path);
    }

    log::info!("Total execution time: {:.2}s", start_total.elapsed().as_secs_f32());
    Ok(())
}

fn asset_path(output_dir: &Path, name: &str) -> PathBuf {
    let file_name: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    output_dir.join(format!("{}.lmsh", file_name))
}

fn is_cached(path: &Path, config: &MeshletConfig) -> bool {
    if !path.exists() {
        return false;
    }
    match MeshAsset::load_from_file(path) {
        Ok(asset) if asset.matches(config) => {
            log::info!("Reusing cached {:?}", path);
            true
        }
        Ok(_) => false,
        Err(e) => {
            log::warn!("Ignoring unreadable cache {:?}: {:#}", path, e);
            false
        }
    }
}

fn load_obj(path: &Path) -> Result<Vec<MeshInput>> {
    let (models, _materials) =
        tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS).with_context(|| format!("Failed to load OBJ file: {:?}", path))?;

    let mut inputs = Vec::with_capacity(models.len());
    for (i, model) in models.into_iter().enumerate() {
        let mesh = &model.mesh;
        if mesh.indices.is_empty() {
            log::warn!("Skipping empty model '{}'", model.name);
            continue;
        }

        let name = if model.name.is_empty() { format!("mesh{}", i) } else { model.name.clone() };
        let mut input = MeshInput::from_flat(&name, &mesh.positions, &mesh.normals, &mesh.texcoords, &mesh.indices);
        input.attributes = vec![mesh.material_id.unwrap_or(0) as u32; input.triangle_count()];
        inputs.push(input);
    }

    Ok(inputs)
}

fn bench_meshletizers(input: &MeshInput, config: &MeshletConfig) -> Result<()> {
    let (vertices, indices) = clean_mesh(&input.vertices, &input.indices, config);
    log::info!("{}: {} vertices, {} triangles", input.name, vertices.len(), indices.len() / 3);

    for kind in MeshletizerType::ALL {
        let config = MeshletConfig { meshletizer: kind, ..*config };

        let start = Instant::now();
        let output = meshletize(&vertices, &indices, &config)?;
        let elapsed = start.elapsed();

        log::info!(
            "  {:<8} {:>8.2}ms  {}",
            kind.name(),
            elapsed.as_secs_f64() * 1000.0,
            MeshletStats::from_output(&output)
        );
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use lume_meshlet::{MeshletError, MeshletLimits};

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args() {
        let options =
            parse_args(&args(&["bunny.obj", "out", "--meshletizer=tipsify", "--max-prims=64", "--force"])).unwrap();

        assert_eq!(options.input, PathBuf::from("bunny.obj"));
        assert_eq!(options.output_dir, PathBuf::from("out"));
        assert_eq!(options.config.meshletizer, MeshletizerType::Tipsify);
        assert_eq!(options.config.limits, MeshletLimits { max_verts: 64, max_prims: 64 });
        assert!(options.force);
        assert!(!options.bench);
    }

    #[test]
    fn test_parse_args_rejects_bad_input() {
        assert!(parse_args(&args(&["only_one.obj"])).is_err());
        assert!(parse_args(&args(&["a.obj", "out", "--max-verts=65"])).is_err());
        assert!(parse_args(&args(&["a.obj", "out", "--meshletizer=nanite"])).is_err());
        assert!(parse_args(&args(&["a.obj", "out", "--verbose"])).is_err());

        let err = parse_args(&args(&["a.obj", "out", "--meshletizer=tipsify", "--cache-size=2"]))
            .err()
            .and_then(|e| e.downcast::<MeshletError>().ok());
        assert_eq!(err, Some(MeshletError::InvalidCacheSize(2)));
    }

    #[test]
    fn test_asset_path_sanitizes_name() {
        let path = asset_path(Path::new("out"), "body/head mesh");
        assert_eq!(path, PathBuf::from("out").join("body_head_mesh.lmsh"));
    }
}
