//! Terrain tool: generate terrain files and inspect existing ones.
//!
//! Usage:
//!   cargo run --release --bin terrain_tool -- generate [OPTIONS]
//!   cargo run --release --bin terrain_tool -- info <FILE>
//!
//! Generate options:
//!   --config <PATH>     Terrain settings JSON (default: built-in defaults)
//!   --name <NAME>       Terrain name (default: "terrain")
//!   --out <DIR>         Output directory (default: "assets/terrains")
//!   --size <METERS>     Terrain width and depth (default: 1000)
//!   --resolution <N>    Grid resolution, 2..=256 (default: from settings)
//!   --seed <SEED>       Noise seed (default: from settings)
//!   --height <H>        Height scale (default: from settings)
//!   --lods <N>          LOD levels including the base (default: from settings)
//!   --format <VER>      1.1, 1.2 or legacy (default: 1.1)
//!
//! Output:
//!   <out>/<name>.terra    Heights + LOD meshes
//!   <out>/<name>.json     Terrain metadata

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use strata::asset::TerrainMeta;
use strata::core::types::Vec2;
use strata::core::{Error, Result, TerrainSettings};
use strata::io::{load_terrain_file, FormatVersion};
use strata::lod::{build_lod_levels, CancelToken};
use strata::terrain::{Terrain, TerrainGenerator};

fn main() -> ExitCode {
    strata::core::logging::init();

    let args: Vec<String> = std::env::args().collect();
    let result = match args.get(1).map(String::as_str) {
        Some("generate") => generate(&args),
        Some("info") => match args.get(2) {
            Some(path) => info(Path::new(path)),
            None => Err(usage("info needs a file path")),
        },
        _ => Err(usage("expected a subcommand")),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn usage(reason: &str) -> Error {
    eprintln!("Usage: terrain_tool generate [OPTIONS] | terrain_tool info <FILE>");
    Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, reason.to_string()))
}

fn generate(args: &[String]) -> Result<()> {
    let mut settings = match parse_str_arg(args, "--config") {
        Some(path) => TerrainSettings::load_sync(Path::new(&path))?,
        None => TerrainSettings::default(),
    };

    let name = parse_str_arg(args, "--name").unwrap_or_else(|| "terrain".to_string());
    let out_dir = PathBuf::from(parse_str_arg(args, "--out").unwrap_or_else(|| "assets/terrains".to_string()));
    let size = parse_f32_arg(args, "--size").unwrap_or(1000.0);
    let resolution = parse_usize_arg(args, "--resolution").unwrap_or(settings.default_resolution);
    if let Some(seed) = parse_u32_arg(args, "--seed") {
        settings.generator.seed = seed;
    }
    if let Some(height) = parse_f32_arg(args, "--height") {
        settings.generator.height_scale = height;
    }
    if let Some(lods) = parse_usize_arg(args, "--lods") {
        settings.lod.level_count = lods;
    }
    let version = match parse_str_arg(args, "--format").as_deref() {
        None | Some("1.1") => FormatVersion::V1_1,
        Some("1.2") => FormatVersion::V1_2,
        Some("legacy") => FormatVersion::Legacy,
        Some(other) => return Err(usage(&format!("unknown format '{}'", other))),
    };

    println!("=== Strata Terrain Generator ===");
    println!("Terrain:    {}", name);
    println!("Size:       {}m x {}m", size, size);
    println!("Resolution: {}", resolution);
    println!("Seed:       {}", settings.generator.seed);
    println!("LOD levels: {}", settings.lod.level_count);
    println!("Output:     {}", out_dir.display());
    println!();

    let start = Instant::now();
    let generator = TerrainGenerator::new(settings.generator.clone());
    let field = generator.generate(resolution, size, size)?;
    let uv_scale = Vec2::from_array(settings.default_uv_scale);
    let terrain = Terrain::new(field, uv_scale, settings.vertex_layout);
    log::info!("Heightfield built in {:.2?}", start.elapsed());

    let start = Instant::now();
    let levels = build_lod_levels(&terrain.lod_input(), &settings.lod, &CancelToken::new())?;
    for (i, level) in levels.iter().enumerate() {
        let triangles: usize = level.iter().map(|m| m.triangle_count()).sum();
        println!("  LOD {}: {} triangles", i + 1, triangles);
    }
    log::info!("{} LOD level(s) built in {:.2?}", levels.len(), start.elapsed());

    // No GPU here, so the levels go straight into the file data
    let mut data = terrain.to_file_data();
    data.lods = levels;

    let file_name = format!("{}.terra", name);
    let terrain_path = out_dir.join(&file_name);
    strata::io::save_terrain_file(&terrain_path, &data, version)?;

    let mut meta = TerrainMeta::new(&name, &file_name, size, size);
    meta.uv_scale = settings.default_uv_scale;
    meta.layout = settings.vertex_layout;
    meta.save_sync(&out_dir.join(format!("{}.json", name)))?;

    println!();
    println!("Wrote {}", terrain_path.display());
    Ok(())
}

fn info(path: &Path) -> Result<()> {
    let data = load_terrain_file(path)?;
    let samples = data.heights.len();
    let resolution = (samples as f64).sqrt() as usize;
    let (lo, hi) = data
        .heights
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &h| (lo.min(h), hi.max(h)));

    println!("File:       {}", path.display());
    println!("Format:     {:?}", data.version);
    println!("Samples:    {} ({}x{})", samples, resolution, resolution);
    println!("Heights:    {:.3} .. {:.3}", lo, hi);
    println!("LOD levels: {} (+ base)", data.lods.len());
    for (i, level) in data.lods.iter().enumerate() {
        let vertices: usize = level.iter().map(|m| m.vertices.len()).sum();
        let triangles: usize = level.iter().map(|m| m.triangle_count()).sum();
        println!("  LOD {}: {} mesh(es), {} floats, {} triangles", i + 1, level.len(), vertices, triangles);
    }
    Ok(())
}

fn parse_f32_arg(args: &[String], flag: &str) -> Option<f32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_u32_arg(args: &[String], flag: &str) -> Option<u32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_usize_arg(args: &[String], flag: &str) -> Option<usize> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
