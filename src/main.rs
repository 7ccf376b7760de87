use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tilesmith::{Chunk, EditorConfig, TileLoader, write_tile};

#[derive(Parser, Debug)]
#[command(name = "tilesmith", about = "Inspect and re-encode terrain tile containers")]
struct Args {
    /// Tile containers to load.
    #[arg(required = true)]
    tiles: Vec<PathBuf>,
    /// Editor settings (TOML).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Re-encode the loaded chunks into this file (single input only).
    #[arg(long)]
    rewrite: Option<PathBuf>,
    /// Drop texture layers at or below the configured unused threshold before rewriting.
    #[arg(long)]
    cleanup: bool,
}

fn summarize(path: &str, chunk: &Chunk) {
    let (x, z) = chunk.index();
    let lod = chunk.generate_lod_indices();
    let lod_counts: Vec<usize> = (0..lod.level_count())
        .filter_map(|l| lod.level(l).map(<[u16]>::len))
        .collect();
    log::info!(
        "{path} [{x:2},{z:2}] area {} layers {} liquids {} holes {} heights {:.1}..{:.1} lod {lod_counts:?}",
        chunk.area_id(),
        chunk.textures().len(),
        chunk.liquids().len(),
        chunk.mesh().holes().count(),
        chunk.mesh().min_height(),
        chunk.mesh().max_height(),
    );
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let cfg = match &args.config {
        Some(path) => match EditorConfig::from_path(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::error!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None => EditorConfig::default(),
    };
    if args.rewrite.is_some() && args.tiles.len() != 1 {
        log::error!("--rewrite takes exactly one input tile");
        return ExitCode::FAILURE;
    }

    let mut failed = false;
    let loader = TileLoader::new(cfg.loader.workers, cfg.read_options());
    for (id, path) in args.tiles.iter().enumerate() {
        match std::fs::read(path) {
            Ok(bytes) => loader.submit(id as u64, bytes),
            Err(e) => {
                log::error!("{}: {e}", path.display());
                failed = true;
            }
        }
    }
    loader.wait_idle();

    let mut tiles = loader.drain();
    tiles.sort_by_key(|t| t.id);
    for tile in tiles {
        let name = args.tiles[tile.id as usize].display().to_string();
        let chunks = match tile.chunks {
            Ok(chunks) => chunks,
            Err(e) => {
                log::error!("{name}: {e}");
                failed = true;
                continue;
            }
        };
        log::info!(
            "{name}: {} bytes, {} chunks parsed in {} ms",
            tile.bytes,
            chunks.len(),
            tile.t_parse_ms
        );
        let mut good = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.into_iter().enumerate() {
            match chunk {
                Ok(chunk) => {
                    summarize(&name, &chunk);
                    good.push(chunk);
                }
                Err(e) => log::warn!("{name} chunk {i}: {e}"),
            }
        }

        let Some(out) = &args.rewrite else { continue };
        if args.cleanup {
            let threshold = cfg.brush.unused_threshold;
            for chunk in &mut good {
                chunk.edit_textures(|t| t.remove_unused(threshold));
            }
        }
        let written = write_tile(&good, &cfg.write_options())
            .map_err(|e| e.to_string())
            .and_then(|bytes| std::fs::write(out, bytes).map_err(|e| e.to_string()));
        match written {
            Ok(()) => log::info!("wrote {} chunks to {}", good.len(), out.display()),
            Err(e) => {
                log::error!("{}: {e}", out.display());
                failed = true;
            }
        }
    }

    if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}
