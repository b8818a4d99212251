//! quadbatch - headless command stream player
//!
//! Loads textures, replays a command file through a wgpu-backed canvas and
//! writes PNG captures of the final frame.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use quadbatch_core::config::parse_size;
use quadbatch_core::Canvas;
use quadbatch_gpu::WgpuBackend;
use tracing_subscriber::EnvFilter;

use crate::config::{parse_texture_arg, HostConfig, TextureSource};

/// Replay a quad command stream and capture the result
#[derive(Parser, Debug)]
#[command(name = "quadbatch")]
#[command(about = "Replay a quad command stream headlessly and capture frames")]
#[command(version)]
struct Args {
    /// Command file; each non-empty line is rendered as one frame
    #[arg(short, long)]
    commands: PathBuf,

    /// Register an image as a texture, `ID=PATH` (repeatable)
    #[arg(short, long = "texture", value_parser = parse_texture_arg)]
    textures: Vec<TextureSource>,

    /// Surface size
    #[arg(long, default_value = "800x600")]
    size: String,

    /// Write the last frame to this PNG file
    #[arg(long)]
    capture: Option<PathBuf>,

    /// Host configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of passes over the command file
    #[arg(long, default_value = "1")]
    frames: u32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let host = match &args.config {
        Some(path) => HostConfig::load(path)?,
        None => HostConfig::default(),
    };
    let canvas_config = host.canvas.with_env_overrides();

    let [width, height] = parse_size(&args.size)
        .with_context(|| format!("Invalid --size `{}`, expected WIDTHxHEIGHT", args.size))?;

    let source = std::fs::read_to_string(&args.commands)
        .with_context(|| format!("Failed to read {}", args.commands.display()))?;
    let frames: Vec<&str> = source
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let (device, queue) = quadbatch_gpu::headless_device().context("Failed to create GPU device")?;
    let backend = WgpuBackend::new(Arc::new(device), Arc::new(queue), width, height);
    let mut canvas = Canvas::with_config(backend, canvas_config, width, height);

    for texture in host.textures.iter().chain(&args.textures) {
        let bytes = std::fs::read(&texture.path)
            .with_context(|| format!("Failed to read {}", texture.path.display()))?;
        let (w, h) = canvas
            .add_image_texture(texture.id, &bytes)
            .with_context(|| format!("Failed to load texture {}", texture.path.display()))?;
        tracing::info!(id = texture.id, width = w, height = h, "loaded {}", texture.path.display());
    }

    let passes = args.frames.max(1);
    let total = frames.len() * passes as usize;
    let mut rendered = 0;
    for _ in 0..passes {
        for commands in &frames {
            rendered += 1;
            if rendered == total {
                queue_capture(&mut canvas, args.capture.as_ref());
            }
            canvas.render(commands);
        }
    }
    if total == 0 {
        queue_capture(&mut canvas, args.capture.as_ref());
        canvas.render("");
    }

    tracing::info!(
        frames = canvas.stats().total_frames(),
        streams = canvas.streams().len(),
        "replay finished"
    );

    let mut failed = false;
    while let Some(callback) = canvas.pop_callback() {
        let status = if callback.is_error { "error" } else { "ok" };
        println!("{} {} {}", callback.callback_id, status, callback.result);
        failed |= callback.is_error;
    }

    if failed {
        anyhow::bail!("One or more captures failed");
    }
    Ok(())
}

fn queue_capture(canvas: &mut Canvas<WgpuBackend>, path: Option<&PathBuf>) {
    if let Some(path) = path {
        let path = path.to_string_lossy();
        canvas.queue_capture(0, 0, -1, -1, "capture", &path);
    }
}
