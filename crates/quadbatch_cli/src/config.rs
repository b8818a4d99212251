//! Host configuration file handling

use anyhow::{Context, Result};
use quadbatch_core::CanvasConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level host configuration (canvas.toml)
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct HostConfig {
    #[serde(default)]
    pub canvas: CanvasConfig,
    /// Textures registered before the first frame
    #[serde(default)]
    pub textures: Vec<TextureSource>,
}

/// An image file registered under a texture ID
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TextureSource {
    pub id: i32,
    pub path: PathBuf,
}

impl HostConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let config: HostConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(config)
    }
}

/// Parse a `--texture` argument of the form `ID=PATH`.
pub fn parse_texture_arg(arg: &str) -> Result<TextureSource, String> {
    let (id, path) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected ID=PATH, got `{arg}`"))?;
    let id = id
        .trim()
        .parse()
        .map_err(|_| format!("invalid texture ID `{id}`"))?;
    if path.is_empty() {
        return Err("texture path is empty".to_string());
    }
    Ok(TextureSource {
        id,
        path: PathBuf::from(path),
    })
}
