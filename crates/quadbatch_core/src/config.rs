//! Canvas configuration

use serde::{Deserialize, Serialize};

use crate::backend::Viewport;

/// Projection size used when a fixed ortho size is requested with
/// non-positive dimensions
pub const DEFAULT_ORTHO: Viewport = Viewport::new(800, 600);

/// Startup options for a [`Canvas`](crate::Canvas)
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct CanvasConfig {
    /// Clear color, RGB in `0.0..=1.0`
    #[serde(default)]
    pub background: [f32; 3],
    /// Fixed projection size; `None` follows the surface size
    #[serde(default)]
    pub ortho: Option<[u32; 2]>,
    /// Draw the frame statistics line
    #[serde(default)]
    pub debug_overlay: bool,
    /// Frames per statistics sample
    #[serde(default = "default_stats_window")]
    pub stats_window: u32,
}

fn default_stats_window() -> u32 {
    20
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            background: [0.0; 3],
            ortho: None,
            debug_overlay: false,
            stats_window: default_stats_window(),
        }
    }
}

impl CanvasConfig {
    /// Apply `QUADBATCH_*` environment overrides.
    ///
    /// - `QUADBATCH_DEBUG_OVERLAY=1`
    /// - `QUADBATCH_STATS_WINDOW=60`
    /// - `QUADBATCH_ORTHO=1024x768`
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Same as [`with_env_overrides`](Self::with_env_overrides) with a custom
    /// variable source.
    pub fn with_overrides_from(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = var("QUADBATCH_DEBUG_OVERLAY") {
            self.debug_overlay = matches!(v.trim(), "1" | "true" | "yes" | "on");
        }
        if let Some(v) = var("QUADBATCH_STATS_WINDOW").and_then(|v| v.trim().parse::<u32>().ok()) {
            self.stats_window = v.max(1);
        }
        if let Some(size) = var("QUADBATCH_ORTHO").and_then(|v| parse_size(&v)) {
            self.ortho = Some(size);
            tracing::info!("ortho override: {}x{}", size[0], size[1]);
        }
        self
    }
}

/// Parse `WIDTHxHEIGHT`.
pub fn parse_size(s: &str) -> Option<[u32; 2]> {
    let (w, h) = s.trim().split_once(['x', 'X'])?;
    Some([w.trim().parse().ok()?, h.trim().parse().ok()?])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = CanvasConfig::default();
        assert_eq!(config.stats_window, 20);
        assert!(config.ortho.is_none());
        assert!(!config.debug_overlay);
    }

    #[test]
    fn overrides_apply() {
        let config = CanvasConfig::default().with_overrides_from(vars(&[
            ("QUADBATCH_DEBUG_OVERLAY", "1"),
            ("QUADBATCH_STATS_WINDOW", "60"),
            ("QUADBATCH_ORTHO", "1024x768"),
        ]));
        assert!(config.debug_overlay);
        assert_eq!(config.stats_window, 60);
        assert_eq!(config.ortho, Some([1024, 768]));
    }

    #[test]
    fn bad_values_are_ignored() {
        let config = CanvasConfig::default().with_overrides_from(vars(&[
            ("QUADBATCH_STATS_WINDOW", "lots"),
            ("QUADBATCH_ORTHO", "wide"),
        ]));
        assert_eq!(config, CanvasConfig::default());
    }

    #[test]
    fn size_parsing() {
        assert_eq!(parse_size("800x600"), Some([800, 600]));
        assert_eq!(parse_size(" 16 X 9 "), Some([16, 9]));
        assert_eq!(parse_size("800"), None);
        assert_eq!(parse_size("-1x5"), None);
    }
}
