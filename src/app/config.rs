//! Configuration for the console overlay

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[cfg(feature = "font")]
use crate::renderer::{FontError, FontMetrics};
use crate::renderer::{GlyphMetrics, MonospaceMetrics};

/// Console configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Console settings
    pub console: ConsoleConfig,
    /// Renderer settings
    pub renderer: RendererConfig,
    /// Show/hide transition settings
    pub slide: SlideConfig,
}

/// Console behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Initial prompt
    pub prompt: String,
    /// Cursor blink interval in milliseconds (0 = no blinking)
    pub cursor_blink_ms: u64,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            prompt: "console> ".to_string(),
            cursor_blink_ms: 500,
        }
    }
}

impl ConsoleConfig {
    /// Blink interval, or `None` when blinking is disabled
    pub fn cursor_blink(&self) -> Option<Duration> {
        match self.cursor_blink_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

/// Canvas and viewport geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Visible width in pixels
    pub viewport_width: u32,
    /// Visible height in pixels
    pub viewport_height: u32,
    /// Width of one cell for monospace metrics
    pub cell_width: u32,
    /// Height of one console line
    pub line_height: u32,
    /// Maximum canvas height as a multiple of the viewport height
    pub max_canvas_factor: u32,
    /// Length of a scroll animation in milliseconds
    pub scroll_duration_ms: u64,
    /// Distance of one scroll as a fraction of the viewport height
    pub scroll_fraction: f64,
    /// Animation sampling rate in frames per second
    pub frame_rate: u32,
    /// Optional TTF/OTF font used for glyph metrics
    pub font_path: Option<PathBuf>,
    /// Font size in pixels when `font_path` is set
    pub font_size: f32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            viewport_width: 560,
            viewport_height: 400,
            cell_width: 8,
            line_height: 16,
            max_canvas_factor: 3,
            scroll_duration_ms: 750,
            scroll_fraction: 0.8,
            frame_rate: 30,
            font_path: None,
            font_size: 14.0,
        }
    }
}

impl RendererConfig {
    pub fn scroll_duration(&self) -> Duration {
        Duration::from_millis(self.scroll_duration_ms)
    }

    /// Lines that fit in the viewport
    pub fn visible_lines(&self) -> u32 {
        self.viewport_height / self.line_height.max(1)
    }

    /// Glyph metrics for this configuration
    ///
    /// Reads `font_path` when it is set and the `font` feature is enabled.
    /// Otherwise the metrics are monospace cells of `cell_width` by
    /// `line_height`.
    pub fn metrics(&self) -> Result<Box<dyn GlyphMetrics>, ConfigError> {
        let monospace = || -> Box<dyn GlyphMetrics> {
            Box::new(MonospaceMetrics::new(self.cell_width, self.line_height))
        };
        match &self.font_path {
            #[cfg(feature = "font")]
            Some(path) => {
                let metrics = FontMetrics::new(path, self.font_size)?;
                tracing::info!(path = %path.display(), ?metrics, "loaded font metrics");
                Ok(Box::new(metrics))
            },
            #[cfg(not(feature = "font"))]
            Some(path) => {
                tracing::warn!(
                    path = %path.display(),
                    "built without the font feature, using monospace metrics"
                );
                Ok(monospace())
            },
            None => Ok(monospace()),
        }
    }
}

/// Overlay show/hide transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlideConfig {
    /// Transition length in milliseconds
    pub duration_ms: u64,
    /// Distance travelled in pixels
    pub distance: f64,
}

impl Default for SlideConfig {
    fn default() -> Self {
        Self {
            duration_ms: 750,
            distance: 400.0,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from default location or return default config
    pub fn load_or_default() -> Self {
        // Try to load from ~/.config/mochi-console/config.json
        if let Some(config_dir) = dirs_config_path() {
            let config_path = config_dir.join("config.json");
            if config_path.exists() {
                match Self::load(&config_path) {
                    Ok(config) => return config,
                    Err(e) => tracing::warn!("ignoring {}: {}", config_path.display(), e),
                }
            }
        }
        Self::default()
    }

    /// Reject values the renderer and animations cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let r = &self.renderer;
        if r.viewport_width == 0 || r.viewport_height == 0 {
            return Err(ConfigError::Invalid("viewport must not be empty".into()));
        }
        if r.cell_width == 0 || r.line_height == 0 {
            return Err(ConfigError::Invalid("cell size must be positive".into()));
        }
        if r.line_height > r.viewport_height {
            return Err(ConfigError::Invalid(
                "line_height exceeds viewport_height".into(),
            ));
        }
        if r.max_canvas_factor == 0 {
            return Err(ConfigError::Invalid("max_canvas_factor must be at least 1".into()));
        }
        if r.scroll_duration_ms == 0 || self.slide.duration_ms == 0 {
            return Err(ConfigError::Invalid("animation durations must be positive".into()));
        }
        if r.frame_rate == 0 {
            return Err(ConfigError::Invalid("frame_rate must be positive".into()));
        }
        if !(r.scroll_fraction > 0.0 && r.scroll_fraction <= 1.0) {
            return Err(ConfigError::Invalid(
                "scroll_fraction must be in (0, 1]".into(),
            ));
        }
        if !self.slide.distance.is_finite() {
            return Err(ConfigError::Invalid("slide distance must be finite".into()));
        }
        if r.font_path.is_some() && !(r.font_size > 0.0) {
            return Err(ConfigError::Invalid("font_size must be positive".into()));
        }
        Ok(())
    }
}

/// Get the configuration directory path
fn dirs_config_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".config").join("mochi-console"))
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[cfg(feature = "font")]
    #[error("font error: {0}")]
    Font(#[from] FontError),
}
