use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::overlay::Legibility;

/// Top-level configuration for the exif-label library.
///
/// Controls render tuning (caption geometry, colors, legibility, fonts),
/// the default style and slider limits, and export behavior.
///
/// # Loading
///
/// ```rust,no_run
/// use exif_label::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.export.quality = 98;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Caption geometry, colors, legibility strategy, fonts.
    pub render: RenderConfig,
    /// Default style values and slider limits.
    pub style: StyleDefaults,
    /// Export behavior (quality, naming, stagger).
    pub export: ExportConfig,
}

/// Caption rendering tunables.
///
/// The divisor and the padding/line-height multiples are visual-design
/// choices, not semantic contract — observed values across variants of the
/// original tool range from 1000 to 1500 for the divisor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// `font_size = canvas_width * font_scale / font_scale_divisor`.
    pub font_scale_divisor: f32,
    /// Padding as a multiple of font size.
    pub padding_factor: f32,
    /// Line height as a multiple of font size.
    pub line_height_factor: f32,
    /// RGB of the identity (accent) line.
    pub accent_color: [u8; 3],
    /// RGB of all other lines.
    pub primary_color: [u8; 3],
    /// Letterbox background fill.
    pub background: [u8; 3],
    /// Legibility strategy: shadow, scrim, or none.
    pub legibility: Legibility,
    /// Shadow strength (shadow mode only).
    pub shadow_opacity: f32,
    /// Scrim strength (scrim mode only); never scaled by the user opacity.
    pub scrim_opacity: f32,
    /// Explicit font file; takes precedence over `font_family`.
    pub font_path: Option<PathBuf>,
    /// Named font family, resolved against the system font database.
    pub font_family: Option<String>,
}

/// Default style values and the slider range they live in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleDefaults {
    pub font_scale: f32,
    pub opacity: f32,
    pub min_font_scale: f32,
    pub max_font_scale: f32,
}

/// Export behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// JPEG quality, 0–100.
    pub quality: u8,
    /// Appended to the original stem: `photo.jpg` → `photo-labeled.jpg`.
    pub suffix: String,
    /// Delay between bulk-export writes, in milliseconds.
    pub stagger_ms: u64,
    /// Target directory; `None` exports next to each original.
    pub output_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            render: RenderConfig::default(),
            style: StyleDefaults {
                font_scale: 55.0,
                opacity: 0.95,
                min_font_scale: 10.0,
                max_font_scale: 100.0,
            },
            export: ExportConfig {
                quality: 95,
                suffix: "-labeled".to_string(),
                stagger_ms: 200,
                output_dir: None,
            },
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font_scale_divisor: 1000.0,
            padding_factor: 1.0,
            line_height_factor: 1.3,
            accent_color: [255, 0, 0],
            primary_color: [255, 255, 255],
            background: [0, 0, 0],
            legibility: Legibility::Shadow,
            shadow_opacity: 0.7,
            scrim_opacity: 0.45,
            font_path: None,
            font_family: None,
        }
    }
}

impl Config {
    /// Resolve the config file path — same directory as the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_original_tool() {
        let config = Config::default();
        assert_eq!(config.render.font_scale_divisor, 1000.0);
        assert_eq!(config.style.font_scale, 55.0);
        assert_eq!(config.style.opacity, 0.95);
        assert_eq!(config.export.suffix, "-labeled");
        assert_eq!(config.export.quality, 95);
    }

    #[test]
    fn round_trips_through_json() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.render.legibility = Legibility::Scrim;
        config.export.quality = 90;
        config.save(Some(&path)).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.render.legibility, Legibility::Scrim);
        assert_eq!(loaded.export.quality, 90);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let loaded = Config::load(Some(Path::new("/nonexistent/config.json"))).unwrap();
        assert_eq!(loaded.export.suffix, "-labeled");
    }
}
