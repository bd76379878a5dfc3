use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::warn;

static DEFAULT_CONFIG: &str = include_str!("default_config.toml");

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub styles: StyleConfig,
    pub read: ReadConfig,
}

/// Styling applied to compiled markup.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct StyleConfig {
    pub code_font: String,
    pub code_font_size: f64,
    pub bullet_preset: String,
    pub numbered_preset: String,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            code_font: "Courier New".to_string(),
            code_font_size: 10.0,
            bullet_preset: "BULLET_DISC_CIRCLE_SQUARE".to_string(),
            numbered_preset: "NUMBERED_DECIMAL_ALPHA_ROMAN".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReadConfig {
    pub max_lines: usize,
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self { max_lines: 100 }
    }
}

impl Config {
    /// The configuration shipped in `default_config.toml`.
    pub fn compiled_default() -> Self {
        toml::from_str(DEFAULT_CONFIG).unwrap_or_default()
    }

    /// Load config from a TOML file, or return the compiled defaults if it is
    /// missing or invalid.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Invalid config, using defaults");
                    Self::compiled_default()
                }
            },
            Err(_) => Self::compiled_default(),
        }
    }
}
