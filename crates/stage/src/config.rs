//! Stage configuration, loaded from YAML. Every field has a default, so an
//! empty file (or no file) gives the stock scene.

use diorama_common::Color;
use diorama_params::ParamValue;
use diorama_render::BloomSettings;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid colour {0:?}, expected #rrggbb or 0xrrggbb")]
    InvalidColor(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "diorama".into(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BloomConfig {
    pub enabled: bool,
    #[serde(flatten)]
    pub settings: BloomSettings,
}

/// A parameter override as written in YAML: `true`, `0.02` or `"#ff00ff"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParamOverride {
    Toggle(bool),
    Number(f64),
    Color(String),
}

impl ParamOverride {
    pub fn to_value(&self) -> Result<ParamValue, ConfigError> {
        Ok(match self {
            Self::Toggle(b) => ParamValue::Toggle(*b),
            Self::Number(n) => ParamValue::from(*n),
            Self::Color(s) => ParamValue::Color(parse_color(s)?),
        })
    }
}

/// Parse `#rrggbb`, `0xrrggbb` or bare `rrggbb`.
pub fn parse_color(s: &str) -> Result<Color, ConfigError> {
    let digits = s
        .strip_prefix('#')
        .or_else(|| s.strip_prefix("0x"))
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    // from_str_radix alone would take a leading sign
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ConfigError::InvalidColor(s.to_string()));
    }
    u32::from_str_radix(digits, 16)
        .map(Color::from_hex)
        .map_err(|_| ConfigError::InvalidColor(s.to_string()))
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    pub window: WindowConfig,
    /// Mesh imported at startup. `null` skips the import.
    pub asset_path: Option<PathBuf>,
    /// Colour shown on whatever the pointer is over.
    pub highlight_color: String,
    /// Aim the camera at the bouncing sphere from the first frame.
    pub track_sphere: bool,
    pub bloom: BloomConfig,
    /// Draw the grid and light helpers.
    pub helpers: bool,
    /// Initial parameter values, applied through the parameter store.
    pub parameters: BTreeMap<String, ParamOverride>,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            asset_path: Some(PathBuf::from("assets/monkey.glb")),
            highlight_color: "#ffff00".into(),
            track_sphere: false,
            bloom: BloomConfig::default(),
            helpers: true,
            parameters: BTreeMap::new(),
        }
    }
}

impl StageConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        // serde_yaml reads an empty document as unit, not as an empty map.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&text)?;
        tracing::info!(path = %path.display(), "loaded stage config");
        Ok(config)
    }

    pub fn highlight(&self) -> Result<Color, ConfigError> {
        parse_color(&self.highlight_color)
    }
}
