pub mod resolve;
pub mod template;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::compare::CompareOptions;
use crate::store::{DEFAULT_SCALE, SNAPSHOTS_DIR};

pub use self::resolve::{EnvOverrides, Overrides, ResolvedRunConfig};
pub use self::template::{config_file_exists, write_template};

pub const CONFIG_DIR: &str = ".snapshooter";
const CONFIG_FILE: &str = "config.toml";

pub fn config_path() -> PathBuf {
    Path::new(CONFIG_DIR).join(CONFIG_FILE)
}

pub fn validate_threshold(v: f32) -> Result<f32, String> {
    if !(0.0..=1.0).contains(&v) {
        return Err(format!("threshold must be between 0.0 and 1.0, got {v}"));
    }
    Ok(v)
}

pub fn validate_scale(v: f32) -> Result<f32, String> {
    if !v.is_finite() || v <= 0.0 {
        return Err(format!("scale must be a positive number, got {v}"));
    }
    Ok(v)
}

/// `clap` value parser for `--threshold`.
pub fn parse_threshold(s: &str) -> Result<f32, String> {
    let v: f32 = s.parse().map_err(|e| format!("{e}"))?;
    validate_threshold(v)
}

/// `clap` value parser for `--scale`.
pub fn parse_scale(s: &str) -> Result<f32, String> {
    let v: f32 = s.parse().map_err(|e| format!("{e}"))?;
    validate_scale(v)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding reference PNGs.
    pub reference_dir: PathBuf,
    /// Where failure artifacts are written. `None` = system temp dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    /// Display scale reference PNGs are decoded at.
    pub scale: f32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            reference_dir: PathBuf::from(SNAPSHOTS_DIR),
            output_dir: None,
            scale: DEFAULT_SCALE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub compare: CompareOptions,
    #[serde(default)]
    pub store: StoreConfig,
}

impl Config {
    /// Validate semantic constraints that serde cannot express.
    fn validate(&self) -> Result<()> {
        validate_threshold(self.compare.threshold).map_err(|e| anyhow::anyhow!("compare.{e}"))?;
        validate_scale(self.store.scale).map_err(|e| anyhow::anyhow!("store.{e}"))?;
        if self.store.reference_dir.as_os_str().is_empty() {
            bail!("store.reference_dir must not be empty");
        }
        Ok(())
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}

/// Load a config file. A missing file yields the defaults.
pub fn load_from(path: &Path) -> Result<Config> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };
    Config::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn load() -> Result<Config> {
    load_from(&config_path())
}
