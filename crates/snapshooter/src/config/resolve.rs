use std::path::PathBuf;

use anyhow::{Context, Result};

use super::{
    Config, StoreConfig, load, parse_scale, parse_threshold, validate_scale, validate_threshold,
};
use crate::compare::CompareOptions;

/// Comparison and store settings that can be overridden per run.
///
/// All fields are `Option`; `None` means "use the lower layer".
#[derive(Clone, Debug, Default, clap::Args)]
pub struct Overrides {
    /// Max per-channel difference (0-255) for pixels to count as equal
    #[arg(long)]
    pub tolerance: Option<u8>,

    /// Min similarity (0.0-1.0) for a snapshot to pass
    #[arg(long, value_parser = parse_threshold)]
    pub threshold: Option<f32>,

    /// Display scale reference images are loaded at
    #[arg(long, value_parser = parse_scale)]
    pub scale: Option<f32>,

    /// Directory holding reference snapshots
    #[arg(long)]
    pub reference_dir: Option<PathBuf>,

    /// Directory for failure artifacts (default: system temp dir)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

impl Overrides {
    /// Overlay non-None fields from `other` onto self.
    pub fn merge(&mut self, other: &Overrides) {
        if other.tolerance.is_some() {
            self.tolerance = other.tolerance;
        }
        if other.threshold.is_some() {
            self.threshold = other.threshold;
        }
        if other.scale.is_some() {
            self.scale = other.scale;
        }
        if other.reference_dir.is_some() {
            self.reference_dir = other.reference_dir.clone();
        }
        if other.output_dir.is_some() {
            self.output_dir = other.output_dir.clone();
        }
    }
}

/// Values read from `SNAPSHOOTER_*` environment variables.
#[derive(Clone, Debug, Default)]
pub struct EnvOverrides {
    pub tolerance: Option<u8>,
    pub threshold: Option<f32>,
}

impl EnvOverrides {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let tolerance = lookup("SNAPSHOOTER_TOLERANCE")
            .map(|v| v.parse::<u8>())
            .transpose()
            .context("SNAPSHOOTER_TOLERANCE must be an integer between 0 and 255")?;
        let threshold = lookup("SNAPSHOOTER_THRESHOLD")
            .map(|v| v.parse::<f32>())
            .transpose()
            .context("SNAPSHOOTER_THRESHOLD must be a valid float")?;
        Ok(Self {
            tolerance,
            threshold,
        })
    }
}

/// Fully resolved config after CLI > env > file > defaults merge.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRunConfig {
    pub compare: CompareOptions,
    pub store: StoreConfig,
}

impl ResolvedRunConfig {
    pub fn new(cli: Overrides) -> Result<Self> {
        let file = load()?;
        let env = EnvOverrides::from_env()?;
        Self::resolve(file, env, cli)
    }

    pub fn resolve(file: Config, env: EnvOverrides, cli: Overrides) -> Result<Self> {
        let mut layered = Overrides {
            tolerance: env.tolerance,
            threshold: env.threshold,
            ..Overrides::default()
        };
        layered.merge(&cli);

        let compare = CompareOptions {
            tolerance: layered.tolerance.unwrap_or(file.compare.tolerance),
            threshold: layered.threshold.unwrap_or(file.compare.threshold),
        };
        validate_threshold(compare.threshold).map_err(|e| anyhow::anyhow!("{e}"))?;

        let store = StoreConfig {
            reference_dir: layered.reference_dir.unwrap_or(file.store.reference_dir),
            output_dir: layered.output_dir.or(file.store.output_dir),
            scale: layered.scale.unwrap_or(file.store.scale),
        };
        validate_scale(store.scale).map_err(|e| anyhow::anyhow!("{e}"))?;

        Ok(Self { compare, store })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_config() -> Config {
        Config::parse(
            "[compare]\ntolerance = 2\nthreshold = 0.9\n[store]\nreference_dir = \"refs\"\n",
        )
        .unwrap()
    }

    #[test]
    fn file_values_apply_without_overrides() {
        let resolved =
            ResolvedRunConfig::resolve(file_config(), EnvOverrides::default(), Overrides::default())
                .unwrap();
        assert_eq!(resolved.compare.tolerance, 2);
        assert_eq!(resolved.compare.threshold, 0.9);
        assert_eq!(resolved.store.reference_dir, PathBuf::from("refs"));
        assert_eq!(resolved.store.scale, 3.0);
    }

    #[test]
    fn env_beats_file_and_cli_beats_env() {
        let env = EnvOverrides {
            tolerance: Some(5),
            threshold: Some(0.7),
        };
        let cli = Overrides {
            threshold: Some(0.6),
            ..Overrides::default()
        };
        let resolved = ResolvedRunConfig::resolve(file_config(), env, cli).unwrap();
        assert_eq!(resolved.compare.tolerance, 5);
        assert_eq!(resolved.compare.threshold, 0.6);
    }

    #[test]
    fn env_threshold_is_validated() {
        let env = EnvOverrides {
            tolerance: None,
            threshold: Some(2.0),
        };
        assert!(ResolvedRunConfig::resolve(Config::default(), env, Overrides::default()).is_err());
    }

    #[test]
    fn env_lookup_parses_values() {
        let env = EnvOverrides::from_lookup(|key| match key {
            "SNAPSHOOTER_TOLERANCE" => Some("4".to_string()),
            "SNAPSHOOTER_THRESHOLD" => Some("0.75".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(env.tolerance, Some(4));
        assert_eq!(env.threshold, Some(0.75));
    }

    #[test]
    fn env_lookup_rejects_garbage() {
        let err = EnvOverrides::from_lookup(|key| {
            (key == "SNAPSHOOTER_TOLERANCE").then(|| "lots".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("SNAPSHOOTER_TOLERANCE"));
    }

    #[test]
    fn cli_store_overrides_apply() {
        let cli = Overrides {
            scale: Some(2.0),
            output_dir: Some(PathBuf::from("out")),
            ..Overrides::default()
        };
        let resolved =
            ResolvedRunConfig::resolve(Config::default(), EnvOverrides::default(), cli).unwrap();
        assert_eq!(resolved.store.scale, 2.0);
        assert_eq!(resolved.store.output_dir, Some(PathBuf::from("out")));
    }
}
