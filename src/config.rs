//! Layered configuration.
//!
//! Every key is resolved independently by walking the tiers in priority order:
//! command line, series-specific entry, `[default]` table of the config file,
//! then the built-in system defaults. The first tier that sets the key wins.
//!
//! ```toml
//! [default]
//! download_path = "/home/me/Podcasts"
//! speedup = 1.25
//!
//! [series."Some Slow Talkers"]
//! speedup = 1.8
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;

/// One tier of configuration; every key may be unset
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    pub download_path: Option<PathBuf>,
    pub verbose: Option<u8>,
    pub speedup: Option<f64>,
}

impl PartialConfig {
    /// The built-in tier at the bottom of the chain
    pub fn system_defaults() -> Self {
        Self {
            download_path: Some(PathBuf::from(".")),
            verbose: Some(0),
            speedup: Some(1.0),
        }
    }

    fn validate(&self, tier: &str) -> Result<(), ConfigError> {
        match self.speedup {
            Some(value) if !(value.is_finite() && value > 0.0) => Err(ConfigError::InvalidSpeedup {
                tier: tier.to_string(),
                value,
            }),
            _ => Ok(()),
        }
    }
}

/// Fully resolved settings for one download; nothing is optional here
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveConfig {
    pub download_path: PathBuf,
    pub verbose: u8,
    pub speedup: f64,
}

/// Contents of the TOML config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub default: PartialConfig,
    /// Overrides keyed by series title
    #[serde(default)]
    pub series: HashMap<String, PartialConfig>,
}

impl ConfigFile {
    /// Parse and validate config file contents; `path` is only used in errors
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(text).map_err(|e| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        file.validate()?;
        Ok(file)
    }

    /// Load and validate a config file from disk
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&text, path)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.default.validate("[default]")?;
        for (title, overrides) in &self.series {
            overrides.validate(&format!("[series.\"{title}\"]"))?;
        }
        Ok(())
    }
}

/// Configuration resolver holding every tier for the current run
#[derive(Debug, Clone)]
pub struct Config {
    command_line: PartialConfig,
    file: ConfigFile,
    system: PartialConfig,
}

impl Config {
    /// Build a resolver from command line overrides and an already loaded file
    pub fn new(command_line: PartialConfig, file: ConfigFile) -> Result<Self, ConfigError> {
        command_line.validate("command line")?;
        Ok(Self {
            command_line,
            file,
            system: PartialConfig::system_defaults(),
        })
    }

    /// Build a resolver, reading the config file if a path is given.
    ///
    /// Without a path the resolver behaves as if an empty file had been loaded.
    pub fn load(command_line: PartialConfig, path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => {
                let file = ConfigFile::load(path)?;
                debug!(
                    path = %path.display(),
                    series = file.series.len(),
                    "Loaded config file"
                );
                file
            }
            None => ConfigFile::default(),
        };
        Self::new(command_line, file)
    }

    /// Resolve the effective configuration for a series.
    ///
    /// Series overrides only apply when `series_title` is known and listed in
    /// the config file.
    pub fn for_series(&self, series_title: Option<&str>) -> Result<EffectiveConfig, ConfigError> {
        let series = series_title.and_then(|title| self.file.series.get(title));
        let tiers: Vec<&PartialConfig> = [
            Some(&self.command_line),
            series,
            Some(&self.file.default),
            Some(&self.system),
        ]
        .into_iter()
        .flatten()
        .collect();

        Ok(EffectiveConfig {
            download_path: first_present(
                "download_path",
                tiers.iter().map(|t| t.download_path.clone()),
            )?,
            verbose: first_present("verbose", tiers.iter().map(|t| t.verbose))?,
            speedup: first_present("speedup", tiers.iter().map(|t| t.speedup))?,
        })
    }
}

/// First candidate that is set, in priority order
fn first_present<T>(
    key: &'static str,
    candidates: impl IntoIterator<Item = Option<T>>,
) -> Result<T, ConfigError> {
    candidates
        .into_iter()
        .flatten()
        .next()
        .ok_or(ConfigError::MissingKey { key })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn file(toml: &str) -> ConfigFile {
        ConfigFile::parse(toml, Path::new("test.toml")).unwrap()
    }

    const SAMPLE: &str = r#"
        [default]
        download_path = "/podcasts"
        verbose = 1

        [series.X]
        speedup = 2.0

        [series."Slow Talkers"]
        download_path = "/slow"
        speedup = 1.5
    "#;

    // === System defaults ===

    #[test]
    fn no_config_file_yields_system_defaults() {
        let config = Config::load(PartialConfig::default(), None).unwrap();

        for series in [None, Some("X"), Some("anything")] {
            let effective = config.for_series(series).unwrap();
            assert_eq!(effective.download_path, PathBuf::from("."));
            assert_eq!(effective.verbose, 0);
            assert_eq!(effective.speedup, 1.0);
        }
    }

    #[test]
    fn empty_config_file_behaves_like_no_file() {
        let config = Config::new(PartialConfig::default(), file("")).unwrap();
        let effective = config.for_series(Some("X")).unwrap();
        assert_eq!(effective, config.for_series(None).unwrap());
        assert_eq!(effective.speedup, 1.0);
    }

    // === Per-key resolution ===

    #[test]
    fn command_line_speedup_wins_without_other_values() {
        let command_line = PartialConfig {
            speedup: Some(2.0),
            ..Default::default()
        };
        let config = Config::load(command_line, None).unwrap();
        let effective = config.for_series(None).unwrap();

        assert_eq!(effective.speedup, 2.0);
        assert_eq!(effective.download_path, PathBuf::from("."));
    }

    #[test]
    fn keys_fall_through_tiers_independently() {
        let command_line = PartialConfig {
            speedup: Some(3.0),
            ..Default::default()
        };
        let config = Config::new(command_line, file(SAMPLE)).unwrap();
        let effective = config.for_series(Some("Slow Talkers")).unwrap();

        // speedup from command line, download_path from series, verbose from default
        assert_eq!(effective.speedup, 3.0);
        assert_eq!(effective.download_path, PathBuf::from("/slow"));
        assert_eq!(effective.verbose, 1);
    }

    #[test]
    fn command_line_override_does_not_hide_other_series_keys() {
        let command_line = PartialConfig {
            verbose: Some(2),
            ..Default::default()
        };
        let config = Config::new(command_line, file(SAMPLE)).unwrap();
        let effective = config.for_series(Some("X")).unwrap();

        assert_eq!(effective.verbose, 2);
        assert_eq!(effective.speedup, 2.0);
        assert_eq!(effective.download_path, PathBuf::from("/podcasts"));
    }

    #[test]
    fn series_override_applies_to_listed_series() {
        let config = Config::new(PartialConfig::default(), file(SAMPLE)).unwrap();
        assert_eq!(config.for_series(Some("X")).unwrap().speedup, 2.0);
    }

    #[test]
    fn unlisted_series_uses_default_or_system_tier() {
        let config = Config::new(PartialConfig::default(), file(SAMPLE)).unwrap();
        let effective = config.for_series(Some("Y")).unwrap();

        assert_eq!(effective.speedup, 1.0);
        assert_eq!(effective.download_path, PathBuf::from("/podcasts"));
    }

    #[test]
    fn unknown_series_title_skips_series_tier() {
        let config = Config::new(PartialConfig::default(), file(SAMPLE)).unwrap();
        assert_eq!(config.for_series(None).unwrap().speedup, 1.0);
    }

    #[test]
    fn command_line_beats_series_and_default() {
        let command_line = PartialConfig {
            download_path: Some(PathBuf::from("/cli")),
            verbose: Some(3),
            speedup: Some(1.1),
        };
        let config = Config::new(command_line, file(SAMPLE)).unwrap();
        let effective = config.for_series(Some("Slow Talkers")).unwrap();

        assert_eq!(
            effective,
            EffectiveConfig {
                download_path: PathBuf::from("/cli"),
                verbose: 3,
                speedup: 1.1,
            }
        );
    }

    #[test]
    fn missing_key_in_every_tier_is_reported() {
        let result: Result<u8, _> = first_present("verbose", [None, None, None]);
        assert!(matches!(
            result,
            Err(ConfigError::MissingKey { key: "verbose" })
        ));
    }

    #[test]
    fn first_present_respects_order() {
        assert_eq!(first_present("k", [None, Some(2), Some(3)]).unwrap(), 2);
    }

    // === File loading and validation ===

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("podsync.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = Config::load(PartialConfig::default(), Some(&path)).unwrap();
        assert_eq!(config.for_series(Some("X")).unwrap().speedup, 2.0);
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempdir().unwrap();
        let result = Config::load(PartialConfig::default(), Some(&dir.path().join("nope.toml")));
        assert!(matches!(result, Err(ConfigError::ReadFailed { .. })));
    }

    #[test]
    fn sections_are_optional() {
        let only_series = file("[series.X]\nverbose = 2\n");
        assert!(only_series.default.download_path.is_none());
        assert_eq!(only_series.series["X"].verbose, Some(2));

        let only_default = file("[default]\nspeedup = 1.2\n");
        assert!(only_default.series.is_empty());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = ConfigFile::parse("[default]\nspeed = 2.0\n", Path::new("t.toml"));
        assert!(matches!(result, Err(ConfigError::ParseFailed { .. })));
    }

    #[test]
    fn negative_verbose_is_rejected() {
        let result = ConfigFile::parse("[default]\nverbose = -1\n", Path::new("t.toml"));
        assert!(matches!(result, Err(ConfigError::ParseFailed { .. })));
    }

    #[test]
    fn non_positive_speedup_is_rejected() {
        let result = ConfigFile::parse("[series.X]\nspeedup = 0.0\n", Path::new("t.toml"));
        match result {
            Err(ConfigError::InvalidSpeedup { tier, value }) => {
                assert_eq!(tier, "[series.\"X\"]");
                assert_eq!(value, 0.0);
            }
            other => panic!("Expected InvalidSpeedup, got {other:?}"),
        }

        let command_line = PartialConfig {
            speedup: Some(-1.0),
            ..Default::default()
        };
        assert!(matches!(
            Config::new(command_line, ConfigFile::default()),
            Err(ConfigError::InvalidSpeedup { .. })
        ));
    }
}
