//! Run configuration via TOML files.
//!
//! Every key is optional; missing sections fall back to the defaults of a
//! single-endpoint run with `alpha = beta = 0.01` and `lambda = 1.0`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use toml::value::Table;
use toml::Value;

use crate::checkpoint::CheckpointPlan;
use crate::index::UnknownSymbolPolicy;
use crate::learner::LearningParams;

/// Default number of evenly spaced checkpoints in a longitudinal run.
pub const DEFAULT_LONGITUDINAL_POINTS: u32 = 20;

/// Configuration for one learning run.
///
/// # Examples
///
/// ```
/// use ndl_core::NdlConfig;
///
/// let config = NdlConfig::from_str("[learning]\nalpha = 0.1\nbeta = 0.1").unwrap();
/// assert_eq!(config.learning.lambda, 1.0);
/// assert_eq!(config.checkpoints.percentages(), &[100]);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct NdlConfig {
    /// Rescorla-Wagner parameters
    pub learning: LearningParams,
    /// Which percentages of the corpus get a persisted snapshot
    pub checkpoints: CheckpointPlan,
    /// What to do with symbols missing from the vocabulary
    pub unknown_symbols: UnknownSymbolPolicy,
    /// Checkpoint root; `None` derives it from the corpus path
    pub store_root: Option<PathBuf>,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub path: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from(crate::logging::DEFAULT_LOG_PATH),
        }
    }
}

impl NdlConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(&path)?;
        Self::from_str(&contents)
    }

    pub fn from_str(toml_str: &str) -> Result<Self, ConfigError> {
        let value: Value =
            toml::from_str(toml_str).map_err(|err| ConfigError::Parse(err.to_string()))?;

        let learning = section(&value, "learning");
        let defaults = LearningParams::default();
        let alpha = positive_float(&learning, "alpha", defaults.alpha)?;
        let beta = positive_float(&learning, "beta", defaults.beta)?;
        let lambda = positive_float(&learning, "lambda", defaults.lambda)?;

        let checkpoints = section(&value, "checkpoints");
        let longitudinal = match checkpoints.get("longitudinal") {
            Some(value) => value
                .as_bool()
                .ok_or_else(|| ConfigError::Parse("longitudinal must be a boolean".into()))?,
            None => false,
        };
        let points = match checkpoints.get("points") {
            Some(value) => value
                .as_integer()
                .filter(|points| (1..=100).contains(points))
                .map(|points| points as u32)
                .ok_or_else(|| {
                    ConfigError::Parse("points must be an integer between 1 and 100".into())
                })?,
            None => DEFAULT_LONGITUDINAL_POINTS,
        };
        let plan = if longitudinal {
            CheckpointPlan::longitudinal(points)
        } else {
            CheckpointPlan::single()
        };

        let unknown_symbols = match section(&value, "vocabulary").get("unknown_symbols") {
            Some(value) => value
                .as_str()
                .ok_or_else(|| ConfigError::Parse("unknown_symbols must be a string".into()))?
                .parse::<UnknownSymbolPolicy>()
                .map_err(ConfigError::Parse)?,
            None => UnknownSymbolPolicy::default(),
        };

        let store_root = match section(&value, "store").get("root") {
            Some(value) => Some(PathBuf::from(value.as_str().ok_or_else(|| {
                ConfigError::Parse("store root must be a string".into())
            })?)),
            None => None,
        };

        let logging_table = section(&value, "logging");
        let mut logging = LoggingConfig::default();
        if let Some(enabled) = logging_table.get("enabled") {
            logging.enabled = enabled
                .as_bool()
                .ok_or_else(|| ConfigError::Parse("logging enabled must be a boolean".into()))?;
        }
        if let Some(path) = logging_table.get("path") {
            logging.path = PathBuf::from(
                path.as_str()
                    .ok_or_else(|| ConfigError::Parse("logging path must be a string".into()))?,
            );
        }

        Ok(Self {
            learning: LearningParams {
                alpha,
                beta,
                lambda,
            },
            checkpoints: plan,
            unknown_symbols,
            store_root,
            logging,
        })
    }

    /// Points the process-wide logger at the configured destination.
    pub fn apply_logging(&self) {
        if self.logging.enabled {
            crate::logging::set_log_path(&self.logging.path);
        } else {
            crate::logging::disable();
        }
    }
}

impl Default for NdlConfig {
    fn default() -> Self {
        Self {
            learning: LearningParams::default(),
            checkpoints: CheckpointPlan::single(),
            unknown_symbols: UnknownSymbolPolicy::default(),
            store_root: None,
            logging: LoggingConfig::default(),
        }
    }
}

fn section(value: &Value, name: &str) -> Table {
    value
        .get(name)
        .and_then(|v| v.as_table())
        .cloned()
        .unwrap_or_default()
}

fn positive_float(table: &Table, key: &str, default: f64) -> Result<f64, ConfigError> {
    let value = match table.get(key) {
        None => return Ok(default),
        Some(value) => {
            if let Some(float) = value.as_float() {
                float
            } else if let Some(int) = value.as_integer() {
                int as f64
            } else {
                return Err(ConfigError::Parse(format!("{key} must be a number")));
            }
        }
    };

    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::Parse(format!(
            "{key} must be a positive finite number, got {value}"
        )));
    }
    Ok(value)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_sections_missing() {
        let config = NdlConfig::from_str("").unwrap();
        assert_eq!(config.learning.alpha, 0.01);
        assert_eq!(config.learning.beta, 0.01);
        assert_eq!(config.learning.lambda, 1.0);
        assert_eq!(config.checkpoints.percentages(), &[100]);
        assert_eq!(config.unknown_symbols, UnknownSymbolPolicy::Reject);
        assert!(config.store_root.is_none());
        assert!(config.logging.enabled);
    }

    #[test]
    fn parses_custom_values() {
        let toml = "[learning]\nalpha = 0.1\nbeta = 0.2\nlambda = 2\n\
                    [checkpoints]\nlongitudinal = true\npoints = 10\n\
                    [vocabulary]\nunknown_symbols = \"skip\"\n\
                    [store]\nroot = \"runs\"\n\
                    [logging]\nenabled = false\npath = \"out.jsonl\"";
        let config = NdlConfig::from_str(toml).unwrap();
        assert_eq!(config.learning.alpha, 0.1);
        assert_eq!(config.learning.beta, 0.2);
        assert_eq!(config.learning.lambda, 2.0);
        assert_eq!(
            config.checkpoints.percentages(),
            &[10, 20, 30, 40, 50, 60, 70, 80, 90, 100]
        );
        assert_eq!(config.unknown_symbols, UnknownSymbolPolicy::Skip);
        assert_eq!(config.store_root, Some(PathBuf::from("runs")));
        assert!(!config.logging.enabled);
        assert_eq!(config.logging.path, PathBuf::from("out.jsonl"));
    }

    #[test]
    fn longitudinal_defaults_to_twenty_points() {
        let config = NdlConfig::from_str("[checkpoints]\nlongitudinal = true").unwrap();
        let percentages = config.checkpoints.percentages();
        assert_eq!(percentages.len(), 20);
        assert_eq!(percentages[0], 5);
        assert_eq!(percentages[19], 100);
    }

    #[test]
    fn rejects_non_positive_parameters() {
        assert!(matches!(
            NdlConfig::from_str("[learning]\nbeta = 0.0"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            NdlConfig::from_str("[learning]\nlambda = -1.0"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            NdlConfig::from_str("[learning]\nalpha = \"high\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn rejects_unknown_policy_and_bad_points() {
        assert!(NdlConfig::from_str("[vocabulary]\nunknown_symbols = \"guess\"").is_err());
        assert!(NdlConfig::from_str("[checkpoints]\npoints = 0").is_err());
        assert!(NdlConfig::from_str("[checkpoints]\npoints = 101").is_err());
    }
}
