//! Optimizer configuration, loadable from TOML.
//!
//! ```toml
//! [optimizer]
//! exhaustive_limit = 8
//! label_only_bonus = 1
//! split_components = true
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Largest component searched exhaustively by default. `8!` permutations is
/// the worst case before connectivity pruning.
pub const DEFAULT_EXHAUSTIVE_LIMIT: usize = 8;

/// Ceiling for `exhaustive_limit`. Larger values are rejected when loading and
/// clamped by the optimizer.
pub const MAX_EXHAUSTIVE_LIMIT: usize = 10;

/// Tuning knobs for the traversal-order optimizer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptimizerOptions {
    /// Search units with more expressions than this are ordered greedily.
    /// Capped at [`MAX_EXHAUSTIVE_LIMIT`].
    pub exhaustive_limit: usize,
    /// Flat score added for each label-only expression.
    pub label_only_bonus: i64,
    /// Order disconnected components independently instead of failing.
    pub split_components: bool,
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        Self {
            exhaustive_limit: DEFAULT_EXHAUSTIVE_LIMIT,
            label_only_bonus: 1,
            split_components: true,
        }
    }
}

impl OptimizerOptions {
    /// Parses options from TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        parse(contents, "<inline>")
    }

    /// Reads options from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        parse(&contents, &path.display().to_string())
    }
}

fn parse(contents: &str, origin: &str) -> Result<OptimizerOptions, ConfigError> {
    let raw: RawConfig = toml::from_str(contents).map_err(|source| ConfigError::Parse {
        origin: origin.to_owned(),
        source,
    })?;
    convert(raw.optimizer)
}

fn convert(raw: RawOptimizer) -> Result<OptimizerOptions, ConfigError> {
    let defaults = OptimizerOptions::default();
    let exhaustive_limit = raw.exhaustive_limit.unwrap_or(defaults.exhaustive_limit);
    if exhaustive_limit == 0 {
        return Err(ConfigError::InvalidValue {
            key: "optimizer.exhaustive_limit",
            value: exhaustive_limit.to_string(),
            reason: "must be at least 1",
        });
    }
    if exhaustive_limit > MAX_EXHAUSTIVE_LIMIT {
        return Err(ConfigError::InvalidValue {
            key: "optimizer.exhaustive_limit",
            value: exhaustive_limit.to_string(),
            reason: "must not exceed 10",
        });
    }
    let label_only_bonus = raw.label_only_bonus.unwrap_or(defaults.label_only_bonus);
    if label_only_bonus < 0 {
        return Err(ConfigError::InvalidValue {
            key: "optimizer.label_only_bonus",
            value: label_only_bonus.to_string(),
            reason: "must not be negative",
        });
    }
    Ok(OptimizerOptions {
        exhaustive_limit,
        label_only_bonus,
        split_components: raw.split_components.unwrap_or(defaults.split_components),
    })
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    optimizer: RawOptimizer,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOptimizer {
    exhaustive_limit: Option<usize>,
    label_only_bonus: Option<i64>,
    split_components: Option<bool>,
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read optimizer config {path}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The contents are not valid TOML for this schema.
    #[error("failed to parse optimizer config {origin}: {source}")]
    Parse {
        /// File path, or `<inline>` for in-memory text.
        origin: String,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
    /// A key parsed but its value is out of range.
    #[error("{key} = {value} is invalid: {reason}")]
    InvalidValue {
        /// Fully-qualified key.
        key: &'static str,
        /// Offending value.
        value: String,
        /// Constraint that was violated.
        reason: &'static str,
    },
}

impl ConfigError {
    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "ConfigRead",
            ConfigError::Parse { .. } => "ConfigParse",
            ConfigError::InvalidValue { .. } => "ConfigInvalidValue",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_yields_defaults() {
        let opts = OptimizerOptions::from_toml_str("").unwrap();
        assert_eq!(opts, OptimizerOptions::default());
    }

    #[test]
    fn partial_section_overrides_only_given_keys() {
        let opts = OptimizerOptions::from_toml_str("[optimizer]\nexhaustive_limit = 5\n").unwrap();
        assert_eq!(opts.exhaustive_limit, 5);
        assert_eq!(opts.label_only_bonus, 1);
        assert!(opts.split_components);
    }

    #[test]
    fn rejects_zero_limit_and_unknown_keys() {
        let err = OptimizerOptions::from_toml_str("[optimizer]\nexhaustive_limit = 0\n").unwrap_err();
        assert_eq!(err.code(), "ConfigInvalidValue");
        let err = OptimizerOptions::from_toml_str("[optimizer]\nexhaustive = 3\n").unwrap_err();
        assert_eq!(err.code(), "ConfigParse");
        let err =
            OptimizerOptions::from_toml_str("[optimizer]\nlabel_only_bonus = -2\n").unwrap_err();
        assert!(err.to_string().contains("label_only_bonus"));
    }

    #[test]
    fn rejects_limit_above_ceiling() {
        let opts = OptimizerOptions::from_toml_str("[optimizer]\nexhaustive_limit = 10\n").unwrap();
        assert_eq!(opts.exhaustive_limit, MAX_EXHAUSTIVE_LIMIT);
        let err = OptimizerOptions::from_toml_str("[optimizer]\nexhaustive_limit = 20\n").unwrap_err();
        match err {
            ConfigError::InvalidValue { key, value, .. } => {
                assert_eq!(key, "optimizer.exhaustive_limit");
                assert_eq!(value, "20");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[optimizer]\nlabel_only_bonus = 4\nsplit_components = false").unwrap();
        let opts = OptimizerOptions::load(file.path()).unwrap();
        assert_eq!(opts.label_only_bonus, 4);
        assert!(!opts.split_components);

        let missing = file.path().with_extension("absent");
        assert_eq!(OptimizerOptions::load(missing).unwrap_err().code(), "ConfigRead");
    }
}
