//! Evaluation run configuration.
//!
//! An [`EvalConfig`] is layered from (lowest to highest precedence) built-in
//! defaults, an optional config file and `ISCC_EVAL__*` environment variables.
//! The binary applies its command-line flags on top.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! # iscc-eval.yaml
//! bits: 64
//! mode: text            # omit to detect from the first corpus file
//! threshold: 8
//! policy: drop-cluster  # or promote-next
//! parallel: false
//! shingle_size: 3
//! data_dir: /var/lib/iscc-eval
//! log_level: info
//! ```
//!
//! Environment overrides use a double underscore after the prefix, e.g.
//! `ISCC_EVAL__BITS=128` or `ISCC_EVAL__THRESHOLD=12`.

use std::fs;
use std::path::{Path, PathBuf};

use fingerprint::{Bits, CodeConfig, PerceptualMode};
use index::QueryFailurePolicy;
use matcher::MatchConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Base name of the optional config file looked up in the working directory.
pub const CONFIG_FILE_STEM: &str = "iscc-eval";
/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "ISCC_EVAL";

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("failed to load configuration: {0}")]
    Source(#[from] config::ConfigError),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Settings of one matching benchmark run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Fingerprint size.
    #[serde(default)]
    pub bits: Bits,

    /// Perceptual mode; detected from the corpus when absent.
    #[serde(default)]
    pub mode: Option<PerceptualMode>,

    /// Maximum bit distance for a match (inclusive).
    #[serde(default = "default_threshold")]
    pub threshold: u32,

    /// What to do when a cluster's query cannot be coded.
    #[serde(default)]
    pub policy: QueryFailurePolicy,

    /// Match queries in parallel.
    #[serde(default)]
    pub parallel: bool,

    /// Tokens per shingle for text codes.
    #[serde(default = "default_shingle_size")]
    pub shingle_size: usize,

    /// Root of the ground-truth cache. Falls back to the user settings.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            bits: Bits::default(),
            mode: None,
            threshold: default_threshold(),
            policy: QueryFailurePolicy::default(),
            parallel: false,
            shingle_size: default_shingle_size(),
            data_dir: None,
            log_level: default_log_level(),
        }
    }
}

impl EvalConfig {
    /// Load configuration from an optional file and the environment.
    ///
    /// With `path = None` a file named `iscc-eval.{yaml,json,toml,...}` in the
    /// working directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        builder = match path {
            Some(path) => builder.add_source(config::File::from(path).required(true)),
            None => builder.add_source(config::File::with_name(CONFIG_FILE_STEM).required(false)),
        };
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let cfg: EvalConfig = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a YAML configuration file from the given path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let cfg: EvalConfig = serde_yaml::from_str(yaml)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_for(self.bits)
    }

    /// [`EvalConfig::validate`] for codes of `bits`, which may differ from
    /// `self.bits` when the coder is supplied by the caller.
    pub fn validate_for(&self, bits: Bits) -> Result<(), ConfigError> {
        if self.threshold > u32::from(bits.get()) {
            return Err(ConfigError::Validation(format!(
                "threshold {} exceeds the fingerprint size of {} bits",
                self.threshold, bits
            )));
        }
        if self.shingle_size == 0 {
            return Err(ConfigError::Validation(
                "shingle_size must be greater than zero".into(),
            ));
        }
        if self.log_level.trim().is_empty() {
            return Err(ConfigError::Validation(
                "log_level must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Coder settings for a run in `mode`.
    pub fn code_config(&self, mode: PerceptualMode) -> CodeConfig {
        CodeConfig::new(self.bits, mode).with_shingle_size(self.shingle_size)
    }

    pub fn match_config(&self) -> MatchConfig {
        MatchConfig {
            threshold: self.threshold,
            parallel: self.parallel,
        }
    }
}

fn default_threshold() -> u32 {
    MatchConfig::DEFAULT_THRESHOLD
}

fn default_shingle_size() -> usize {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}
