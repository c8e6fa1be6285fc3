//! Workspace umbrella crate for the iscc-eval matching benchmark.
//!
//! This crate wires the workspace crates into a single entry point:
//! `fingerprint` codes files, `index` builds and caches the ground truth of a
//! labeled corpus, and `matcher` radius-matches every query and scores the
//! result with recall, precision and F1.
//!
//! ```no_run
//! # #[cfg(feature = "redb")] {
//! use std::path::Path;
//! use iscc_eval::{EvalConfig, run_match_benchmark};
//!
//! let cfg = EvalConfig::default();
//! let report = run_match_benchmark(Path::new("corpus"), &cfg).unwrap();
//! println!("{report}");
//! # }
//! ```

pub mod config;
pub mod logging;
#[cfg(feature = "redb")]
mod pipeline;
pub mod settings;

use std::path::PathBuf;

use thiserror::Error;

pub use crate::config::{ConfigError, EvalConfig};
#[cfg(feature = "redb")]
pub use crate::pipeline::{
    BenchmarkReport, clear_cache, resolve_mode, run_match_benchmark, run_match_benchmark_with,
};
pub use crate::settings::{Settings, SettingsError, SettingsFile};

pub use fingerprint::{
    Bits, CodeConfig, CodeGenerator, CodeOutput, ContentCoder, Fingerprint, FingerprintError,
    PerceptualMode, distance,
};
pub use index::{
    BuildDiagnostics, GroundTruthBuilder, GroundTruthIndex, IndexError, QueryFailurePolicy,
};
#[cfg(feature = "redb")]
pub use index::{CacheKey, GroundTruthCache};
pub use matcher::{
    EvaluationSummary, MatchConfig, MatchError, MatchResults, Matcher, QueryScore, evaluate,
};

/// Errors of a benchmark run.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),
    #[error("cannot detect a perceptual mode from {}", path.display())]
    UndetectableMode { path: PathBuf },
}
