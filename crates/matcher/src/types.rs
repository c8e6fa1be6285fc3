use std::collections::{BTreeMap, BTreeSet};

use fingerprint::{Fingerprint, FingerprintError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Query fingerprint → set of matched candidates.
pub type MatchResults = BTreeMap<Fingerprint, BTreeSet<Fingerprint>>;

/// Configuration for one matching run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchConfig {
    /// Maximum bit distance (inclusive) for a candidate to count as a match.
    #[serde(default = "MatchConfig::default_threshold")]
    pub threshold: u32,
    /// Fan queries out over the rayon thread pool.
    #[serde(default)]
    pub parallel: bool,
}

impl MatchConfig {
    pub const DEFAULT_THRESHOLD: u32 = 8;

    pub(crate) fn default_threshold() -> u32 {
        Self::DEFAULT_THRESHOLD
    }

    pub fn with_threshold(threshold: u32) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
            parallel: false,
        }
    }
}

/// Errors produced by matching and evaluation.
#[derive(Debug, Error)]
pub enum MatchError {
    /// Comparing codes failed, usually because their lengths differ.
    #[error(transparent)]
    Distance(#[from] FingerprintError),
    /// The results hold no entry for a query of the index.
    #[error("no match results for query {query}")]
    MissingResults { query: Fingerprint },
    /// A query without true positives retrieved something, so recall is undefined.
    #[error("query {query} has no true positives but retrieved {retrieved} candidates")]
    EmptyRelevantSet { query: Fingerprint, retrieved: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_threshold_is_eight_and_sequential() {
        let cfg = MatchConfig::default();
        assert_eq!(cfg.threshold, 8);
        assert!(!cfg.parallel);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let cfg: MatchConfig = serde_json::from_str(r#"{"parallel": true}"#).unwrap();
        assert_eq!(cfg.threshold, MatchConfig::DEFAULT_THRESHOLD);
        assert!(cfg.parallel);
    }
}
