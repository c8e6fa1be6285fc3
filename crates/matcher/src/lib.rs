//! # Matcher (`matcher`)
//!
//! ## Purpose
//!
//! `matcher` runs the matching half of an accuracy benchmark on top of a
//! [`index::GroundTruthIndex`]: every query fingerprint is compared against
//! every candidate fingerprint, and the matched sets are scored against the
//! index's true positives.
//!
//! ## Core Types
//!
//! - [`Matcher`]: brute-force radius search. A candidate matches a query when
//!   their bit distance is at most the threshold (inclusive).
//! - [`MatchConfig`]: threshold and whether to fan queries out with rayon.
//!   Parallel and sequential runs produce identical results.
//! - [`MatchResults`]: query → matched candidate set.
//! - [`evaluate`]: per-query precision / recall / F1 and their means as an
//!   [`EvaluationSummary`].
//!
//! ## Example Usage
//!
//! ```
//! use fingerprint::{Bits, Fingerprint};
//! use index::GroundTruthIndex;
//! use matcher::{evaluate, MatchConfig, Matcher};
//!
//! let q = Fingerprint::from_lanes(&[0b0000]).unwrap();
//! let near = Fingerprint::from_lanes(&[0b0011]).unwrap();
//! let far = Fingerprint::from_lanes(&[u64::MAX]).unwrap();
//!
//! let mut index = GroundTruthIndex::new(Bits::B64, None);
//! index.insert_cluster(q, vec![near]).unwrap();
//! index.push_distractor(far).unwrap();
//!
//! let matcher = Matcher::new(&index);
//! let results = matcher.match_all(&MatchConfig::default()).unwrap();
//! let summary = evaluate(&index, &results).unwrap();
//! assert_eq!(summary.recall, 1.0);
//! assert_eq!(summary.precision, 1.0);
//! ```

pub mod engine;
pub mod evaluate;
pub mod types;

pub use crate::engine::Matcher;
pub use crate::evaluate::{evaluate, score_query, EvaluationSummary, QueryScore};
pub use crate::types::{MatchConfig, MatchError, MatchResults};
