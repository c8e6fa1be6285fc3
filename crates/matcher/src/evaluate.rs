//! Recall, precision and F1 of match results against the ground truth.
//!
//! Per query, `relevant` is the set of true positives and `retrieved` the set
//! of matched candidates:
//!
//! - both empty: precision = recall = 1.0, and the query has no F1 value;
//! - otherwise precision = |relevant ∩ retrieved| / |retrieved| (0 when
//!   nothing was retrieved), recall = |relevant ∩ retrieved| / |relevant| and
//!   F1 = 2PR / (P + R) (0 when P + R = 0).
//!
//! Recall and precision are averaged over all queries, F1 over the queries
//! that have one. An empty average is 0.0; the counts in
//! [`EvaluationSummary`] tell that case apart from a genuine zero.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Instant;

use fingerprint::Fingerprint;
use index::GroundTruthIndex;
use serde::Serialize;
use tracing::{debug, info, Level};

use crate::types::{MatchError, MatchResults};

/// Scores of a single query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryScore {
    pub query: Fingerprint,
    pub precision: f64,
    pub recall: f64,
    pub f1: Option<f64>,
}

/// Aggregate scores over every query of an index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationSummary {
    pub recall: f64,
    pub precision: f64,
    pub f1: f64,
    /// Queries averaged into recall and precision.
    pub queries: usize,
    /// Queries averaged into F1.
    pub f1_queries: usize,
    pub per_query: Vec<QueryScore>,
}

impl fmt::Display for EvaluationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Recall {:.2} - Precision {:.2} - F1 {:.2}",
            self.recall, self.precision, self.f1
        )
    }
}

/// Score a single query.
pub fn score_query(
    query: &Fingerprint,
    relevant: &[Fingerprint],
    retrieved: &BTreeSet<Fingerprint>,
) -> Result<QueryScore, MatchError> {
    let relevant: BTreeSet<&Fingerprint> = relevant.iter().collect();

    if relevant.is_empty() && retrieved.is_empty() {
        return Ok(QueryScore {
            query: query.clone(),
            precision: 1.0,
            recall: 1.0,
            f1: None,
        });
    }
    if relevant.is_empty() {
        return Err(MatchError::EmptyRelevantSet {
            query: query.clone(),
            retrieved: retrieved.len(),
        });
    }

    let hits = retrieved.iter().filter(|fp| relevant.contains(fp)).count() as f64;
    let precision = if retrieved.is_empty() {
        0.0
    } else {
        hits / retrieved.len() as f64
    };
    let recall = hits / relevant.len() as f64;
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };

    Ok(QueryScore {
        query: query.clone(),
        precision,
        recall,
        f1: Some(f1),
    })
}

fn mean(values: impl Iterator<Item = f64>) -> (f64, usize) {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { (0.0, 0) } else { (sum / n as f64, n) }
}

/// Evaluate `results` against every query of `index`.
pub fn evaluate(
    index: &GroundTruthIndex,
    results: &MatchResults,
) -> Result<EvaluationSummary, MatchError> {
    let start = Instant::now();
    let span = tracing::span!(Level::INFO, "matcher.evaluate", queries = index.query_count());
    let _guard = span.enter();

    let mut per_query = Vec::with_capacity(index.query_count());
    for (query, relevant) in index.queries() {
        let retrieved = results
            .get(query)
            .ok_or_else(|| MatchError::MissingResults {
                query: query.clone(),
            })?;
        let score = score_query(query, relevant, retrieved)?;
        debug!(
            query = %query,
            recall = score.recall,
            precision = score.precision,
            f1 = ?score.f1,
            "query_scored"
        );
        per_query.push(score);
    }

    let (recall, queries) = mean(per_query.iter().map(|s| s.recall));
    let (precision, _) = mean(per_query.iter().map(|s| s.precision));
    let (f1, f1_queries) = mean(per_query.iter().filter_map(|s| s.f1));

    let summary = EvaluationSummary {
        recall,
        precision,
        f1,
        queries,
        f1_queries,
        per_query,
    };
    info!(
        recall = summary.recall,
        precision = summary.precision,
        f1 = summary.f1,
        queries,
        f1_queries,
        elapsed_micros = start.elapsed().as_micros(),
        "evaluation_complete"
    );
    Ok(summary)
}
