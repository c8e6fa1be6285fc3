use std::collections::BTreeSet;
use std::time::Instant;

use fingerprint::{distance, Fingerprint};
use index::GroundTruthIndex;
use rayon::prelude::*;
use tracing::{info, Level};

use crate::types::{MatchConfig, MatchError, MatchResults};


/// Brute-force radius matcher over a ground-truth index.
///
/// The candidate pool is every true positive of every query plus the
/// distractor pool, deduplicated. Queries are not candidates unless they also
/// appear as a member somewhere.
pub struct Matcher<'a> {
    index: &'a GroundTruthIndex,
    candidates: Vec<Fingerprint>,
}

impl<'a> Matcher<'a> {
    pub fn new(index: &'a GroundTruthIndex) -> Self {
        let pool: BTreeSet<&Fingerprint> = index
            .queries()
            .flat_map(|(_, relevant)| relevant.iter())
            .chain(index.distractors())
            .collect();
        Self {
            index,
            candidates: pool.into_iter().cloned().collect(),
        }
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    pub fn candidates(&self) -> &[Fingerprint] {
        &self.candidates
    }

    /// Every candidate within `threshold` bits of `query` (inclusive).
    pub fn match_query(
        &self,
        query: &Fingerprint,
        threshold: u32,
    ) -> Result<BTreeSet<Fingerprint>, MatchError> {
        let mut matched = BTreeSet::new();
        for candidate in &self.candidates {
            if distance(query, candidate)? <= threshold {
                matched.insert(candidate.clone());
            }
        }
        Ok(matched)
    }

    /// Match every query of the index.
    pub fn match_all(&self, cfg: &MatchConfig) -> Result<MatchResults, MatchError> {
        let start = Instant::now();
        let span = tracing::span!(
            Level::INFO,
            "matcher.match_all",
            threshold = cfg.threshold,
            parallel = cfg.parallel
        );
        let _guard = span.enter();

        let queries: Vec<&Fingerprint> = self.index.queries().map(|(q, _)| q).collect();
        let run = |query: &&Fingerprint| {
            self.match_query(query, cfg.threshold)
                .map(|matched| ((*query).clone(), matched))
        };
        let results: MatchResults = if cfg.parallel {
            queries.par_iter().map(run).collect::<Result<_, _>>()?
        } else {
            queries.iter().map(run).collect::<Result<_, _>>()?
        };

        info!(
            queries = results.len(),
            candidates = self.candidates.len(),
            matched = results.values().map(BTreeSet::len).sum::<usize>(),
            elapsed_micros = start.elapsed().as_micros(),
            "match_all_complete"
        );
        Ok(results)
    }
}
