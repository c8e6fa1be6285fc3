use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use fingerprint::{Bits, CodeGenerator, ContentCoder, PerceptualMode, detect_mode};
use index::corpus::first_file;
use index::{BuildDiagnostics, GroundTruthBuilder, GroundTruthCache, IndexError};
use matcher::{EvaluationSummary, Matcher, evaluate};
use serde::Serialize;
use tracing::{Level, info};

use crate::EvalError;
use crate::config::EvalConfig;
use crate::settings::Settings;

/// Outcome of one matching benchmark.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkReport {
    /// e.g. `Text-Code`.
    pub code_type: String,
    pub bits: Bits,
    pub threshold: u32,
    pub cache_hit: bool,
    pub cache_key: String,
    pub queries: usize,
    pub samples: usize,
    pub candidates: usize,
    pub summary: EvaluationSummary,
    /// Present when the ground truth was built during this run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<BuildDiagnostics>,
}

impl fmt::Display for BenchmarkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Matching result: {} (with {}-bit threshold)",
            self.summary, self.threshold
        )
    }
}

/// Mode of a run: configured, or detected from the first file of the corpus.
///
/// An empty corpus falls back to text.
pub fn resolve_mode(corpus: &Path, cfg: &EvalConfig) -> Result<PerceptualMode, EvalError> {
    if let Some(mode) = cfg.mode {
        return Ok(mode);
    }
    if !corpus.is_dir() {
        return Err(IndexError::CorpusNotFound(corpus.to_path_buf()).into());
    }
    let Some(first) = first_file(corpus)? else {
        return Ok(PerceptualMode::Text);
    };
    let mode = detect_mode(&first).ok_or_else(|| EvalError::UndetectableMode {
        path: first.clone(),
    })?;
    info!(mode = %mode, file = %first.display(), "perceptual_mode_detected");
    Ok(mode)
}

fn data_dir(cfg: &EvalConfig) -> PathBuf {
    cfg.data_dir.clone().unwrap_or_else(Settings::default_data_dir)
}

/// Build (or load) the ground truth for `corpus`, match every query and score
/// the results, using the built-in [`ContentCoder`].
pub fn run_match_benchmark(corpus: &Path, cfg: &EvalConfig) -> Result<BenchmarkReport, EvalError> {
    let mode = resolve_mode(corpus, cfg)?;
    let coder = ContentCoder::new(cfg.code_config(mode));
    run_match_benchmark_with(corpus, cfg, coder)
}

/// [`run_match_benchmark`] with a caller-supplied code generator.
///
/// Bits and mode come from `generator`; the remaining settings from `cfg`.
pub fn run_match_benchmark_with<G: CodeGenerator>(
    corpus: &Path,
    cfg: &EvalConfig,
    generator: G,
) -> Result<BenchmarkReport, EvalError> {
    let code = generator.config().clone();
    cfg.validate_for(code.bits)?;
    let start = Instant::now();
    let span = tracing::span!(
        Level::INFO,
        "eval.match_benchmark",
        corpus = %corpus.display(),
        code_type = %code.mode.code_type(),
        bits = %code.bits,
        threshold = cfg.threshold
    );
    let _guard = span.enter();

    let builder = GroundTruthBuilder::new(generator).with_policy(cfg.policy);
    let cache = GroundTruthCache::new(data_dir(cfg));
    let cached = cache.load_or_build(corpus, &builder)?;
    let index = &cached.index;
    info!(
        queries = index.query_count(),
        samples = index.sample_count(),
        "Dataset has {} queries against {} samples",
        index.query_count(),
        index.sample_count()
    );

    let matcher = Matcher::new(index);
    let results = matcher.match_all(&cfg.match_config())?;
    let summary = evaluate(index, &results)?;

    let report = BenchmarkReport {
        code_type: code.mode.code_type(),
        bits: code.bits,
        threshold: cfg.threshold,
        cache_hit: cached.hit,
        cache_key: cached.key.to_string(),
        queries: index.query_count(),
        samples: index.sample_count(),
        candidates: matcher.candidate_count(),
        summary,
        diagnostics: cached.diagnostics.clone(),
    };
    info!(
        recall = report.summary.recall,
        precision = report.summary.precision,
        f1 = report.summary.f1,
        cache_hit = report.cache_hit,
        elapsed_micros = start.elapsed().as_micros(),
        "match_benchmark_complete"
    );
    Ok(report)
}

/// Remove the cached ground truth of `corpus` at `bits`.
pub fn clear_cache(corpus: &Path, bits: Bits, cfg: &EvalConfig) -> Result<bool, EvalError> {
    Ok(GroundTruthCache::new(data_dir(cfg)).invalidate(corpus, bits)?)
}
