//! Ground-truth construction from a labeled corpus.

use std::path::{Path, PathBuf};
use std::time::Instant;

use fingerprint::{distance, Bits, CodeGenerator, Fingerprint};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn, Level};

use crate::corpus::{collect_files, entry_kind, sorted_children, EntryKind};
use crate::{GroundTruthIndex, IndexError};

/// What to do when a cluster's designated query cannot be coded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryFailurePolicy {
    /// Drop the whole cluster; none of its members are recorded.
    #[default]
    DropCluster,
    /// Use the first file that codes successfully as the query.
    PromoteNext,
}

impl QueryFailurePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DropCluster => "drop-cluster",
            Self::PromoteNext => "promote-next",
        }
    }
}

impl std::fmt::Display for QueryFailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QueryFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drop-cluster" => Ok(Self::DropCluster),
            "promote-next" => Ok(Self::PromoteNext),
            other => Err(format!(
                "unknown query failure policy `{other}` (expected drop-cluster or promote-next)"
            )),
        }
    }
}

/// A file left out of the index because it could not be coded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// What happened during a build, beyond the index itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildDiagnostics {
    /// Cluster directories seen.
    pub clusters: usize,
    pub skipped_files: Vec<SkippedFile>,
    /// Names of clusters that produced no query.
    pub dropped_clusters: Vec<String>,
    /// Files that became the query after earlier files failed.
    pub promoted_queries: Vec<PathBuf>,
    /// Clusters whose query fingerprint replaced an earlier cluster's entry.
    pub query_collisions: Vec<String>,
}

/// Scans a corpus with a [`CodeGenerator`] and assembles a [`GroundTruthIndex`].
///
/// Bit length and mode are taken from the generator, so every code in one
/// build shares them.
pub struct GroundTruthBuilder<G> {
    generator: G,
    policy: QueryFailurePolicy,
}

impl<G: CodeGenerator> GroundTruthBuilder<G> {
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            policy: QueryFailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: QueryFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn bits(&self) -> Bits {
        self.generator.config().bits
    }

    pub fn policy(&self) -> QueryFailurePolicy {
        self.policy
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn build(&self, corpus: &Path) -> Result<GroundTruthIndex, IndexError> {
        self.build_with_diagnostics(corpus).map(|(index, _)| index)
    }

    pub fn build_with_diagnostics(
        &self,
        corpus: &Path,
    ) -> Result<(GroundTruthIndex, BuildDiagnostics), IndexError> {
        if !corpus.is_dir() {
            return Err(IndexError::CorpusNotFound(corpus.to_path_buf()));
        }

        let start = Instant::now();
        let cfg = self.generator.config();
        let span = tracing::span!(
            Level::INFO,
            "ground_truth.build",
            corpus = %corpus.display(),
            bits = %cfg.bits,
            mode = %cfg.mode
        );
        let _guard = span.enter();

        let mut index = GroundTruthIndex::new(cfg.bits, Some(cfg.mode));
        let mut diag = BuildDiagnostics::default();

        for child in sorted_children(corpus)? {
            match entry_kind(&child)? {
                EntryKind::Dir => {
                    diag.clusters += 1;
                    self.add_cluster(&child, &mut index, &mut diag)?;
                }
                EntryKind::File => {
                    if let Some(fp) = self.code_or_skip(&child, &mut diag)? {
                        index.push_distractor(fp)?;
                    }
                }
                EntryKind::Other => {
                    debug!(path = %child.display(), "entry_ignored");
                }
            }
        }

        info!(
            clusters = diag.clusters,
            queries = index.query_count(),
            samples = index.sample_count(),
            distractors = index.distractors().len(),
            skipped = diag.skipped_files.len(),
            dropped = diag.dropped_clusters.len(),
            elapsed_micros = start.elapsed().as_micros(),
            "ground_truth_built"
        );
        Ok((index, diag))
    }

    fn add_cluster(
        &self,
        dir: &Path,
        index: &mut GroundTruthIndex,
        diag: &mut BuildDiagnostics,
    ) -> Result<(), IndexError> {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string());
        let files = collect_files(dir)?;
        if files.is_empty() {
            debug!(cluster = %name, "empty_cluster");
            return Ok(());
        }

        let mut rest = files.iter();
        let mut query = None;
        for (position, path) in rest.by_ref().enumerate() {
            if let Some(fp) = self.code_or_skip(path, diag)? {
                if position > 0 {
                    debug!(cluster = %name, path = %path.display(), "query_promoted");
                    diag.promoted_queries.push(path.clone());
                }
                query = Some(fp);
                break;
            }
            if self.policy == QueryFailurePolicy::DropCluster {
                break;
            }
        }

        let Some(query) = query else {
            warn!(cluster = %name, "cluster_dropped");
            diag.dropped_clusters.push(name);
            return Ok(());
        };

        let mut members = Vec::new();
        for path in rest {
            if let Some(fp) = self.code_or_skip(path, diag)? {
                members.push(fp);
            }
        }

        if tracing::enabled!(Level::DEBUG) {
            for member in &members {
                let d = distance(&query, member)?;
                debug!(cluster = %name, query = %query, member = %member, distance = d, "cluster_distance");
            }
        }

        if index.insert_cluster(query.clone(), members)?.is_some() {
            warn!(cluster = %name, query = %query, "query_collision");
            diag.query_collisions.push(name);
        }
        Ok(())
    }

    /// Code one file. Recoverable failures are logged, recorded and return `None`.
    fn code_or_skip(
        &self,
        path: &Path,
        diag: &mut BuildDiagnostics,
    ) -> Result<Option<Fingerprint>, IndexError> {
        match self.generator.code(path) {
            Ok(output) => Ok(Some(output.fingerprint)),
            Err(err) if err.is_unsupported_input() => {
                warn!(path = %path.display(), error = %err, "file_skipped");
                diag.skipped_files.push(SkippedFile {
                    path: path.to_path_buf(),
                    reason: err.to_string(),
                });
                Ok(None)
            }
            Err(err) => Err(IndexError::from(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fingerprint::{CodeConfig, CodeOutput, FingerprintError, PerceptualMode};
    use std::collections::HashMap;
    use std::fs;
    use tempfile::tempdir;

    /// Maps file contents to a fingerprint; unknown contents are unsupported.
    struct StubCoder {
        cfg: CodeConfig,
        codes: HashMap<String, u64>,
    }

    impl StubCoder {
        fn new(codes: &[(&str, u64)]) -> Self {
            Self {
                cfg: CodeConfig::new(Bits::B64, PerceptualMode::Text),
                codes: codes.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            }
        }
    }

    impl CodeGenerator for StubCoder {
        fn config(&self) -> &CodeConfig {
            &self.cfg
        }

        fn code(&self, path: &Path) -> Result<CodeOutput, FingerprintError> {
            let body = fs::read_to_string(path).unwrap();
            match self.codes.get(body.trim()) {
                Some(v) => Ok(CodeOutput::new(
                    self.cfg.mode,
                    Fingerprint::from_lanes(&[*v]).unwrap(),
                )),
                None => Err(FingerprintError::UnsupportedMediaType {
                    path: path.to_path_buf(),
                }),
            }
        }
    }

    fn fp(v: u64) -> Fingerprint {
        Fingerprint::from_lanes(&[v]).unwrap()
    }

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[test]
    fn builds_clusters_and_distractors() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a/1.txt", "q");
        write(dir.path(), "a/2.txt", "m1");
        write(dir.path(), "a/sub/3.txt", "m2");
        write(dir.path(), "b/1.txt", "lonely");
        write(dir.path(), "x.txt", "far");

        let builder = GroundTruthBuilder::new(StubCoder::new(&[
            ("q", 0b1),
            ("m1", 0b11),
            ("m2", 0b111),
            ("lonely", 0xf0),
            ("far", u64::MAX),
        ]));
        let (index, diag) = builder.build_with_diagnostics(dir.path()).unwrap();

        assert_eq!(index.query_count(), 2);
        // "2.txt" sorts before "sub/3.txt".
        assert_eq!(index.relevant(&fp(0b1)), Some(&[fp(0b11), fp(0b111)][..]));
        assert_eq!(index.relevant(&fp(0xf0)), Some(&[][..]));
        assert_eq!(index.distractors(), &[fp(u64::MAX)]);
        assert_eq!(index.mode(), Some(PerceptualMode::Text));
        assert_eq!(diag.clusters, 2);
        assert!(diag.skipped_files.is_empty());
    }

    #[test]
    fn failing_query_drops_the_cluster_by_default() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a/1.txt", "broken");
        write(dir.path(), "a/2.txt", "m");
        write(dir.path(), "b/1.txt", "q");
        write(dir.path(), "b/2.txt", "broken");
        write(dir.path(), "b/3.txt", "m2");
        write(dir.path(), "junk.txt", "broken");

        let builder = GroundTruthBuilder::new(StubCoder::new(&[("q", 1), ("m", 2), ("m2", 3)]));
        let (index, diag) = builder.build_with_diagnostics(dir.path()).unwrap();

        assert_eq!(index.query_count(), 1);
        assert_eq!(index.relevant(&fp(1)), Some(&[fp(3)][..]));
        assert_eq!(index.sample_count(), 1);
        assert_eq!(diag.dropped_clusters, vec!["a".to_string()]);
        assert_eq!(diag.skipped_files.len(), 3);
    }

    #[test]
    fn promote_next_uses_first_codable_file() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a/1.txt", "broken");
        write(dir.path(), "a/2.txt", "m");
        write(dir.path(), "a/3.txt", "m2");
        write(dir.path(), "b/1.txt", "broken");

        let builder = GroundTruthBuilder::new(StubCoder::new(&[("m", 2), ("m2", 3)]))
            .with_policy(QueryFailurePolicy::PromoteNext);
        let (index, diag) = builder.build_with_diagnostics(dir.path()).unwrap();

        assert_eq!(index.relevant(&fp(2)), Some(&[fp(3)][..]));
        assert_eq!(diag.promoted_queries, vec![dir.path().join("a/2.txt")]);
        assert_eq!(diag.dropped_clusters, vec!["b".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_cluster_directories_are_ignored() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a/1.txt", "q");
        write(dir.path(), "a/2.txt", "m");
        std::os::unix::fs::symlink(dir.path().join("a"), dir.path().join("a/loop")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("a"), dir.path().join("b")).unwrap();

        let builder = GroundTruthBuilder::new(StubCoder::new(&[("q", 1), ("m", 2)]));
        let (index, diag) = builder.build_with_diagnostics(dir.path()).unwrap();

        assert_eq!(diag.clusters, 1);
        assert_eq!(index.query_count(), 1);
        assert_eq!(index.relevant(&fp(1)), Some(&[fp(2)][..]));
    }

    #[test]
    fn colliding_queries_keep_the_later_cluster() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a/1.txt", "q");
        write(dir.path(), "a/2.txt", "m1");
        write(dir.path(), "b/1.txt", "q");
        write(dir.path(), "b/2.txt", "m2");

        let builder = GroundTruthBuilder::new(StubCoder::new(&[("q", 1), ("m1", 2), ("m2", 3)]));
        let (index, diag) = builder.build_with_diagnostics(dir.path()).unwrap();

        assert_eq!(index.query_count(), 1);
        assert_eq!(index.relevant(&fp(1)), Some(&[fp(3)][..]));
        assert_eq!(diag.query_collisions, vec!["b".to_string()]);
    }

    #[test]
    fn empty_and_missing_corpora() {
        let dir = tempdir().unwrap();
        let builder = GroundTruthBuilder::new(StubCoder::new(&[]));
        assert!(builder.build(dir.path()).unwrap().is_empty());
        assert!(matches!(
            builder.build(&dir.path().join("missing")),
            Err(IndexError::CorpusNotFound(_))
        ));
    }

    #[test]
    fn policy_parses_from_cli_spelling() {
        assert_eq!(
            "promote-next".parse::<QueryFailurePolicy>().unwrap(),
            QueryFailurePolicy::PromoteNext
        );
        assert!("sometimes".parse::<QueryFailurePolicy>().is_err());
        assert_eq!(
            serde_json::to_string(&QueryFailurePolicy::DropCluster).unwrap(),
            "\"drop-cluster\""
        );
        assert_eq!(QueryFailurePolicy::PromoteNext.to_string(), "promote-next");
    }
}
