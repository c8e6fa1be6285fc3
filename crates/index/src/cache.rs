//! Content-addressed on-disk cache of ground-truth indexes.
//!
//! A cached index is identified by the SHA-256 digest of the corpus files
//! together with every setting that shapes the index: bit length, perceptual
//! mode, query-failure policy and shingle size. Each key gets its own
//! directory holding one redb file.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use fingerprint::{Bits, CodeConfig, CodeGenerator, PerceptualMode};
use tracing::{info, warn};

use crate::backend::RedbStore;
use crate::builder::{BuildDiagnostics, GroundTruthBuilder, QueryFailurePolicy};
use crate::corpus::corpus_digest;
use crate::{GroundTruthIndex, GroundTruthStore, IndexError, INDEX_SCHEMA_VERSION};

/// File name of the store inside a key directory.
pub const STORE_FILE: &str = "ground_truth.redb";

/// Identifies a cached index: corpus content digest plus build settings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub digest: String,
    pub bits: Bits,
    pub mode: PerceptualMode,
    pub policy: QueryFailurePolicy,
    pub shingle_size: usize,
}

impl CacheKey {
    pub fn new(digest: String, code: &CodeConfig, policy: QueryFailurePolicy) -> Self {
        Self {
            digest,
            bits: code.bits,
            mode: code.mode,
            policy,
            shingle_size: code.shingle_size,
        }
    }

    /// Directory name, e.g. `3fa1c9e07b2d4410_64_text_drop-cluster_k3`.
    pub fn dir_name(&self) -> String {
        format!(
            "{}{}_{}_k{}",
            Self::prefix(&self.digest, self.bits),
            self.mode.as_str(),
            self.policy,
            self.shingle_size
        )
    }

    /// Leading part of [`CacheKey::dir_name`] shared by every entry of one
    /// corpus at one bit length.
    fn prefix(digest: &str, bits: Bits) -> String {
        let short = digest.get(..16).unwrap_or(digest);
        format!("{short}_{bits}_")
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dir_name())
    }
}

/// Result of [`GroundTruthCache::load_or_build`].
#[derive(Debug)]
pub struct CachedGroundTruth {
    pub index: GroundTruthIndex,
    pub key: CacheKey,
    /// Directory holding the store.
    pub location: PathBuf,
    /// True when the index was read from disk instead of being built.
    pub hit: bool,
    /// Present only when the index was built by this call.
    pub diagnostics: Option<BuildDiagnostics>,
}

pub struct GroundTruthCache {
    data_dir: PathBuf,
}

impl GroundTruthCache {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn cache_key(
        &self,
        corpus: &Path,
        code: &CodeConfig,
        policy: QueryFailurePolicy,
    ) -> Result<CacheKey, IndexError> {
        Ok(CacheKey::new(corpus_digest(corpus)?, code, policy))
    }

    pub fn location(&self, key: &CacheKey) -> PathBuf {
        self.data_dir.join(key.dir_name())
    }

    /// Load a cached index for `key`, or `None` when it was never built.
    ///
    /// A directory that exists but does not hold a complete store matching
    /// the key's bit length and mode is [`IndexError::CorruptStore`].
    pub fn load(&self, key: &CacheKey) -> Result<Option<GroundTruthIndex>, IndexError> {
        let location = self.location(key);
        if !location.is_dir() {
            return Ok(None);
        }

        let path = location.join(STORE_FILE);
        let corrupt = |reason: String| IndexError::CorruptStore {
            path: path.clone(),
            reason,
        };
        if !path.is_file() {
            return Err(corrupt("store file is missing".into()));
        }

        let store = RedbStore::open_existing(&path)?;
        let meta = store
            .meta()
            .map_err(|e| corrupt(e.to_string()))?
            .ok_or_else(|| corrupt("metadata record is missing".into()))?;
        if meta.schema_version != INDEX_SCHEMA_VERSION {
            return Err(corrupt(format!(
                "unsupported schema version {}",
                meta.schema_version
            )));
        }
        if meta.bits != key.bits {
            return Err(corrupt(format!(
                "store holds {}-bit codes, expected {}",
                meta.bits, key.bits
            )));
        }
        if let Some(mode) = meta.mode {
            if mode != key.mode {
                return Err(corrupt(format!(
                    "store holds {mode} codes, expected {}",
                    key.mode
                )));
            }
        }

        GroundTruthIndex::load(&store)
            .map(Some)
            .map_err(|e| corrupt(e.to_string()))
    }

    /// Return the cached index for `corpus`, building and persisting it on a miss.
    pub fn load_or_build<G: CodeGenerator>(
        &self,
        corpus: &Path,
        builder: &GroundTruthBuilder<G>,
    ) -> Result<CachedGroundTruth, IndexError> {
        let key = self.cache_key(corpus, builder.generator().config(), builder.policy())?;
        let location = self.location(&key);

        if let Some(index) = self.load(&key)? {
            info!(
                key = %key,
                queries = index.query_count(),
                samples = index.sample_count(),
                "ground_truth_cache_hit"
            );
            return Ok(CachedGroundTruth {
                index,
                key,
                location,
                hit: true,
                diagnostics: None,
            });
        }

        info!(key = %key, corpus = %corpus.display(), "ground_truth_cache_miss");
        let (index, diagnostics) = builder.build_with_diagnostics(corpus)?;

        fs::create_dir_all(&self.data_dir).map_err(|e| IndexError::io(&self.data_dir, e))?;
        fs::create_dir(&location).map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => IndexError::CacheExists(location.clone()),
            _ => IndexError::io(&location, e),
        })?;

        let store = RedbStore::create(location.join(STORE_FILE))?;
        if let Err(err) = index.persist(&store) {
            warn!(key = %key, error = %err, "ground_truth_persist_failed");
            return Err(err);
        }
        info!(key = %key, location = %location.display(), "ground_truth_persisted");

        Ok(CachedGroundTruth {
            index,
            key,
            location,
            hit: false,
            diagnostics: Some(diagnostics),
        })
    }

    /// Remove every cached index of `corpus` at `bits`, whatever mode, policy
    /// or shingle size it was built with. Returns whether anything was removed.
    pub fn invalidate(&self, corpus: &Path, bits: Bits) -> Result<bool, IndexError> {
        let prefix = CacheKey::prefix(&corpus_digest(corpus)?, bits);
        let entries = match fs::read_dir(&self.data_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(IndexError::io(&self.data_dir, e)),
        };

        let mut removed = false;
        for entry in entries {
            let entry = entry.map_err(|e| IndexError::io(&self.data_dir, e))?;
            let name = entry.file_name();
            if !name.to_string_lossy().starts_with(&prefix) {
                continue;
            }
            let location = entry.path();
            match fs::remove_dir_all(&location) {
                Ok(()) => {
                    info!(key = %name.to_string_lossy(), "ground_truth_cache_invalidated");
                    removed = true;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(IndexError::io(location, e)),
            }
        }
        Ok(removed)
    }
}
