//! # Ground-truth index
//!
//! This crate turns a labeled corpus into the reference data a matching
//! benchmark is scored against, and keeps that reference data on disk so it
//! is only computed once per corpus.
//!
//! ## Corpus layout
//!
//! ```text
//! corpus/
//!   cluster-a/          # a cluster: near-duplicates of one another
//!     000_original.txt  # first file in sorted order is the query
//!     001_edited.txt    # members: the query's true positives
//!   cluster-b/
//!     ...
//!   loose-file.txt      # a distractor: must not match anything
//! ```
//!
//! ## Core types
//!
//! - [`GroundTruthIndex`]: query fingerprint → ordered true-positive list,
//!   plus the distractor pool.
//! - [`GroundTruthBuilder`]: scans a corpus with a
//!   [`fingerprint::CodeGenerator`] and assembles the index.
//! - [`GroundTruthStore`]: key-ordered persistent mapping. Keys are the tagged
//!   union [`StoreKey`], so the distractor pool can never collide with a real
//!   fingerprint.
//! - [`GroundTruthCache`]: content-addressed cache of built indexes.
//!
//! ## Example
//!
//! ```
//! use fingerprint::{Bits, Fingerprint};
//! use index::{GroundTruthIndex, GroundTruthStore, InMemoryStore};
//!
//! let q = Fingerprint::from_lanes(&[0xff00]).unwrap();
//! let m = Fingerprint::from_lanes(&[0xff01]).unwrap();
//!
//! let mut index = GroundTruthIndex::new(Bits::B64, None);
//! index.insert_cluster(q.clone(), vec![m.clone()]).unwrap();
//!
//! let store = InMemoryStore::new();
//! index.persist(&store).unwrap();
//! let loaded = GroundTruthIndex::load(&store).unwrap();
//! assert_eq!(loaded.relevant(&q), Some(&[m][..]));
//! ```

mod backend;
pub mod builder;
#[cfg(feature = "backend-redb")]
pub mod cache;
pub mod corpus;

use std::collections::BTreeMap;
use std::path::PathBuf;

use bincode::config::standard;
use bincode::error::{DecodeError, EncodeError};
use bincode::serde::{decode_from_slice, encode_to_vec};
use fingerprint::{Bits, Fingerprint, FingerprintError, PerceptualMode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "backend-redb")]
pub use backend::RedbStore;
pub use backend::{GroundTruthStore, InMemoryStore};
pub use builder::{BuildDiagnostics, GroundTruthBuilder, QueryFailurePolicy, SkippedFile};
#[cfg(feature = "backend-redb")]
pub use cache::{CacheKey, CachedGroundTruth, GroundTruthCache};

/// Whether this build carries the redb store and the on-disk cache.
pub const REDB_BACKEND: bool = cfg!(feature = "backend-redb");

/// Bump this value whenever the persisted layout changes.
pub const INDEX_SCHEMA_VERSION: u16 = 1;

/// Key of a persisted ground-truth entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StoreKey {
    /// A cluster's query; the value is its true-positive list.
    Query(Fingerprint),
    /// The shared pool of distractor fingerprints.
    DistractorPool,
}

/// Metadata record describing a persisted index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMeta {
    pub schema_version: u16,
    pub bits: Bits,
    #[serde(default)]
    pub mode: Option<PerceptualMode>,
}

/// Errors raised by the index, store backends, builder and cache.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("serialization encode error: {0}")]
    Encode(String),
    #[error("serialization decode error: {0}")]
    Decode(String),
    #[error("i/o error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corpus directory not found: {}", .0.display())]
    CorpusNotFound(PathBuf),
    #[error("corrupt ground-truth store at {}: {reason}", path.display())]
    CorruptStore { path: PathBuf, reason: String },
    #[error("cache location already exists: {}", .0.display())]
    CacheExists(PathBuf),
    #[error("fingerprint has {found} bits, index holds {expected}-bit codes")]
    BitsMismatch { expected: Bits, found: Bits },
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),
}

impl From<EncodeError> for IndexError {
    fn from(e: EncodeError) -> Self {
        IndexError::Encode(e.to_string())
    }
}

impl From<DecodeError> for IndexError {
    fn from(e: DecodeError) -> Self {
        IndexError::Decode(e.to_string())
    }
}

impl IndexError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub(crate) fn encode_list(values: &[Fingerprint]) -> Result<Vec<u8>, IndexError> {
    Ok(encode_to_vec(values, standard())?)
}

pub(crate) fn decode_list(data: &[u8]) -> Result<Vec<Fingerprint>, IndexError> {
    let (values, _) = decode_from_slice(data, standard())?;
    Ok(values)
}

/// Queries with their true positives, plus the distractor pool.
///
/// Every fingerprint in an index has the same bit length; inserts of any
/// other length are rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundTruthIndex {
    bits: Bits,
    mode: Option<PerceptualMode>,
    queries: BTreeMap<Fingerprint, Vec<Fingerprint>>,
    distractors: Vec<Fingerprint>,
}

impl GroundTruthIndex {
    pub fn new(bits: Bits, mode: Option<PerceptualMode>) -> Self {
        Self {
            bits,
            mode,
            queries: BTreeMap::new(),
            distractors: Vec::new(),
        }
    }

    pub fn bits(&self) -> Bits {
        self.bits
    }

    pub fn mode(&self) -> Option<PerceptualMode> {
        self.mode
    }

    fn check(&self, fp: &Fingerprint) -> Result<(), IndexError> {
        if fp.bits() != self.bits {
            return Err(IndexError::BitsMismatch {
                expected: self.bits,
                found: fp.bits(),
            });
        }
        Ok(())
    }

    /// Record a cluster. Returns the members of a previous cluster that had
    /// the same query fingerprint; the new cluster replaces it.
    pub fn insert_cluster(
        &mut self,
        query: Fingerprint,
        members: Vec<Fingerprint>,
    ) -> Result<Option<Vec<Fingerprint>>, IndexError> {
        self.check(&query)?;
        for member in &members {
            self.check(member)?;
        }
        Ok(self.queries.insert(query, members))
    }

    pub fn push_distractor(&mut self, fp: Fingerprint) -> Result<(), IndexError> {
        self.check(&fp)?;
        self.distractors.push(fp);
        Ok(())
    }

    /// Queries in key order with their true positives.
    pub fn queries(&self) -> impl Iterator<Item = (&Fingerprint, &[Fingerprint])> {
        self.queries.iter().map(|(q, rel)| (q, rel.as_slice()))
    }

    pub fn relevant(&self, query: &Fingerprint) -> Option<&[Fingerprint]> {
        self.queries.get(query).map(Vec::as_slice)
    }

    pub fn distractors(&self) -> &[Fingerprint] {
        &self.distractors
    }

    pub fn query_count(&self) -> usize {
        self.queries.len()
    }

    /// Total fingerprints held in value lists: true positives plus distractors.
    pub fn sample_count(&self) -> usize {
        self.queries.values().map(Vec::len).sum::<usize>() + self.distractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty() && self.distractors.is_empty()
    }

    pub fn meta(&self) -> StoreMeta {
        StoreMeta {
            schema_version: INDEX_SCHEMA_VERSION,
            bits: self.bits,
            mode: self.mode,
        }
    }

    /// Write the whole index to `store`.
    ///
    /// Entries go out in one batch; the metadata record is written last, so
    /// a store without metadata is an interrupted write.
    pub fn persist(&self, store: &dyn GroundTruthStore) -> Result<(), IndexError> {
        let mut entries = Vec::with_capacity(self.queries.len() + 1);
        for (query, relevant) in &self.queries {
            entries.push((StoreKey::Query(query.clone()), relevant.clone()));
        }
        entries.push((StoreKey::DistractorPool, self.distractors.clone()));
        store.batch_put(entries)?;
        store.put_meta(&self.meta())?;
        store.flush()
    }

    /// Read a complete index back from `store`.
    pub fn load(store: &dyn GroundTruthStore) -> Result<Self, IndexError> {
        let meta = store
            .meta()?
            .ok_or_else(|| IndexError::Decode("store has no metadata record".into()))?;
        if meta.schema_version != INDEX_SCHEMA_VERSION {
            return Err(IndexError::Decode(format!(
                "unsupported schema version {}",
                meta.schema_version
            )));
        }

        let mut index = Self::new(meta.bits, meta.mode);
        store.scan(&mut |key: StoreKey, values: Vec<Fingerprint>| {
            match key {
                StoreKey::Query(query) => {
                    index.insert_cluster(query, values)?;
                }
                StoreKey::DistractorPool => {
                    for fp in values {
                        index.push_distractor(fp)?;
                    }
                }
            }
            Ok(())
        })?;
        Ok(index)
    }
}
