//! Redb (Rust embedded database) backend for persisted ground truth.
//!
//! Queries, pools and metadata live in separate tables, so the distractor
//! pool is addressed in its own namespace and can never be confused with a
//! fingerprint key.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fingerprint::Fingerprint;
use redb::{Database, ReadableTable, TableDefinition};

use crate::{decode_list, encode_list, GroundTruthStore, IndexError, StoreKey, StoreMeta};

/// Query fingerprint bytes → encoded true-positive list.
const QUERIES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("ground_truth_queries");
/// Pool name → encoded fingerprint list.
const POOLS: TableDefinition<&str, &[u8]> = TableDefinition::new("ground_truth_pools");
/// Metadata key → JSON.
const META: TableDefinition<&str, &[u8]> = TableDefinition::new("ground_truth_meta");

const DISTRACTOR_POOL: &str = "distractors";
const META_KEY: &str = "store";

/// Redb-backed [`GroundTruthStore`].
///
/// Every write is its own ACID transaction; `batch_put` commits all entries
/// in a single one.
pub struct RedbStore {
    db: Arc<Database>,
    path: PathBuf,
}

impl RedbStore {
    /// Create a new database at `path` (or open an existing one) and make
    /// sure all tables exist.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, IndexError> {
        let path = path.as_ref();
        let db = Database::create(path).map_err(IndexError::backend)?;

        let write_txn = db.begin_write().map_err(IndexError::backend)?;
        {
            // Accessing a table creates it if it doesn't exist
            write_txn.open_table(QUERIES).map_err(IndexError::backend)?;
            write_txn.open_table(POOLS).map_err(IndexError::backend)?;
            write_txn.open_table(META).map_err(IndexError::backend)?;
        }
        write_txn.commit().map_err(IndexError::backend)?;

        Ok(Self {
            db: Arc::new(db),
            path: path.to_path_buf(),
        })
    }

    /// Open a database that must already exist with all of its tables.
    ///
    /// Anything unexpected is reported as [`IndexError::CorruptStore`].
    pub fn open_existing<P: AsRef<Path>>(path: P) -> Result<Self, IndexError> {
        let path = path.as_ref();
        let corrupt = |reason: String| IndexError::CorruptStore {
            path: path.to_path_buf(),
            reason,
        };

        let db = Database::open(path).map_err(|e| corrupt(e.to_string()))?;
        {
            let read_txn = db.begin_read().map_err(|e| corrupt(e.to_string()))?;
            read_txn
                .open_table(QUERIES)
                .map_err(|e| corrupt(e.to_string()))?;
            read_txn
                .open_table(POOLS)
                .map_err(|e| corrupt(e.to_string()))?;
            read_txn
                .open_table(META)
                .map_err(|e| corrupt(e.to_string()))?;
        }

        Ok(Self {
            db: Arc::new(db),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GroundTruthStore for RedbStore {
    fn get(&self, key: &StoreKey) -> Result<Option<Vec<Fingerprint>>, IndexError> {
        let read_txn = self.db.begin_read().map_err(IndexError::backend)?;
        let raw = match key {
            StoreKey::Query(query) => {
                let table = read_txn.open_table(QUERIES).map_err(IndexError::backend)?;
                let value = table
                    .get(query.as_bytes())
                    .map_err(IndexError::backend)?;
                value.map(|v| v.value().to_vec())
            }
            StoreKey::DistractorPool => {
                let table = read_txn.open_table(POOLS).map_err(IndexError::backend)?;
                let value = table.get(DISTRACTOR_POOL).map_err(IndexError::backend)?;
                value.map(|v| v.value().to_vec())
            }
        };
        raw.map(|bytes| decode_list(&bytes)).transpose()
    }

    fn put(&self, key: &StoreKey, values: &[Fingerprint]) -> Result<(), IndexError> {
        self.batch_put(vec![(key.clone(), values.to_vec())])
    }

    fn batch_put(&self, entries: Vec<(StoreKey, Vec<Fingerprint>)>) -> Result<(), IndexError> {
        let write_txn = self.db.begin_write().map_err(IndexError::backend)?;
        {
            let mut queries = write_txn.open_table(QUERIES).map_err(IndexError::backend)?;
            let mut pools = write_txn.open_table(POOLS).map_err(IndexError::backend)?;

            for (key, values) in entries {
                let encoded = encode_list(&values)?;
                match key {
                    StoreKey::Query(query) => {
                        queries
                            .insert(query.as_bytes(), encoded.as_slice())
                            .map_err(IndexError::backend)?;
                    }
                    StoreKey::DistractorPool => {
                        pools
                            .insert(DISTRACTOR_POOL, encoded.as_slice())
                            .map_err(IndexError::backend)?;
                    }
                }
            }
        }
        write_txn.commit().map_err(IndexError::backend)?;
        Ok(())
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(StoreKey, Vec<Fingerprint>) -> Result<(), IndexError>,
    ) -> Result<(), IndexError> {
        let read_txn = self.db.begin_read().map_err(IndexError::backend)?;

        let queries = read_txn.open_table(QUERIES).map_err(IndexError::backend)?;
        for item in queries.iter().map_err(IndexError::backend)? {
            let (key, value) = item.map_err(IndexError::backend)?;
            let query = Fingerprint::from_bytes(key.value().to_vec())?;
            visitor(StoreKey::Query(query), decode_list(value.value())?)?;
        }

        let pools = read_txn.open_table(POOLS).map_err(IndexError::backend)?;
        for item in pools.iter().map_err(IndexError::backend)? {
            let (name, value) = item.map_err(IndexError::backend)?;
            if name.value() != DISTRACTOR_POOL {
                return Err(IndexError::Decode(format!(
                    "unknown pool `{}`",
                    name.value()
                )));
            }
            visitor(StoreKey::DistractorPool, decode_list(value.value())?)?;
        }

        Ok(())
    }

    fn meta(&self) -> Result<Option<StoreMeta>, IndexError> {
        let read_txn = self.db.begin_read().map_err(IndexError::backend)?;
        let table = read_txn.open_table(META).map_err(IndexError::backend)?;
        match table.get(META_KEY).map_err(IndexError::backend)? {
            Some(value) => serde_json::from_slice(value.value())
                .map(Some)
                .map_err(|e| IndexError::Decode(e.to_string())),
            None => Ok(None),
        }
    }

    fn put_meta(&self, meta: &StoreMeta) -> Result<(), IndexError> {
        let payload = serde_json::to_vec(meta).map_err(|e| IndexError::Encode(e.to_string()))?;
        let write_txn = self.db.begin_write().map_err(IndexError::backend)?;
        {
            let mut table = write_txn.open_table(META).map_err(IndexError::backend)?;
            table
                .insert(META_KEY, payload.as_slice())
                .map_err(IndexError::backend)?;
        }
        write_txn.commit().map_err(IndexError::backend)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), IndexError> {
        // Redb commits are durable on return, so there is nothing to flush.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fingerprint::Bits;
    use tempfile::tempdir;

    fn fp(v: u64) -> Fingerprint {
        Fingerprint::from_lanes(&[v]).unwrap()
    }

    #[test]
    fn roundtrip_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gt.redb");
        {
            let store = RedbStore::create(&path).unwrap();
            store.put(&StoreKey::Query(fp(1)), &[fp(2), fp(3)]).unwrap();
            store.append(&StoreKey::DistractorPool, fp(9)).unwrap();
            store
                .put_meta(&StoreMeta {
                    schema_version: crate::INDEX_SCHEMA_VERSION,
                    bits: Bits::B64,
                    mode: None,
                })
                .unwrap();
        }

        let store = RedbStore::open_existing(&path).unwrap();
        assert_eq!(
            store.get(&StoreKey::Query(fp(1))).unwrap(),
            Some(vec![fp(2), fp(3)])
        );
        assert_eq!(
            store.get(&StoreKey::DistractorPool).unwrap(),
            Some(vec![fp(9)])
        );
        assert_eq!(store.get(&StoreKey::Query(fp(2))).unwrap(), None);
        assert_eq!(store.meta().unwrap().unwrap().bits, Bits::B64);
    }

    #[test]
    fn scan_visits_queries_then_pool() {
        let dir = tempdir().unwrap();
        let store = RedbStore::create(dir.path().join("gt.redb")).unwrap();
        store
            .batch_put(vec![
                (StoreKey::DistractorPool, vec![fp(7)]),
                (StoreKey::Query(fp(5)), vec![]),
                (StoreKey::Query(fp(4)), vec![fp(6)]),
            ])
            .unwrap();

        let mut keys = Vec::new();
        store
            .scan(&mut |key: StoreKey, _values: Vec<Fingerprint>| {
                keys.push(key);
                Ok(())
            })
            .unwrap();
        assert_eq!(
            keys,
            vec![
                StoreKey::Query(fp(4)),
                StoreKey::Query(fp(5)),
                StoreKey::DistractorPool,
            ]
        );
    }

    #[test]
    fn garbage_file_is_reported_as_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gt.redb");
        std::fs::write(&path, b"definitely not a redb file").unwrap();
        assert!(matches!(
            RedbStore::open_existing(&path),
            Err(IndexError::CorruptStore { .. })
        ));
    }
}
