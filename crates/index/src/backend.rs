use std::collections::BTreeMap;
use std::sync::RwLock;

use fingerprint::Fingerprint;

use crate::{IndexError, StoreKey, StoreMeta};

/// Key-ordered persistent mapping that holds a ground-truth index.
/// This allows for different storage implementations (in-memory, redb).
pub trait GroundTruthStore: Send + Sync {
    /// Retrieve the fingerprint list stored under `key`.
    fn get(&self, key: &StoreKey) -> Result<Option<Vec<Fingerprint>>, IndexError>;
    /// Insert or replace the list stored under `key`.
    fn put(&self, key: &StoreKey, values: &[Fingerprint]) -> Result<(), IndexError>;
    /// Append one fingerprint to the list under `key` (read-modify-write).
    ///
    /// Not atomic across crashes; bulk writers should prefer [`Self::batch_put`].
    fn append(&self, key: &StoreKey, value: Fingerprint) -> Result<(), IndexError> {
        let mut current = self.get(key)?.unwrap_or_default();
        current.push(value);
        self.put(key, &current)
    }
    /// Insert or replace many entries at once.
    fn batch_put(&self, entries: Vec<(StoreKey, Vec<Fingerprint>)>) -> Result<(), IndexError>;
    /// Visit every entry in key order: queries by fingerprint bytes, then the pool.
    fn scan(
        &self,
        visitor: &mut dyn FnMut(StoreKey, Vec<Fingerprint>) -> Result<(), IndexError>,
    ) -> Result<(), IndexError>;
    /// Metadata describing the stored index, if it has been written.
    fn meta(&self) -> Result<Option<StoreMeta>, IndexError>;
    /// Write the metadata record.
    fn put_meta(&self, meta: &StoreMeta) -> Result<(), IndexError>;
    /// Flush any buffered writes to the backend.
    fn flush(&self) -> Result<(), IndexError> {
        Ok(())
    }
}

/// An in-memory store using a `RwLock` around a `BTreeMap`.
#[derive(Default)]
pub struct InMemoryStore {
    entries: RwLock<BTreeMap<StoreKey, Vec<Fingerprint>>>,
    meta: RwLock<Option<StoreMeta>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> IndexError {
    IndexError::backend("poisoned lock")
}

impl GroundTruthStore for InMemoryStore {
    fn get(&self, key: &StoreKey) -> Result<Option<Vec<Fingerprint>>, IndexError> {
        let guard = self.entries.read().map_err(poisoned)?;
        Ok(guard.get(key).cloned())
    }

    fn put(&self, key: &StoreKey, values: &[Fingerprint]) -> Result<(), IndexError> {
        self.entries
            .write()
            .map_err(poisoned)?
            .insert(key.clone(), values.to_vec());
        Ok(())
    }

    fn batch_put(&self, entries: Vec<(StoreKey, Vec<Fingerprint>)>) -> Result<(), IndexError> {
        // A single write lock is held for the entire batch insert.
        let mut guard = self.entries.write().map_err(poisoned)?;
        for (key, values) in entries {
            guard.insert(key, values);
        }
        Ok(())
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(StoreKey, Vec<Fingerprint>) -> Result<(), IndexError>,
    ) -> Result<(), IndexError> {
        let guard = self.entries.read().map_err(poisoned)?;
        for (key, values) in guard.iter() {
            visitor(key.clone(), values.clone())?;
        }
        Ok(())
    }

    fn meta(&self) -> Result<Option<StoreMeta>, IndexError> {
        Ok(self.meta.read().map_err(poisoned)?.clone())
    }

    fn put_meta(&self, meta: &StoreMeta) -> Result<(), IndexError> {
        *self.meta.write().map_err(poisoned)? = Some(meta.clone());
        Ok(())
    }
}

/// The redb backend: one database file per cached index.
#[cfg(feature = "backend-redb")]
pub mod redb;

#[cfg(feature = "backend-redb")]
pub use self::redb::RedbStore;

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(v: u64) -> Fingerprint {
        Fingerprint::from_lanes(&[v]).unwrap()
    }

    #[test]
    fn append_grows_the_list_in_order() {
        let store = InMemoryStore::new();
        let key = StoreKey::Query(fp(1));
        store.append(&key, fp(2)).unwrap();
        store.append(&key, fp(3)).unwrap();
        store.append(&StoreKey::DistractorPool, fp(4)).unwrap();

        assert_eq!(store.get(&key).unwrap(), Some(vec![fp(2), fp(3)]));
        assert_eq!(store.get(&StoreKey::DistractorPool).unwrap(), Some(vec![fp(4)]));
    }

    #[test]
    fn pool_key_never_shadows_a_query() {
        let store = InMemoryStore::new();
        // An all-zero fingerprint is the most "sentinel-like" value there is.
        let zero = StoreKey::Query(fp(0));
        store.put(&zero, &[fp(1)]).unwrap();
        store.put(&StoreKey::DistractorPool, &[fp(2)]).unwrap();

        let mut seen = Vec::new();
        store
            .scan(&mut |key: StoreKey, values: Vec<Fingerprint>| {
                seen.push((key, values));
                Ok(())
            })
            .unwrap();
        assert_eq!(
            seen,
            vec![
                (zero, vec![fp(1)]),
                (StoreKey::DistractorPool, vec![fp(2)]),
            ]
        );
    }
}
