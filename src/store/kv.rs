//! Shared key-value store backed by redb.
//!
//! All queue instances in the process multiplex one ordered store and
//! partition its keyspace by `id/version/` prefixes. Point operations and
//! scans take the read lock; [`SharedStore::compact`] needs exclusive access
//! to the database handle and takes the write lock.

use parking_lot::RwLock;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::constants;
use crate::error::StoreError;

/// Table holding spilled events keyed by `"{id}/{version}/{seq}"`.
const EVENTS_TABLE: TableDefinition<'static, &'static str, &'static [u8]> =
    TableDefinition::new("events");

/// Process-wide ordered key-value store.
///
/// `SharedStore` is `Clone` and safe to use from many threads; redb
/// serializes writers internally. Keys are byte-comparable strings, so
/// lexicographic scan order equals FIFO order within a queue's namespace.
#[derive(Clone)]
pub struct SharedStore {
    db: Arc<RwLock<Database>>,
}

impl SharedStore {
    /// Open or create the store inside the given holding area.
    ///
    /// The store must be allowed to fill the device; out-of-space errors
    /// surface from the individual operations, not from here.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Fatal`] if the directory cannot be created or
    /// the database cannot be opened; without a backing store the queue
    /// subsystem cannot function.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(dir).map_err(StoreError::fatal)?;

        let path = dir.join(constants::STORE_FILE);
        let db = Database::create(&path).map_err(StoreError::fatal)?;

        // Create the table up front so reads never see a missing table.
        let write_txn = db.begin_write().map_err(StoreError::fatal)?;
        {
            let _table = write_txn
                .open_table(EVENTS_TABLE)
                .map_err(StoreError::fatal)?;
        }
        write_txn.commit().map_err(StoreError::fatal)?;

        Ok(Self {
            db: Arc::new(RwLock::new(db)),
        })
    }

    /// Insert or overwrite a key.
    pub fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let db = self.db.read();
        let write_txn = db
            .begin_write()
            .map_err(|e| StoreError::transient("put", e))?;
        {
            let mut table = write_txn
                .open_table(EVENTS_TABLE)
                .map_err(|e| StoreError::transient("put", e))?;
            table
                .insert(key, value)
                .map_err(|e| StoreError::transient("put", e))?;
        }
        write_txn
            .commit()
            .map_err(|e| StoreError::transient("put", e))?;
        Ok(())
    }

    /// Point lookup.
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let db = self.db.read();
        let read_txn = db
            .begin_read()
            .map_err(|e| StoreError::transient("get", e))?;
        let table = read_txn
            .open_table(EVENTS_TABLE)
            .map_err(|e| StoreError::transient("get", e))?;
        let value = table
            .get(key)
            .map_err(|e| StoreError::transient("get", e))?;
        Ok(value.map(|guard| guard.value().to_vec()))
    }

    /// Remove a key. Returns whether it existed.
    pub fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let db = self.db.read();
        let write_txn = db
            .begin_write()
            .map_err(|e| StoreError::transient("delete", e))?;
        let removed = {
            let mut table = write_txn
                .open_table(EVENTS_TABLE)
                .map_err(|e| StoreError::transient("delete", e))?;
            table
                .remove(key)
                .map_err(|e| StoreError::transient("delete", e))?
                .is_some()
        };
        write_txn
            .commit()
            .map_err(|e| StoreError::transient("delete", e))?;
        Ok(removed)
    }

    /// Collect the `(key, value)` pairs whose keys start with `prefix`, in
    /// lexicographic order. The scan opens at `prefix` and stops at the
    /// first key outside it.
    pub fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        let db = self.db.read();
        let read_txn = db
            .begin_read()
            .map_err(|e| StoreError::transient("scan", e))?;
        let table = read_txn
            .open_table(EVENTS_TABLE)
            .map_err(|e| StoreError::transient("scan", e))?;

        let mut pairs = Vec::new();
        for item in table
            .range::<&str>(prefix..)
            .map_err(|e| StoreError::transient("scan", e))?
        {
            let (key, value) = item.map_err(|e| StoreError::transient("scan", e))?;
            let key = key.value();
            if !key.starts_with(prefix) {
                break;
            }
            pairs.push((key.to_string(), value.value().to_vec()));
        }
        Ok(pairs)
    }

    /// Delete every key starting with `prefix` in one transaction.
    /// Returns the number of keys removed.
    pub fn purge_prefix(&self, prefix: &str) -> Result<usize, StoreError> {
        let db = self.db.read();
        let write_txn = db
            .begin_write()
            .map_err(|e| StoreError::transient("purge", e))?;
        let removed = {
            let mut table = write_txn
                .open_table(EVENTS_TABLE)
                .map_err(|e| StoreError::transient("purge", e))?;

            let mut doomed = Vec::new();
            {
                let range = table
                    .range::<&str>(prefix..)
                    .map_err(|e| StoreError::transient("purge", e))?;
                for item in range {
                    let (key, _) = item.map_err(|e| StoreError::transient("purge", e))?;
                    let key = key.value();
                    if !key.starts_with(prefix) {
                        break;
                    }
                    doomed.push(key.to_string());
                }
            }
            for key in &doomed {
                table
                    .remove(key.as_str())
                    .map_err(|e| StoreError::transient("purge", e))?;
            }
            doomed.len()
        };
        write_txn
            .commit()
            .map_err(|e| StoreError::transient("purge", e))?;
        Ok(removed)
    }

    /// Reclaim space from deleted entries. May block other store traffic
    /// briefly while it holds the exclusive handle.
    pub fn compact(&self) -> Result<bool, StoreError> {
        let mut db = self.db.write();
        db.compact().map_err(|e| StoreError::transient("compact", e))
    }
}
