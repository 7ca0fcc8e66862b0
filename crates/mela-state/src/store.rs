//! StateStore: redb-backed persistence for Mela documents.
//!
//! Every document type owns one table (see [`Document`]); the generic
//! operations below work on any of them. Resource-specific lookups that
//! handlers need live in the per-resource sections further down.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::{ALL_TABLES, COUNTERS, CROWD_SEQ, Document};
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

fn encode<D: Document>(doc: &D) -> StateResult<Vec<u8>> {
    serde_json::to_vec(doc).map_err(map_err!(Serialize))
}

fn decode<D: Document>(bytes: &[u8]) -> StateResult<D> {
    serde_json::from_slice(bytes).map_err(map_err!(Deserialize))
}

/// Thread-safe document store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        for table in ALL_TABLES {
            txn.open_table(table).map_err(map_err!(Table))?;
        }
        txn.open_table(COUNTERS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Documents ──────────────────────────────────────────────────

    /// Insert or replace a document under its key.
    pub fn put<D: Document>(&self, doc: &D) -> StateResult<()> {
        let key = doc.key();
        let value = encode(doc)?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(D::TABLE).map_err(map_err!(Table))?;
            table.insert(key, value.as_slice()).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(kind = D::KIND, %key, "document stored");
        Ok(())
    }

    /// Insert a document only if its key is free. Returns false on conflict.
    pub fn insert_new<D: Document>(&self, doc: &D) -> StateResult<bool> {
        let key = doc.key();
        let value = encode(doc)?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(D::TABLE).map_err(map_err!(Table))?;
            let taken = table.get(key).map_err(map_err!(Read))?.is_some();
            if taken {
                debug!(kind = D::KIND, %key, "key already taken");
                return Ok(false);
            }
            table.insert(key, value.as_slice()).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(kind = D::KIND, %key, "document created");
        Ok(true)
    }

    pub fn get<D: Document>(&self, key: &str) -> StateResult<Option<D>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(D::TABLE).map_err(map_err!(Table))?;
        match table.get(key).map_err(map_err!(Read))? {
            Some(guard) => Ok(Some(decode(guard.value())?)),
            None => Ok(None),
        }
    }

    /// List every document of a type, in key order.
    pub fn list<D: Document>(&self) -> StateResult<Vec<D>> {
        self.list_where(|_: &D| true)
    }

    /// List the documents of a type that satisfy `keep`.
    pub fn list_where<D: Document>(&self, keep: impl Fn(&D) -> bool) -> StateResult<Vec<D>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(D::TABLE).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let doc: D = decode(value.value())?;
            if keep(&doc) {
                results.push(doc);
            }
        }
        Ok(results)
    }

    /// Read-modify-write a document in one transaction.
    /// Returns the updated document, or `None` if the key is absent.
    pub fn modify<D: Document>(&self, key: &str, f: impl FnOnce(&mut D)) -> StateResult<Option<D>> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let updated = {
            let mut table = txn.open_table(D::TABLE).map_err(map_err!(Table))?;
            let current = table
                .get(key)
                .map_err(map_err!(Read))?
                .map(|guard| guard.value().to_vec());
            match current {
                Some(bytes) => {
                    let mut doc: D = decode(&bytes)?;
                    f(&mut doc);
                    let value = encode(&doc)?;
                    table.insert(key, value.as_slice()).map_err(map_err!(Write))?;
                    Some(doc)
                }
                None => None,
            }
        };
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(kind = D::KIND, %key, found = updated.is_some(), "document modified");
        Ok(updated)
    }

    /// Delete a document by key, returning it if it existed.
    pub fn delete<D: Document>(&self, key: &str) -> StateResult<Option<D>> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let removed = {
            let mut table = txn.open_table(D::TABLE).map_err(map_err!(Table))?;
            table
                .remove(key)
                .map_err(map_err!(Write))?
                .map(|guard| guard.value().to_vec())
        };
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(kind = D::KIND, %key, existed = removed.is_some(), "document deleted");
        removed.map(|bytes| decode(&bytes)).transpose()
    }

    // ── Locations ──────────────────────────────────────────────────

    pub fn find_location_by_name(&self, name: &str) -> StateResult<Option<Location>> {
        Ok(self
            .list_where(|l: &Location| l.name == name)?
            .into_iter()
            .next())
    }

    // ── Crowd data ─────────────────────────────────────────────────

    /// Store a new reading, stamping it with the next insertion sequence
    /// in the same transaction.
    pub fn record_crowd(&self, reading: &mut CrowdData) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut counters = txn.open_table(COUNTERS).map_err(map_err!(Table))?;
            let last = counters
                .get(CROWD_SEQ)
                .map_err(map_err!(Read))?
                .map(|guard| guard.value())
                .unwrap_or(0);
            reading.seq = last + 1;
            counters
                .insert(CROWD_SEQ, reading.seq)
                .map_err(map_err!(Write))?;

            let value = encode(reading)?;
            let mut table = txn.open_table(CrowdData::TABLE).map_err(map_err!(Table))?;
            table
                .insert(reading.id.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(id = %reading.id, seq = reading.seq, "crowd reading recorded");
        Ok(())
    }

    /// Readings for one location, newest first.
    pub fn crowd_history(&self, location_id: &str) -> StateResult<Vec<CrowdData>> {
        let mut history = self.list_where(|c: &CrowdData| c.location_id == location_id)?;
        history.sort_by_key(|c| std::cmp::Reverse(c.recency()));
        Ok(history)
    }

    /// The most recent reading of every location that has one.
    pub fn latest_crowd_per_location(&self) -> StateResult<Vec<CrowdData>> {
        let mut latest: HashMap<String, CrowdData> = HashMap::new();
        for reading in self.list::<CrowdData>()? {
            match latest.get(&reading.location_id) {
                Some(seen) if seen.recency() >= reading.recency() => {}
                _ => {
                    latest.insert(reading.location_id.clone(), reading);
                }
            }
        }
        let mut readings: Vec<CrowdData> = latest.into_values().collect();
        readings.sort_by_key(|c| std::cmp::Reverse(c.recency()));
        Ok(readings)
    }

    // ── Devotee timing ─────────────────────────────────────────────

    /// The latest visit of a devotee to a zone that has no exit yet.
    pub fn open_timing(&self, devotee_id: &str, zone: &str) -> StateResult<Option<DevoteeTiming>> {
        Ok(self
            .list_where(|t: &DevoteeTiming| {
                t.devotee_id == devotee_id && t.zone == zone && t.is_open()
            })?
            .into_iter()
            .max_by_key(|t| t.entry_time))
    }

    // ── Routes ─────────────────────────────────────────────────────

    pub fn find_route(&self, name: &str, from: &str, to: &str) -> StateResult<Option<RouteStatus>> {
        Ok(self
            .list_where(|r: &RouteStatus| r.name == name && r.from == from && r.to == to)?
            .into_iter()
            .next())
    }
}
