//! Settlement store
//!
//! The in-memory directory of settlement records.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::SettlementRecord;

/// Thread-safe store of settlement records
///
/// ## Policy:
/// - One record per client id, a later `add` for the same id replaces it
/// - Snapshots are ordered by ascending client id
///
/// ## Concurrency:
/// - `records`: Protected by RwLock (concurrent snapshots, exclusive writers)
/// - A snapshot clones under the read guard, so it never sees a half-applied write
#[derive(Debug, Default)]
pub struct Registry {
    records: RwLock<BTreeMap<u32, SettlementRecord>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record of `record.client_id`
    ///
    /// Returns the replaced record, if any.
    pub fn add(&self, record: SettlementRecord) -> Option<SettlementRecord> {
        self.records.write().insert(record.client_id, record)
    }

    /// Replace the record of `record.client_id` only if the stored one has the same name
    pub fn update(&self, record: SettlementRecord) -> bool {
        let mut records = self.records.write();
        match records.get_mut(&record.client_id) {
            Some(existing) if existing.name == record.name => {
                *existing = record;
                true
            }
            _ => false,
        }
    }

    /// Remove the record of `client_id` only if its name matches
    pub fn remove_named(&self, client_id: u32, name: &str) -> bool {
        let mut records = self.records.write();
        let matches = records
            .get(&client_id)
            .map(|r| r.name == name)
            .unwrap_or(false);
        if matches {
            records.remove(&client_id);
        }
        matches
    }

    /// Remove every record owned by `client_id`
    ///
    /// Returns how many records were dropped.
    pub fn remove_by_client(&self, client_id: u32) -> usize {
        self.records.write().remove(&client_id).map_or(0, |_| 1)
    }

    /// Record owned by `client_id`, if any
    pub fn get(&self, client_id: u32) -> Option<SettlementRecord> {
        self.records.read().get(&client_id).cloned()
    }

    /// Point-in-time copy of all records, ordered by client id
    pub fn snapshot(&self) -> Vec<SettlementRecord> {
        self.records.read().values().cloned().collect()
    }

    /// Number of stored records
    pub fn count(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}
