// Recent question/answer history, persisted through local storage
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::StorageError;
use crate::local_storage::LocalStorage;

pub const HISTORY_KEY: &str = "queryHistory";
pub const HISTORY_CAPACITY: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRecord {
    pub query: String,
    pub response: String,
}

pub struct History {
    storage: LocalStorage,
    items: Vec<QueryRecord>,
    cap: usize,
}

impl History {
    /// Reads the stored sequence, keeping only the newest `HISTORY_CAPACITY` entries.
    pub fn load(storage: LocalStorage) -> Self {
        let mut items: Vec<QueryRecord> = match storage.get_item(HISTORY_KEY) {
            Some(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
                warn!(error = %e, "stored history is not a valid record list, ignoring it");
                Vec::new()
            }),
            None => Vec::new(),
        };
        let cap = HISTORY_CAPACITY;
        if items.len() > cap {
            items.drain(..items.len() - cap);
        }
        Self { storage, items, cap }
    }

    /// Appends to the end and evicts from the front. Memory only changes once the write succeeds.
    pub fn push(&mut self, record: QueryRecord) -> Result<(), StorageError> {
        let keep = self.items.len().min(self.cap.saturating_sub(1));
        let mut next: Vec<QueryRecord> = self.items[self.items.len() - keep..].to_vec();
        next.push(record);
        self.save(&next)?;
        self.items = next;
        Ok(())
    }

    fn save(&mut self, items: &[QueryRecord]) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(items)?;
        self.storage.set_item(HISTORY_KEY, encoded)
    }

    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.storage.remove_item(HISTORY_KEY)?;
        self.items.clear();
        Ok(())
    }

    pub fn records(&self) -> &[QueryRecord] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&QueryRecord> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(i: usize) -> QueryRecord {
        QueryRecord { query: format!("q{i}"), response: format!("r{i}") }
    }

    fn open(dir: &TempDir) -> History {
        History::load(LocalStorage::open(dir.path().join("storage.json")))
    }

    #[test]
    fn keeps_the_five_most_recent_oldest_first() {
        let dir = TempDir::new().unwrap();
        let mut history = open(&dir);
        for i in 0..8 {
            history.push(record(i)).unwrap();
            assert!(history.len() <= HISTORY_CAPACITY);
        }
        let expected: Vec<_> = (3..8).map(record).collect();
        assert_eq!(history.records(), expected.as_slice());
    }

    #[test]
    fn reload_yields_identical_sequence() {
        let dir = TempDir::new().unwrap();
        let mut history = open(&dir);
        history.push(QueryRecord { query: "Drought?".into(), response: "# Plan\n- mulch".into() }).unwrap();
        history.push(record(1)).unwrap();

        let reloaded = open(&dir);
        assert_eq!(reloaded.records(), history.records());
    }

    #[test]
    fn stored_layout_is_a_json_array_under_the_fixed_key() {
        let dir = TempDir::new().unwrap();
        let mut history = open(&dir);
        history.push(record(0)).unwrap();

        let storage = LocalStorage::open(dir.path().join("storage.json"));
        let raw: serde_json::Value = serde_json::from_str(storage.get_item("queryHistory").unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!([{ "query": "q0", "response": "r0" }]));
    }

    #[test]
    fn oversized_stored_history_is_trimmed_on_load() {
        let dir = TempDir::new().unwrap();
        let mut storage = LocalStorage::open(dir.path().join("storage.json"));
        let seeded: Vec<_> = (0..7).map(record).collect();
        storage.set_item(HISTORY_KEY, serde_json::to_string(&seeded).unwrap()).unwrap();

        let history = History::load(storage);
        assert_eq!(history.records(), &seeded[2..]);
    }

    #[test]
    fn invalid_stored_value_loads_empty() {
        let dir = TempDir::new().unwrap();
        let mut storage = LocalStorage::open(dir.path().join("storage.json"));
        storage.set_item(HISTORY_KEY, "{\"query\":1}".into()).unwrap();

        assert!(History::load(storage).is_empty());
    }

    #[test]
    fn failed_write_leaves_records_untouched() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not a directory").unwrap();
        let mut history = History::load(LocalStorage::open(blocker.join("storage.json")));

        assert!(history.push(record(0)).is_err());
        assert!(history.is_empty());
    }

    #[test]
    fn clear_removes_persisted_entry() {
        let dir = TempDir::new().unwrap();
        let mut history = open(&dir);
        history.push(record(0)).unwrap();
        history.clear().unwrap();

        assert!(open(&dir).is_empty());
        assert_eq!(history.get(0), None);
    }
}
