// Persistent string key/value store, one JSON object on disk
use std::{collections::BTreeMap, fs, io::ErrorKind, path::{Path, PathBuf}};
use directories::ProjectDirs;
use tracing::warn;

use crate::error::StorageError;

pub struct LocalStorage {
    path: PathBuf,
    items: BTreeMap<String, String>,
}

/// Platform data directory for the app, e.g. `~/.local/share/farmadvisor`.
pub fn data_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "farmadvisor", "farmadvisor").map(|p| p.data_dir().to_path_buf())
}

pub fn default_path() -> PathBuf {
    data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("local_storage.json")
}

impl LocalStorage {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let items = match fs::read_to_string(&path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "local storage file is corrupt, starting empty");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "local storage file is unreadable, starting empty");
                BTreeMap::new()
            }
        };
        Self { path, items }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_item(&self, key: &str) -> Option<&str> {
        self.items.get(key).map(String::as_str)
    }

    pub fn set_item(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        let mut next = self.items.clone();
        next.insert(key.to_string(), value);
        self.save(&next)?;
        self.items = next;
        Ok(())
    }

    pub fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        if !self.items.contains_key(key) {
            return Ok(());
        }
        let mut next = self.items.clone();
        next.remove(key);
        self.save(&next)?;
        self.items = next;
        Ok(())
    }

    fn save(&self, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let io_err = |source: std::io::Error| StorageError::Io { path: self.path.clone(), source };
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        let body = serde_json::to_string_pretty(items)?;
        fs::write(&self.path, body).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn items_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let mut store = LocalStorage::open(&path);
        assert_eq!(store.get_item("k"), None);
        store.set_item("k", "v1".into()).unwrap();
        store.set_item("other", "v2".into()).unwrap();

        let reopened = LocalStorage::open(&path);
        assert_eq!(reopened.get_item("k"), Some("v1"));
        assert_eq!(reopened.get_item("other"), Some("v2"));
    }

    #[test]
    fn remove_item_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        let mut store = LocalStorage::open(&path);
        store.set_item("k", "v".into()).unwrap();
        store.remove_item("k").unwrap();
        store.remove_item("missing").unwrap();

        assert_eq!(LocalStorage::open(&path).get_item("k"), None);
    }

    #[test]
    fn non_utf8_file_opens_empty_and_is_replaced_on_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, [0xff, 0xfe, 0x7b, 0x7d]).unwrap();

        let mut store = LocalStorage::open(&path);
        assert_eq!(store.get_item("queryHistory"), None);
        store.set_item("queryHistory", "[]".into()).unwrap();
        assert_eq!(LocalStorage::open(&path).get_item("queryHistory"), Some("[]"));
    }

    #[test]
    fn unwritable_location_reports_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();

        let mut store = LocalStorage::open(blocker.join("store.json"));
        assert!(matches!(store.set_item("k", "v".into()), Err(StorageError::Io { .. })));
        assert_eq!(store.get_item("k"), None);
    }

    #[test]
    fn corrupt_file_opens_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{not json").unwrap();

        let store = LocalStorage::open(&path);
        assert_eq!(store.get_item("queryHistory"), None);
        assert_eq!(store.path(), path.as_path());
    }
}
