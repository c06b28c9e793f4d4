//! File-backed JSON snapshot storage.
//!
//! Each store keeps its full state under one namespaced key, read once at
//! startup and rewritten on every mutation. Read/write failures are logged
//! and swallowed; in-memory state keeps working for the session.

use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::PathBuf;

pub const CATALOG_KEY: &str = "catalog";
pub const CART_KEY: &str = "cart";
pub const ANALYTICS_KEY: &str = "analytics";

#[derive(Clone, Debug)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if let Err(e) = fs::create_dir_all(&dir) {
            tracing::warn!(dir = %dir.display(), error = %e, "failed to create data directory");
        }
        Self { dir }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Load a snapshot. Missing or corrupt data reads as `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.path(key);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to read snapshot");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to parse snapshot");
                None
            }
        }
    }

    /// Write the full snapshot for a key. Failures are logged, not surfaced.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to serialize snapshot");
                return;
            }
        };
        if let Err(e) = fs::write(self.path(key), json) {
            tracing::warn!(key, error = %e, "failed to write snapshot");
        }
    }

    /// Delete the persisted snapshot for a key.
    pub fn remove(&self, key: &str) {
        match fs::remove_file(self.path(key)) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(key, error = %e, "failed to remove snapshot"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        store.put("cart", &vec![1u32, 2, 3]);
        assert_eq!(store.get::<Vec<u32>>("cart"), Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_missing_key_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        assert_eq!(store.get::<Vec<u32>>("nothing"), None);
    }

    #[test]
    fn test_corrupt_snapshot_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cart.json"), "{not json").unwrap();
        let store = JsonStore::new(dir.path());
        assert_eq!(store.get::<Vec<u32>>("cart"), None);
    }

    #[test]
    fn test_remove_erases_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        store.put("analytics", &42u32);
        store.remove("analytics");
        assert_eq!(store.get::<u32>("analytics"), None);
        // Removing again is harmless.
        store.remove("analytics");
    }
}
