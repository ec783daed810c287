//! Durable key-value cache for the last successfully loaded dataset.
//!
//! Three keys are kept: the JSON row payload, the provenance label, and a
//! force-reload flag that makes the next startup skip the cache.

use crate::dataset::Dataset;
use crate::dataset::Row;
use crate::dataset::SourceKind;
use crate::error::LookupError;
use duckdb::params;
use duckdb::Connection;
use log::debug;
use log::info;
use log::warn;
use std::path::Path;

/// Key holding the JSON array of row objects
pub const KEY_ROWS: &str = "coilData";
/// Key holding the provenance label
pub const KEY_LABEL: &str = "loadedFileName";
/// Key whose presence forces the next startup to skip the cache
pub const KEY_FORCE_RELOAD: &str = "forceReload";

/// Persists the last loaded dataset between runs.
pub trait CacheStore {
    /// Writes rows and label together; a failure leaves the previous record in place.
    fn save(&mut self, dataset: &Dataset) -> Result<(), LookupError>;

    /// Restores the cached dataset with kind `cache`.
    ///
    /// Missing keys, an empty label and unparseable payloads are all misses.
    fn load(&self) -> Option<Dataset>;

    /// Removes the rows and label keys.
    fn clear(&mut self) -> Result<(), LookupError>;

    /// Removes every key.
    fn reset(&mut self) -> Result<(), LookupError>;

    /// Marks the next startup to bypass the cache.
    fn request_reload(&mut self) -> Result<(), LookupError>;

    /// Consumes the force-reload flag, returning whether it was set.
    fn take_reload_request(&mut self) -> Result<bool, LookupError>;
}

/// Cache store backed by an embedded DuckDB database.
pub struct DuckDbCacheStore {
    connection: Connection,
}

impl DuckDbCacheStore {
    /// Opens (or creates) the database file, creating parent directories as needed
    pub fn open(path: &Path) -> Result<Self, LookupError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| LookupError::io(parent.display(), e))?;
        }
        debug!("Opening cache database '{}'", path.display());
        Self::with_connection(Connection::open(path)?)
    }

    /// Opens a throwaway in-memory store
    pub fn open_in_memory() -> Result<Self, LookupError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(connection: Connection) -> Result<Self, LookupError> {
        connection.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv_store (key VARCHAR PRIMARY KEY, value VARCHAR NOT NULL);",
        )?;
        Ok(Self { connection })
    }

    fn get(&self, key: &str) -> Result<Option<String>, LookupError> {
        match self.connection.query_row("SELECT value FROM kv_store WHERE key = ?", [key], |row| row.get(0)) {
            Ok(value) => Ok(Some(value)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) fn put(&self, key: &str, value: &str) -> Result<(), LookupError> {
        self.connection.execute("INSERT OR REPLACE INTO kv_store VALUES (?, ?)", params![key, value])?;
        Ok(())
    }

    fn delete(&self, keys: &[&str]) -> Result<(), LookupError> {
        for key in keys {
            self.connection.execute("DELETE FROM kv_store WHERE key = ?", [*key])?;
        }
        Ok(())
    }

    fn read_record(&self) -> Result<Option<Dataset>, LookupError> {
        let (Some(payload), Some(label)) = (self.get(KEY_ROWS)?, self.get(KEY_LABEL)?) else {
            return Ok(None);
        };
        if label.trim().is_empty() {
            return Ok(None);
        }
        let rows: Vec<Row> = serde_json::from_str(&payload)?;
        Ok(Some(Dataset::new(rows, label, SourceKind::Cache)))
    }
}

impl CacheStore for DuckDbCacheStore {
    fn save(&mut self, dataset: &Dataset) -> Result<(), LookupError> {
        let payload = serde_json::to_string(dataset.rows())?;
        let transaction = self.connection.transaction()?;
        transaction.execute("INSERT OR REPLACE INTO kv_store VALUES (?, ?)", params![KEY_ROWS, payload])?;
        transaction.execute("INSERT OR REPLACE INTO kv_store VALUES (?, ?)", params![KEY_LABEL, dataset.label()])?;
        transaction.commit()?;
        info!("Cached {} rows from '{}'", dataset.len(), dataset.label());
        Ok(())
    }

    fn load(&self) -> Option<Dataset> {
        match self.read_record() {
            Ok(Some(dataset)) => {
                info!("Loaded {} rows of '{}' from cache", dataset.len(), dataset.label());
                Some(dataset)
            }
            Ok(None) => {
                debug!("No cached dataset");
                None
            }
            Err(e) => {
                warn!("Ignoring unreadable cache record: {}", e);
                None
            }
        }
    }

    fn clear(&mut self) -> Result<(), LookupError> {
        self.delete(&[KEY_ROWS, KEY_LABEL])?;
        info!("Cleared cached dataset");
        Ok(())
    }

    fn reset(&mut self) -> Result<(), LookupError> {
        self.connection.execute("DELETE FROM kv_store", [])?;
        info!("Removed all cached state");
        Ok(())
    }

    fn request_reload(&mut self) -> Result<(), LookupError> {
        self.put(KEY_FORCE_RELOAD, "true")
    }

    fn take_reload_request(&mut self) -> Result<bool, LookupError> {
        let requested = self.get(KEY_FORCE_RELOAD)?.is_some();
        if requested {
            self.delete(&[KEY_FORCE_RELOAD])?;
        }
        Ok(requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::CellValue;

    fn dataset() -> Dataset {
        Dataset::new(
            vec![
                Row::from([("MILL COIL NO", CellValue::from("C100")), ("WEIGHT", CellValue::Number(12.5))]),
                Row::from([("MILL COIL NO", CellValue::from("C101")), ("WEIGHT", CellValue::Empty)]),
            ],
            "coil-data.xlsx",
            SourceKind::Remote,
        )
    }

    #[test]
    fn save_then_load() {
        let mut store = DuckDbCacheStore::open_in_memory().unwrap();
        assert!(store.load().is_none());

        store.save(&dataset()).unwrap();
        let cached = store.load().unwrap();
        assert_eq!(cached.rows(), dataset().rows());
        assert_eq!(cached.label(), "coil-data.xlsx");
        assert_eq!(cached.kind(), SourceKind::Cache);
    }

    #[test]
    fn save_replaces_previous_record() {
        let mut store = DuckDbCacheStore::open_in_memory().unwrap();
        store.save(&dataset()).unwrap();
        let newer = Dataset::new(
            vec![Row::from([("MILL COIL NO", CellValue::from("C200"))])],
            "march.xlsx",
            SourceKind::LocalUpload,
        );
        store.save(&newer).unwrap();

        let cached = store.load().unwrap();
        assert_eq!(cached.label(), "march.xlsx");
        assert_eq!(cached.len(), 1);
    }

    #[test]
    fn clear_removes_record() {
        let mut store = DuckDbCacheStore::open_in_memory().unwrap();
        store.clear().unwrap();
        store.save(&dataset()).unwrap();
        store.clear().unwrap();
        assert!(store.load().is_none());
        assert_eq!(store.get(KEY_ROWS).unwrap(), None);
    }

    #[test]
    fn corrupt_payload_is_a_miss() {
        let store = DuckDbCacheStore::open_in_memory().unwrap();
        store.put(KEY_ROWS, "{not json").unwrap();
        store.put(KEY_LABEL, "coil-data.xlsx").unwrap();
        assert!(store.load().is_none());

        store.put(KEY_ROWS, r#"[{"MILL COIL NO": true}]"#).unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn missing_label_is_a_miss() {
        let store = DuckDbCacheStore::open_in_memory().unwrap();
        store.put(KEY_ROWS, r#"[{"MILL COIL NO": "C100"}]"#).unwrap();
        assert!(store.load().is_none());

        store.put(KEY_LABEL, "  ").unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn reload_flag_is_consumed() {
        let mut store = DuckDbCacheStore::open_in_memory().unwrap();
        assert!(!store.take_reload_request().unwrap());

        store.save(&dataset()).unwrap();
        store.reset().unwrap();
        store.request_reload().unwrap();
        assert!(store.load().is_none());
        assert!(store.take_reload_request().unwrap());
        assert!(!store.take_reload_request().unwrap());
    }

    #[test]
    fn record_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.duckdb");
        {
            let mut store = DuckDbCacheStore::open(&path).unwrap();
            store.save(&dataset()).unwrap();
        }
        let store = DuckDbCacheStore::open(&path).unwrap();
        assert_eq!(store.load().unwrap().len(), 2);
    }
}
