//! JSON-file storage backend.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{KeyValueStore, StorageError};

/// Key-value store persisted as a single JSON object on disk.
///
/// The whole map is rewritten on every mutation. That is deliberate: the
/// state is a handful of small blobs and atomicity per write matters more
/// than throughput. Writes go through a temp file followed by a rename so
/// a crash cannot leave a half-written state file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Open a store at `path`, loading existing state if the file exists.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the file exists but cannot be read or
    /// parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// The path of the backing state file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let raw = serde_json::to_string_pretty(entries)?;
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_owned(), value.to_owned());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("tundra-file-store-{name}-{}", std::process::id()))
    }

    #[test]
    fn test_roundtrip_across_reopen() {
        let path = temp_path("roundtrip");
        let _ = fs::remove_file(&path);

        {
            let store = FileStore::open(&path).unwrap();
            store.set("tundra.session", "{\"user\":1}").unwrap();
        }

        let store = FileStore::open(&path).unwrap();
        assert_eq!(
            store.get("tundra.session").unwrap(),
            Some("{\"user\":1}".to_owned())
        );

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_remove_persists() {
        let path = temp_path("remove");
        let _ = fs::remove_file(&path);

        {
            let store = FileStore::open(&path).unwrap();
            store.set("a", "1").unwrap();
            store.set("b", "2").unwrap();
            store.remove("a").unwrap();
        }

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.get("b").unwrap(), Some("2".to_owned()));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_open_missing_file_is_empty() {
        let path = temp_path("missing");
        let _ = fs::remove_file(&path);

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("anything").unwrap(), None);
    }
}
