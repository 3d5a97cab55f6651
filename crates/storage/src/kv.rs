//! Keyed UTF-8 document storage under fixed string keys.
//!
//! Backends are injected at construction so stores can run against a real
//! directory or an in-memory map in tests.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::{fs, io};

use log::warn;
use uuid::Uuid;

use crate::error::{Result, StorageError};

/// Key holding the serialized local user document.
pub const USER_DATA_KEY: &str = "cuet_user_data";

/// Key holding the cached shared document.
pub const SHARED_CACHE_KEY: &str = "cuet_shared_cache";

/// Key holding the generated device user id.
pub const USER_ID_KEY: &str = "cuet_user_id";

/// Key holding the timestamp of the last successful remote round trip.
pub const LAST_SYNC_KEY: &str = "cuet_last_sync";

/// Legacy stats snapshot written by older builds; read only to gate a UI hint.
pub const LEGACY_STATS_KEY: &str = "cuet_user_stats";

/// Keyed string storage. Values are UTF-8 text (JSON documents or scalars).
pub trait KvBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// File-per-key backend under a data directory.
#[derive(Debug)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KvBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        // Write-then-rename so a crash mid-write never corrupts the document.
        let path = self.path_for(key);
        let tmp = self.dir.join(format!("{}.json.tmp", key));
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::Io(err)),
        }
    }
}

/// In-memory backend for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

/// Return the persisted device user id, generating one on first call.
///
/// The id is the device's sole identity: random, unauthenticated, stable
/// across sessions for as long as local storage survives.
pub fn ensure_user_id(backend: &dyn KvBackend) -> String {
    match backend.get(USER_ID_KEY) {
        Ok(Some(existing)) if !existing.trim().is_empty() => existing.trim().to_string(),
        Ok(_) => {
            let generated = Uuid::new_v4().to_string();
            if let Err(err) = backend.set(USER_ID_KEY, &generated) {
                warn!("[Storage] Could not persist generated user id: {}", err);
            }
            generated
        }
        Err(err) => {
            warn!("[Storage] User id read failed, generating ephemeral id: {}", err);
            Uuid::new_v4().to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_backend_round_trips_and_removes() {
        let dir = tempdir().expect("tempdir");
        let backend = FileBackend::new(dir.path()).expect("backend");

        assert!(backend.get(USER_DATA_KEY).expect("get").is_none());
        backend.set(USER_DATA_KEY, "{\"a\":1}").expect("set");
        assert_eq!(
            backend.get(USER_DATA_KEY).expect("get"),
            Some("{\"a\":1}".to_string())
        );
        backend.remove(USER_DATA_KEY).expect("remove");
        assert!(backend.get(USER_DATA_KEY).expect("get").is_none());
        // Removing an absent key is not an error.
        backend.remove(USER_DATA_KEY).expect("remove absent");
    }

    #[test]
    fn file_backend_overwrite_replaces_whole_value() {
        let dir = tempdir().expect("tempdir");
        let backend = FileBackend::new(dir.path()).expect("backend");
        backend.set("k", "first-longer-value").expect("set");
        backend.set("k", "second").expect("set");
        assert_eq!(backend.get("k").expect("get"), Some("second".to_string()));
    }

    #[test]
    fn user_id_is_generated_once_and_reused() {
        let backend = MemoryBackend::new();
        let first = ensure_user_id(&backend);
        let second = ensure_user_id(&backend);
        assert_eq!(first, second);
        assert_eq!(first.len(), 36, "uuid format");
    }
}
