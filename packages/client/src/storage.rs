//! Device-local key-value storage.
//!
//! Holds the participant id per room and the last joined profile across runs.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};

use crate::error::StorageError;

/// Key of the participant id stored for `room_id`.
pub fn participant_id_key(room_id: &str) -> String {
    format!("todo-user-id:{}", room_id)
}

/// Key of the last joined profile.
pub const PROFILE_KEY: &str = "collaborative-todo-user";

const STORAGE_FILE: &str = "storage.json";

#[cfg_attr(test, mockall::automock)]
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Storage persisted as one JSON object in `<dir>/storage.json`.
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or create) the storage file inside `dir`.
    ///
    /// A file that is not a JSON object of strings is treated as empty and
    /// overwritten on the next write.
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(STORAGE_FILE);

        let entries = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Discarding unreadable storage file {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!("Opened storage {} ({} keys)", path.display(), entries.len());

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write through a temporary file so a crash never leaves a torn file.
    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries();
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries();
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

/// Storage that forgets everything when dropped.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_storage_survives_reopen() {
        // テスト項目: 書いた値はファイルを開き直しても読める
        // given (前提条件):
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        // when (操作):
        storage.set(&participant_id_key("room1"), "user_abc").unwrap();
        storage.set(PROFILE_KEY, r#"{"name":"Alice"}"#).unwrap();
        storage.remove(PROFILE_KEY).unwrap();
        let reopened = FileStorage::open(dir.path()).unwrap();

        // then (期待する結果):
        assert_eq!(
            reopened.get("todo-user-id:room1"),
            Some("user_abc".to_string())
        );
        assert_eq!(reopened.get(PROFILE_KEY), None);
        assert!(!dir.path().join("storage.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_is_treated_as_empty() {
        // テスト項目: 壊れたファイルは空として扱われ、次の書き込みで上書きされる
        // given (前提条件):
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(STORAGE_FILE), "not json").unwrap();

        // when (操作):
        let storage = FileStorage::open(dir.path()).unwrap();
        storage.set("k", "v").unwrap();

        // then (期待する結果):
        let content = fs::read_to_string(storage.path()).unwrap();
        let parsed: BTreeMap<String, String> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.get("k"), Some(&"v".to_string()));
    }

    #[test]
    fn test_memory_storage() {
        // テスト項目: メモリストレージの get / set / remove
        // given (前提条件):
        let storage = MemoryStorage::new();

        // when (操作):
        storage.set("a", "1").unwrap();
        storage.set("a", "2").unwrap();
        storage.set("b", "3").unwrap();
        storage.remove("b").unwrap();

        // then (期待する結果):
        assert_eq!(storage.get("a"), Some("2".to_string()));
        assert_eq!(storage.get("b"), None);
    }
}
