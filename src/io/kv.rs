use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::Value;

use crate::io::recovery::{self, RecoveryCategory, RecoveryEntry};

/// Error type for key-value store operations
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not write {path}: {source}")]
    WriteError { path: PathBuf, source: io::Error },
    #[error("could not encode store contents: {0}")]
    EncodeError(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A durable string-keyed store of JSON values.
///
/// Writes are synchronous: once `set` returns `Ok`, the change
/// survives a process restart.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Value>, KvError>;
    fn set(&mut self, key: &str, value: Value) -> Result<(), KvError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &mut S {
    fn get(&self, key: &str) -> Result<Option<Value>, KvError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), KvError> {
        (**self).set(key, value)
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local store. Cloning it simulates a restart against the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: IndexMap<String, Value>,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Make every subsequent `set` fail without changing anything
    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Keys currently stored, in insertion order
    #[cfg(test)]
    pub fn keys(&self) -> Vec<&str> {
        self.entries.keys().map(|k| k.as_str()).collect()
    }

    fn check_writable(&self) -> Result<(), KvError> {
        if self.fail_writes {
            return Err(KvError::Unavailable("writes disabled".into()));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, KvError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), KvError> {
        self.check_writable()?;
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// Backups beyond this many distinct corrupt files are not attempted.
const MAX_BACKUPS: usize = 10;

#[derive(Debug)]
enum Access {
    ReadWrite,
    /// Corrupt contents exist only in `store.json`; writing would destroy them.
    ReadOnly(String),
    /// The file exists but could not be read.
    Unreadable(io::ErrorKind, String),
}

/// All keys in one JSON object file, rewritten atomically on every change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: IndexMap<String, Value>,
    access: Access,
}

impl FileStore {
    pub const FILE_NAME: &'static str = "store.json";

    /// Open `store.json` in `data_dir`. Never fails; problems surface
    /// through `get` and `set`.
    ///
    /// - missing or blank file: empty store
    /// - unreadable file: every `get` reports the read error, writes are
    ///   refused so the file is left as it was
    /// - file that is not a JSON object: its text is copied to a fresh
    ///   `store.json[.N].bak` and the store opens empty. When
    ///   `recovery_log` is set, or the backup fails, the text also goes to
    ///   the recovery log. If it could be kept nowhere, writes are refused.
    pub fn open(data_dir: &Path, recovery_log: bool) -> Self {
        let path = data_dir.join(Self::FILE_NAME);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Self::empty(path),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "store file could not be read");
                return FileStore {
                    path,
                    entries: IndexMap::new(),
                    access: Access::Unreadable(e.kind(), e.to_string()),
                };
            }
        };

        if content.trim().is_empty() {
            return Self::empty(path);
        }

        match serde_json::from_str::<IndexMap<String, Value>>(&content) {
            Ok(entries) => FileStore {
                path,
                entries,
                access: Access::ReadWrite,
            },
            Err(e) => Self::open_corrupt(data_dir, path, content, &e, recovery_log),
        }
    }

    fn empty(path: PathBuf) -> Self {
        FileStore {
            path,
            entries: IndexMap::new(),
            access: Access::ReadWrite,
        }
    }

    fn open_corrupt(
        data_dir: &Path,
        path: PathBuf,
        content: String,
        error: &serde_json::Error,
        recovery_log: bool,
    ) -> Self {
        let backup = write_backup(&path, &content);

        let mut entry = RecoveryEntry::now(RecoveryCategory::Corrupt, "store file could not be parsed")
            .field("Path", path.display().to_string())
            .field("Error", error.to_string());
        if let Ok(bak) = &backup {
            entry = entry.field("Backup", bak.display().to_string());
        }
        let entry = entry.body(content);

        // Without a backup the log is the last copy, so the config is overridden.
        let logged = (recovery_log || backup.is_err())
            && match recovery::try_log_recovery_unique(data_dir, entry) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(error = %e, dir = %data_dir.display(), "could not write to recovery log");
                    false
                }
            };

        let access = match backup {
            Ok(bak) => {
                tracing::warn!(
                    path = %path.display(),
                    backup = %bak.display(),
                    error = %error,
                    "store file is corrupt, starting empty"
                );
                Access::ReadWrite
            }
            Err(e) if logged => {
                tracing::warn!(
                    path = %path.display(),
                    backup_error = %e,
                    error = %error,
                    "store file is corrupt and could not be backed up, its text is in the recovery log"
                );
                Access::ReadWrite
            }
            Err(e) => {
                tracing::error!(
                    path = %path.display(),
                    backup_error = %e,
                    error = %error,
                    "store file is corrupt and could not be preserved, leaving it untouched"
                );
                Access::ReadOnly(format!(
                    "{} is corrupt and could not be backed up: {}",
                    path.display(),
                    e
                ))
            }
        };

        FileStore {
            path,
            entries: IndexMap::new(),
            access,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// False when writes are refused to protect the file on disk
    pub fn is_writable(&self) -> bool {
        matches!(self.access, Access::ReadWrite)
    }

    fn check_writable(&self) -> Result<(), KvError> {
        match &self.access {
            Access::ReadWrite => Ok(()),
            Access::ReadOnly(reason) => Err(KvError::Unavailable(reason.clone())),
            Access::Unreadable(_, error) => Err(KvError::Unavailable(format!(
                "{} could not be read: {}",
                self.path.display(),
                error
            ))),
        }
    }

    fn flush(&self, entries: &IndexMap<String, Value>) -> Result<(), KvError> {
        let content = serde_json::to_string_pretty(entries)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| KvError::WriteError {
                path: self.path.clone(),
                source: e,
            })?;
        }
        recovery::atomic_write(&self.path, content.as_bytes()).map_err(|e| KvError::WriteError {
            path: self.path.clone(),
            source: e,
        })
    }
}

/// Copy corrupt store text next to the store without replacing an earlier
/// backup. An existing backup with the same text is reused.
fn write_backup(path: &Path, content: &str) -> io::Result<PathBuf> {
    let mut last_error = None;
    for n in 0..MAX_BACKUPS {
        let candidate = if n == 0 {
            path.with_extension("json.bak")
        } else {
            path.with_extension(format!("json.{}.bak", n))
        };
        match fs::read_to_string(&candidate) {
            Ok(existing) if existing == content => return Ok(candidate),
            Ok(_) => continue,
            Err(e) if e.kind() != io::ErrorKind::NotFound => {
                last_error = Some(e);
                continue;
            }
            Err(_) => {}
        }
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(mut file) => {
                file.write_all(content.as_bytes())?;
                return Ok(candidate);
            }
            Err(e) => last_error = Some(e),
        }
    }
    Err(last_error.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::AlreadyExists, "every backup name is taken")
    }))
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, KvError> {
        if let Access::Unreadable(kind, error) = &self.access {
            return Err(KvError::ReadError {
                path: self.path.clone(),
                source: io::Error::new(*kind, error.clone()),
            });
        }
        Ok(self.entries.get(key).cloned())
    }

    // The in-memory map only changes once the file write succeeded.
    fn set(&mut self, key: &str, value: Value) -> Result<(), KvError> {
        self.check_writable()?;
        let mut next = self.entries.clone();
        next.insert(key.to_string(), value);
        self.flush(&next)?;
        self.entries = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn memory_store_set_get() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("Theme").unwrap(), None);
        store.set("Theme", json!(3)).unwrap();
        assert_eq!(store.get("Theme").unwrap(), Some(json!(3)));
        store.set("Theme", json!(4)).unwrap();
        assert_eq!(store.get("Theme").unwrap(), Some(json!(4)));
    }

    #[test]
    fn memory_store_failing_writes_leave_data_untouched() {
        let mut store = MemoryStore::new();
        store.set("HideCompleted", json!(true)).unwrap();
        store.fail_writes(true);
        assert!(matches!(
            store.set("HideCompleted", json!(false)),
            Err(KvError::Unavailable(_))
        ));
        assert_eq!(store.get("HideCompleted").unwrap(), Some(json!(true)));
    }

    #[test]
    fn memory_store_keeps_insertion_order() {
        let mut store = MemoryStore::new();
        store.set("Tasks", json!([])).unwrap();
        store.set("Theme", json!(1)).unwrap();
        store.set("HideCompleted", json!(false)).unwrap();
        assert_eq!(store.keys(), vec!["Tasks", "Theme", "HideCompleted"]);
    }

    #[test]
    fn file_store_missing_file_opens_empty() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path(), true);
        assert_eq!(store.get("Tasks").unwrap(), None);
        assert!(store.is_writable());
        assert!(!store.path().exists());
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let tmp = TempDir::new().unwrap();
        let mut store = FileStore::open(tmp.path(), true);
        store.set("Theme", json!(4)).unwrap();
        store.set("HideCompleted", json!(true)).unwrap();

        let reopened = FileStore::open(tmp.path(), true);
        assert_eq!(reopened.get("Theme").unwrap(), Some(json!(4)));
        assert_eq!(reopened.get("HideCompleted").unwrap(), Some(json!(true)));
    }

    #[test]
    fn file_store_creates_missing_data_dir() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nested").join("data");
        let mut store = FileStore::open(&dir, true);
        store.set("Theme", json!(2)).unwrap();
        assert!(dir.join(FileStore::FILE_NAME).exists());
    }

    #[test]
    fn file_store_unreadable_file_reports_on_get_and_refuses_writes() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join(FileStore::FILE_NAME)).unwrap();

        let mut store = FileStore::open(tmp.path(), true);
        assert!(!store.is_writable());
        assert!(matches!(store.get("Tasks"), Err(KvError::ReadError { .. })));
        assert!(matches!(
            store.set("Theme", json!(2)),
            Err(KvError::Unavailable(_))
        ));
        assert!(tmp.path().join(FileStore::FILE_NAME).is_dir());
    }

    #[test]
    fn file_store_corrupt_file_is_backed_up_and_logged() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(FileStore::FILE_NAME);
        fs::write(&path, "{ not json").unwrap();

        let store = FileStore::open(tmp.path(), true);
        assert_eq!(store.get("Tasks").unwrap(), None);
        assert!(store.is_writable());
        assert_eq!(
            fs::read_to_string(tmp.path().join("store.json.bak")).unwrap(),
            "{ not json"
        );

        let entries = recovery::read_recovery_entries(tmp.path(), None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, RecoveryCategory::Corrupt);
        assert_eq!(entries[0].body, "{ not json");
    }

    #[test]
    fn file_store_new_corruption_keeps_earlier_backup() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(FileStore::FILE_NAME);

        fs::write(&path, "first").unwrap();
        FileStore::open(tmp.path(), false);
        // Reopening the same corrupt file reuses its backup.
        FileStore::open(tmp.path(), false);
        fs::write(&path, "second").unwrap();
        FileStore::open(tmp.path(), false);

        assert_eq!(fs::read_to_string(tmp.path().join("store.json.bak")).unwrap(), "first");
        assert_eq!(fs::read_to_string(tmp.path().join("store.json.1.bak")).unwrap(), "second");
        assert!(!tmp.path().join("store.json.2.bak").exists());
    }

    fn block_backups(dir: &Path) {
        fs::create_dir(dir.join("store.json.bak")).unwrap();
        for n in 1..MAX_BACKUPS {
            fs::create_dir(dir.join(format!("store.json.{}.bak", n))).unwrap();
        }
    }

    #[test]
    fn file_store_failed_backup_forces_recovery_entry() {
        let tmp = TempDir::new().unwrap();
        let corrupt = r#"{"Tasks": [ {"id": broken"#;
        fs::write(tmp.path().join(FileStore::FILE_NAME), corrupt).unwrap();
        block_backups(tmp.path());

        let store = FileStore::open(tmp.path(), false);
        assert!(store.is_writable());

        let entries = recovery::read_recovery_entries(tmp.path(), None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, RecoveryCategory::Corrupt);
        assert_eq!(entries[0].body, corrupt);
    }

    #[test]
    fn file_store_corrupt_text_kept_nowhere_is_left_untouched() {
        let tmp = TempDir::new().unwrap();
        let corrupt = r#"{"Tasks": [ {"id": broken"#;
        let path = tmp.path().join(FileStore::FILE_NAME);
        fs::write(&path, corrupt).unwrap();
        block_backups(tmp.path());
        fs::create_dir(recovery::recovery_log_path(tmp.path())).unwrap();

        let mut store = FileStore::open(tmp.path(), false);
        assert!(!store.is_writable());
        assert!(matches!(
            store.set("Tasks", json!([])),
            Err(KvError::Unavailable(_))
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), corrupt);
    }

    #[test]
    fn file_store_non_object_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(FileStore::FILE_NAME), "[1, 2, 3]").unwrap();
        let store = FileStore::open(tmp.path(), false);
        assert_eq!(store.get("Tasks").unwrap(), None);
        assert!(tmp.path().join("store.json.bak").exists());
        assert!(recovery::read_recovery_entries(tmp.path(), None).is_empty());
    }

    #[test]
    fn file_store_blank_file_opens_empty_without_backup() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(FileStore::FILE_NAME), "\n").unwrap();
        let store = FileStore::open(tmp.path(), true);
        assert_eq!(store.get("Theme").unwrap(), None);
        assert!(!tmp.path().join("store.json.bak").exists());
    }

    #[test]
    fn mut_ref_forwards_to_store() {
        fn write_theme<S: KeyValueStore>(mut store: S) {
            store.set("Theme", json!(3)).unwrap();
        }

        let mut inner = MemoryStore::new();
        write_theme(&mut inner);
        assert_eq!(inner.get("Theme").unwrap(), Some(json!(3)));
    }
}
