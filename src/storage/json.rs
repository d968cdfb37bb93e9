use std::{
    fs::{self, OpenOptions, rename, write},
    path::PathBuf,
};

use fs2::FileExt;
use serde_json::to_string_pretty;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    models::store::TaskDocument,
    storage::{Storage, StorageError, check_version},
};

/// Number of backups kept per key.
const KEPT_BACKUPS: usize = 5;

/// Stores each key as `<dir>/<key>.json`, with rotating backups in
/// `<dir>/backups`.
pub struct JsonFileStorage {
    dir: PathBuf,
}

impl JsonFileStorage {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn get_backup_dir(&self) -> PathBuf {
        self.dir.join("backups")
    }

    fn get_backup_path(&self, key: &str) -> PathBuf {
        // Fixed-width nanoseconds keep the names sorting chronologically.
        let nanos = jiff::Timestamp::now().as_nanosecond();
        self.get_backup_dir().join(format!("{key}-{nanos:020}.json"))
    }

    fn create_backup(&self, key: &str) -> Result<u64, StorageError> {
        let path = self.path_for(key);
        let file_exists = fs::exists(&path).map_err(|e| StorageError::BackupFailed {
            path: path.clone(),
            source: e,
        })?;
        if !file_exists {
            return Ok(0);
        }

        let backups_dir = self.get_backup_dir();
        fs::create_dir_all(&backups_dir).map_err(|e| StorageError::BackupFailed {
            path: backups_dir,
            source: e,
        })?;

        let backup_path = self.get_backup_path(key);
        fs::copy(&path, &backup_path).map_err(|e| StorageError::BackupFailed {
            path: backup_path,
            source: e,
        })
    }

    fn cleanup_old_backups(&self, key: &str) -> Result<(), StorageError> {
        let backup_dir = self.get_backup_dir();
        let backup_dir_exists =
            fs::exists(&backup_dir).map_err(|e| StorageError::CleanupFailed {
                dir: backup_dir.clone(),
                source: e,
            })?;
        if !backup_dir_exists {
            return Ok(());
        }

        let prefix = format!("{key}-");
        let mut file_entries = fs::read_dir(&backup_dir)
            .map_err(|e| StorageError::CleanupFailed {
                dir: backup_dir.clone(),
                source: e,
            })?
            .flatten()
            .filter(|entry| entry.metadata().map(|m| m.is_file()).unwrap_or(false))
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(&prefix))
            .map(|entry| entry.path())
            .collect::<Vec<_>>();

        file_entries.sort();

        let number_of_files_to_delete = file_entries.len().saturating_sub(KEPT_BACKUPS);
        for file_path in &file_entries[..number_of_files_to_delete] {
            fs::remove_file(file_path).map_err(|e| StorageError::CleanupFailed {
                dir: backup_dir.clone(),
                source: e,
            })?;
        }

        if number_of_files_to_delete > 0 {
            debug!(key, removed = number_of_files_to_delete, "pruned old backups");
        }

        Ok(())
    }
}

impl Storage for JsonFileStorage {
    fn get_or_default(&self, key: &str) -> Result<TaskDocument, StorageError> {
        let path = self.path_for(key);

        match fs::read_to_string(&path) {
            Ok(content) => {
                let document: TaskDocument =
                    serde_json::from_str(&content).map_err(|e| StorageError::ParseFailed {
                        key: key.to_string(),
                        source: e,
                    })?;
                let document = check_version(key, document)?;
                info!(
                    key,
                    path = %path.display(),
                    tasks = document.tasks.len(),
                    "loaded task collection"
                );
                Ok(document)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(key, path = %path.display(), "no stored task collection, starting empty");
                Ok(TaskDocument::default())
            }
            Err(e) => Err(StorageError::LoadFailed {
                key: key.to_string(),
                path,
                source: e,
            }),
        }
    }

    fn set(&self, key: &str, document: &TaskDocument) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let json = to_string_pretty(document).map_err(|e| StorageError::SerializeFailed {
            key: key.to_string(),
            source: e,
        })?;

        fs::create_dir_all(&self.dir).map_err(|e| StorageError::SaveFailed {
            key: key.to_string(),
            path: self.dir.clone(),
            source: e,
        })?;

        let temp_path = PathBuf::from(format!("{}.tmp.{}", path.display(), Uuid::new_v4()));
        write(&temp_path, json).map_err(|e| StorageError::SaveFailed {
            key: key.to_string(),
            path: temp_path.clone(),
            source: e,
        })?;

        let lock_file_path = path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_file_path)
            .map_err(|e| StorageError::SaveFailed {
                key: key.to_string(),
                path: lock_file_path.clone(),
                source: e,
            })?;
        lock_file
            .lock_exclusive()
            .map_err(|e| StorageError::SaveFailed {
                key: key.to_string(),
                path: lock_file_path,
                source: e,
            })?;

        self.create_backup(key)?;
        self.cleanup_old_backups(key)?;

        rename(&temp_path, &path).map_err(|e| StorageError::SaveFailed {
            key: key.to_string(),
            path: path.clone(),
            source: e,
        })?;

        lock_file.unlock().map_err(|e| StorageError::SaveFailed {
            key: key.to_string(),
            path: path.clone(),
            source: e,
        })?;

        debug!(key, tasks = document.tasks.len(), "saved task collection");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        store::{CURRENT_VERSION, TaskStore},
        task::Bucket,
    };

    fn sample_document() -> TaskDocument {
        let mut store = TaskStore::default();
        store.create("write report #work", 45, Bucket::ThisWeek);
        store.create("stretch", 5, Bucket::Today);
        store.complete("stretch", 312);
        store.to_document()
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().to_path_buf());
        let document = sample_document();

        if storage.set("tasks", &document).is_err() {
            panic!("Should correctly save the document");
        }
        match storage.get_or_default("tasks") {
            Ok(loaded) => assert_eq!(loaded, document),
            Err(_) => panic!("Should correctly load the saved document"),
        }
    }

    #[test]
    fn test_missing_key_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("not-yet-created"));

        let document = storage.get_or_default("tasks").unwrap();
        assert!(document.tasks.is_empty());
        assert_eq!(document.version, CURRENT_VERSION);
    }

    #[test]
    fn test_keys_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().to_path_buf());

        storage.set("work", &sample_document()).unwrap();

        assert!(storage.get_or_default("home").unwrap().tasks.is_empty());
        assert_eq!(storage.get_or_default("work").unwrap().tasks.len(), 2);
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().to_path_buf());
        fs::write(storage.path_for("tasks"), "{ this is not valid json }").unwrap();

        match storage.get_or_default("tasks") {
            Err(StorageError::ParseFailed { .. }) => {}
            _ => panic!("Expected ParseFailed error, got something else"),
        }
    }

    #[test]
    fn test_load_document_without_version_field() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().to_path_buf());
        let old_json = r#"{
            "tasks": [
                {"name": "legacy", "status": "DONE", "time": 90, "scheduling": "this year"}
            ]
        }"#;
        fs::write(storage.path_for("tasks"), old_json).unwrap();

        let document = storage.get_or_default("tasks").unwrap();
        assert_eq!(document.version, CURRENT_VERSION);
        assert_eq!(document.tasks[0].name, "legacy");
        assert_eq!(document.tasks[0].scheduling, Bucket::ThisYear);
    }

    #[test]
    fn test_load_future_version() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().to_path_buf());
        fs::write(
            storage.path_for("tasks"),
            r#"{"version": 999, "tasks": []}"#,
        )
        .unwrap();

        match storage.get_or_default("tasks") {
            Err(StorageError::FutureVersion { version: 999, .. }) => {}
            _ => panic!("Expected FutureVersion error for version 999"),
        }
    }

    #[test]
    fn test_backup_creation_and_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().to_path_buf());

        for _ in 0..8 {
            storage.set("tasks", &sample_document()).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(10));
        }

        let backup_count = fs::read_dir(dir.path().join("backups"))
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.metadata().map(|m| m.is_file()).unwrap_or(false))
            .count();

        assert_eq!(backup_count, KEPT_BACKUPS, "Should keep exactly 5 backups");
    }

    #[test]
    fn test_backup_directory_created_on_second_save() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().to_path_buf());
        let backups_dir = dir.path().join("backups");

        storage.set("tasks", &TaskDocument::default()).unwrap();
        assert!(
            !backups_dir.exists(),
            "Backups dir should not exist after first save"
        );

        storage.set("tasks", &sample_document()).unwrap();
        assert!(
            backups_dir.is_dir(),
            "Backups dir should be created on second save"
        );
    }
}
