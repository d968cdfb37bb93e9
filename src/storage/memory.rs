use std::{collections::HashMap, sync::Mutex};

use crate::{
    models::store::TaskDocument,
    storage::{Storage, StorageError, check_version},
};

/// Keeps serialized documents in memory. Values go through JSON like they
/// would on disk, so what comes back is what a reload would see.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw JSON stored under `key`, if any.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    /// Stores raw JSON under `key` as if another session had written it.
    pub fn insert_raw(&self, key: &str, json: impl Into<String>) -> Result<(), StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Unavailable(key.to_string()))?
            .insert(key.to_string(), json.into());
        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn get_or_default(&self, key: &str) -> Result<TaskDocument, StorageError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::Unavailable(key.to_string()))?;

        match entries.get(key) {
            Some(json) => {
                let document =
                    serde_json::from_str(json).map_err(|e| StorageError::ParseFailed {
                        key: key.to_string(),
                        source: e,
                    })?;
                check_version(key, document)
            }
            None => Ok(TaskDocument::default()),
        }
    }

    fn set(&self, key: &str, document: &TaskDocument) -> Result<(), StorageError> {
        let json = serde_json::to_string(document).map_err(|e| StorageError::SerializeFailed {
            key: key.to_string(),
            source: e,
        })?;
        self.insert_raw(key, json)
    }
}
