use std::path::PathBuf;

use thiserror::Error;

use crate::models::store::TaskDocument;

pub mod json;
pub mod memory;

/// Key the task collection is stored under unless configured otherwise.
pub const DEFAULT_KEY: &str = "tasks";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to load '{key}' from '{path}': {source}")]
    LoadFailed {
        key: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse stored '{key}': {source}")]
    ParseFailed {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to save '{key}' to '{path}': {source}")]
    SaveFailed {
        key: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize '{key}' to JSON: {source}")]
    SerializeFailed {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to create backup at '{path}': {source}")]
    BackupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to cleanup old backups in '{dir}': {source}")]
    CleanupFailed {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Stored '{key}' was written by a newer version of ticktask (version {version}). Please upgrade to open it."
    )]
    FutureVersion { key: String, version: u32 },

    #[error("Storage for '{0}' is unavailable")]
    Unavailable(String),
}

/// Key/value persistence of whole task collections. Writes always replace
/// the full document stored under a key.
pub trait Storage {
    /// The document stored under `key`, or an empty one if nothing is stored.
    fn get_or_default(&self, key: &str) -> Result<TaskDocument, StorageError>;
    fn set(&self, key: &str, document: &TaskDocument) -> Result<(), StorageError>;
}

fn check_version(key: &str, document: TaskDocument) -> Result<TaskDocument, StorageError> {
    use crate::models::store::CURRENT_VERSION;

    if document.version > CURRENT_VERSION {
        return Err(StorageError::FutureVersion {
            key: key.to_string(),
            version: document.version,
        });
    }
    Ok(document)
}
