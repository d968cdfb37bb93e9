use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::{models::task::Bucket, storage::DEFAULT_KEY};

const APP_DIR: &str = "ticktask";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config from '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config '{path}': {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Where the JSON store lives. Defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,
    /// Storage key of the task collection
    pub storage_key: String,
    /// Bucket for new tasks while the "all tasks" view is selected
    pub default_bucket: Bucket,
    pub tick_interval_ms: u64,
    /// Used when `RUST_LOG` is not set
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            storage_key: DEFAULT_KEY.to_string(),
            default_bucket: Bucket::Today,
            tick_interval_ms: 1_000,
            log_filter: String::from("warn"),
        }
    }
}

impl Config {
    /// Loads `path`, or the default config file when `path` is `None`. A
    /// missing file yields the defaults; a broken one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_path) else {
            warn!("no config directory available; using defaults");
            return Ok(Self::default());
        };

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no config file found; using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::ReadFailed { path, source: e }),
        };

        let config =
            toml::from_str(&content).map_err(|e| ConfigError::ParseFailed {
                path: path.clone(),
                source: e,
            })?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
        })
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}
