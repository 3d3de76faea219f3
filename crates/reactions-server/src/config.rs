// SPDX-License-Identifier: Apache-2.0
//! Persisted server preferences: a storage port plus the filesystem adapter
//! (JSON files under the platform config dir).

use std::fs;
use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

/// Error type for preference load/save.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Key not present in the store.
    #[error("not found")]
    NotFound,
    /// I/O error while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization/deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Catch-all error variant.
    #[error("other: {0}")]
    Other(String),
}

/// Storage port for raw preference blobs, keyed by logical name.
pub trait ConfigStore {
    /// Load a raw blob. Returns `NotFound` when missing.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Persist a raw blob.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// JSON files under the platform config directory
/// (e.g. `~/.config/Reactions/<key>.json`).
pub struct FsConfigStore {
    base: PathBuf,
}

impl FsConfigStore {
    /// Create a store rooted at the user config directory.
    pub fn new() -> Result<Self, ConfigError> {
        let proj = ProjectDirs::from("dev", "flying-reactions", "Reactions")
            .ok_or_else(|| ConfigError::Other("could not resolve config dir".into()))?;
        let base = proj.config_dir().to_path_buf();
        fs::create_dir_all(&base)?;
        Ok(Self { base })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base.join(format!("{key}.json"))
    }
}

impl ConfigStore for FsConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(ConfigError::NotFound),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, data)?;
        Ok(())
    }
}

/// Thin service serializing typed preference values over a [`ConfigStore`].
pub struct ConfigService<S> {
    store: S,
}

impl<S: ConfigStore> ConfigService<S> {
    /// Wrap a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Load and deserialize the value for `key`. `Ok(None)` when missing.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.store.load_raw(key) {
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(ConfigError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Serialize and persist the value for `key`.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ConfigError> {
        let data = serde_json::to_vec_pretty(value)?;
        self.store.save_raw(key, &data)
    }
}

/// Persisted server preferences; CLI flags override individual fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerPrefs {
    /// TCP listener address.
    pub listen: String,
    /// Directory holding the persisted counter files.
    pub data_dir: String,
    /// Base URL clients post submissions to, as advertised in the bootstrap.
    pub endpoint_url: String,
    /// Ledger cookie lifetime in days.
    pub cookie_days: u32,
}

impl Default for ServerPrefs {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8780".to_string(),
            data_dir: "./reactions-data".to_string(),
            endpoint_url: "/reactions".to_string(),
            // Matches the client ledger's default cookie lifetime.
            cookie_days: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemStore {
        blobs: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl ConfigStore for MemStore {
        fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
            self.blobs
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .ok_or(ConfigError::NotFound)
        }

        fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
            self.blobs
                .lock()
                .unwrap()
                .insert(key.to_string(), data.to_vec());
            Ok(())
        }
    }

    #[test]
    fn missing_key_loads_as_none() {
        let service = ConfigService::new(MemStore::default());
        let prefs: Option<ServerPrefs> = service.load("server").unwrap();
        assert!(prefs.is_none());
    }

    #[test]
    fn prefs_round_trip_through_the_store() {
        let service = ConfigService::new(MemStore::default());
        let prefs = ServerPrefs {
            cookie_days: 7,
            ..ServerPrefs::default()
        };
        service.save("server", &prefs).unwrap();

        let loaded: ServerPrefs = service.load("server").unwrap().unwrap();
        assert_eq!(loaded.cookie_days, 7);
        assert_eq!(loaded.listen, prefs.listen);
    }
}
