// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Engine configuration and its storage port.
//!
//! [`WireConfig`] is plain serde data. Where it lives is up to a
//! [`ConfigStore`]; [`ConfigService`] handles the JSON round trip.

use std::fs;
use std::path::PathBuf;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

/// Tunables of an [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireConfig {
    /// Track object identity so shared and cyclic references survive the
    /// round trip. Off by default: every reference is written inline.
    pub preserve_references: bool,
    /// Maximum nesting of framed values, for both encode and decode.
    ///
    /// Traversal recurses on the caller's stack. The default holds on a
    /// 2 MiB thread in an unoptimized build; raise it only together with the
    /// stack size of the threads that encode and decode.
    pub max_depth: usize,
    /// Maximum string length in bytes.
    pub max_string_len: usize,
    /// Maximum element count of a decoded collection.
    pub max_collection_len: usize,
    /// Maximum number of distinct type names one decoded stream may declare.
    /// Each may instantiate a generic type and its codec, and both are kept
    /// for the life of the registry.
    pub max_manifests: usize,
}

impl WireConfig {
    /// Store key under which the engine configuration is kept.
    pub const KEY: &'static str = "tangle-wire";
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            preserve_references: false,
            max_depth: 128,
            max_string_len: 16 * 1024 * 1024,
            max_collection_len: 16 * 1024 * 1024,
            max_manifests: 1024,
        }
    }
}

/// Where serialized engine settings are kept, addressed by key.
pub trait ConfigStore {
    /// Bytes stored under `key`, or [`ConfigError::NotFound`].
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Replaces whatever is stored under `key`.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Failure loading or saving engine settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Nothing stored under the key.
    #[error("config key not found")]
    NotFound,
    /// The store could not be read or written.
    #[error("config store i/o: {0}")]
    Io(#[from] std::io::Error),
    /// Stored bytes are not valid JSON for the requested type.
    #[error("config json: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Keeps each key as `<base>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    base: PathBuf,
}

impl FileConfigStore {
    /// Store under `base`, which need not exist until the first save.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base.join(format!("{key}.json"))
    }
}

impl ConfigStore for FileConfigStore {
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

/// JSON encoding of settings on top of a [`ConfigStore`].
#[derive(Debug)]
pub struct ConfigService<S> {
    store: S,
}

impl<S> ConfigService<S> {
    /// Service over `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Gives the store back.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S> ConfigService<S>
where
    S: ConfigStore,
{
    /// Value stored under `key`; `None` when the key is absent or empty.
    pub fn load<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: DeserializeOwned,
    {
        match self.store.load_raw(key) {
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(ConfigError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Stores `value` under `key` as pretty-printed JSON.
    pub fn save<T>(&self, key: &str, value: &T) -> Result<(), ConfigError>
    where
        T: Serialize,
    {
        let data = serde_json::to_vec_pretty(value)?;
        self.store.save_raw(key, &data)
    }

    /// Loads the engine configuration, falling back to defaults when none is
    /// stored.
    pub fn load_wire_config(&self) -> Result<WireConfig, ConfigError> {
        Ok(self.load(WireConfig::KEY)?.unwrap_or_default())
    }
}
