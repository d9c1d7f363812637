//! Durable client-side key/value storage (the browser's local storage analog).
//!
//! Keys in use:
//!   - `stanzle_daily_challenge` : cached daily challenge record (JSON)
//!   - `authToken`               : session token
//!   - `user`                    : serialized `UserStats`

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::error::ClientError;

pub const DAILY_CHALLENGE_KEY: &str = "stanzle_daily_challenge";
pub const AUTH_TOKEN_KEY: &str = "authToken";
pub const USER_KEY: &str = "user";

pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError>;
    fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;
    fn remove(&self, key: &str) -> Result<(), ClientError>;
}

/// All keys in one JSON object on disk, rewritten atomically on every change.
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ClientError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        debug!(target: "stanzle", path = %path.display(), "Opened local store");
        Ok(Self { path, lock: Mutex::new(()) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing or unreadable file reads as empty; the store never refuses to start.
    fn read_all(&self) -> BTreeMap<String, String> {
        match fs::read_to_string(&self.path) {
            Ok(s) => match serde_json::from_str::<BTreeMap<String, String>>(&s) {
                Ok(map) => map,
                Err(e) => {
                    warn!(target: "stanzle", path = %self.path.display(), error = %e, "Local store is corrupt; starting empty");
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        }
    }

    fn write_all(&self, map: &BTreeMap<String, String>) -> Result<(), ClientError> {
        let tmp = self.path.with_extension("json.tmp");
        let data = serde_json::to_vec_pretty(map).map_err(|e| ClientError::Storage(e.to_string()))?;
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update<F: FnOnce(&mut BTreeMap<String, String>)>(&self, f: F) -> Result<(), ClientError> {
        let _guard = self.lock.lock().map_err(|_| ClientError::Storage("store lock poisoned".into()))?;
        let mut map = self.read_all();
        f(&mut map);
        self.write_all(&map)
    }
}

impl LocalStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        let _guard = self.lock.lock().map_err(|_| ClientError::Storage("store lock poisoned".into()))?;
        Ok(self.read_all().remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.update(|m| {
            m.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        self.update(|m| {
            m.remove(key);
        })
    }
}

/// Process-local store for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        let map = self.inner.lock().map_err(|_| ClientError::Storage("store lock poisoned".into()))?;
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let mut map = self.inner.lock().map_err(|_| ClientError::Storage("store lock poisoned".into()))?;
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        let mut map = self.inner.lock().map_err(|_| ClientError::Storage("store lock poisoned".into()))?;
        map.remove(key);
        Ok(())
    }
}

impl<S: LocalStore + ?Sized> LocalStore for &S {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        (**self).remove(key)
    }
}

impl<S: LocalStore + ?Sized> LocalStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        (**self).remove(key)
    }
}
