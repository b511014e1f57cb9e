//! Durable key-value storage for session tokens

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::AuthError;

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Key written by older releases; read on restore, cleared on logout
pub const LEGACY_TOKEN_KEY: &str = "token";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
/// JSON-encoded [`Identity`](crate::Identity)
pub const USER_KEY: &str = "user";

pub(crate) const ALL_KEYS: [&str; 4] = [ACCESS_TOKEN_KEY, LEGACY_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY];

/// String key-value store that survives restarts
pub trait SessionStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), AuthError>;

    fn remove_item(&self, key: &str) -> Result<(), AuthError>;
}

/// In-process storage. Nothing survives the process; useful for tests and
/// for callers that persist sessions themselves.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-populated with `items`
    pub fn with_items<'a>(items: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let items = items
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            items: RwLock::new(items),
        }
    }

    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        let items = self.items.read().unwrap_or_else(|e| e.into_inner());
        items.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), AuthError> {
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), AuthError> {
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        items.remove(key);
        Ok(())
    }
}

/// Storage backed by a single JSON object file, rewritten on every change
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    items: RwLock<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or lazily create) the storage file at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        let path = path.as_ref().to_path_buf();
        let items = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                return Err(AuthError::Storage(format!(
                    "failed to read {}: {}",
                    path.display(),
                    err
                )))
            }
        };

        Ok(Self {
            path,
            items: RwLock::new(items),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, items: &BTreeMap<String, String>) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| {
                    AuthError::Storage(format!("failed to create {}: {}", parent.display(), err))
                })?;
            }
        }
        let raw = serde_json::to_string_pretty(items)?;
        fs::write(&self.path, raw).map_err(|err| {
            AuthError::Storage(format!("failed to write {}: {}", self.path.display(), err))
        })
    }
}

impl SessionStorage for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        let items = self.items.read().unwrap_or_else(|e| e.into_inner());
        items.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), AuthError> {
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        items.insert(key.to_string(), value.to_string());
        self.flush(&items)
    }

    fn remove_item(&self, key: &str) -> Result<(), AuthError> {
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        if items.remove(key).is_some() {
            self.flush(&items)?;
        }
        Ok(())
    }
}
