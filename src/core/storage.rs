//! Local key-value persistence
//!
//! String keys and string values only; structured data is JSON-serialized by
//! the callers. Three backends:
//! - `KeyringStore` - the whole map as one JSON blob in the system keyring
//! - `FileStore` - a JSON file in the config directory
//! - `MemoryStore` - process-local, used by tests and ephemeral sessions
//!
//! Every backend keeps the full map in one record, so `remove_many` and
//! `clear` are a single write and never leave a partial state behind.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fs2::FileExt;
use keyring::Entry;
use tokio::sync::RwLock;

use crate::core::config::{Config, StorageBackend};
use crate::error::{Result, ScoutError};

const SERVICE_NAME: &str = "soundscout";
const KEYRING_ENTRY: &str = "local_store";
const STORE_FILE: &str = "store.json";

/// Async key-value persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value; missing keys are not an error
    async fn remove(&self, key: &str) -> Result<()>;

    /// Remove several keys in one atomic write
    async fn remove_many(&self, keys: &[&'static str]) -> Result<()>;

    /// Remove everything
    async fn clear(&self) -> Result<()>;
}

/// Open the backend selected in the configuration
pub fn open_store(config: &Config) -> Result<Arc<dyn KeyValueStore>> {
    match config.storage {
        StorageBackend::Keyring => Ok(Arc::new(KeyringStore::new())),
        StorageBackend::File => {
            let path = Config::config_dir()?.join(STORE_FILE);
            Ok(Arc::new(FileStore::new(path)))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn remove_many(&self, keys: &[&'static str]) -> Result<()> {
        let mut entries = self.entries.write().await;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File
// ─────────────────────────────────────────────────────────────────────────────

/// JSON file store
///
/// Several processes share the file (a running `sync` next to one-shot
/// commands), so nothing is cached: reads go to disk, and every mutation
/// re-reads the file under an exclusive lock on a sibling `.lock` file before
/// applying its change. Writes go to a temp file that is renamed over the
/// original, so readers never see a partial map.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Apply a mutation to the current contents of the file
    async fn mutate<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>) + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let _lock = lock_exclusive(&path)?;
            let mut entries = read_map(&path)?;
            f(&mut entries);
            write_map(&path, &entries)
        })
        .await
        .map_err(|e| ScoutError::Storage(format!("Storage task failed: {}", e)))?
    }
}

/// Held for the duration of a read-modify-write; released on drop
fn lock_exclusive(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path.with_extension("lock"))?;
    file.lock_exclusive()
        .map_err(|e| ScoutError::Storage(format!("Failed to lock {}: {}", path.display(), e)))?;
    Ok(file)
}

fn read_map(path: &Path) -> Result<BTreeMap<String, String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => parse_map(path, &contents),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(e.into()),
    }
}

fn parse_map(path: &Path, contents: &str) -> Result<BTreeMap<String, String>> {
    if contents.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(contents)
        .map_err(|e| ScoutError::Storage(format!("{} is corrupt: {}", path.display(), e)))
}

fn write_map(path: &Path, entries: &BTreeMap<String, String>) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => parse_map(&self.path, &contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let (key, value) = (key.to_string(), value.to_string());
        self.mutate(move |entries| {
            entries.insert(key, value);
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.mutate(move |entries| {
            entries.remove(&key);
        })
        .await
    }

    async fn remove_many(&self, keys: &[&'static str]) -> Result<()> {
        let keys = keys.to_vec();
        self.mutate(move |entries| {
            for key in keys {
                entries.remove(key);
            }
        })
        .await
    }

    async fn clear(&self) -> Result<()> {
        self.mutate(|entries| entries.clear()).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Keyring
// ─────────────────────────────────────────────────────────────────────────────

/// System keyring store
///
/// The map is fetched from the keychain on every access since other
/// processes write the same entry. Mutations inside this process are
/// serialized so two writers never interleave their fetch and store.
pub struct KeyringStore {
    service: String,
    writer: Mutex<()>,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    /// Use a custom keyring service name
    pub fn with_service(service: &str) -> Self {
        Self {
            service: service.to_string(),
            writer: Mutex::new(()),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Ok(Entry::new(&self.service, KEYRING_ENTRY)?)
    }

    fn fetch(&self) -> Result<BTreeMap<String, String>> {
        match self.entry()?.get_password() {
            Ok(json) => serde_json::from_str(&json)
                .map_err(|e| ScoutError::Storage(format!("Invalid keyring contents: {}", e))),
            Err(keyring::Error::NoEntry) => Ok(BTreeMap::new()),
            Err(e) => Err(ScoutError::Credential(format!(
                "Cannot access system keychain. Make sure your keyring is unlocked. ({})",
                e
            ))),
        }
    }

    fn mutate(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
        let _writer = self
            .writer
            .lock()
            .map_err(|_| ScoutError::Storage("keyring writer poisoned".into()))?;

        let mut entries = self.fetch()?;
        f(&mut entries);
        self.entry()?
            .set_password(&serde_json::to_string(&entries)?)?;
        Ok(())
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for KeyringStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.fetch()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.mutate(|entries| {
            entries.remove(key);
        })
    }

    async fn remove_many(&self, keys: &[&'static str]) -> Result<()> {
        self.mutate(|entries| {
            for key in keys {
                entries.remove(*key);
            }
        })
    }

    async fn clear(&self) -> Result<()> {
        let _writer = self
            .writer
            .lock()
            .map_err(|_| ScoutError::Storage("keyring writer poisoned".into()))?;
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(ScoutError::Credential(e.to_string())),
        }
    }
}
