//! Secure key-value storage
//!
//! The wallet core owns two keys per wallet (vault record and quick-pay
//! policy). Values are JSON documents; the platform secure store sits behind
//! [`SecureStore`].

use crate::{Error, Result};
use async_trait::async_trait;
use directories::ProjectDirs;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// At-rest key-value store
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Read a value
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value (no-op if absent)
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Storage keys owned by one wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    key_prefix: String,
}

impl StorageKeys {
    /// Key names for a wallet id
    pub fn for_wallet(wallet_id: &str) -> Self {
        Self {
            key_prefix: format!("custody_wallet_{}", wallet_id),
        }
    }

    /// Key holding the vault record
    pub fn vault_key(&self) -> String {
        format!("{}_vault", self.key_prefix)
    }

    /// Key holding the quick-pay policy
    pub fn quick_pay_key(&self) -> String {
        format!("{}_quickpay", self.key_prefix)
    }

    /// Both owned keys
    pub fn all(&self) -> [String; 2] {
        [self.vault_key(), self.quick_pay_key()]
    }
}

/// In-memory store for tests and simulators
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl SecureStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// Directory-backed store, one JSON file per key
///
/// Writes go to a temporary file and are renamed into place.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `root`
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        tracing::debug!("Opened file store at {}", root.display());
        Ok(Self { root })
    }

    /// Open the store in the platform data directory
    pub async fn open_default() -> Result<Self> {
        Self::open(default_store_dir()).await
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl SecureStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Default on-disk location of the file store
pub fn default_store_dir() -> PathBuf {
    ProjectDirs::from("com", "Custody", "CustodyWallet")
        .map(|dirs| dirs.data_local_dir().join("secure_store"))
        .unwrap_or_else(|| PathBuf::from("secure_store"))
}

fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(Error::Validation(format!("Invalid storage key: {:?}", key)));
    }
    Ok(())
}

/// Load and deserialize a JSON value
pub async fn load_json<T: serde::de::DeserializeOwned>(
    store: &dyn SecureStore,
    key: &str,
) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Serialize and store a JSON value
pub async fn save_json<T: serde::Serialize>(
    store: &dyn SecureStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_keys() {
        let keys = StorageKeys::for_wallet("main");
        assert_eq!(keys.vault_key(), "custody_wallet_main_vault");
        assert_eq!(keys.quick_pay_key(), "custody_wallet_main_quickpay");
        assert_eq!(keys.all().len(), 2);
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("a").await.unwrap(), None);

        store.set("a", "1").await.unwrap();
        store.set("a", "2").await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("2"));
        assert_eq!(store.len(), 1);

        store.delete("a").await.unwrap();
        store.delete("a").await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("nested")).await.unwrap();

        store.set("custody_wallet_x_vault", "{\"v\":1}").await.unwrap();
        assert_eq!(
            store.get("custody_wallet_x_vault").await.unwrap().as_deref(),
            Some("{\"v\":1}")
        );

        // Reopening sees the same data
        let reopened = FileStore::open(store.root().to_path_buf()).await.unwrap();
        assert!(reopened.get("custody_wallet_x_vault").await.unwrap().is_some());

        store.delete("custody_wallet_x_vault").await.unwrap();
        assert_eq!(store.get("custody_wallet_x_vault").await.unwrap(), None);
        store.delete("custody_wallet_x_vault").await.unwrap();
    }

    #[tokio::test]
    async fn test_file_store_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        assert!(matches!(
            store.set("../escape", "x").await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(store.get("").await, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_json_helpers() {
        let store = MemoryStore::new();
        save_json(&store, "k", &vec![1u32, 2, 3]).await.unwrap();
        let loaded: Option<Vec<u32>> = load_json(&store, "k").await.unwrap();
        assert_eq!(loaded, Some(vec![1, 2, 3]));

        store.set("bad", "not json").await.unwrap();
        let result: Result<Option<Vec<u32>>> = load_json(&store, "bad").await;
        assert!(matches!(result, Err(Error::Serialization(_))));
    }
}
