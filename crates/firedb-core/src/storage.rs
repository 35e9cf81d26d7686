//! Scoped local storage and the credential store built on it.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, trace};

use crate::Result;
use crate::tokens::IdToken;
use crate::types::ApiKey;

/// Prefix of the storage key holding the current credential token.
pub const TOKEN_KEY_PREFIX: &str = "FirebaseUserToken";

/// A string key/value store scoped to one client context.
pub trait ScopedStorage: Send + Sync {
    /// Read an item.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Write an item, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove an item. Removing a missing item is not an error.
    fn remove_item(&self, key: &str) -> Result<()>;
}

/// In-process storage that lives as long as the value does.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScopedStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        items.remove(key);
        Ok(())
    }
}

/// Holds the current credential token under `"FirebaseUserToken-<apiKey>"`.
///
/// Everything may read the token; only the session manager writes or clears
/// it, which is why the mutating methods are crate-private.
#[derive(Clone)]
pub struct CredentialStore {
    storage: Arc<dyn ScopedStorage>,
    key: String,
}

impl CredentialStore {
    /// Create a credential store scoped to the given project key.
    pub fn new(storage: Arc<dyn ScopedStorage>, api_key: &ApiKey) -> Self {
        Self {
            storage,
            key: Self::key_for(api_key),
        }
    }

    /// Storage key used for a project.
    pub fn key_for(api_key: &ApiKey) -> String {
        format!("{}-{}", TOKEN_KEY_PREFIX, api_key)
    }

    /// Returns the storage key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the current token. Blank stored values count as absent.
    pub fn read(&self) -> Result<Option<IdToken>> {
        let token = self
            .storage
            .get_item(&self.key)?
            .map(IdToken::new)
            .filter(|t| !t.is_empty());
        trace!(present = token.is_some(), "Read credential token");
        Ok(token)
    }

    pub(crate) fn write(&self, token: &IdToken) -> Result<()> {
        debug!(key = %self.key, "Storing credential token");
        self.storage.set_item(&self.key, token.as_str())
    }

    pub(crate) fn clear(&self) -> Result<()> {
        debug!(key = %self.key, "Removing credential token");
        self.storage.remove_item(&self.key)
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("key", &self.key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(api_key: &str) -> (Arc<MemoryStorage>, CredentialStore) {
        let storage = Arc::new(MemoryStorage::new());
        let store = CredentialStore::new(storage.clone(), &ApiKey::new(api_key).unwrap());
        (storage, store)
    }

    #[test]
    fn key_is_scoped_by_api_key() {
        let (_, store) = store("AIza-demo");
        assert_eq!(store.key(), "FirebaseUserToken-AIza-demo");
    }

    #[test]
    fn write_read_clear() {
        let (_, store) = store("k");
        assert!(store.read().unwrap().is_none());

        store.write(&IdToken::new("t1")).unwrap();
        assert_eq!(store.read().unwrap(), Some(IdToken::new("t1")));

        store.write(&IdToken::new("t2")).unwrap();
        assert_eq!(store.read().unwrap(), Some(IdToken::new("t2")));

        store.clear().unwrap();
        assert!(store.read().unwrap().is_none());
    }

    #[test]
    fn environments_do_not_collide() {
        let storage = Arc::new(MemoryStorage::new());
        let dev = CredentialStore::new(storage.clone(), &ApiKey::new("dev").unwrap());
        let live = CredentialStore::new(storage, &ApiKey::new("live").unwrap());

        dev.write(&IdToken::new("dev-token")).unwrap();
        assert!(live.read().unwrap().is_none());
    }

    #[test]
    fn blank_value_reads_as_absent() {
        let (storage, store) = store("k");
        storage.set_item(store.key(), "").unwrap();
        assert!(store.read().unwrap().is_none());
    }
}
