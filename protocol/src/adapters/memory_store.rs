use std::collections::HashMap;
use std::sync::Mutex;

use crate::ports::keystore::{KeyStore, StoreError};
use crate::types::KeyScope;

/// In-memory implementation of `KeyStore` for tests and ephemeral sessions.
#[derive(Default)]
pub struct InMemoryKeyStore {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Internal("key store mutex poisoned".into()))
    }
}

impl KeyStore for InMemoryKeyStore {
    fn get(&self, scope: &KeyScope) -> Result<Option<String>, StoreError> {
        Ok(self.lock()?.get(&scope.storage_key()).cloned())
    }

    fn set(&self, scope: &KeyScope, value: &str) -> Result<(), StoreError> {
        self.lock()?.insert(scope.storage_key(), value.to_string());
        Ok(())
    }

    fn delete(&self, scope: &KeyScope) -> Result<(), StoreError> {
        self.lock()?.remove(&scope.storage_key());
        Ok(())
    }

    fn contains(&self, scope: &KeyScope) -> Result<bool, StoreError> {
        Ok(self.lock()?.contains_key(&scope.storage_key()))
    }
}
