//! Decryption key lifecycle: generate, normalize, persist, load
//!
//! Keys are stored per `(address, mode)` scope through an injected [`KeyStore`].
//! Presence is a plain boolean; the key itself is never validated here.

use crate::error::ProtocolError;
use crate::ports::keystore::KeyStore;
use crate::ports::registrar::{GeneratedKey, KeyGenerator};
use crate::types::{DecryptionKey, KeyScope};

pub struct KeyManager<S: KeyStore> {
    store: S,
}

impl<S: KeyStore> KeyManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Existence check only; nothing is decoded.
    pub fn has_stored_key(&self, scope: &KeyScope) -> Result<bool, ProtocolError> {
        Ok(self.store.contains(scope)?)
    }

    /// Ask the external primitive for a key, normalize it to a string and persist it.
    ///
    /// Overwrites any existing key for the scope. Callers that must not orphan a
    /// registered key go through [`crate::registration::RegistrationCoordinator`].
    pub async fn generate_and_store_key<G: KeyGenerator>(
        &self,
        generator: &G,
        scope: &KeyScope,
    ) -> Result<DecryptionKey, ProtocolError> {
        let generated = generator
            .generate_decryption_key(scope)
            .await
            .map_err(|e| ProtocolError::KeyGenerationFailed(e.to_string()))?;

        let key = normalize(generated)?;

        self.store
            .set(scope, key.expose())
            .map_err(ProtocolError::KeyPersistenceFailed)?;

        tracing::info!(%scope, "stored new decryption key");
        Ok(key)
    }

    /// Raw stored value, without any well-formedness check.
    pub fn load_key(&self, scope: &KeyScope) -> Result<Option<DecryptionKey>, ProtocolError> {
        Ok(self.store.get(scope)?.map(DecryptionKey::new))
    }

    /// Remove the key for a scope (corruption recovery).
    pub fn clear_key(&self, scope: &KeyScope) -> Result<(), ProtocolError> {
        self.store.delete(scope)?;
        tracing::warn!(%scope, "cleared decryption key");
        Ok(())
    }
}

/// Serialize a generated key into its storage form.
///
/// Structured keys are encoded as JSON; `serde_json::Value` keeps object keys
/// sorted, so the same key always yields the same string.
pub fn normalize(generated: GeneratedKey) -> Result<DecryptionKey, ProtocolError> {
    match generated {
        GeneratedKey::Raw(raw) if raw.is_empty() => Err(ProtocolError::KeyGenerationFailed(
            "primitive returned an empty key".into(),
        )),
        GeneratedKey::Raw(raw) => Ok(DecryptionKey::new(raw)),
        GeneratedKey::Structured(value) => serde_json::to_string(&value)
            .map(DecryptionKey::new)
            .map_err(|e| ProtocolError::KeyGenerationFailed(format!("unserializable key: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::InMemoryKeyStore;
    use crate::ports::registrar::RegistrarError;
    use crate::ports::StoreError;
    use crate::types::{Address, Mode};
    use serde_json::json;

    struct FixedGenerator(Result<GeneratedKey, String>);

    impl KeyGenerator for FixedGenerator {
        async fn generate_decryption_key(&self, _scope: &KeyScope) -> Result<GeneratedKey, RegistrarError> {
            self.0.clone().map_err(RegistrarError::KeyGeneration)
        }
    }

    struct FullStore;

    impl KeyStore for FullStore {
        fn get(&self, _scope: &KeyScope) -> Result<Option<String>, StoreError> {
            Ok(None)
        }
        fn set(&self, _scope: &KeyScope, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Internal("quota exceeded".into()))
        }
        fn delete(&self, _scope: &KeyScope) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn scope() -> KeyScope {
        KeyScope::new(Address::from_bytes([7; 20]), Mode::Standalone)
    }

    #[tokio::test]
    async fn test_presence_flips_after_generation() {
        let manager = KeyManager::new(InMemoryKeyStore::new());
        let generator = FixedGenerator(Ok(GeneratedKey::Raw("raw-key".into())));

        assert!(!manager.has_stored_key(&scope()).unwrap());
        let key = manager.generate_and_store_key(&generator, &scope()).await.unwrap();
        assert!(manager.has_stored_key(&scope()).unwrap());
        assert_eq!(manager.load_key(&scope()).unwrap(), Some(key));
    }

    #[tokio::test]
    async fn test_structured_key_is_deterministic_json() {
        let manager = KeyManager::new(InMemoryKeyStore::new());
        let generator = FixedGenerator(Ok(GeneratedKey::Structured(json!({ "z": 1, "a": [2, 3] }))));

        let key = manager.generate_and_store_key(&generator, &scope()).await.unwrap();
        assert_eq!(key.expose(), r#"{"a":[2,3],"z":1}"#);
    }

    #[tokio::test]
    async fn test_generation_failure_surfaces() {
        let manager = KeyManager::new(InMemoryKeyStore::new());
        let generator = FixedGenerator(Err("user closed signing prompt".into()));

        let err = manager.generate_and_store_key(&generator, &scope()).await.unwrap_err();
        assert!(matches!(err, ProtocolError::KeyGenerationFailed(_)));
        assert!(!manager.has_stored_key(&scope()).unwrap());
    }

    #[tokio::test]
    async fn test_persistence_failure_surfaces() {
        let manager = KeyManager::new(FullStore);
        let generator = FixedGenerator(Ok(GeneratedKey::Raw("raw-key".into())));

        let err = manager.generate_and_store_key(&generator, &scope()).await.unwrap_err();
        assert!(matches!(err, ProtocolError::KeyPersistenceFailed(_)));
    }

    #[test]
    fn test_empty_raw_key_rejected() {
        assert!(matches!(
            normalize(GeneratedKey::Raw(String::new())),
            Err(ProtocolError::KeyGenerationFailed(_))
        ));
    }

    #[test]
    fn test_clear_key() {
        let manager = KeyManager::new(InMemoryKeyStore::new());
        manager.store().set(&scope(), "k").unwrap();
        manager.clear_key(&scope()).unwrap();
        assert_eq!(manager.load_key(&scope()).unwrap(), None);
    }
}
