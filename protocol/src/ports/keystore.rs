use crate::types::KeyScope;

/// Durable local persistence of one serialized decryption key per scope.
///
/// Implementations:
/// - `InMemoryKeyStore` (tests, ephemeral sessions)
/// - `EncryptedFileKeyStore` (password-protected vault on disk)
pub trait KeyStore: Send + Sync {
    /// Read the raw serialized key, if any.
    fn get(&self, scope: &KeyScope) -> Result<Option<String>, StoreError>;

    /// Store a serialized key, overwriting any previous value.
    fn set(&self, scope: &KeyScope, value: &str) -> Result<(), StoreError>;

    /// Remove the key for a scope. Removing an absent key is not an error.
    fn delete(&self, scope: &KeyScope) -> Result<(), StoreError>;

    /// Existence check without decrypting or decoding the entry.
    fn contains(&self, scope: &KeyScope) -> Result<bool, StoreError> {
        Ok(self.get(scope)?.is_some())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("key store is locked by another writer; remove {0} if no other hushfund process is running")]
    Locked(String),

    #[error("invalid vault password")]
    InvalidPassword,

    #[error("key store is corrupted: {0}")]
    Corrupted(String),

    #[error("key store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal key store error: {0}")]
    Internal(String),
}
