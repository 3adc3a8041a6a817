use std::future::Future;

use crate::types::{DecryptionKey, KeyScope, TxHash};

/// Raw output of the external key-generation primitive
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedKey {
    Raw(String),
    Structured(serde_json::Value),
}

/// Port for the external decryption-key generation primitive.
pub trait KeyGenerator: Send + Sync {
    fn generate_decryption_key(
        &self,
        scope: &KeyScope,
    ) -> impl Future<Output = Result<GeneratedKey, RegistrarError>> + Send;
}

/// Port for the registration primitive of the privacy layer.
///
/// Implementations:
/// - `LocalNetwork` (simulated network, CLI and integration tests)
pub trait Registrar: KeyGenerator {
    /// Whether the scope's public key is registered on chain.
    fn is_registered(
        &self,
        scope: &KeyScope,
    ) -> impl Future<Output = Result<bool, RegistrarError>> + Send;

    /// Submit the registration transaction for the scope using its key.
    fn register(
        &self,
        scope: &KeyScope,
        key: &DecryptionKey,
    ) -> impl Future<Output = Result<TxHash, RegistrarError>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum RegistrarError {
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    #[error("registration rejected: {0}")]
    Rejected(String),

    #[error("RPC error: {0}")]
    Rpc(String),
}
