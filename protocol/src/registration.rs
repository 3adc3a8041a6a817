//! Registration state machine
//!
//! ```text
//! Uninitialized --sdk ready--> KeyMissing --generate--> KeyPresentUnregistered
//!                                                          |        ^
//!                                                       register  failure
//!                                                          v        |
//!                                                     Registering --+
//!                                                          |
//!                                                       success
//!                                                          v
//!                                                        Ready
//! ```
//!
//! The state is never cached: every read combines SDK readiness, local key
//! presence, the in-flight flag and the on-chain registration status.

use std::sync::Arc;

use crate::error::ProtocolError;
use crate::inflight::{InFlight, InFlightGuard};
use crate::keys::KeyManager;
use crate::ports::keystore::KeyStore;
use crate::ports::registrar::Registrar;
use crate::sdk::SdkHandle;
use crate::types::{DecryptionKey, KeyScope, TxHash};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrationState {
    Uninitialized,
    KeyMissing,
    KeyPresentUnregistered,
    Registering,
    Ready,
}

impl RegistrationState {
    pub fn derive(
        sdk_initialized: bool,
        key_present: bool,
        registered_on_chain: bool,
        registration_in_flight: bool,
    ) -> Self {
        if !sdk_initialized {
            RegistrationState::Uninitialized
        } else if registration_in_flight {
            RegistrationState::Registering
        } else if !key_present {
            RegistrationState::KeyMissing
        } else if !registered_on_chain {
            RegistrationState::KeyPresentUnregistered
        } else {
            RegistrationState::Ready
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, RegistrationState::Ready)
    }

    /// The error an operation gated on `Ready` reports from this state
    pub fn not_ready_error(&self, scope: KeyScope) -> Option<ProtocolError> {
        match self {
            RegistrationState::Ready => None,
            RegistrationState::Uninitialized => Some(ProtocolError::SdkNotInitialized),
            RegistrationState::KeyMissing => Some(ProtocolError::KeyMissing(scope)),
            RegistrationState::KeyPresentUnregistered | RegistrationState::Registering => {
                Some(ProtocolError::NotRegistered(scope))
            }
        }
    }
}

impl std::fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RegistrationState::Uninitialized => "SDK not initialized",
            RegistrationState::KeyMissing => "decryption key missing",
            RegistrationState::KeyPresentUnregistered => "key present, not registered",
            RegistrationState::Registering => "registration in progress",
            RegistrationState::Ready => "ready",
        };
        f.write_str(label)
    }
}

/// Result of [`RegistrationCoordinator::register_with_key`]
#[derive(Debug)]
pub struct RegistrationOutcome {
    /// Key material the registration used
    pub key: DecryptionKey,
    /// `None` when the scope was already registered and nothing was submitted
    pub tx_hash: Option<TxHash>,
    /// Whether a new key was generated during this call
    pub generated_key: bool,
}

pub struct RegistrationCoordinator<S: KeyStore, P: Registrar> {
    keys: Arc<KeyManager<S>>,
    sdk: SdkHandle<P>,
    inflight: InFlight,
}

impl<S: KeyStore, P: Registrar> RegistrationCoordinator<S, P> {
    pub fn new(keys: Arc<KeyManager<S>>, sdk: SdkHandle<P>) -> Self {
        Self {
            keys,
            sdk,
            inflight: InFlight::new("registration"),
        }
    }

    pub async fn state(&self, scope: &KeyScope) -> Result<RegistrationState, ProtocolError> {
        let Ok(primitive) = self.sdk.primitive() else {
            return Ok(RegistrationState::Uninitialized);
        };
        if self.inflight.is_active(scope) {
            return Ok(RegistrationState::Registering);
        }
        if !self.keys.has_stored_key(scope)? {
            return Ok(RegistrationState::KeyMissing);
        }
        let registered = primitive.is_registered(scope).await?;
        Ok(RegistrationState::derive(true, true, registered, false))
    }

    /// Current state, or the error an operation gated on `Ready` reports
    pub async fn require_ready(&self, scope: &KeyScope) -> Result<RegistrationState, ProtocolError> {
        let state = self.state(scope).await?;
        match state.not_ready_error(*scope) {
            Some(err) => {
                tracing::debug!(%scope, %state, "operation rejected, scope not ready");
                Err(err)
            }
            None => Ok(state),
        }
    }

    /// `KeyMissing -> KeyPresentUnregistered`.
    ///
    /// Refuses to replace the key of a scope that is already registered, since the
    /// new key would not match the registered public key.
    pub async fn generate_key(&self, scope: &KeyScope) -> Result<DecryptionKey, ProtocolError> {
        let primitive = self.sdk.primitive()?;
        let _guard = self.inflight.claim(*scope)?;

        if self.keys.has_stored_key(scope)? && primitive.is_registered(scope).await? {
            return Err(ProtocolError::AlreadyRegistered(*scope));
        }
        self.keys.generate_and_store_key(primitive.as_ref(), scope).await
    }

    /// `KeyPresentUnregistered -> Ready` using the stored key.
    ///
    /// Returns `None` without submitting when the scope is already registered.
    pub async fn register(&self, scope: &KeyScope) -> Result<Option<TxHash>, ProtocolError> {
        let primitive = self.sdk.primitive()?;
        let guard = self.inflight.claim(*scope)?;

        let key = self
            .keys
            .load_key(scope)?
            .ok_or(ProtocolError::KeyMissing(*scope))?;

        self.submit(primitive.as_ref(), scope, &key, guard).await
    }

    /// Generate a key if absent, then register. The returned key is the exact
    /// material used for registration.
    pub async fn register_with_key(&self, scope: &KeyScope) -> Result<RegistrationOutcome, ProtocolError> {
        let primitive = self.sdk.primitive()?;
        let guard = self.inflight.claim(*scope)?;

        let (key, generated_key) = match self.keys.load_key(scope)? {
            Some(key) => (key, false),
            None => (self.keys.generate_and_store_key(primitive.as_ref(), scope).await?, true),
        };

        let tx_hash = self.submit(primitive.as_ref(), scope, &key, guard).await?;
        Ok(RegistrationOutcome { key, tx_hash, generated_key })
    }

    async fn submit(
        &self,
        primitive: &P,
        scope: &KeyScope,
        key: &DecryptionKey,
        _guard: InFlightGuard,
    ) -> Result<Option<TxHash>, ProtocolError> {
        if primitive.is_registered(scope).await? {
            tracing::debug!(%scope, "already registered, nothing to submit");
            return Ok(None);
        }

        match primitive.register(scope, key).await {
            Ok(tx_hash) => {
                tracing::info!(%scope, %tx_hash, "registered decryption key");
                Ok(Some(tx_hash))
            }
            Err(e) => {
                tracing::warn!(%scope, error = %e, "registration failed");
                Err(ProtocolError::RegistrationFailed(e.to_string()))
            }
        }
    }

    /// Drop the local key; the scope falls back to `KeyMissing`.
    pub fn clear_key(&self, scope: &KeyScope) -> Result<(), ProtocolError> {
        let _guard = self.inflight.claim(*scope)?;
        self.keys.clear_key(scope)
    }
}
