//! Encrypted and decrypted balance views
//!
//! The encrypted balance is public and always readable once the SDK is up.
//! The decrypted balance needs a `Ready` scope and a stored key; any failure
//! yields `None` plus a recorded error so callers can show "unable to decrypt"
//! instead of failing. `None` is never conflated with zero.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::ProtocolError;
use crate::keys::KeyManager;
use crate::ports::keystore::KeyStore;
use crate::ports::ledger::EncryptedLedger;
use crate::registration::RegistrationState;
use crate::sdk::SdkHandle;
use crate::types::{EncryptedAmount, KeyScope};

/// Last known balances for the active scope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceSnapshot {
    pub encrypted: Option<EncryptedAmount>,
    /// Base units; `None` means unknown
    pub decrypted: Option<u128>,
    pub decimals: Option<u8>,
    pub last_error: Option<String>,
}

struct Stored {
    applied_ticket: u64,
    snapshot: BalanceSnapshot,
}

pub struct BalanceService<S: KeyStore, P: EncryptedLedger> {
    keys: Arc<KeyManager<S>>,
    sdk: SdkHandle<P>,
    tickets: AtomicU64,
    stored: Mutex<Stored>,
}

impl<S: KeyStore, P: EncryptedLedger> BalanceService<S, P> {
    pub fn new(keys: Arc<KeyManager<S>>, sdk: SdkHandle<P>) -> Self {
        Self {
            keys,
            sdk,
            tickets: AtomicU64::new(0),
            stored: Mutex::new(Stored {
                applied_ticket: 0,
                snapshot: BalanceSnapshot::default(),
            }),
        }
    }

    pub async fn encrypted_balance(&self, scope: &KeyScope) -> Result<EncryptedAmount, ProtocolError> {
        let primitive = self.sdk.primitive()?;
        primitive
            .encrypted_balance(scope)
            .await
            .map_err(ProtocolError::Ledger)
    }

    /// Decrypted balance, or `None` when it cannot be determined.
    pub async fn decrypted_balance(&self, scope: &KeyScope, state: RegistrationState) -> Option<u128> {
        match self.try_decrypt(scope, state).await {
            Ok(Some(value)) => {
                self.lock().snapshot.last_error = None;
                Some(value)
            }
            Ok(None) => None,
            Err(reason) => {
                self.lock().snapshot.last_error = Some(reason);
                None
            }
        }
    }

    /// Decrypted balance with the token's decimals, or `BalanceUnavailable`
    pub async fn require_decrypted(&self, scope: &KeyScope, state: RegistrationState) -> Result<(u128, u8), ProtocolError> {
        let balance = self
            .decrypted_balance(scope, state)
            .await
            .ok_or(ProtocolError::BalanceUnavailable)?;
        let decimals = self
            .sdk
            .primitive()?
            .decimals()
            .await
            .map_err(ProtocolError::Ledger)?;
        Ok((balance, decimals))
    }

    /// Re-fetch both representations.
    ///
    /// Concurrent refreshes are not queued. Each takes a ticket and only stores
    /// its result if no newer refresh has stored already; the freshest stored
    /// snapshot is returned.
    pub async fn refresh(&self, scope: &KeyScope, state: RegistrationState) -> BalanceSnapshot {
        let ticket = self.tickets.fetch_add(1, Ordering::SeqCst) + 1;
        let mut errors = Vec::new();

        let encrypted = match self.encrypted_balance(scope).await {
            Ok(encrypted) => Some(encrypted),
            Err(e) => {
                errors.push(e.to_string());
                None
            }
        };

        let decimals = match &encrypted {
            Some(encrypted) => Some(encrypted.decimals),
            None => match self.sdk.primitive() {
                Ok(primitive) => primitive.decimals().await.ok(),
                Err(_) => None,
            },
        };

        let decrypted = match self.try_decrypt(scope, state).await {
            Ok(value) => value,
            Err(reason) => {
                errors.push(reason);
                None
            }
        };

        let snapshot = BalanceSnapshot {
            encrypted,
            decrypted,
            decimals,
            last_error: (!errors.is_empty()).then(|| errors.join("; ")),
        };
        self.apply(ticket, snapshot)
    }

    /// Last stored snapshot
    pub fn snapshot(&self) -> BalanceSnapshot {
        self.lock().snapshot.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().snapshot.last_error.clone()
    }

    fn apply(&self, ticket: u64, snapshot: BalanceSnapshot) -> BalanceSnapshot {
        let mut stored = self.lock();
        if ticket > stored.applied_ticket {
            stored.applied_ticket = ticket;
            stored.snapshot = snapshot;
        } else {
            tracing::debug!(ticket, newer = stored.applied_ticket, "discarded stale balance refresh");
        }
        stored.snapshot.clone()
    }

    /// `Ok(None)` when the read is not allowed; `Err` carries a failure reason.
    async fn try_decrypt(&self, scope: &KeyScope, state: RegistrationState) -> Result<Option<u128>, String> {
        if !state.is_ready() {
            return Ok(None);
        }
        let key = match self.keys.load_key(scope) {
            Ok(Some(key)) => key,
            Ok(None) => return Ok(None),
            Err(e) => return Err(e.to_string()),
        };
        let primitive = self.sdk.primitive().map_err(|e| e.to_string())?;

        match primitive.decrypted_balance(scope, &key).await {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(%scope, error = %e, "unable to decrypt balance");
                Err(format!("unable to decrypt balance: {}", e))
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Stored> {
        self.stored.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::InMemoryKeyStore;
    use crate::adapters::local_network::LocalNetwork;

    fn service() -> BalanceService<InMemoryKeyStore, LocalNetwork> {
        BalanceService::new(
            Arc::new(KeyManager::new(InMemoryKeyStore::new())),
            SdkHandle::initialized(LocalNetwork::in_memory(2)),
        )
    }

    #[test]
    fn test_stale_refresh_does_not_overwrite_newer() {
        let service = service();
        let newer = BalanceSnapshot { decrypted: Some(2), ..Default::default() };
        let older = BalanceSnapshot { decrypted: Some(1), ..Default::default() };

        service.apply(2, newer.clone());
        let returned = service.apply(1, older);

        assert_eq!(returned, newer);
        assert_eq!(service.snapshot().decrypted, Some(2));
    }

    #[tokio::test]
    async fn test_decrypted_balance_requires_ready() {
        use crate::types::{Address, Mode};
        let service = service();
        let scope = KeyScope::new(Address::from_bytes([9; 20]), Mode::Standalone);

        for state in [
            RegistrationState::Uninitialized,
            RegistrationState::KeyMissing,
            RegistrationState::KeyPresentUnregistered,
            RegistrationState::Registering,
        ] {
            assert_eq!(service.decrypted_balance(&scope, state).await, None);
        }
        assert_eq!(service.last_error(), None);
    }
}
