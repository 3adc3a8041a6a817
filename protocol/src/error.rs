use thiserror::Error;

use crate::ports::{CampaignError, LedgerError, RegistrarError, StoreError};
use crate::types::KeyScope;

/// Fallback shown when a transfer fails without an underlying message
pub const GENERIC_TRANSFER_FAILURE: &str = "Transaction failed";

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Invalid amount '{0}' - must be a positive number")]
    InvalidAmount(String),

    #[error("Insufficient balance - have {available} base units, need {requested}")]
    InsufficientBalance { available: u128, requested: u128 },

    #[error("Decrypted balance is unavailable")]
    BalanceUnavailable,

    #[error("No wallet connected")]
    WalletNotConnected,

    #[error("Invalid recipient address '{0}'")]
    InvalidRecipient(String),

    #[error("No decryption key stored for {0}")]
    KeyMissing(KeyScope),

    #[error("Decryption key generation failed: {0}")]
    KeyGenerationFailed(String),

    #[error("Decryption key could not be persisted: {0}")]
    KeyPersistenceFailed(#[source] StoreError),

    #[error("{0} is not registered")]
    NotRegistered(KeyScope),

    #[error("{0} is already registered - regenerating its key would orphan encrypted funds")]
    AlreadyRegistered(KeyScope),

    #[error("Registration failed: {0}")]
    RegistrationFailed(String),

    #[error("Privacy SDK is not initialized")]
    SdkNotInitialized,

    #[error("Another {operation} is already in progress for {scope}")]
    OperationInProgress { operation: &'static str, scope: KeyScope },

    #[error("Transfer rejected: {0}")]
    TransferRejected(String),

    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    #[error("Campaign linkage failed: {0}")]
    LinkageFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Key storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Privacy layer error: {0}")]
    Ledger(#[source] LedgerError),

    #[error("Campaign contract error: {0}")]
    Campaign(#[source] CampaignError),
}

impl ProtocolError {
    /// Errors raised before any external state-changing call
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidAmount(_)
                | Self::InsufficientBalance { .. }
                | Self::BalanceUnavailable
                | Self::WalletNotConnected
                | Self::InvalidRecipient(_)
                | Self::KeyMissing(_)
                | Self::NotRegistered(_)
                | Self::SdkNotInitialized
        )
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RegistrationFailed(_)
                | Self::TransferFailed(_)
                | Self::OperationInProgress { .. }
                | Self::LinkageFailed(_)
        )
    }

    /// Map a transfer-stage ledger error, keeping the underlying message
    pub(crate) fn from_transfer(err: LedgerError) -> Self {
        match err {
            LedgerError::Rejected(msg) => Self::TransferRejected(non_empty_or_generic(msg)),
            LedgerError::Failed(msg) => Self::TransferFailed(non_empty_or_generic(msg)),
            LedgerError::NotRegistered(scope) => Self::NotRegistered(scope),
            other => Self::TransferFailed(other.to_string()),
        }
    }
}

impl From<RegistrarError> for ProtocolError {
    fn from(err: RegistrarError) -> Self {
        match err {
            RegistrarError::KeyGeneration(msg) => Self::KeyGenerationFailed(msg),
            other => Self::RegistrationFailed(other.to_string()),
        }
    }
}

fn non_empty_or_generic(msg: String) -> String {
    if msg.trim().is_empty() {
        GENERIC_TRANSFER_FAILURE.to_string()
    } else {
        msg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_error_keeps_underlying_message() {
        let err = ProtocolError::from_transfer(LedgerError::Failed("nonce too low".into()));
        assert!(matches!(err, ProtocolError::TransferFailed(ref m) if m.contains("nonce too low")));
    }

    #[test]
    fn test_transfer_error_generic_fallback() {
        let err = ProtocolError::from_transfer(LedgerError::Rejected(String::new()));
        assert!(matches!(err, ProtocolError::TransferRejected(ref m) if m == GENERIC_TRANSFER_FAILURE));
    }

    #[test]
    fn test_classification() {
        assert!(ProtocolError::InvalidAmount("x".into()).is_validation());
        assert!(!ProtocolError::InvalidAmount("x".into()).is_retryable());
        assert!(ProtocolError::RegistrationFailed("timeout".into()).is_retryable());
        assert!(!ProtocolError::TransferRejected("declined".into()).is_retryable());
    }
}
