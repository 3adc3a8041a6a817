use std::future::Future;

use crate::types::{
    Address, DecryptedTransfer, DecryptionKey, EncryptedAmount, KeyScope, TransferResult, TxHash,
};

/// Port for the external encrypted-balance primitive.
///
/// Amounts are in base units. Every state-changing call is atomic at this
/// boundary: it either lands completely or not at all.
pub trait EncryptedLedger: Send + Sync {
    /// Scale factor of the encrypted token.
    fn decimals(&self) -> impl Future<Output = Result<u8, LedgerError>> + Send;

    /// Ciphertext balance, readable without a key.
    fn encrypted_balance(
        &self,
        scope: &KeyScope,
    ) -> impl Future<Output = Result<EncryptedAmount, LedgerError>> + Send;

    /// Plaintext balance, decrypted with the scope's key.
    fn decrypted_balance(
        &self,
        scope: &KeyScope,
        key: &DecryptionKey,
    ) -> impl Future<Output = Result<u128, LedgerError>> + Send;

    /// Move `amount` to `to`, carrying `message` inside the encrypted channel.
    fn private_transfer(
        &self,
        scope: &KeyScope,
        key: &DecryptionKey,
        to: Address,
        amount: u128,
        message: &str,
    ) -> impl Future<Output = Result<TransferResult, LedgerError>> + Send;

    /// Withdraw `amount` from the encrypted balance to the owner's own wallet.
    fn withdraw(
        &self,
        scope: &KeyScope,
        key: &DecryptionKey,
        amount: u128,
        message: &str,
    ) -> impl Future<Output = Result<TxHash, LedgerError>> + Send;

    /// Convert public tokens into encrypted balance (converter mode).
    fn deposit(
        &self,
        scope: &KeyScope,
        amount: u128,
    ) -> impl Future<Output = Result<TxHash, LedgerError>> + Send;

    /// Decrypt a historical transfer the key holder is a party to.
    fn decrypt_transaction(
        &self,
        tx_hash: TxHash,
        key: &DecryptionKey,
    ) -> impl Future<Output = Result<DecryptedTransfer, LedgerError>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    Failed(String),

    #[error("{0} is not registered")]
    NotRegistered(KeyScope),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("transaction not found: {0}")]
    TransactionNotFound(TxHash),

    #[error("insufficient encrypted balance")]
    InsufficientFunds,

    #[error("operation not supported in {0} mode")]
    UnsupportedMode(crate::types::Mode),
}
