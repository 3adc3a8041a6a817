use std::future::Future;

use crate::types::{Address, TxHash};

/// Port for the campaign contract's donation bookkeeping.
pub trait CampaignContract: Send + Sync {
    /// Associate a completed private transfer with the campaign.
    fn register_donation(
        &self,
        campaign: Address,
        tx_hash: TxHash,
    ) -> impl Future<Output = Result<TxHash, CampaignError>> + Send;

    /// Transaction hashes registered against the campaign, in registration order.
    fn donation_hashes(
        &self,
        campaign: Address,
    ) -> impl Future<Output = Result<Vec<TxHash>, CampaignError>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum CampaignError {
    #[error("donation already registered: {0}")]
    DuplicateDonation(TxHash),

    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    #[error("RPC error: {0}")]
    Rpc(String),
}
