//! Decryption of a campaign's donation history
//!
//! Every transaction is decrypted on its own task. A failure (or panic) in one
//! item degrades that record only; the batch always returns one record per
//! input hash, newest first.

use std::sync::Arc;

use tokio::task::JoinSet;

use crate::codec::decode_donation;
use crate::error::ProtocolError;
use crate::ports::EncryptedLedger;
use crate::types::{DecryptedTransfer, DecryptionKey, DonationRecord, TxHash};

pub async fn decrypt_history<P: EncryptedLedger + 'static>(
    primitive: Arc<P>,
    campaign_address: &str,
    refs: &[TxHash],
    key: &DecryptionKey,
) -> Vec<DonationRecord> {
    let mut records: Vec<DonationRecord> = refs
        .iter()
        .map(|tx_hash| DonationRecord::undecryptable(*tx_hash, campaign_address))
        .collect();

    let mut tasks = JoinSet::new();
    for (index, tx_hash) in refs.iter().copied().enumerate() {
        let primitive = Arc::clone(&primitive);
        let key = key.clone();
        tasks.spawn(async move { (index, tx_hash, primitive.decrypt_transaction(tx_hash, &key).await) });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, _, Ok(transfer))) => {
                records[index] = to_record(transfer, campaign_address);
            }
            Ok((_, tx_hash, Err(e))) => {
                let err = ProtocolError::DecryptionFailed(e.to_string());
                tracing::warn!(%tx_hash, error = %err, "donation left undecrypted");
            }
            Err(e) => {
                tracing::warn!(error = %e, "donation decryption task aborted");
            }
        }
    }

    // Stable: equal timestamps keep input order
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    records
}

fn to_record(transfer: DecryptedTransfer, campaign_address: &str) -> DonationRecord {
    let decoded = decode_donation(&transfer.decrypted_message);
    DonationRecord {
        tx_hash: transfer.transaction_hash,
        donor: transfer.message_from.to_string(),
        message: decoded.text,
        timestamp: transfer.timestamp,
        campaign_address: decoded
            .campaign_address
            .unwrap_or_else(|| campaign_address.to_string()),
    }
}
