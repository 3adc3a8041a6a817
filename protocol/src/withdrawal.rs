//! Withdrawal from the encrypted balance back to the owner's wallet

use std::sync::Arc;

use crate::amount::{self, ensure_sufficient, DecimalAmount};
use crate::balance::BalanceService;
use crate::codec::encode_withdrawal;
use crate::error::ProtocolError;
use crate::inflight::InFlight;
use crate::keys::KeyManager;
use crate::ports::{KeyStore, PrivacyNetwork};
use crate::registration::{RegistrationCoordinator, RegistrationState};
use crate::sdk::SdkHandle;
use crate::types::{CampaignRef, Mode, TxHash, WalletSession};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalOutcome {
    pub tx_hash: TxHash,
    pub amount_base_units: u128,
    /// Message carried with the withdrawal
    pub message: String,
}

/// Suggested maximum for the withdrawal form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxWithdrawal {
    pub base_units: u128,
    pub decimals: u8,
}

impl MaxWithdrawal {
    pub fn formatted(&self) -> String {
        amount::format_units(self.base_units, self.decimals)
    }
}

pub struct WithdrawalOrchestrator<S: KeyStore + 'static, P: PrivacyNetwork> {
    keys: Arc<KeyManager<S>>,
    sdk: SdkHandle<P>,
    registration: Arc<RegistrationCoordinator<S, P>>,
    balances: Arc<BalanceService<S, P>>,
    inflight: InFlight,
}

impl<S: KeyStore + 'static, P: PrivacyNetwork> WithdrawalOrchestrator<S, P> {
    pub fn new(
        keys: Arc<KeyManager<S>>,
        sdk: SdkHandle<P>,
        registration: Arc<RegistrationCoordinator<S, P>>,
        balances: Arc<BalanceService<S, P>>,
    ) -> Self {
        Self {
            keys,
            sdk,
            registration,
            balances,
            inflight: InFlight::new("withdrawal"),
        }
    }

    /// Validate, then submit the withdrawal.
    ///
    /// Once submitted the withdrawal and the balance refresh run on their own
    /// task, so dropping the returned future does not abandon them.
    pub async fn withdraw(
        &self,
        wallet: &WalletSession,
        mode: Mode,
        amount: &str,
        campaign: Option<&CampaignRef>,
    ) -> Result<WithdrawalOutcome, ProtocolError> {
        let amount = DecimalAmount::parse(amount)?;
        let scope = wallet.scope(mode)?;
        let primitive = self.sdk.primitive()?;
        let guard = self.inflight.claim(scope)?;

        let state = self.registration.require_ready(&scope).await?;
        let (available, decimals) = self.balances.require_decrypted(&scope, state).await?;
        let base_units = amount.to_base_units(decimals)?;
        ensure_sufficient(available, base_units)?;

        let key = self
            .keys
            .load_key(&scope)?
            .ok_or(ProtocolError::KeyMissing(scope))?;
        let message = encode_withdrawal(campaign.map(|c| c.message_address()).as_deref());
        let balances = Arc::clone(&self.balances);

        let handle = tokio::spawn(async move {
            let _guard = guard;
            let tx_hash = match primitive.withdraw(&scope, &key, base_units, &message).await {
                Ok(tx_hash) => tx_hash,
                Err(e) => {
                    tracing::warn!(%scope, error = %e, "withdrawal failed");
                    return Err(ProtocolError::from_transfer(e));
                }
            };
            tracing::info!(%scope, %tx_hash, amount = %base_units, "withdrawal submitted");

            balances.refresh(&scope, RegistrationState::Ready).await;

            Ok(WithdrawalOutcome {
                tx_hash,
                amount_base_units: base_units,
                message,
            })
        });

        handle
            .await
            .unwrap_or_else(|e| Err(ProtocolError::TransferFailed(e.to_string())))
    }

    /// Largest withdrawal that still leaves the fee reserve, or `None` while
    /// the decrypted balance is unknown
    pub async fn max_withdrawal(&self, wallet: &WalletSession, mode: Mode) -> Result<Option<MaxWithdrawal>, ProtocolError> {
        let scope = wallet.scope(mode)?;
        let state = self.registration.state(&scope).await?;
        match self.balances.require_decrypted(&scope, state).await {
            Ok((balance, decimals)) => Ok(Some(MaxWithdrawal {
                base_units: amount::max_withdrawal(balance, decimals),
                decimals,
            })),
            Err(ProtocolError::BalanceUnavailable) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
