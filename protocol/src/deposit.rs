//! Converter-mode deposit of public tokens into the encrypted balance

use std::sync::Arc;

use crate::amount::DecimalAmount;
use crate::balance::BalanceService;
use crate::error::ProtocolError;
use crate::inflight::InFlight;
use crate::ports::{KeyStore, LedgerError, PrivacyNetwork};
use crate::registration::{RegistrationCoordinator, RegistrationState};
use crate::sdk::SdkHandle;
use crate::types::{Mode, TxHash, WalletSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositOutcome {
    pub tx_hash: TxHash,
    pub amount_base_units: u128,
}

pub struct DepositService<S: KeyStore + 'static, P: PrivacyNetwork> {
    sdk: SdkHandle<P>,
    registration: Arc<RegistrationCoordinator<S, P>>,
    balances: Arc<BalanceService<S, P>>,
    inflight: InFlight,
}

impl<S: KeyStore + 'static, P: PrivacyNetwork> DepositService<S, P> {
    pub fn new(
        sdk: SdkHandle<P>,
        registration: Arc<RegistrationCoordinator<S, P>>,
        balances: Arc<BalanceService<S, P>>,
    ) -> Self {
        Self {
            sdk,
            registration,
            balances,
            inflight: InFlight::new("deposit"),
        }
    }

    /// Validate, then submit the deposit on its own task so it completes even
    /// if the caller stops waiting.
    pub async fn deposit(&self, wallet: &WalletSession, mode: Mode, amount: &str) -> Result<DepositOutcome, ProtocolError> {
        let amount = DecimalAmount::parse(amount)?;
        let scope = wallet.scope(mode)?;
        let primitive = self.sdk.primitive()?;
        let guard = self.inflight.claim(scope)?;

        self.registration.require_ready(&scope).await?;
        let decimals = primitive.decimals().await.map_err(ProtocolError::Ledger)?;
        let base_units = amount.to_base_units(decimals)?;
        let balances = Arc::clone(&self.balances);

        let handle = tokio::spawn(async move {
            let _guard = guard;
            let tx_hash = match primitive.deposit(&scope, base_units).await {
                Ok(tx_hash) => tx_hash,
                Err(e @ LedgerError::UnsupportedMode(_)) => return Err(ProtocolError::Ledger(e)),
                Err(e) => {
                    tracing::warn!(%scope, error = %e, "deposit failed");
                    return Err(ProtocolError::from_transfer(e));
                }
            };
            tracing::info!(%scope, %tx_hash, amount = %base_units, "deposit submitted");

            balances.refresh(&scope, RegistrationState::Ready).await;

            Ok(DepositOutcome {
                tx_hash,
                amount_base_units: base_units,
            })
        });

        handle
            .await
            .unwrap_or_else(|e| Err(ProtocolError::TransferFailed(e.to_string())))
    }
}
