//! Donation flow: validate, encode, transfer, then link to the campaign
//!
//! ```text
//! Form -> Validating -> Processing -> Success
//!             |              |
//!             +--> Error <---+
//! ```
//!
//! Validation runs before any state-changing call and reports the first
//! failing check. Once the transfer has been submitted the flow runs on its
//! own task and completes even if the caller goes away. Campaign linkage is
//! best effort: a transfer that landed is a successful donation even when the
//! linkage call fails.

use std::sync::{Arc, Mutex};

use crate::amount::{ensure_sufficient, DecimalAmount};
use crate::balance::BalanceService;
use crate::codec::encode_donation;
use crate::error::ProtocolError;
use crate::inflight::{InFlight, InFlightGuard};
use crate::keys::KeyManager;
use crate::ports::{KeyStore, PrivacyNetwork};
use crate::registration::{RegistrationCoordinator, RegistrationState};
use crate::sdk::SdkHandle;
use crate::types::{Address, CampaignRef, DecryptionKey, KeyScope, Mode, TransferResult, TxHash, WalletSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DonationPhase {
    Form,
    Validating,
    Processing,
    Success,
    Error,
}

/// A donation as entered by the user; nothing here is validated yet
#[derive(Debug, Clone)]
pub struct DonationRequest {
    pub recipient: String,
    pub amount: String,
    pub message: String,
    pub campaign: CampaignRef,
}

/// What happened to the campaign linkage after a successful transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkageStatus {
    /// Registered with the campaign contract
    Linked(TxHash),
    /// The campaign has no contract
    Skipped,
    /// The transfer landed but the linkage call failed
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct DonationOutcome {
    pub transfer: TransferResult,
    pub amount_base_units: u128,
    pub linkage: LinkageStatus,
}

impl DonationOutcome {
    pub fn tx_hash(&self) -> TxHash {
        self.transfer.transaction_hash
    }

    /// Warning to surface alongside the success, if linkage failed
    pub fn linkage_warning(&self) -> Option<ProtocolError> {
        match &self.linkage {
            LinkageStatus::Failed(reason) => Some(ProtocolError::LinkageFailed(reason.clone())),
            _ => None,
        }
    }
}

pub struct DonationOrchestrator<S: KeyStore + 'static, P: PrivacyNetwork> {
    keys: Arc<KeyManager<S>>,
    sdk: SdkHandle<P>,
    registration: Arc<RegistrationCoordinator<S, P>>,
    balances: Arc<BalanceService<S, P>>,
    inflight: InFlight,
    phase: Arc<Mutex<DonationPhase>>,
}

impl<S: KeyStore + 'static, P: PrivacyNetwork> DonationOrchestrator<S, P> {
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
            inflight: InFlight::new("donation"),
            phase: Arc::new(Mutex::new(DonationPhase::Form)),
        }
    }

    pub fn phase(&self) -> DonationPhase {
        *self.phase.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Back to `Form` after a finished donation
    pub fn reset(&self) {
        set_phase(&self.phase, DonationPhase::Form);
    }

    pub async fn donate(
        &self,
        wallet: &WalletSession,
        mode: Mode,
        request: DonationRequest,
    ) -> Result<DonationOutcome, ProtocolError> {
        let admitted = match self.admit(wallet, mode, &request.amount) {
            Ok(admitted) => admitted,
            Err(e) => {
                tracing::debug!(error = %e, "donation rejected before validation");
                // The phase belongs to whichever call holds the claim
                if self.inflight.is_idle() {
                    set_phase(&self.phase, DonationPhase::Error);
                }
                return Err(e);
            }
        };

        set_phase(&self.phase, DonationPhase::Validating);
        let execution = match self.validate(admitted, request).await {
            Ok(execution) => execution,
            Err(e) => {
                tracing::debug!(error = %e, "donation rejected during validation");
                set_phase(&self.phase, DonationPhase::Error);
                return Err(e);
            }
        };

        set_phase(&self.phase, DonationPhase::Processing);
        let phase = Arc::clone(&self.phase);
        let balances = Arc::clone(&self.balances);
        let scope = execution.scope;

        // Detached: dropping the caller's future no longer cancels the flow
        let handle = tokio::spawn(async move {
            let result = execution.run().await;
            match &result {
                Ok(_) => {
                    set_phase(&phase, DonationPhase::Success);
                    balances.refresh(&scope, RegistrationState::Ready).await;
                }
                Err(_) => set_phase(&phase, DonationPhase::Error),
            }
            result
        });

        match handle.await {
            Ok(result) => result,
            Err(e) => {
                set_phase(&self.phase, DonationPhase::Error);
                Err(ProtocolError::TransferFailed(e.to_string()))
            }
        }
    }

    /// Synchronous checks up to and including the in-flight claim
    fn admit(&self, wallet: &WalletSession, mode: Mode, amount: &str) -> Result<Admitted<P>, ProtocolError> {
        let amount = DecimalAmount::parse(amount)?;
        let scope = wallet.scope(mode)?;
        let primitive = self.sdk.primitive()?;
        let guard = self.inflight.claim(scope)?;
        Ok(Admitted {
            amount,
            scope,
            primitive,
            guard,
        })
    }

    async fn validate(&self, admitted: Admitted<P>, request: DonationRequest) -> Result<Execution<P>, ProtocolError> {
        let Admitted {
            amount,
            scope,
            primitive,
            guard,
        } = admitted;

        let state = self.registration.require_ready(&scope).await?;

        let recipient = Address::parse(&request.recipient)?;
        if recipient.is_zero() {
            return Err(ProtocolError::InvalidRecipient(request.recipient));
        }

        let (available, decimals) = self.balances.require_decrypted(&scope, state).await?;
        let base_units = amount.to_base_units(decimals)?;
        ensure_sufficient(available, base_units)?;

        let key = self
            .keys
            .load_key(&scope)?
            .ok_or(ProtocolError::KeyMissing(scope))?;

        let message = encode_donation(&request.campaign.message_address(), &request.message);

        Ok(Execution {
            primitive,
            scope,
            key,
            recipient,
            base_units,
            message,
            campaign_contract: request.campaign.contract,
            _guard: guard,
        })
    }
}

/// A donation that passed the synchronous checks and holds the scope's claim
struct Admitted<P> {
    amount: DecimalAmount,
    scope: KeyScope,
    primitive: Arc<P>,
    guard: InFlightGuard,
}

/// A validated donation, ready to submit
struct Execution<P> {
    primitive: Arc<P>,
    scope: KeyScope,
    key: DecryptionKey,
    recipient: Address,
    base_units: u128,
    message: String,
    campaign_contract: Option<Address>,
    _guard: InFlightGuard,
}

impl<P: PrivacyNetwork> Execution<P> {
    async fn run(self) -> Result<DonationOutcome, ProtocolError> {
        let transfer = self
            .primitive
            .private_transfer(&self.scope, &self.key, self.recipient, self.base_units, &self.message)
            .await
            .map_err(|e| {
                tracing::warn!(scope = %self.scope, error = %e, "donation transfer failed");
                ProtocolError::from_transfer(e)
            })?;

        let tx_hash = transfer.transaction_hash;
        tracing::info!(scope = %self.scope, %tx_hash, amount = %self.base_units, "donation transferred");

        let linkage = match self.campaign_contract {
            None => LinkageStatus::Skipped,
            Some(campaign) => match self.primitive.register_donation(campaign, tx_hash).await {
                Ok(receipt) => {
                    tracing::info!(%campaign, %tx_hash, "donation linked to campaign");
                    LinkageStatus::Linked(receipt)
                }
                Err(e) => {
                    tracing::warn!(%campaign, %tx_hash, error = %e, "campaign linkage failed, donation still succeeded");
                    LinkageStatus::Failed(e.to_string())
                }
            },
        };

        Ok(DonationOutcome {
            transfer,
            amount_base_units: self.base_units,
            linkage,
        })
    }
}

fn set_phase(phase: &Mutex<DonationPhase>, next: DonationPhase) {
    *phase.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = next;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(linkage: LinkageStatus) -> DonationOutcome {
        DonationOutcome {
            transfer: TransferResult {
                transaction_hash: TxHash::from_bytes([1; 32]),
                message_from: Address::from_bytes([2; 20]),
                decrypted_message: "DONATION:c:t".into(),
            },
            amount_base_units: 5,
            linkage,
        }
    }

    #[test]
    fn test_linkage_warning_only_on_failure() {
        assert!(outcome(LinkageStatus::Skipped).linkage_warning().is_none());
        assert!(outcome(LinkageStatus::Linked(TxHash::from_bytes([3; 32]))).linkage_warning().is_none());
        assert!(matches!(
            outcome(LinkageStatus::Failed("reverted".into())).linkage_warning(),
            Some(ProtocolError::LinkageFailed(reason)) if reason == "reverted"
        ));
    }
}
