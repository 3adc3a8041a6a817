//! `PrivacyClient`: the one object a UI talks to
//!
//! Wires the key manager, registration coordinator, balance service and the
//! orchestrators around a shared SDK handle, for one wallet session and mode
//! at a time.

use std::sync::Arc;

use crate::balance::{BalanceService, BalanceSnapshot};
use crate::deposit::{DepositOutcome, DepositService};
use crate::donation::{DonationOrchestrator, DonationOutcome, DonationPhase, DonationRequest};
use crate::error::ProtocolError;
use crate::history::decrypt_history;
use crate::keys::KeyManager;
use crate::ports::{CampaignContract, KeyStore, PrivacyNetwork, Registrar};
use crate::registration::{RegistrationCoordinator, RegistrationOutcome, RegistrationState};
use crate::sdk::SdkHandle;
use crate::types::{
    Address, CampaignRef, DecryptionKey, DonationRecord, EncryptedAmount, KeyScope, Mode, WalletSession,
};
use crate::withdrawal::{MaxWithdrawal, WithdrawalOrchestrator, WithdrawalOutcome};

pub struct PrivacyClient<S: KeyStore + 'static, P: PrivacyNetwork> {
    wallet: WalletSession,
    mode: Mode,
    keys: Arc<KeyManager<S>>,
    sdk: SdkHandle<P>,
    registration: Arc<RegistrationCoordinator<S, P>>,
    balances: Arc<BalanceService<S, P>>,
    donations: DonationOrchestrator<S, P>,
    withdrawals: WithdrawalOrchestrator<S, P>,
    deposits: DepositService<S, P>,
}

impl<S: KeyStore + 'static, P: PrivacyNetwork> PrivacyClient<S, P> {
    pub fn new(store: S, sdk: SdkHandle<P>, wallet: WalletSession, mode: Mode) -> Self {
        let keys = Arc::new(KeyManager::new(store));
        let registration = Arc::new(RegistrationCoordinator::new(Arc::clone(&keys), sdk.clone()));
        let balances = Arc::new(BalanceService::new(Arc::clone(&keys), sdk.clone()));

        Self {
            donations: DonationOrchestrator::new(
                Arc::clone(&keys),
                sdk.clone(),
                Arc::clone(&registration),
                Arc::clone(&balances),
            ),
            withdrawals: WithdrawalOrchestrator::new(
                Arc::clone(&keys),
                sdk.clone(),
                Arc::clone(&registration),
                Arc::clone(&balances),
            ),
            deposits: DepositService::new(sdk.clone(), Arc::clone(&registration), Arc::clone(&balances)),
            wallet,
            mode,
            keys,
            sdk,
            registration,
            balances,
        }
    }

    pub fn wallet(&self) -> &WalletSession {
        &self.wallet
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn scope(&self) -> Result<KeyScope, ProtocolError> {
        self.wallet.scope(self.mode)
    }

    pub fn keys(&self) -> &KeyManager<S> {
        &self.keys
    }

    pub fn sdk(&self) -> &SdkHandle<P> {
        &self.sdk
    }

    pub fn is_initialized(&self) -> bool {
        self.sdk.is_initialized()
    }

    /// On-chain registration of the active scope
    pub async fn is_registered(&self) -> Result<bool, ProtocolError> {
        let scope = self.scope()?;
        Ok(self.sdk.primitive()?.is_registered(&scope).await?)
    }

    pub fn has_stored_key(&self) -> Result<bool, ProtocolError> {
        self.keys.has_stored_key(&self.scope()?)
    }

    pub async fn registration_state(&self) -> Result<RegistrationState, ProtocolError> {
        self.registration.state(&self.scope()?).await
    }

    pub async fn generate_key(&self) -> Result<DecryptionKey, ProtocolError> {
        self.registration.generate_key(&self.scope()?).await
    }

    /// Generate a key if needed and register it
    pub async fn register(&self) -> Result<RegistrationOutcome, ProtocolError> {
        self.registration.register_with_key(&self.scope()?).await
    }

    pub async fn encrypted_balance(&self) -> Result<EncryptedAmount, ProtocolError> {
        self.balances.encrypted_balance(&self.scope()?).await
    }

    pub async fn decrypted_balance(&self) -> Result<Option<u128>, ProtocolError> {
        let scope = self.scope()?;
        let state = self.registration.state(&scope).await?;
        Ok(self.balances.decrypted_balance(&scope, state).await)
    }

    pub async fn refresh_balance(&self) -> Result<BalanceSnapshot, ProtocolError> {
        let scope = self.scope()?;
        let state = self.registration.state(&scope).await?;
        Ok(self.balances.refresh(&scope, state).await)
    }

    pub fn balance_snapshot(&self) -> BalanceSnapshot {
        self.balances.snapshot()
    }

    pub async fn donate(&self, request: DonationRequest) -> Result<DonationOutcome, ProtocolError> {
        self.donations.donate(&self.wallet, self.mode, request).await
    }

    pub fn donation_phase(&self) -> DonationPhase {
        self.donations.phase()
    }

    pub async fn withdraw(&self, amount: &str, campaign: Option<&CampaignRef>) -> Result<WithdrawalOutcome, ProtocolError> {
        self.withdrawals.withdraw(&self.wallet, self.mode, amount, campaign).await
    }

    pub async fn max_withdrawal(&self) -> Result<Option<MaxWithdrawal>, ProtocolError> {
        self.withdrawals.max_withdrawal(&self.wallet, self.mode).await
    }

    pub async fn deposit(&self, amount: &str) -> Result<DepositOutcome, ProtocolError> {
        self.deposits.deposit(&self.wallet, self.mode, amount).await
    }

    /// Decrypted donations registered with `campaign`, newest first
    pub async fn history(&self, campaign: Address) -> Result<Vec<DonationRecord>, ProtocolError> {
        let scope = self.scope()?;
        let primitive = self.sdk.primitive()?;
        let key = self
            .keys
            .load_key(&scope)?
            .ok_or(ProtocolError::KeyMissing(scope))?;

        let refs = primitive
            .donation_hashes(campaign)
            .await
            .map_err(ProtocolError::Campaign)?;
        tracing::debug!(%campaign, count = refs.len(), "decrypting donation history");

        Ok(decrypt_history(primitive, &campaign.to_string(), &refs, &key).await)
    }

    pub fn clear_key(&self) -> Result<(), ProtocolError> {
        self.registration.clear_key(&self.scope()?)
    }
}
