//! Wiring of one CLI invocation: vault, network and the privacy client

use std::sync::Arc;

use anyhow::{Context, Result};

use hushfund::adapters::{EncryptedFileKeyStore, LocalNetwork};
use hushfund::ports::EncryptedLedger;
use hushfund::{PrivacyClient, SdkHandle, WalletSession};

use crate::config::Settings;

/// Chain id reported for the local network
pub const LOCAL_CHAIN_ID: u64 = 31337;

pub type Client = PrivacyClient<EncryptedFileKeyStore, LocalNetwork>;

pub struct Session {
    pub settings: Settings,
    pub client: Client,
}

impl Session {
    /// Open the vault with `password` and attach to the network file
    pub fn open(settings: Settings, password: &str) -> Result<Self> {
        let store = EncryptedFileKeyStore::open(&settings.vault, password)
            .with_context(|| format!("Failed to open key vault at {}", settings.vault.display()))?;
        Self::with_store(settings, store)
    }

    pub fn with_store(settings: Settings, store: EncryptedFileKeyStore) -> Result<Self> {
        let network = LocalNetwork::open(&settings.network_file, settings.decimals)
            .with_context(|| format!("Failed to open network at {}", settings.network_file.display()))?;

        let wallet = match settings.wallet {
            Some(address) => WalletSession::connected(address, LOCAL_CHAIN_ID),
            None => WalletSession::disconnected(),
        };
        tracing::debug!(?wallet, mode = %settings.mode, "opening session");

        let client = PrivacyClient::new(store, SdkHandle::initialized(network), wallet, settings.mode);
        Ok(Self { settings, client })
    }

    pub fn network(&self) -> Result<Arc<LocalNetwork>> {
        Ok(self.client.sdk().primitive()?)
    }

    pub async fn decimals(&self) -> Result<u8> {
        Ok(self.network()?.decimals().await?)
    }
}
