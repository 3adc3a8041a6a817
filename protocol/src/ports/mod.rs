//! Narrow interfaces to everything outside the protocol core
//!
//! Adapters live in [`crate::adapters`]; tests supply their own doubles.

pub mod campaign;
pub mod keystore;
pub mod ledger;
pub mod registrar;

pub use campaign::{CampaignContract, CampaignError};
pub use keystore::{KeyStore, StoreError};
pub use ledger::{EncryptedLedger, LedgerError};
pub use registrar::{GeneratedKey, KeyGenerator, Registrar, RegistrarError};

/// Everything the protocol needs from the external privacy network
pub trait PrivacyNetwork: Registrar + EncryptedLedger + CampaignContract + 'static {}

impl<T> PrivacyNetwork for T where T: Registrar + EncryptedLedger + CampaignContract + 'static {}
