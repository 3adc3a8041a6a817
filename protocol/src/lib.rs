//! hushfund - privacy-preserving donations over an encrypted-balance token
//!
//! Donation amounts stay encrypted on chain; sender and recipient decrypt them
//! with a device-local key. This crate holds the client-side protocol: key
//! lifecycle, registration, balances, the donation and withdrawal flows, the
//! wire format of in-channel messages and history decryption. The encrypted
//! balance primitive, campaign contract and key storage are reached through
//! the traits in [`ports`].

pub mod adapters;
pub mod amount;
pub mod balance;
pub mod client;
pub mod codec;
pub mod deposit;
pub mod donation;
pub mod error;
pub mod history;
pub mod inflight;
pub mod keys;
pub mod ports;
pub mod registration;
pub mod sdk;
pub mod types;
pub mod withdrawal;


#[cfg(test)]
mod fuzz_tests;


pub use client::PrivacyClient;
pub use donation::{DonationOutcome, DonationPhase, DonationRequest, LinkageStatus};
pub use error::ProtocolError;
pub use registration::{RegistrationOutcome, RegistrationState};
pub use sdk::SdkHandle;
pub use types::{Address, CampaignRef, DecryptionKey, DonationRecord, KeyScope, Mode, TxHash, WalletSession};
