//! Core value types shared by every component

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::ProtocolError;

/// Length of an account address in bytes
pub const ADDRESS_LEN: usize = 20;

/// Length of a transaction hash in bytes
pub const TX_HASH_LEN: usize = 32;

// ============================================================================
// Address
// ============================================================================

/// A 20-byte account address, displayed as lower-case `0x`-prefixed hex
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    pub const fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Parse a `0x`-prefixed, 40 hex digit address
    pub fn parse(input: &str) -> Result<Self, ProtocolError> {
        let trimmed = input.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| ProtocolError::InvalidRecipient(input.to_string()))?;

        if digits.len() != ADDRESS_LEN * 2 {
            return Err(ProtocolError::InvalidRecipient(input.to_string()));
        }

        let mut bytes = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|_| ProtocolError::InvalidRecipient(input.to_string()))?;
        Ok(Self(bytes))
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Transaction hash
// ============================================================================

/// A 32-byte transaction hash, displayed as `0x`-prefixed hex
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash([u8; TX_HASH_LEN]);

impl TxHash {
    pub const fn from_bytes(bytes: [u8; TX_HASH_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; TX_HASH_LEN] {
        &self.0
    }

    pub fn parse(input: &str) -> Option<Self> {
        let digits = input.trim().strip_prefix("0x")?;
        let mut bytes = [0u8; TX_HASH_LEN];
        hex::decode_to_slice(digits, &mut bytes).ok()?;
        Some(Self(bytes))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self)
    }
}

impl Serialize for TxHash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid tx hash: {s}")))
    }
}

// ============================================================================
// Mode and key scope
// ============================================================================

/// Which privacy contract/token pairing is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Standalone,
    Converter,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Standalone => "standalone",
            Mode::Converter => "converter",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standalone" => Ok(Mode::Standalone),
            "converter" => Ok(Mode::Converter),
            other => Err(format!("unknown mode '{other}' (expected standalone or converter)")),
        }
    }
}

/// The `(address, mode)` pair every key and registration is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyScope {
    pub address: Address,
    pub mode: Mode,
}

impl KeyScope {
    pub fn new(address: Address, mode: Mode) -> Self {
        Self { address, mode }
    }

    /// Local storage entry name: `key:{mode}:{address}`
    pub fn storage_key(&self) -> String {
        format!("key:{}:{}", self.mode, self.address)
    }
}

impl fmt::Display for KeyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.address, self.mode)
    }
}

// ============================================================================
// Decryption key
// ============================================================================

/// Device-local secret that decrypts balances and messages for one scope
///
/// The serialized form is kept verbatim: either a raw string or the
/// deterministic JSON encoding of a structured key.
#[derive(Clone, PartialEq, Eq, Zeroize)]
#[zeroize(drop)]
pub struct DecryptionKey(String);

impl DecryptionKey {
    pub fn new(serialized: impl Into<String>) -> Self {
        Self(serialized.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DecryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DecryptionKey(<redacted>)")
    }
}

// ============================================================================
// Amounts and transfers
// ============================================================================

/// Publicly visible ciphertext of a balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedAmount {
    /// Ciphertext words, `0x`-prefixed 256-bit hex
    pub ciphertext: Vec<String>,
    pub decimals: u8,
}

impl EncryptedAmount {
    pub fn empty(decimals: u8) -> Self {
        Self { ciphertext: Vec::new(), decimals }
    }
}

/// Outcome of the external private-transfer primitive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    pub transaction_hash: TxHash,
    /// Sender identity recovered from decryption
    pub message_from: Address,
    pub decrypted_message: String,
}

/// A historical transfer decrypted with a party's key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptedTransfer {
    pub transaction_hash: TxHash,
    pub message_from: Address,
    pub decrypted_message: String,
    /// Unix seconds
    pub timestamp: i64,
}

/// Campaign a donation or withdrawal is booked against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignRef {
    /// Campaign contract, when one is deployed
    pub contract: Option<Address>,
    /// Campaign identifier used when there is no contract
    pub id: String,
}

impl CampaignRef {
    pub fn with_contract(contract: Address) -> Self {
        Self { contract: Some(contract), id: contract.to_string() }
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self { contract: None, id: id.into() }
    }

    /// Value carried in the wire message: the contract address, else the id
    pub fn message_address(&self) -> String {
        match self.contract {
            Some(contract) => contract.to_string(),
            None => self.id.clone(),
        }
    }
}

/// Donor sentinel for records that failed to decrypt
pub const UNKNOWN_DONOR: &str = "Unknown";

/// Message sentinel for records that failed to decrypt
pub const UNDECRYPTABLE_MESSAGE: &str = "Failed to decrypt message";

/// A donation reconstructed from a decrypted transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationRecord {
    pub tx_hash: TxHash,
    /// Donor address, or [`UNKNOWN_DONOR`]
    pub donor: String,
    pub message: String,
    /// Unix seconds; zero when unknown
    pub timestamp: i64,
    pub campaign_address: String,
}

impl DonationRecord {
    pub fn undecryptable(tx_hash: TxHash, campaign_address: &str) -> Self {
        Self {
            tx_hash,
            donor: UNKNOWN_DONOR.to_string(),
            message: UNDECRYPTABLE_MESSAGE.to_string(),
            timestamp: 0,
            campaign_address: campaign_address.to_string(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.donor == UNKNOWN_DONOR && self.message == UNDECRYPTABLE_MESSAGE
    }
}

/// Connected wallet as reported by the wallet/network layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WalletSession {
    pub address: Option<Address>,
    pub chain_id: u64,
}

impl WalletSession {
    pub fn connected(address: Address, chain_id: u64) -> Self {
        Self { address: Some(address), chain_id }
    }

    pub fn disconnected() -> Self {
        Self::default()
    }

    /// Scope of the connected wallet in `mode`, or `WalletNotConnected`
    pub fn scope(&self, mode: Mode) -> Result<KeyScope, ProtocolError> {
        self.address
            .map(|address| KeyScope::new(address, mode))
            .ok_or(ProtocolError::WalletNotConnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "0x1111111111111111111111111111111111111111";

    #[test]
    fn test_address_parse_and_display() {
        let addr = Address::parse("0xAbCdEf0123456789aBcDeF0123456789AbCdEf01").unwrap();
        assert_eq!(addr.to_string(), "0xabcdef0123456789abcdef0123456789abcdef01");
    }

    #[test]
    fn test_address_rejects_malformed() {
        for bad in ["", "0x", "1111111111111111111111111111111111111111", "0x123", "0xzz11111111111111111111111111111111111111"] {
            assert!(
                matches!(Address::parse(bad), Err(ProtocolError::InvalidRecipient(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_storage_key_format() {
        let scope = KeyScope::new(Address::parse(ALICE).unwrap(), Mode::Converter);
        assert_eq!(scope.storage_key(), format!("key:converter:{ALICE}"));
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("Standalone".parse::<Mode>().unwrap(), Mode::Standalone);
        assert_eq!("converter".parse::<Mode>().unwrap(), Mode::Converter);
        assert!("hybrid".parse::<Mode>().is_err());
    }

    #[test]
    fn test_decryption_key_debug_is_redacted() {
        let key = DecryptionKey::new("super-secret");
        assert!(!format!("{key:?}").contains("super-secret"));
    }

    #[test]
    fn test_campaign_message_address_fallback() {
        let contract = Address::parse(ALICE).unwrap();
        assert_eq!(CampaignRef::with_contract(contract).message_address(), ALICE);
        assert_eq!(CampaignRef::with_id("campaign-42").message_address(), "campaign-42");
    }

    #[test]
    fn test_disconnected_wallet_has_no_scope() {
        assert!(matches!(
            WalletSession::disconnected().scope(Mode::Standalone),
            Err(ProtocolError::WalletNotConnected)
        ));
        let wallet = WalletSession::connected(Address::parse(ALICE).unwrap(), 43113);
        assert_eq!(wallet.scope(Mode::Converter).unwrap().mode, Mode::Converter);
    }

    #[test]
    fn test_tx_hash_serde_roundtrip() {
        let hash = TxHash::from_bytes([0xab; 32]);
        let json = serde_json::to_string(&hash).unwrap();
        let back: TxHash = serde_json::from_str(&json).unwrap();
        assert_eq!(hash, back);
    }
}
