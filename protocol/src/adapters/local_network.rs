//! Simulated privacy network for local use and integration tests
//!
//! Implements the registration, encrypted-ledger and campaign ports against a
//! single JSON state file (or purely in memory). It stands in for the real
//! encrypted-token contracts; it is not a cryptographic scheme.
//!
//! - Registration records a SHA-256 fingerprint of the party's decryption key.
//! - Balances and transfer payloads are sealed with AES-256-GCM under a key
//!   derived from the owning party's fingerprint, so the state file never holds
//!   plaintext amounts or messages.
//! - Reading plaintext requires presenting a key whose fingerprint matches
//!   (compared in constant time).
//! - Generated keys are derived from a per-network seed and the scope, so
//!   regenerating a lost key yields the same key, like a signature-derived key.
//!
//! A file-backed network is shared by every process that opens the same path.
//! Each operation re-reads the file; writers hold the sibling lock file while
//! they read, apply their change and write the state back.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng, Payload},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;

use super::lockfile::FileLock;
use crate::ports::campaign::{CampaignContract, CampaignError};
use crate::ports::ledger::{EncryptedLedger, LedgerError};
use crate::ports::registrar::{GeneratedKey, KeyGenerator, Registrar, RegistrarError};
use crate::types::{
    Address, DecryptedTransfer, DecryptionKey, EncryptedAmount, KeyScope, Mode, TransferResult, TxHash,
};

/// Domain separator for key fingerprints
const FINGERPRINT_DOMAIN: &[u8] = b"hushfund_local_fingerprint_v1";

/// Domain separator for sealing keys
const SEAL_DOMAIN: &[u8] = b"hushfund_local_seal_v1";

/// Domain separator for generated decryption keys
const KEYGEN_DOMAIN: &[u8] = b"hushfund_local_keygen_v1";

/// Domain separator for transaction hashes
const TX_DOMAIN: &[u8] = b"hushfund_local_tx_v1";

const KEY_SCHEME: &str = "local-aes-gcm-v1";

/// How often a writer retries a held state lock before giving up
const LOCK_ATTEMPTS: u32 = 250;
const LOCK_RETRY: Duration = Duration::from_millis(20);

#[derive(Serialize, Deserialize, Clone)]
struct SealedBox {
    nonce: String,
    ciphertext: String,
}

#[derive(Serialize, Deserialize, Clone)]
struct Account {
    fingerprint: String,
    balance: SealedBox,
    registered_at: i64,
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
enum TransferKind {
    Transfer,
    Withdrawal,
    Deposit,
}

#[derive(Serialize, Deserialize, Clone)]
struct TransferRecord {
    kind: TransferKind,
    from: Address,
    to: Address,
    mode: Mode,
    timestamp: i64,
    sender_fingerprint: String,
    recipient_fingerprint: String,
    sender_copy: SealedBox,
    recipient_copy: SealedBox,
}

/// What each party can decrypt from a transfer
#[derive(Serialize, Deserialize)]
struct TransferPayload {
    from: Address,
    amount: String,
    message: String,
}

#[derive(Serialize, Deserialize)]
struct NetworkState {
    version: u8,
    decimals: u8,
    /// Hex seed for deterministic key generation
    seed: String,
    tx_nonce: u64,
    accounts: BTreeMap<String, Account>,
    transfers: BTreeMap<String, TransferRecord>,
    campaigns: BTreeMap<String, Vec<TxHash>>,
}

impl NetworkState {
    fn fresh(decimals: u8) -> Self {
        let mut seed = [0u8; 32];
        OsRng.fill_bytes(&mut seed);
        Self {
            version: 1,
            decimals,
            seed: hex::encode(seed),
            tx_nonce: 0,
            accounts: BTreeMap::new(),
            transfers: BTreeMap::new(),
            campaigns: BTreeMap::new(),
        }
    }

    fn next_tx_hash(&mut self) -> TxHash {
        self.tx_nonce += 1;
        let mut hasher = Sha256::new();
        hasher.update(TX_DOMAIN);
        hasher.update(self.seed.as_bytes());
        hasher.update(self.tx_nonce.to_le_bytes());
        TxHash::from_bytes(hasher.finalize().into())
    }

    fn account(&self, scope: &KeyScope) -> Result<&Account, LedgerError> {
        self.accounts
            .get(&scope.storage_key())
            .ok_or(LedgerError::NotRegistered(*scope))
    }

    /// Account of a key holder, after checking the presented key
    fn authorized_account(&self, scope: &KeyScope, key: &DecryptionKey) -> Result<&Account, LedgerError> {
        let account = self.account(scope)?;
        if !fingerprint_matches(&account.fingerprint, key) {
            return Err(LedgerError::Decryption("key does not match the registered key".into()));
        }
        Ok(account)
    }

    fn read_balance(&self, scope: &KeyScope) -> Result<u128, LedgerError> {
        let account = self.account(scope)?;
        let plaintext = open(&account.fingerprint, &account.balance, scope.storage_key().as_bytes())?;
        let text = String::from_utf8(plaintext).map_err(|_| LedgerError::Failed("corrupted balance".into()))?;
        text.parse().map_err(|_| LedgerError::Failed("corrupted balance".into()))
    }

    fn write_balance(&mut self, scope: &KeyScope, value: u128) -> Result<(), LedgerError> {
        let name = scope.storage_key();
        let account = self
            .accounts
            .get_mut(&name)
            .ok_or(LedgerError::NotRegistered(*scope))?;
        account.balance = seal(&account.fingerprint, value.to_string().as_bytes(), name.as_bytes())?;
        Ok(())
    }

    fn record(
        &mut self,
        kind: TransferKind,
        from: &KeyScope,
        to: &KeyScope,
        amount: u128,
        message: &str,
    ) -> Result<(TxHash, i64), LedgerError> {
        let tx_hash = self.next_tx_hash();
        let timestamp = chrono::Utc::now().timestamp();
        let aad = tx_hash.to_string();
        let payload = serde_json::to_vec(&TransferPayload {
            from: from.address,
            amount: amount.to_string(),
            message: message.to_string(),
        })
        .map_err(|e| LedgerError::Failed(e.to_string()))?;

        let sender_fingerprint = self.account(from)?.fingerprint.clone();
        let recipient_fingerprint = self.account(to)?.fingerprint.clone();

        let record = TransferRecord {
            kind,
            from: from.address,
            to: to.address,
            mode: from.mode,
            timestamp,
            sender_copy: seal(&sender_fingerprint, &payload, aad.as_bytes())?,
            recipient_copy: seal(&recipient_fingerprint, &payload, aad.as_bytes())?,
            sender_fingerprint,
            recipient_fingerprint,
        };
        self.transfers.insert(aad, record);
        Ok((tx_hash, timestamp))
    }
}

/// In-process privacy network, optionally persisted to a JSON file
pub struct LocalNetwork {
    path: Option<PathBuf>,
    state: Mutex<NetworkState>,
}

impl LocalNetwork {
    /// A network that lives only as long as this value
    pub fn in_memory(decimals: u8) -> Self {
        Self {
            path: None,
            state: Mutex::new(NetworkState::fresh(decimals)),
        }
    }

    /// Open the network state at `path`, creating it with `decimals` when absent
    pub fn open(path: impl Into<PathBuf>, decimals: u8) -> Result<Self, LedgerError> {
        let path = path.into();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| LedgerError::Failed(e.to_string()))?;
            }
            let lock = FileLock::try_acquire(&path)
                .map_err(|e| LedgerError::Failed(e.to_string()))?
                .ok_or_else(|| locked(&path))?;
            // Another process may have created it while we checked
            if !path.exists() {
                persist(&path, &NetworkState::fresh(decimals))?;
                tracing::info!(path = %path.display(), decimals, "created local network");
            }
            drop(lock);
        }

        let state = load(&path)?;
        Ok(Self {
            path: Some(path),
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Credit encrypted balance out of thin air (standalone-mode private mint)
    pub async fn mint(&self, scope: &KeyScope, amount: u128) -> Result<TxHash, LedgerError> {
        self.update(|state| {
            let balance = state.read_balance(scope)?;
            let updated = balance
                .checked_add(amount)
                .ok_or_else(|| LedgerError::Failed("balance overflow".into()))?;
            state.write_balance(scope, updated)?;
            let (tx_hash, _) = state.record(TransferKind::Deposit, scope, scope, amount, "MINT")?;
            Ok(tx_hash)
        })
        .await
    }

    /// Run `read` against the latest state
    async fn read<R, E>(&self, read: impl FnOnce(&NetworkState) -> Result<R, E>) -> Result<R, E>
    where
        E: From<LedgerError>,
    {
        let mut state = self.state.lock().await;
        if let Some(path) = &self.path {
            *state = load(path)?;
        }
        read(&*state)
    }

    /// Apply `change` to the latest state and write it back.
    ///
    /// The file is left untouched when `change` fails.
    async fn update<R, E>(&self, change: impl FnOnce(&mut NetworkState) -> Result<R, E>) -> Result<R, E>
    where
        E: From<LedgerError>,
    {
        let mut state = self.state.lock().await;
        let Some(path) = &self.path else {
            return change(&mut *state);
        };

        let _lock = lock_state(path).await?;
        let mut fresh = load(path)?;
        let result = change(&mut fresh)?;
        persist(path, &fresh)?;
        *state = fresh;
        Ok(result)
    }
}

async fn lock_state(path: &Path) -> Result<FileLock, LedgerError> {
    for _ in 0..LOCK_ATTEMPTS {
        if let Some(lock) = FileLock::try_acquire(path).map_err(|e| LedgerError::Failed(e.to_string()))? {
            return Ok(lock);
        }
        tokio::time::sleep(LOCK_RETRY).await;
    }
    Err(locked(path))
}

fn locked(path: &Path) -> LedgerError {
    LedgerError::Failed(format!(
        "network state is locked; remove {} if no other hushfund process is running",
        FileLock::lock_path(path).display()
    ))
}

impl From<LedgerError> for RegistrarError {
    fn from(e: LedgerError) -> Self {
        RegistrarError::Rpc(e.to_string())
    }
}

impl From<LedgerError> for CampaignError {
    fn from(e: LedgerError) -> Self {
        CampaignError::Rpc(e.to_string())
    }
}

impl KeyGenerator for LocalNetwork {
    async fn generate_decryption_key(&self, scope: &KeyScope) -> Result<GeneratedKey, RegistrarError> {
        let secret = self
            .read(|state| {
                let mut hasher = Sha256::new();
                hasher.update(KEYGEN_DOMAIN);
                hasher.update(state.seed.as_bytes());
                hasher.update(scope.storage_key().as_bytes());
                Ok::<_, RegistrarError>(hasher.finalize())
            })
            .await?;

        Ok(GeneratedKey::Structured(serde_json::json!({
            "scheme": KEY_SCHEME,
            "address": scope.address.to_string(),
            "mode": scope.mode.as_str(),
            "secret": hex::encode(secret),
        })))
    }
}

impl Registrar for LocalNetwork {
    async fn is_registered(&self, scope: &KeyScope) -> Result<bool, RegistrarError> {
        self.read(|state| Ok(state.accounts.contains_key(&scope.storage_key())))
            .await
    }

    async fn register(&self, scope: &KeyScope, key: &DecryptionKey) -> Result<TxHash, RegistrarError> {
        self.update(|state| {
            let name = scope.storage_key();
            if state.accounts.contains_key(&name) {
                return Err(RegistrarError::Rejected(format!("{} is already registered", scope)));
            }

            let fingerprint = fingerprint(key);
            let balance = seal(&fingerprint, b"0", name.as_bytes())?;
            state.accounts.insert(
                name,
                Account {
                    fingerprint,
                    balance,
                    registered_at: chrono::Utc::now().timestamp(),
                },
            );
            Ok(state.next_tx_hash())
        })
        .await
    }
}

impl EncryptedLedger for LocalNetwork {
    async fn decimals(&self) -> Result<u8, LedgerError> {
        self.read(|state| Ok(state.decimals)).await
    }

    async fn encrypted_balance(&self, scope: &KeyScope) -> Result<EncryptedAmount, LedgerError> {
        let (bytes, decimals) = self
            .read(|state| {
                let account = state.account(scope)?;
                let mut bytes = STANDARD
                    .decode(&account.balance.nonce)
                    .map_err(|e| LedgerError::Failed(e.to_string()))?;
                bytes.extend(
                    STANDARD
                        .decode(&account.balance.ciphertext)
                        .map_err(|e| LedgerError::Failed(e.to_string()))?,
                );
                Ok::<_, LedgerError>((bytes, state.decimals))
            })
            .await?;

        let ciphertext = bytes
            .chunks(32)
            .map(|chunk| {
                let mut word = [0u8; 32];
                word[32 - chunk.len()..].copy_from_slice(chunk);
                format!("0x{}", hex::encode(word))
            })
            .collect();

        Ok(EncryptedAmount { ciphertext, decimals })
    }

    async fn decrypted_balance(&self, scope: &KeyScope, key: &DecryptionKey) -> Result<u128, LedgerError> {
        self.read(|state| {
            state.authorized_account(scope, key)?;
            state.read_balance(scope)
        })
        .await
    }

    async fn private_transfer(
        &self,
        scope: &KeyScope,
        key: &DecryptionKey,
        to: Address,
        amount: u128,
        message: &str,
    ) -> Result<TransferResult, LedgerError> {
        let recipient = KeyScope::new(to, scope.mode);
        let tx_hash = self
            .update(|state| {
                state.authorized_account(scope, key)?;
                if state.account(&recipient).is_err() {
                    return Err(LedgerError::Failed(format!("recipient {} is not registered", recipient)));
                }

                let sender_balance = state.read_balance(scope)?;
                if sender_balance < amount {
                    return Err(LedgerError::InsufficientFunds);
                }

                // Self-transfers leave the balance unchanged
                if recipient != *scope {
                    let recipient_balance = state.read_balance(&recipient)?;
                    let credited = recipient_balance
                        .checked_add(amount)
                        .ok_or_else(|| LedgerError::Failed("balance overflow".into()))?;
                    state.write_balance(scope, sender_balance - amount)?;
                    state.write_balance(&recipient, credited)?;
                }

                let (tx_hash, _) = state.record(TransferKind::Transfer, scope, &recipient, amount, message)?;
                Ok(tx_hash)
            })
            .await?;

        Ok(TransferResult {
            transaction_hash: tx_hash,
            message_from: scope.address,
            decrypted_message: message.to_string(),
        })
    }

    async fn withdraw(
        &self,
        scope: &KeyScope,
        key: &DecryptionKey,
        amount: u128,
        message: &str,
    ) -> Result<TxHash, LedgerError> {
        self.update(|state| {
            state.authorized_account(scope, key)?;

            let balance = state.read_balance(scope)?;
            if balance < amount {
                return Err(LedgerError::InsufficientFunds);
            }
            state.write_balance(scope, balance - amount)?;

            let (tx_hash, _) = state.record(TransferKind::Withdrawal, scope, scope, amount, message)?;
            Ok(tx_hash)
        })
        .await
    }

    async fn deposit(&self, scope: &KeyScope, amount: u128) -> Result<TxHash, LedgerError> {
        if scope.mode != Mode::Converter {
            return Err(LedgerError::UnsupportedMode(scope.mode));
        }

        self.update(|state| {
            let balance = state.read_balance(scope)?;
            let updated = balance
                .checked_add(amount)
                .ok_or_else(|| LedgerError::Failed("balance overflow".into()))?;
            state.write_balance(scope, updated)?;

            let (tx_hash, _) = state.record(TransferKind::Deposit, scope, scope, amount, "DEPOSIT")?;
            Ok(tx_hash)
        })
        .await
    }

    async fn decrypt_transaction(&self, tx_hash: TxHash, key: &DecryptionKey) -> Result<DecryptedTransfer, LedgerError> {
        let aad = tx_hash.to_string();
        let (plaintext, timestamp) = self
            .read(|state| {
                let record = state
                    .transfers
                    .get(&aad)
                    .ok_or(LedgerError::TransactionNotFound(tx_hash))?;

                let plaintext = if fingerprint_matches(&record.recipient_fingerprint, key) {
                    open(&record.recipient_fingerprint, &record.recipient_copy, aad.as_bytes())?
                } else if fingerprint_matches(&record.sender_fingerprint, key) {
                    open(&record.sender_fingerprint, &record.sender_copy, aad.as_bytes())?
                } else {
                    return Err(LedgerError::Decryption("not a party to this transaction".into()));
                };
                Ok((plaintext, record.timestamp))
            })
            .await?;

        let payload: TransferPayload = serde_json::from_slice(&plaintext)
            .map_err(|e| LedgerError::Decryption(format!("malformed payload: {}", e)))?;

        Ok(DecryptedTransfer {
            transaction_hash: tx_hash,
            message_from: payload.from,
            decrypted_message: payload.message,
            timestamp,
        })
    }
}

impl CampaignContract for LocalNetwork {
    async fn register_donation(&self, campaign: Address, tx_hash: TxHash) -> Result<TxHash, CampaignError> {
        self.update(|state| {
            if !state.transfers.contains_key(&tx_hash.to_string()) {
                return Err(CampaignError::TransactionFailed(format!("unknown transaction {}", tx_hash)));
            }

            let hashes = state.campaigns.entry(campaign.to_string()).or_default();
            if hashes.contains(&tx_hash) {
                return Err(CampaignError::DuplicateDonation(tx_hash));
            }
            hashes.push(tx_hash);
            Ok(state.next_tx_hash())
        })
        .await
    }

    async fn donation_hashes(&self, campaign: Address) -> Result<Vec<TxHash>, CampaignError> {
        self.read(|state| Ok(state.campaigns.get(&campaign.to_string()).cloned().unwrap_or_default()))
            .await
    }
}

fn fingerprint(key: &DecryptionKey) -> String {
    let mut hasher = Sha256::new();
    hasher.update(FINGERPRINT_DOMAIN);
    hasher.update(key.expose().as_bytes());
    hex::encode(hasher.finalize())
}

fn fingerprint_matches(expected: &str, key: &DecryptionKey) -> bool {
    fingerprint(key).as_bytes().ct_eq(expected.as_bytes()).into()
}

fn sealing_cipher(fingerprint: &str) -> Result<Aes256Gcm, LedgerError> {
    let mut hasher = Sha256::new();
    hasher.update(SEAL_DOMAIN);
    hasher.update(fingerprint.as_bytes());
    let key = hasher.finalize();
    Aes256Gcm::new_from_slice(&key).map_err(|e| LedgerError::Failed(format!("Cipher creation failed: {}", e)))
}

fn seal(fingerprint: &str, plaintext: &[u8], aad: &[u8]) -> Result<SealedBox, LedgerError> {
    let cipher = sealing_cipher(fingerprint)?;
    let mut nonce_bytes = [0u8; 12];
    OsRng.fill_bytes(&mut nonce_bytes);
    let ciphertext = cipher
        .encrypt(&Nonce::from(nonce_bytes), Payload { msg: plaintext, aad })
        .map_err(|e| LedgerError::Failed(format!("Encryption failed: {}", e)))?;
    Ok(SealedBox {
        nonce: STANDARD.encode(nonce_bytes),
        ciphertext: STANDARD.encode(ciphertext),
    })
}

fn open(fingerprint: &str, sealed: &SealedBox, aad: &[u8]) -> Result<Vec<u8>, LedgerError> {
    let cipher = sealing_cipher(fingerprint)?;
    let nonce_bytes: [u8; 12] = STANDARD
        .decode(&sealed.nonce)
        .map_err(|e| LedgerError::Decryption(e.to_string()))?
        .try_into()
        .map_err(|_| LedgerError::Decryption("invalid nonce length".into()))?;
    let ciphertext = STANDARD
        .decode(&sealed.ciphertext)
        .map_err(|e| LedgerError::Decryption(e.to_string()))?;
    cipher
        .decrypt(&Nonce::from(nonce_bytes), Payload { msg: &ciphertext, aad })
        .map_err(|_| LedgerError::Decryption("authentication failed".into()))
}

fn load(path: &Path) -> Result<NetworkState, LedgerError> {
    let json = fs::read_to_string(path)
        .map_err(|e| LedgerError::Failed(format!("Failed to read network state: {}", e)))?;
    serde_json::from_str(&json).map_err(|e| LedgerError::Failed(format!("Failed to parse network state: {}", e)))
}

fn persist(path: &Path, state: &NetworkState) -> Result<(), LedgerError> {
    let json = serde_json::to_string_pretty(state)
        .map_err(|e| LedgerError::Failed(format!("Failed to serialize network state: {}", e)))?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| LedgerError::Failed(e.to_string()))?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json).map_err(|e| LedgerError::Failed(e.to_string()))?;
    fs::rename(&tmp, path).map_err(|e| LedgerError::Failed(e.to_string()))?;
    Ok(())
}
