//! Password-protected key vault on disk
//!
//! Uses AES-256-GCM for each entry and Argon2id for key derivation.
//! Decryption keys are never written in plaintext. Each entry is bound to its
//! storage name through the AEAD associated data, so entries cannot be swapped
//! between scopes.
//!
//! Writers take an exclusive lock file, re-read the vault, apply their change
//! and bump `revision`. A second writer finds the lock held and gets
//! [`StoreError::Locked`] instead of silently overwriting.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng, Payload},
    Aes256Gcm, Nonce,
};
use argon2::{
    password_hash::{rand_core::RngCore, PasswordHash, SaltString},
    Argon2, PasswordHasher, PasswordVerifier,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use super::lockfile::FileLock;
use crate::ports::keystore::{KeyStore, StoreError};
use crate::types::KeyScope;

const VAULT_VERSION: u8 = 1;

/// Argon2id cost parameters, recorded in the vault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory in KiB
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            m_cost: 65536, // 64 MB memory
            t_cost: 3,
            p_cost: 4,
        }
    }
}

impl KdfParams {
    /// Cheap parameters for tests only
    pub fn light() -> Self {
        Self { m_cost: 1024, t_cost: 1, p_cost: 1 }
    }

    fn argon2(&self) -> Result<Argon2<'static>, StoreError> {
        let params = argon2::Params::new(self.m_cost, self.t_cost, self.p_cost, Some(32))
            .map_err(|e| StoreError::Internal(format!("Argon2 params error: {}", e)))?;
        Ok(Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params))
    }
}

/// On-disk vault format
#[derive(Serialize, Deserialize)]
struct VaultFile {
    version: u8,
    kdf: KdfParams,
    /// Salt for Argon2 key derivation
    salt: String,
    /// Argon2 PHC string used to verify the password before decrypting
    password_hash: String,
    /// Incremented by every committed write
    revision: u64,
    created_at: String,
    entries: BTreeMap<String, SealedEntry>,
}

#[derive(Serialize, Deserialize, Clone)]
struct SealedEntry {
    /// AES-GCM nonce (base64)
    nonce: String,
    /// Encrypted key (base64)
    ciphertext: String,
    updated_at: String,
}

/// `KeyStore` backed by an encrypted JSON vault file
pub struct EncryptedFileKeyStore {
    path: PathBuf,
    salt: String,
    cipher_key: Zeroizing<[u8; 32]>,
}

impl EncryptedFileKeyStore {
    /// Open the vault at `path`, creating it when absent.
    pub fn open(path: impl Into<PathBuf>, password: &str) -> Result<Self, StoreError> {
        Self::open_with_params(path, password, KdfParams::default())
    }

    /// Like [`open`](Self::open); `params` only applies when a new vault is created.
    pub fn open_with_params(
        path: impl Into<PathBuf>,
        password: &str,
        params: KdfParams,
    ) -> Result<Self, StoreError> {
        let path = path.into();

        if path.exists() {
            let vault = read_vault(&path)?;
            verify_password(&vault, password)?;
            let cipher_key = derive_key(&vault.kdf, &vault.salt, password)?;
            return Ok(Self { path, salt: vault.salt, cipher_key });
        }

        let salt = SaltString::generate(&mut OsRng);
        let argon2 = params.argon2()?;
        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| StoreError::Internal(format!("Password hashing failed: {}", e)))?
            .to_string();
        let cipher_key = derive_key(&params, salt.as_str(), password)?;

        let vault = VaultFile {
            version: VAULT_VERSION,
            kdf: params,
            salt: salt.as_str().to_string(),
            password_hash,
            revision: 0,
            created_at: chrono::Utc::now().to_rfc3339(),
            entries: BTreeMap::new(),
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let lock = lock_vault(&path)?;
        if path.exists() {
            // Another process created the vault between our check and the lock
            drop(lock);
            return Self::open_with_params(path, password, params);
        }
        write_vault(&path, &vault)?;
        drop(lock);

        tracing::info!(path = %path.display(), "created key vault");
        Ok(Self { path, salt: vault.salt, cipher_key })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of committed writes since the vault was created
    pub fn revision(&self) -> Result<u64, StoreError> {
        Ok(read_vault(&self.path)?.revision)
    }

    /// Storage names of all entries (no decryption)
    pub fn entry_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(read_vault(&self.path)?.entries.into_keys().collect())
    }

    /// Re-encrypt every entry under a new password
    pub fn change_password(&mut self, old_password: &str, new_password: &str) -> Result<(), StoreError> {
        let lock = lock_vault(&self.path)?;
        let mut vault = read_vault(&self.path)?;
        verify_password(&vault, old_password)?;

        let mut plaintexts = BTreeMap::new();
        for (name, entry) in &vault.entries {
            plaintexts.insert(name.clone(), Zeroizing::new(self.open_entry(name, entry)?));
        }

        let salt = SaltString::generate(&mut OsRng);
        let argon2 = vault.kdf.argon2()?;
        vault.password_hash = argon2
            .hash_password(new_password.as_bytes(), &salt)
            .map_err(|e| StoreError::Internal(format!("Password hashing failed: {}", e)))?
            .to_string();
        vault.salt = salt.as_str().to_string();
        self.cipher_key = derive_key(&vault.kdf, &vault.salt, new_password)?;
        self.salt = vault.salt.clone();

        for (name, plaintext) in &plaintexts {
            let sealed = self.seal_entry(name, plaintext)?;
            vault.entries.insert(name.clone(), sealed);
        }
        vault.revision += 1;
        write_vault(&self.path, &vault)?;
        drop(lock);
        Ok(())
    }

    fn seal_entry(&self, name: &str, plaintext: &str) -> Result<SealedEntry, StoreError> {
        let cipher = Aes256Gcm::new_from_slice(&self.cipher_key[..])
            .map_err(|e| StoreError::Internal(format!("Cipher creation failed: {}", e)))?;

        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from(nonce_bytes);

        let ciphertext = cipher
            .encrypt(&nonce, Payload { msg: plaintext.as_bytes(), aad: name.as_bytes() })
            .map_err(|e| StoreError::Internal(format!("Encryption failed: {}", e)))?;

        Ok(SealedEntry {
            nonce: STANDARD.encode(nonce_bytes),
            ciphertext: STANDARD.encode(ciphertext),
            updated_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    fn open_entry(&self, name: &str, entry: &SealedEntry) -> Result<String, StoreError> {
        let cipher = Aes256Gcm::new_from_slice(&self.cipher_key[..])
            .map_err(|e| StoreError::Internal(format!("Cipher creation failed: {}", e)))?;

        let nonce_bytes: [u8; 12] = STANDARD
            .decode(&entry.nonce)
            .map_err(|e| StoreError::Corrupted(format!("Invalid nonce encoding: {}", e)))?
            .try_into()
            .map_err(|_| StoreError::Corrupted("Invalid nonce length".into()))?;
        let ciphertext = STANDARD
            .decode(&entry.ciphertext)
            .map_err(|e| StoreError::Corrupted(format!("Invalid ciphertext encoding: {}", e)))?;

        let mut plaintext = cipher
            .decrypt(&Nonce::from(nonce_bytes), Payload { msg: &ciphertext, aad: name.as_bytes() })
            .map_err(|_| StoreError::Corrupted(format!("entry '{}' failed authentication", name)))?;

        let value = String::from_utf8(plaintext.clone())
            .map_err(|_| StoreError::Corrupted(format!("entry '{}' is not UTF-8", name)))?;
        plaintext.zeroize();
        Ok(value)
    }

    /// Run `mutate` on a freshly read vault under the writer lock
    fn commit<F>(&self, mutate: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut VaultFile) -> Result<(), StoreError>,
    {
        let lock = lock_vault(&self.path)?;
        let mut vault = read_vault(&self.path)?;
        if vault.salt != self.salt {
            return Err(StoreError::Corrupted(
                "vault was re-keyed by another session; reopen it".into(),
            ));
        }
        mutate(&mut vault)?;
        vault.revision += 1;
        write_vault(&self.path, &vault)?;
        drop(lock);
        Ok(())
    }
}

impl KeyStore for EncryptedFileKeyStore {
    fn get(&self, scope: &KeyScope) -> Result<Option<String>, StoreError> {
        let name = scope.storage_key();
        let vault = read_vault(&self.path)?;
        vault
            .entries
            .get(&name)
            .map(|entry| self.open_entry(&name, entry))
            .transpose()
    }

    fn set(&self, scope: &KeyScope, value: &str) -> Result<(), StoreError> {
        let name = scope.storage_key();
        let sealed = self.seal_entry(&name, value)?;
        self.commit(|vault| {
            vault.entries.insert(name, sealed);
            Ok(())
        })
    }

    fn delete(&self, scope: &KeyScope) -> Result<(), StoreError> {
        let name = scope.storage_key();
        self.commit(|vault| {
            vault.entries.remove(&name);
            Ok(())
        })
    }

    fn contains(&self, scope: &KeyScope) -> Result<bool, StoreError> {
        Ok(read_vault(&self.path)?.entries.contains_key(&scope.storage_key()))
    }
}

/// Exclusive writer lock on the vault
fn lock_vault(vault_path: &Path) -> Result<FileLock, StoreError> {
    FileLock::try_acquire(vault_path)?
        .ok_or_else(|| StoreError::Locked(FileLock::lock_path(vault_path).display().to_string()))
}

fn read_vault(path: &Path) -> Result<VaultFile, StoreError> {
    let json = fs::read_to_string(path)?;
    let vault: VaultFile = serde_json::from_str(&json)
        .map_err(|e| StoreError::Corrupted(format!("Failed to parse vault: {}", e)))?;
    if vault.version != VAULT_VERSION {
        return Err(StoreError::Corrupted(format!("unsupported vault version {}", vault.version)));
    }
    Ok(vault)
}

fn write_vault(path: &Path, vault: &VaultFile) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(vault)
        .map_err(|e| StoreError::Internal(format!("Failed to serialize vault: {}", e)))?;
    let tmp = path.with_extension("tmp");

    // Set restrictive permissions on Unix
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::write(&tmp, &json)?;
        fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))?;
    }

    #[cfg(not(unix))]
    {
        fs::write(&tmp, &json)?;
    }

    fs::rename(&tmp, path)?;
    Ok(())
}

fn verify_password(vault: &VaultFile, password: &str) -> Result<(), StoreError> {
    let parsed = PasswordHash::new(&vault.password_hash)
        .map_err(|e| StoreError::Corrupted(format!("Invalid password hash: {}", e)))?;
    vault
        .kdf
        .argon2()?
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| StoreError::InvalidPassword)
}

fn derive_key(params: &KdfParams, salt: &str, password: &str) -> Result<Zeroizing<[u8; 32]>, StoreError> {
    let mut key = Zeroizing::new([0u8; 32]);
    params
        .argon2()?
        .hash_password_into(password.as_bytes(), salt.as_bytes(), &mut key[..])
        .map_err(|e| StoreError::Internal(format!("Key derivation failed: {}", e)))?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Address, Mode};
    use tempfile::tempdir;

    const PASSWORD: &str = "TestPassword123";

    fn scope(byte: u8) -> KeyScope {
        KeyScope::new(Address::from_bytes([byte; 20]), Mode::Standalone)
    }

    fn open(path: &Path) -> EncryptedFileKeyStore {
        EncryptedFileKeyStore::open_with_params(path, PASSWORD, KdfParams::light()).unwrap()
    }

    #[test]
    fn test_set_get_roundtrip_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vault.json");

        let store = open(&path);
        store.set(&scope(1), "secret-key-material").unwrap();
        drop(store);

        let reopened = open(&path);
        assert_eq!(reopened.get(&scope(1)).unwrap().as_deref(), Some("secret-key-material"));
        assert_eq!(reopened.get(&scope(2)).unwrap(), None);
    }

    #[test]
    fn test_plaintext_never_on_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vault.json");

        open(&path).set(&scope(1), "very-distinctive-secret").unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("very-distinctive-secret"));
        assert!(raw.contains(&scope(1).storage_key()));
    }

    #[test]
    fn test_wrong_password_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vault.json");
        open(&path);

        let result = EncryptedFileKeyStore::open_with_params(&path, "WrongPassword123", KdfParams::light());
        assert!(matches!(result, Err(StoreError::InvalidPassword)));
    }

    #[test]
    fn test_swapped_entries_fail_authentication() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vault.json");
        let store = open(&path);
        store.set(&scope(1), "key-one").unwrap();
        store.set(&scope(2), "key-two").unwrap();

        let mut vault = read_vault(&path).unwrap();
        let one = vault.entries[&scope(1).storage_key()].clone();
        vault.entries.insert(scope(2).storage_key(), one);
        write_vault(&path, &vault).unwrap();

        assert!(matches!(store.get(&scope(2)), Err(StoreError::Corrupted(_))));
    }

    #[test]
    fn test_writes_bump_revision() {
        let dir = tempdir().unwrap();
        let store = open(&dir.path().join("vault.json"));
        assert_eq!(store.revision().unwrap(), 0);

        store.set(&scope(1), "a").unwrap();
        store.set(&scope(1), "b").unwrap();
        store.delete(&scope(1)).unwrap();

        assert_eq!(store.revision().unwrap(), 3);
        assert!(!store.contains(&scope(1)).unwrap());
    }

    #[test]
    fn test_held_lock_rejects_writer() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vault.json");
        let store = open(&path);

        let held = FileLock::try_acquire(&path).unwrap().unwrap();
        let err = store.set(&scope(1), "x").unwrap_err();
        assert!(matches!(err, StoreError::Locked(_)));
        // A stale lock is named so it can be removed by hand
        assert!(err.to_string().contains(&dir.path().join("vault.lock").display().to_string()));
        drop(held);

        store.set(&scope(1), "x").unwrap();
        assert_eq!(store.get(&scope(1)).unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn test_change_password() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vault.json");
        let mut store = open(&path);
        store.set(&scope(1), "survives").unwrap();

        store.change_password(PASSWORD, "NewPassword456").unwrap();
        assert_eq!(store.get(&scope(1)).unwrap().as_deref(), Some("survives"));

        let reopened =
            EncryptedFileKeyStore::open_with_params(&path, "NewPassword456", KdfParams::light()).unwrap();
        assert_eq!(reopened.get(&scope(1)).unwrap().as_deref(), Some("survives"));
        assert!(EncryptedFileKeyStore::open_with_params(&path, PASSWORD, KdfParams::light()).is_err());
    }
}
