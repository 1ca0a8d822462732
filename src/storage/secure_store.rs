// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Keyed secure store backends.
//!
//! ## Backends
//!
//! - [`RedbSecureStore`]: a redb file whose values are sealed with
//!   AES-256-GCM under a device key. The store key is bound in as associated
//!   data, so a sealed value copied under another key fails to open.
//! - [`MemorySecureStore`]: process-local map for tests and ephemeral use.
//!   It can be put into a locked state to mimic a device that has not been
//!   unlocked since boot.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
    Aes256Gcm, Key, Nonce,
};
use rand::RngCore;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::{StorageError, StorageResult};

/// Keyed store of secret values.
///
/// Reads return `Ok(None)` for absent keys. Errors are reserved for the
/// storage layer itself failing.
pub trait SecureStore: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<Zeroizing<Vec<u8>>>>;

    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()>;

    /// Removing an absent key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// All keys starting with `prefix`, in ascending order.
    fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>>;
}

// =============================================================================
// Device Key
// =============================================================================

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// AES-256-GCM key that seals every value of a [`RedbSecureStore`].
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DeviceKey([u8; KEY_LEN]);

impl DeviceKey {
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LEN];
        rand::rngs::OsRng.fill_bytes(&mut key);
        Self(key)
    }

    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DeviceKey(<redacted>)")
    }
}

// =============================================================================
// Redb Backend
// =============================================================================

/// Sealed values: store key → `nonce || ciphertext`.
const SECRETS: TableDefinition<&str, &[u8]> = TableDefinition::new("secrets");

fn read_failed(e: impl fmt::Display) -> StorageError {
    StorageError::ReadFailed(e.to_string())
}

fn write_failed(e: impl fmt::Display) -> StorageError {
    StorageError::WriteFailed(e.to_string())
}

pub struct RedbSecureStore {
    db: Database,
    cipher: Aes256Gcm,
}

impl RedbSecureStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: &Path, key: &DeviceKey) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_failed)?;
        }
        let db = Database::create(path).map_err(write_failed)?;

        // Pre-create the table so read transactions never see it missing.
        let write_txn = db.begin_write().map_err(write_failed)?;
        {
            let _ = write_txn.open_table(SECRETS).map_err(write_failed)?;
        }
        write_txn.commit().map_err(write_failed)?;

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key.0));
        Ok(Self { db, cipher })
    }

    fn seal(&self, key: &str, value: &[u8]) -> StorageResult<Vec<u8>> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: value,
                    aad: key.as_bytes(),
                },
            )
            .map_err(|_| StorageError::Encode("sealing failed".to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    fn unseal(&self, key: &str, sealed: &[u8]) -> StorageResult<Zeroizing<Vec<u8>>> {
        if sealed.len() < NONCE_LEN {
            return Err(StorageError::IntegrityViolation(key.to_string()));
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        self.cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: key.as_bytes(),
                },
            )
            .map(Zeroizing::new)
            .map_err(|_| StorageError::IntegrityViolation(key.to_string()))
    }

    /// Write raw sealed bytes, bypassing encryption. Test-only tamper hook.
    #[cfg(test)]
    fn put_raw(&self, key: &str, raw: &[u8]) {
        let write_txn = self.db.begin_write().unwrap();
        {
            let mut table = write_txn.open_table(SECRETS).unwrap();
            table.insert(key, raw).unwrap();
        }
        write_txn.commit().unwrap();
    }

    #[cfg(test)]
    fn get_raw(&self, key: &str) -> Option<Vec<u8>> {
        let read_txn = self.db.begin_read().unwrap();
        let table = read_txn.open_table(SECRETS).unwrap();
        table.get(key).unwrap().map(|v| v.value().to_vec())
    }
}

impl SecureStore for RedbSecureStore {
    fn get(&self, key: &str) -> StorageResult<Option<Zeroizing<Vec<u8>>>> {
        let read_txn = self.db.begin_read().map_err(read_failed)?;
        let table = read_txn.open_table(SECRETS).map_err(read_failed)?;
        match table.get(key).map_err(read_failed)? {
            Some(sealed) => self.unseal(key, sealed.value()).map(Some),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        let sealed = self.seal(key, value)?;
        let write_txn = self.db.begin_write().map_err(write_failed)?;
        {
            let mut table = write_txn.open_table(SECRETS).map_err(write_failed)?;
            table.insert(key, sealed.as_slice()).map_err(write_failed)?;
        }
        write_txn.commit().map_err(write_failed)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let write_txn = self.db.begin_write().map_err(write_failed)?;
        {
            let mut table = write_txn.open_table(SECRETS).map_err(write_failed)?;
            table.remove(key).map_err(write_failed)?;
        }
        write_txn.commit().map_err(write_failed)?;
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let read_txn = self.db.begin_read().map_err(read_failed)?;
        let table = read_txn.open_table(SECRETS).map_err(read_failed)?;

        let mut keys = Vec::new();
        for entry in table.range(prefix..).map_err(read_failed)? {
            let (key, _) = entry.map_err(read_failed)?;
            let key = key.value();
            if !key.starts_with(prefix) {
                break;
            }
            keys.push(key.to_string());
        }
        Ok(keys)
    }
}

// =============================================================================
// Memory Backend
// =============================================================================

#[derive(Default)]
pub struct MemorySecureStore {
    entries: RwLock<BTreeMap<String, Zeroizing<Vec<u8>>>>,
    locked: AtomicBool,
}

impl MemorySecureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While locked every operation fails with [`StorageError::NoContext`].
    pub fn set_locked(&self, locked: bool) {
        self.locked.store(locked, Ordering::SeqCst);
    }

    fn ensure_unlocked(&self) -> StorageResult<()> {
        if self.locked.load(Ordering::SeqCst) {
            return Err(StorageError::NoContext);
        }
        Ok(())
    }
}

impl SecureStore for MemorySecureStore {
    fn get(&self, key: &str) -> StorageResult<Option<Zeroizing<Vec<u8>>>> {
        self.ensure_unlocked()?;
        let entries = self.entries.read().map_err(read_failed)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        self.ensure_unlocked()?;
        let mut entries = self.entries.write().map_err(write_failed)?;
        entries.insert(key.to_string(), Zeroizing::new(value.to_vec()));
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.ensure_unlocked()?;
        let mut entries = self.entries.write().map_err(write_failed)?;
        entries.remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        self.ensure_unlocked()?;
        let entries = self.entries.read().map_err(read_failed)?;
        Ok(entries
            .range(prefix.to_string()..)
            .map(|(key, _)| key)
            .take_while(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}
