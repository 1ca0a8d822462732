// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HD wallet repository over a [`SecureStore`].
//!
//! Seeds live under `wallet.{wallet_id}` and derived addresses under
//! `address.{wallet_id}.{address}`. Addresses carry public keys only.
//! Every successful save or delete is recorded in the audit trail.

use serde::{de::DeserializeOwned, Serialize};
use zeroize::Zeroizing;

use super::{keys, AuditEvent, AuditEventType, AuditLog, SecureStore, StorageError, StorageResult};
use crate::models::{HDWalletAddress, HDWalletSeed};

/// Repository for HD wallet seeds and addresses.
pub struct HDWalletStorage<'a, S: SecureStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: SecureStore + ?Sized> HDWalletStorage<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    fn write_json<T: Serialize>(&self, key: &str, value: &T) -> StorageResult<()> {
        let bytes = Zeroizing::new(
            serde_json::to_vec(value).map_err(|e| StorageError::Encode(e.to_string()))?,
        );
        self.store.set(key, &bytes)
    }

    fn audit(&self, event_type: AuditEventType, resource_type: &str, resource_id: &str) {
        AuditLog::new(self.store)
            .record(AuditEvent::new(event_type).with_resource(resource_type, resource_id));
    }

    /// Decode the value under `key`, degrading every failure to `None`.
    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.store.get(key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "secure store read failed");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "discarding undecodable secure store entry");
                None
            }
        }
    }

    // ========== Wallets ==========

    pub fn save_wallet(&self, wallet: &HDWalletSeed) -> StorageResult<()> {
        self.write_json(&keys::wallet(&wallet.id), wallet)?;
        self.audit(AuditEventType::WalletCreated, "wallet", &wallet.id);
        tracing::debug!(wallet_id = %wallet.id, "saved HD wallet");
        Ok(())
    }

    pub fn wallet(&self, wallet_id: &str) -> Option<HDWalletSeed> {
        self.read_json(&keys::wallet(wallet_id))
    }

    /// Ids of every stored wallet.
    pub fn wallet_ids(&self) -> StorageResult<Vec<String>> {
        Ok(self
            .store
            .keys_with_prefix(keys::WALLET_PREFIX)?
            .into_iter()
            .filter_map(|key| key.strip_prefix(keys::WALLET_PREFIX).map(str::to_string))
            .collect())
    }

    /// Delete a wallet seed together with all of its addresses.
    pub fn delete_wallet(&self, wallet_id: &str) -> StorageResult<()> {
        for key in self.store.keys_with_prefix(&keys::addresses_of(wallet_id))? {
            self.store.remove(&key)?;
        }
        self.store.remove(&keys::wallet(wallet_id))?;
        self.audit(AuditEventType::WalletDeleted, "wallet", wallet_id);
        tracing::info!(wallet_id = %wallet_id, "deleted HD wallet");
        Ok(())
    }

    // ========== Addresses ==========

    pub fn save_address(&self, address: &HDWalletAddress) -> StorageResult<()> {
        self.write_json(&keys::address(&address.wallet_id, &address.address), address)?;
        self.audit(AuditEventType::AddressSaved, "address", &address.address);
        tracing::debug!(
            wallet_id = %address.wallet_id,
            address = %address.address,
            "saved HD wallet address"
        );
        Ok(())
    }

    pub fn address(&self, wallet_id: &str, address: &str) -> Option<HDWalletAddress> {
        self.read_json(&keys::address(wallet_id, address))
    }

    /// Every decodable address of a wallet, ordered by address.
    pub fn addresses(&self, wallet_id: &str) -> Vec<HDWalletAddress> {
        let prefix = keys::addresses_of(wallet_id);
        match self.store.keys_with_prefix(&prefix) {
            Ok(keys) => keys.iter().filter_map(|key| self.read_json(key)).collect(),
            Err(e) => {
                tracing::warn!(wallet_id = %wallet_id, error = %e, "listing addresses failed");
                Vec::new()
            }
        }
    }

    pub fn delete_address(&self, wallet_id: &str, address: &str) -> StorageResult<()> {
        self.store.remove(&keys::address(wallet_id, address))?;
        self.audit(AuditEventType::AddressDeleted, "address", address);
        Ok(())
    }
}
