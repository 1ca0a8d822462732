// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Accounts
//!
//! The account view the signing core consumes from the application:
//! which addresses the user holds, how each one signs, and where rekeyed
//! accounts send their signing authority.
//!
//! Rekeying changes who may sign for an address without changing the
//! address. A rekeyed account is signed for with the key of its
//! `auth_address`, which may be another local account, a Ledger device
//! account recorded in `rekey_detail`, or something the wallet does not
//! control at all.

pub mod authorization;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::models::HDWalletAddressDetail;

pub use authorization::AccountAuthorization;

/// Ledger device account coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerDetail {
    /// Device identifier.
    pub id: String,
    /// Display name of the device.
    pub name: String,
    /// Account index on the device.
    pub index_in_ledger: u32,
}

/// One account known to the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Account {
    pub address: String,
    /// Address currently authorized to sign, if rekeyed.
    pub auth_address: Option<String>,
    pub hd_wallet_address_detail: Option<HDWalletAddressDetail>,
    pub ledger_detail: Option<LedgerDetail>,
    /// Ledger accounts this account has been rekeyed to, by auth address.
    #[serde(default)]
    pub rekey_detail: HashMap<String, LedgerDetail>,
    #[serde(default)]
    pub is_watch: bool,
    /// Whether the account's remote state is currently loaded.
    #[serde(default = "default_true")]
    pub is_available: bool,
    /// A raw private key for this address is held in the keyed store.
    #[serde(default)]
    pub has_private_data: bool,
}

fn default_true() -> bool {
    true
}

impl Account {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            is_available: true,
            ..Self::default()
        }
    }

    pub fn standard(address: impl Into<String>) -> Self {
        Self {
            has_private_data: true,
            ..Self::new(address)
        }
    }

    pub fn hd(address: impl Into<String>, detail: HDWalletAddressDetail) -> Self {
        Self {
            hd_wallet_address_detail: Some(detail),
            ..Self::new(address)
        }
    }

    pub fn ledger(address: impl Into<String>, detail: LedgerDetail) -> Self {
        Self {
            ledger_detail: Some(detail),
            ..Self::new(address)
        }
    }

    pub fn watch(address: impl Into<String>) -> Self {
        Self {
            is_watch: true,
            ..Self::new(address)
        }
    }

    pub fn rekeyed_to(mut self, auth_address: impl Into<String>) -> Self {
        self.auth_address = Some(auth_address.into());
        self
    }

    /// The auth address when it differs from the account's own address.
    pub fn rekeyed_auth_address(&self) -> Option<&str> {
        self.auth_address
            .as_deref()
            .filter(|auth| !auth.is_empty() && *auth != self.address)
    }

    pub fn is_rekeyed(&self) -> bool {
        self.rekeyed_auth_address().is_some()
    }
}

/// Where the signature for an account comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningAuthority<'a> {
    /// Key derived from a local HD wallet.
    Hd {
        address: &'a str,
        detail: &'a HDWalletAddressDetail,
    },
    /// Key on a Ledger device.
    Ledger {
        address: &'a str,
        detail: &'a LedgerDetail,
    },
    /// Raw private key held for `address`.
    Standard { address: &'a str },
}

impl SigningAuthority<'_> {
    /// Address whose key produces the signature.
    pub fn address(&self) -> &str {
        match self {
            Self::Hd { address, .. } | Self::Ledger { address, .. } | Self::Standard { address } => {
                address
            }
        }
    }
}

/// The user's accounts keyed by address.
#[derive(Debug, Clone, Default)]
pub struct AccountCollection {
    accounts: BTreeMap<String, Account>,
}

impl AccountCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, account: Account) {
        self.accounts.insert(account.address.clone(), account);
    }

    pub fn remove(&mut self, address: &str) -> Option<Account> {
        self.accounts.remove(address)
    }

    pub fn get(&self, address: &str) -> Option<&Account> {
        self.accounts.get(address)
    }

    pub fn contains(&self, address: &str) -> bool {
        self.accounts.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    /// Whether any local account derives from `wallet_id`.
    pub fn has_wallet(&self, wallet_id: &str) -> bool {
        self.iter().any(|account| {
            account
                .hd_wallet_address_detail
                .as_ref()
                .is_some_and(|detail| detail.wallet_id == wallet_id)
        })
    }

    /// Whether the wallet holds signing material for `account` itself,
    /// ignoring any rekey.
    pub fn has_private_data(&self, account: &Account) -> bool {
        match &account.hd_wallet_address_detail {
            Some(detail) => self.has_wallet(&detail.wallet_id),
            None => account.has_private_data,
        }
    }

    /// The local account whose key signs for `account`.
    ///
    /// A rekeyed account resolves to its auth account; `None` when that
    /// account is not held locally.
    pub fn signing_account<'a>(&'a self, account: &'a Account) -> Option<&'a Account> {
        match account.rekeyed_auth_address() {
            Some(auth) => self.get(auth),
            None => Some(account),
        }
    }

    /// Key material that signs for `account`, following the rekey link.
    pub fn signing_authority<'a>(&'a self, account: &'a Account) -> Option<SigningAuthority<'a>> {
        if account.is_watch {
            return None;
        }

        if let Some(auth) = account.rekeyed_auth_address() {
            return match self.get(auth) {
                Some(auth_account) if !auth_account.is_watch => self.own_authority(auth_account),
                Some(_) => None,
                None => account
                    .rekey_detail
                    .get(auth)
                    .map(|detail| SigningAuthority::Ledger {
                        address: auth,
                        detail,
                    }),
            };
        }

        self.own_authority(account)
    }

    fn own_authority<'a>(&'a self, account: &'a Account) -> Option<SigningAuthority<'a>> {
        if let Some(detail) = &account.hd_wallet_address_detail {
            return self.has_wallet(&detail.wallet_id).then_some(SigningAuthority::Hd {
                address: &account.address,
                detail,
            });
        }
        if let Some(detail) = &account.ledger_detail {
            return Some(SigningAuthority::Ledger {
                address: &account.address,
                detail,
            });
        }
        account.has_private_data.then_some(SigningAuthority::Standard {
            address: &account.address,
        })
    }

    /// Whether signing for `account` needs a Ledger device.
    pub fn requires_ledger(&self, account: &Account) -> bool {
        matches!(
            self.signing_authority(account),
            Some(SigningAuthority::Ledger { .. })
        )
    }

    /// Resolve a requested signer address to a controlled account.
    ///
    /// Matches the account with that address, or an account that has been
    /// rekeyed to that address and is authorized to sign.
    pub fn find_signer(&self, signer: &str) -> Option<&Account> {
        if let Some(account) = self.get(signer) {
            if self.authorization(account).is_authorized() {
                return Some(account);
            }
        }
        self.iter().find(|account| {
            account.rekeyed_auth_address() == Some(signer)
                && self.authorization(account).is_authorized()
        })
    }
}
