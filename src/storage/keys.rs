// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key layout of the secure store.
//!
//! ```text
//! wallet.{wallet_id}                      # HDWalletSeed (JSON)
//! address.{wallet_id}.{address}           # HDWalletAddress (JSON)
//! account.{address}                       # raw Ed25519 secret of a standard account
//! audit.{yyyy-mm-dd}.{event_id}           # AuditEvent (JSON)
//! walletconnect.sessions                  # WCSession list (JSON)
//! ```
//!
//! Algorand addresses are base32 and wallet ids are UUIDs, so neither contains
//! the `.` separator and prefix scans cannot bleed across wallets.

pub const WALLET_PREFIX: &str = "wallet.";
pub const ADDRESS_PREFIX: &str = "address.";
pub const ACCOUNT_KEY_PREFIX: &str = "account.";
pub const AUDIT_PREFIX: &str = "audit.";
pub const WC_SESSIONS_KEY: &str = "walletconnect.sessions";

// ========== Wallet Keys ==========

pub fn wallet(wallet_id: &str) -> String {
    format!("{WALLET_PREFIX}{wallet_id}")
}

// ========== Address Keys ==========

pub fn address(wallet_id: &str, address: &str) -> String {
    format!("{ADDRESS_PREFIX}{wallet_id}.{address}")
}

/// Prefix matching every address of one wallet.
pub fn addresses_of(wallet_id: &str) -> String {
    format!("{ADDRESS_PREFIX}{wallet_id}.")
}

// ========== Standard Account Keys ==========

pub fn account_key(address: &str) -> String {
    format!("{ACCOUNT_KEY_PREFIX}{address}")
}

// ========== Audit Keys ==========

pub fn audit_event(date: &str, event_id: &str) -> String {
    format!("{AUDIT_PREFIX}{date}.{event_id}")
}

pub fn audit_day(date: &str) -> String {
    format!("{AUDIT_PREFIX}{date}.")
}
