// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Secure Storage Module
//!
//! Wallet seeds, derived addresses, WalletConnect sessions and the audit
//! trail all live in one keyed secure store.
//!
//! ## Security Model
//!
//! - Values are encrypted at rest (AES-256-GCM under a device key)
//! - Each value is bound to its key and cannot be replayed under another
//! - Any modification outside the process causes the read to fail
//! - Private key bytes are never stored; only entropy and public keys
//!
//! ## Read Semantics
//!
//! [`HDWalletStorage`] reads return `Option`/`Vec`: absent keys, store
//! failures and undecodable values all read as absent and are logged.
//! Saves and deletes propagate storage-layer errors.

pub mod audit;
pub mod hd_wallet;
pub mod keys;
pub mod secure_store;

pub use audit::{AuditEvent, AuditEventType, AuditLog};
pub use hd_wallet::HDWalletStorage;
pub use secure_store::{DeviceKey, MemorySecureStore, RedbSecureStore, SecureStore};

/// Secure storage errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// The backing store could not be read.
    #[error("read failed: {0}")]
    ReadFailed(String),

    /// The backing store could not be written.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// The store is not accessible in the current device state.
    #[error("secure store is not accessible")]
    NoContext,

    #[error("decode error: {0}")]
    Decode(String),

    #[error("encode error: {0}")]
    Encode(String),

    /// A sealed value failed authentication (tampered, moved or wrong key).
    #[error("integrity violation: {0}")]
    IntegrityViolation(String),
}

pub type StorageResult<T> = Result<T, StorageError>;
