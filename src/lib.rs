// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HD Wallet Core - Algorand key derivation and signing
//!
//! The key-handling core of a mobile Algorand wallet: BIP32-Ed25519 key
//! derivation, software and Ledger signing, signature verification,
//! WalletConnect request validation and encrypted wallet storage.
//!
//! ## Modules
//!
//! - `hd` - Seed handling and BIP32-Ed25519 derivation
//! - `signing` - Software and Ledger signers, signature verification
//! - `walletconnect` - Request validation, signing flow, sessions
//! - `accounts` - Account collection, rekeys and authorization
//! - `storage` - Secure keyed store, wallet repository, audit trail
//! - `address` - Algorand address codec
//! - `assets` - Asset list filtering

pub mod accounts;
pub mod address;
pub mod assets;
pub mod config;
pub mod error;
pub mod hd;
pub mod logging;
pub mod models;
pub mod signing;
pub mod storage;
pub mod walletconnect;

pub use error::{CoreError, CoreResult};
