// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Seed & Key Derivation Engine
//!
//! Turns wallet entropy into BIP32-Ed25519 keys along Algorand's BIP44 path
//! and exposes the signing primitives built on top of them.
//!
//! ## Layers
//!
//! - [`mnemonic`]: entropy <-> 24-word phrase <-> 64-byte BIP-39 seed
//! - [`bip32_ed25519`]: root key, child derivation, raw Ed25519 signing, ECDH
//! - [`path`]: `m/44'/coin'/account'/change/index` coordinates
//! - [`sdk`]: the [`HDWalletSdk`] seam bound to one wallet seed
//! - [`service`]: wallet creation, address generation and account recovery
//!
//! No derivation state is global. Every [`XHdWalletSdk`] is bound to exactly
//! one seed at construction.

pub mod bip32_ed25519;
pub mod key_cache;
pub mod mnemonic;
pub mod path;
pub mod schema;
pub mod sdk;
pub mod service;

pub use bip32_ed25519::ExtendedKey;
pub use path::Bip44Path;
pub use sdk::{
    DeriveKeyDraft, EcdhDraft, HDWalletSdk, KeyGenDraft, SignDataDraft, SignTransactionDraft,
    VerifySignatureDraft, XHdWalletSdk,
};
pub use service::{AccountFastLookup, AccountLookup, HDWalletService};

/// Errors raised by derivation and software signing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HDWalletError {
    #[error("entropy must be 32 bytes")]
    InvalidEntropy,

    #[error("wallet seed is missing or invalid")]
    InvalidSeed,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("failed to generate entropy")]
    EntropyGenerationFailed,

    #[error("sdk error: {0}")]
    SdkError(String),

    #[error("account lookup failed")]
    FastLookupFailed,
}

impl HDWalletError {
    pub(crate) fn sdk(message: impl Into<String>) -> Self {
        Self::SdkError(message.into())
    }
}

pub type HDWalletResult<T> = Result<T, HDWalletError>;
