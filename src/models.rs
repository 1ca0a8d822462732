// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Core wallet data model.
//!
//! These types flow between the derivation engine, the signers and the
//! secure store. None of them carry private key bytes except
//! [`HDWalletSeed`], which zeroizes its entropy on drop and redacts it from
//! `Debug` output.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

// =============================================================================
// Derivation Parameters
// =============================================================================

/// BIP32-Ed25519 child derivation scheme.
///
/// The two schemes differ only in how many of the top bits of `zL` are
/// discarded before the child scalar is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivationType {
    /// Original BIP32-Ed25519 (Khovratovich/Law), truncates 32 bits.
    Khovratovich,
    /// Peikert's amendment, truncates 9 bits.
    #[default]
    Peikert,
}

impl DerivationType {
    /// Number of top bits cleared from `zL`.
    pub const fn truncated_bits(self) -> usize {
        match self {
            Self::Khovratovich => 32,
            Self::Peikert => 9,
        }
    }
}

/// Key context selecting the BIP44 coin type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyContext {
    /// Algorand addresses, coin type 283.
    #[default]
    Address,
    /// Identity keys, coin type 0.
    Identity,
}

impl KeyContext {
    pub const fn coin_type(self) -> u32 {
        match self {
            Self::Address => 283,
            Self::Identity => 0,
        }
    }
}

// =============================================================================
// Wallet Seed
// =============================================================================

/// A wallet's root entropy.
///
/// Immutable once created. The entropy never leaves the process except as a
/// sealed value in the secure store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct HDWalletSeed {
    pub id: String,
    #[serde(with = "entropy_base64")]
    entropy: Vec<u8>,
}

impl HDWalletSeed {
    /// Create a seed record with a fresh UUID v4 identifier.
    pub fn new(entropy: Vec<u8>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), entropy)
    }

    pub fn with_id(id: impl Into<String>, entropy: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            entropy,
        }
    }

    pub fn entropy(&self) -> &[u8] {
        &self.entropy
    }
}

impl fmt::Debug for HDWalletSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HDWalletSeed")
            .field("id", &self.id)
            .field("entropy", &"<redacted>")
            .finish()
    }
}

mod entropy_base64 {
    use base64ct::{Base64, Encoding};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&Base64::encode_string(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Base64::decode_vec(&encoded).map_err(D::Error::custom)
    }
}

// =============================================================================
// Addresses
// =============================================================================

/// Derivation coordinates of one address inside a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HDWalletAddressDetail {
    pub wallet_id: String,
    pub account: u32,
    pub change: u32,
    pub key_index: u32,
    #[serde(default)]
    pub derivation_type: DerivationType,
}

/// A derived address as persisted in the secure store.
///
/// Holds the public key only; signing always re-derives from the seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HDWalletAddress {
    pub wallet_id: String,
    pub address: String,
    #[serde(with = "public_key_hex")]
    pub public_key: [u8; 32],
    pub account: u32,
    pub change: u32,
    pub key_index: u32,
    #[serde(default)]
    pub derivation_type: DerivationType,
}

impl HDWalletAddress {
    pub fn detail(&self) -> HDWalletAddressDetail {
        HDWalletAddressDetail {
            wallet_id: self.wallet_id.clone(),
            account: self.account,
            change: self.change,
            key_index: self.key_index,
            derivation_type: self.derivation_type,
        }
    }
}

mod public_key_hex {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(key: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(key))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let bytes = hex::decode(encoded).map_err(D::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| D::Error::custom("public key must be 32 bytes"))
    }
}

/// Result of importing a recovered account into a freshly saved wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredAddress {
    pub address: String,
    pub account: u32,
    pub change: u32,
    pub key_index: u32,
}

// =============================================================================
// Arbitrary Data Metadata
// =============================================================================

/// Encoding of an arbitrary-data payload before schema validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataEncoding {
    /// Payload bytes are base64 text of the JSON document.
    Base64,
    /// Payload bytes are the JSON document itself.
    #[default]
    None,
}

/// Describes how an arbitrary-data payload is encoded and what shape it must
/// have once decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignMetadata {
    pub encoding: DataEncoding,
    pub schema: serde_json::Value,
}

impl SignMetadata {
    /// Metadata that accepts any JSON object sent as raw bytes.
    pub fn any_object() -> Self {
        Self {
            encoding: DataEncoding::None,
            schema: serde_json::json!({ "type": "object" }),
        }
    }
}
