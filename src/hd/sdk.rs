// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The HD wallet SDK seam.
//!
//! [`HDWalletSdk`] is what the signers talk to. [`XHdWalletSdk`] is the real
//! engine, bound to one wallet seed; tests substitute a recording double.
//! Every operation takes a draft describing one call. Drafts are transient
//! and never persisted.

use base64ct::{Base64, Encoding};
use zeroize::Zeroizing;

use super::bip32_ed25519::ExtendedKey;
use super::key_cache::PublicKeyCache;
use super::mnemonic::{seed_from_entropy, SEED_LEN};
use super::path::Bip44Path;
use super::{schema, HDWalletError, HDWalletResult};
use crate::models::{
    DataEncoding, DerivationType, HDWalletAddressDetail, HDWalletSeed, KeyContext, SignMetadata,
};

/// Prefixes reserved for Algorand protocol objects. Arbitrary data starting
/// with one of these could be replayed as a transaction or program signature.
pub const RESERVED_DATA_TAGS: [&[u8]; 4] = [b"TX", b"MX", b"progData", b"Program"];

// =============================================================================
// Drafts
// =============================================================================

/// Coordinates of one key. Also the public-key cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyGenDraft {
    pub context: KeyContext,
    pub account: u32,
    pub change: u32,
    pub key_index: u32,
    pub derivation_type: DerivationType,
}

impl KeyGenDraft {
    pub fn for_address(detail: &HDWalletAddressDetail) -> Self {
        Self {
            context: KeyContext::Address,
            account: detail.account,
            change: detail.change,
            key_index: detail.key_index,
            derivation_type: detail.derivation_type,
        }
    }

    pub fn path(&self) -> Bip44Path {
        Bip44Path::new(self.context, self.account, self.change, self.key_index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeriveKeyDraft {
    /// Raw indices; the caller hardens the levels that need it.
    pub bip44_path: Vec<u32>,
    pub is_private: bool,
    pub derivation_type: DerivationType,
}

#[derive(Debug, Clone, Copy)]
pub struct SignTransactionDraft<'a> {
    pub key: KeyGenDraft,
    /// Transaction bytes, normally already prefixed with `TX`.
    pub prefix_encoded_tx: &'a [u8],
}

#[derive(Debug, Clone, Copy)]
pub struct SignDataDraft<'a> {
    pub key: KeyGenDraft,
    pub data: &'a [u8],
    pub metadata: &'a SignMetadata,
}

#[derive(Debug, Clone, Copy)]
pub struct VerifySignatureDraft<'a> {
    pub signature: &'a [u8],
    pub message: &'a [u8],
    pub public_key: &'a [u8],
}

#[derive(Debug, Clone, Copy)]
pub struct EcdhDraft<'a> {
    pub key: KeyGenDraft,
    pub other_party_public_key: &'a [u8],
    pub me_first: bool,
}

// =============================================================================
// Trait
// =============================================================================

pub trait HDWalletSdk: Send + Sync {
    /// 32-byte Ed25519 public key at the draft's coordinates.
    fn generate_key(&self, draft: &KeyGenDraft) -> HDWalletResult<[u8; 32]>;

    /// Extended private key (96 bytes) or public key (32 bytes).
    fn derive_key(&self, draft: &DeriveKeyDraft) -> HDWalletResult<Zeroizing<Vec<u8>>>;

    fn sign_transaction(&self, draft: &SignTransactionDraft<'_>) -> HDWalletResult<Vec<u8>>;

    fn sign_data(&self, draft: &SignDataDraft<'_>) -> HDWalletResult<Vec<u8>>;

    fn perform_ecdh(&self, draft: &EcdhDraft<'_>) -> HDWalletResult<[u8; 32]>;

    fn validate_data(&self, data: &[u8], metadata: &SignMetadata) -> HDWalletResult<()> {
        validate_data(data, metadata)
    }

    fn verify_signature(&self, draft: &VerifySignatureDraft<'_>) -> bool {
        crate::signing::verify::verify_signature(draft.signature, draft.message, draft.public_key)
    }
}

// =============================================================================
// Data validation
// =============================================================================

fn has_reserved_tag(data: &[u8]) -> bool {
    RESERVED_DATA_TAGS.iter().any(|tag| data.starts_with(tag))
}

/// Check an arbitrary-data payload before it may be signed.
///
/// The payload must not start with a reserved tag (before or after
/// decoding), must decode per `metadata.encoding` into JSON, and that JSON
/// must satisfy `metadata.schema`.
pub fn validate_data(data: &[u8], metadata: &SignMetadata) -> HDWalletResult<()> {
    if has_reserved_tag(data) {
        return Err(HDWalletError::sdk("data carries a reserved Algorand domain tag"));
    }

    let decoded = match metadata.encoding {
        DataEncoding::Base64 => {
            let text = std::str::from_utf8(data)
                .map_err(|_| HDWalletError::sdk("base64 data is not valid UTF-8"))?;
            Base64::decode_vec(text.trim())
                .map_err(|e| HDWalletError::sdk(format!("invalid base64 data: {}", e)))?
        }
        DataEncoding::None => data.to_vec(),
    };

    if has_reserved_tag(&decoded) {
        return Err(HDWalletError::sdk("data carries a reserved Algorand domain tag"));
    }

    let document: serde_json::Value = serde_json::from_slice(&decoded)
        .map_err(|e| HDWalletError::sdk(format!("data is not valid JSON: {}", e)))?;

    schema::validate(&document, &metadata.schema)
        .map_err(|e| HDWalletError::sdk(format!("data does not match schema: {}", e)))
}

// =============================================================================
// XHdWalletSdk
// =============================================================================

/// BIP32-Ed25519 engine bound to a single wallet seed.
pub struct XHdWalletSdk {
    root: ExtendedKey,
    public_keys: PublicKeyCache,
}

impl XHdWalletSdk {
    /// Build the engine from a 64-byte BIP-39 seed.
    pub fn new(seed: &[u8]) -> HDWalletResult<Self> {
        if seed.len() != SEED_LEN {
            return Err(HDWalletError::InvalidSeed);
        }
        Ok(Self {
            root: ExtendedKey::from_seed(seed)?,
            public_keys: PublicKeyCache::default(),
        })
    }

    pub fn from_entropy(entropy: &[u8]) -> HDWalletResult<Self> {
        let seed = seed_from_entropy(entropy)?;
        Self::new(seed.as_slice())
    }

    pub fn from_wallet(wallet: &HDWalletSeed) -> HDWalletResult<Self> {
        Self::from_entropy(wallet.entropy())
    }

    fn child(&self, draft: &KeyGenDraft) -> HDWalletResult<ExtendedKey> {
        self.root
            .derive_path(&draft.path().indices(), draft.derivation_type)
    }
}

impl HDWalletSdk for XHdWalletSdk {
    fn generate_key(&self, draft: &KeyGenDraft) -> HDWalletResult<[u8; 32]> {
        if let Some(cached) = self.public_keys.get(draft) {
            return Ok(cached);
        }
        let public_key = self.child(draft)?.public_key();
        self.public_keys.put(*draft, public_key);
        Ok(public_key)
    }

    fn derive_key(&self, draft: &DeriveKeyDraft) -> HDWalletResult<Zeroizing<Vec<u8>>> {
        let key = self.root.derive_path(&draft.bip44_path, draft.derivation_type)?;
        if draft.is_private {
            Ok(Zeroizing::new(key.as_bytes().to_vec()))
        } else {
            Ok(Zeroizing::new(key.public_key().to_vec()))
        }
    }

    fn sign_transaction(&self, draft: &SignTransactionDraft<'_>) -> HDWalletResult<Vec<u8>> {
        if draft.prefix_encoded_tx.is_empty() {
            return Err(HDWalletError::sdk("transaction payload is empty"));
        }
        Ok(self.child(&draft.key)?.sign(draft.prefix_encoded_tx).to_vec())
    }

    fn sign_data(&self, draft: &SignDataDraft<'_>) -> HDWalletResult<Vec<u8>> {
        self.validate_data(draft.data, draft.metadata)?;
        Ok(self.child(&draft.key)?.sign(draft.data).to_vec())
    }

    fn perform_ecdh(&self, draft: &EcdhDraft<'_>) -> HDWalletResult<[u8; 32]> {
        let other: [u8; 32] = draft
            .other_party_public_key
            .try_into()
            .map_err(|_| HDWalletError::InvalidPublicKey)?;
        self.child(&draft.key)?.ecdh(&other, draft.me_first)
    }
}
