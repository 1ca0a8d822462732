// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Algorand address codec.
//!
//! An address is the unpadded RFC 4648 base32 encoding of
//! `public_key || SHA512/256(public_key)[28..32]`, always 58 characters.

use base32::Alphabet;
use sha2::{Digest, Sha512_256};

const ALPHABET: Alphabet = Alphabet::RFC4648 { padding: false };
const CHECKSUM_LEN: usize = 4;

/// Length of an encoded address.
pub const ADDRESS_LEN: usize = 58;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address must be {ADDRESS_LEN} characters, got {0}")]
    InvalidLength(usize),

    #[error("address is not valid base32")]
    InvalidEncoding,

    #[error("address checksum mismatch")]
    ChecksumMismatch,
}

fn checksum(public_key: &[u8; 32]) -> [u8; CHECKSUM_LEN] {
    let digest = Sha512_256::digest(public_key);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[digest.len() - CHECKSUM_LEN..]);
    out
}

/// Encode a 32-byte Ed25519 public key as an Algorand address.
pub fn encode_address(public_key: &[u8; 32]) -> String {
    let mut raw = Vec::with_capacity(32 + CHECKSUM_LEN);
    raw.extend_from_slice(public_key);
    raw.extend_from_slice(&checksum(public_key));
    base32::encode(ALPHABET, &raw)
}

/// Decode an Algorand address back to its public key, verifying the checksum.
pub fn decode_address(address: &str) -> Result<[u8; 32], AddressError> {
    if address.len() != ADDRESS_LEN {
        return Err(AddressError::InvalidLength(address.len()));
    }

    let raw = base32::decode(ALPHABET, address).ok_or(AddressError::InvalidEncoding)?;
    if raw.len() != 32 + CHECKSUM_LEN {
        return Err(AddressError::InvalidEncoding);
    }

    let mut public_key = [0u8; 32];
    public_key.copy_from_slice(&raw[..32]);

    if raw[32..] != checksum(&public_key) {
        return Err(AddressError::ChecksumMismatch);
    }
    Ok(public_key)
}

pub fn is_valid_address(address: &str) -> bool {
    decode_address(address).is_ok()
}
