// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ed25519 signature verification.

use ed25519_dalek::{Signature, VerifyingKey};

/// Check `signature` over `message` against a 32-byte Ed25519 public key.
///
/// Wrong lengths, non-canonical points and bad signatures all yield `false`.
pub fn verify_signature(signature: &[u8], message: &[u8], public_key: &[u8]) -> bool {
    let Ok(public_key) = <[u8; 32]>::try_from(public_key) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    let Ok(key) = VerifyingKey::from_bytes(&public_key) else {
        return false;
    };
    key.verify_strict(message, &signature).is_ok()
}
