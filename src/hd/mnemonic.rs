// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! BIP-39 entropy, mnemonic and seed conversions.
//!
//! Wallets always use 32 bytes of entropy (24 words) and an empty passphrase.

use bip39::{Language, Mnemonic};
use rand::{rngs::OsRng, RngCore};
use unicode_normalization::UnicodeNormalization;
use zeroize::Zeroizing;

use super::{HDWalletError, HDWalletResult};

/// Entropy length accepted for HD wallets.
pub const ENTROPY_LEN: usize = 32;

/// BIP-39 seed length.
pub const SEED_LEN: usize = 64;

/// Fresh wallet entropy from the OS RNG.
pub fn generate_entropy() -> HDWalletResult<Zeroizing<Vec<u8>>> {
    let mut entropy = Zeroizing::new(vec![0u8; ENTROPY_LEN]);
    OsRng
        .try_fill_bytes(&mut entropy)
        .map_err(|_| HDWalletError::EntropyGenerationFailed)?;
    Ok(entropy)
}

/// A new 24-word mnemonic.
pub fn generate_mnemonic() -> HDWalletResult<Zeroizing<String>> {
    let entropy = generate_entropy()?;
    mnemonic_from_entropy(&entropy)
}

pub fn mnemonic_from_entropy(entropy: &[u8]) -> HDWalletResult<Zeroizing<String>> {
    if entropy.len() != ENTROPY_LEN {
        return Err(HDWalletError::InvalidEntropy);
    }
    let mnemonic =
        Mnemonic::from_entropy_in(Language::English, entropy).map_err(|_| HDWalletError::InvalidEntropy)?;
    Ok(Zeroizing::new(mnemonic.to_string()))
}

/// Parse a phrase, tolerating extra whitespace and non-NFKD input.
fn parse(phrase: &str) -> HDWalletResult<Mnemonic> {
    let normalized: Zeroizing<String> = Zeroizing::new(
        phrase
            .nfkd()
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" "),
    );
    Mnemonic::parse_in_normalized(Language::English, &normalized)
        .map_err(|e| HDWalletError::sdk(format!("invalid mnemonic: {}", e)))
}

/// Recover entropy from a phrase. The BIP-39 checksum is verified.
pub fn entropy_from_mnemonic(phrase: &str) -> HDWalletResult<Zeroizing<Vec<u8>>> {
    let mnemonic = parse(phrase)?;
    let entropy = Zeroizing::new(mnemonic.to_entropy());
    if entropy.len() != ENTROPY_LEN {
        return Err(HDWalletError::InvalidEntropy);
    }
    Ok(entropy)
}

/// BIP-39 seed (empty passphrase) for wallet entropy.
///
/// Fails with `InvalidSeed` when the entropy cannot form a mnemonic.
pub fn seed_from_entropy(entropy: &[u8]) -> HDWalletResult<Zeroizing<[u8; SEED_LEN]>> {
    let mnemonic = Mnemonic::from_entropy_in(Language::English, entropy)
        .map_err(|_| HDWalletError::InvalidSeed)?;
    Ok(Zeroizing::new(mnemonic.to_seed_normalized("")))
}

pub fn seed_from_mnemonic(phrase: &str) -> HDWalletResult<Zeroizing<[u8; SEED_LEN]>> {
    let mnemonic = parse(phrase)?;
    Ok(Zeroizing::new(mnemonic.to_seed_normalized("")))
}
