// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! BIP32-Ed25519 extended keys (ARC-52 flavour).
//!
//! An extended private key is 96 bytes: `kL || kR || c`. `kL` is used as the
//! Ed25519 scalar *without* clamping, `kR` seeds deterministic nonces and `c`
//! is the chain code. Child scalars grow by `8 * trunc(zL)`, which keeps them
//! multiples of the cofactor.

use curve25519_dalek::{
    edwards::{CompressedEdwardsY, EdwardsPoint},
    scalar::Scalar,
};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};
use zeroize::{Zeroize, Zeroizing};

use super::{HDWalletError, HDWalletResult};
use crate::models::DerivationType;

type HmacSha512 = Hmac<Sha512>;

/// First index treated as hardened.
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

const EXTENDED_KEY_LEN: usize = 96;

/// A 96-byte BIP32-Ed25519 extended private key.
pub struct ExtendedKey {
    bytes: Zeroizing<[u8; EXTENDED_KEY_LEN]>,
}

impl ExtendedKey {
    /// Derive the root key from a 64-byte BIP-39 seed.
    pub fn from_seed(seed: &[u8]) -> HDWalletResult<Self> {
        let mut k = Zeroizing::new([0u8; 64]);
        k.copy_from_slice(&Sha512::digest(seed));

        // Retry until the third highest bit of kL is clear.
        while k[31] & 0b0010_0000 != 0 {
            let next = hmac_sha512(&k[..32], &[&k[32..]])?;
            k.copy_from_slice(&next[..]);
        }

        k[0] &= 0b1111_1000;
        k[31] &= 0b0111_1111;
        k[31] |= 0b0100_0000;

        let mut hasher = Sha256::new();
        hasher.update([0x01]);
        hasher.update(seed);
        let chain_code = hasher.finalize();

        let mut bytes = Zeroizing::new([0u8; EXTENDED_KEY_LEN]);
        bytes[..64].copy_from_slice(&k[..]);
        bytes[64..].copy_from_slice(&chain_code);
        Ok(Self { bytes })
    }

    /// Rebuild an extended key from its 96-byte serialization.
    pub fn from_bytes(raw: &[u8]) -> HDWalletResult<Self> {
        if raw.len() != EXTENDED_KEY_LEN {
            return Err(HDWalletError::sdk("extended key must be 96 bytes"));
        }
        let mut bytes = Zeroizing::new([0u8; EXTENDED_KEY_LEN]);
        bytes.copy_from_slice(raw);
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; EXTENDED_KEY_LEN] {
        &self.bytes
    }

    fn scalar_bytes(&self) -> [u8; 32] {
        let mut kl = [0u8; 32];
        kl.copy_from_slice(&self.bytes[..32]);
        kl
    }

    fn nonce_key(&self) -> &[u8] {
        &self.bytes[32..64]
    }

    fn chain_code(&self) -> &[u8] {
        &self.bytes[64..]
    }

    /// Derive one child level.
    pub fn derive_child(&self, index: u32, derivation: DerivationType) -> HDWalletResult<Self> {
        let mut kl = self.scalar_bytes();
        let kr = &self.bytes[32..64];
        let index_le = index.to_le_bytes();

        let (z, child_chain) = if index >= HARDENED_OFFSET {
            (
                hmac_sha512(self.chain_code(), &[&[0x00], &kl, kr, &index_le])?,
                hmac_sha512(self.chain_code(), &[&[0x01], &kl, kr, &index_le])?,
            )
        } else {
            let public = public_key_from_scalar(&kl);
            (
                hmac_sha512(self.chain_code(), &[&[0x02], &public, &index_le])?,
                hmac_sha512(self.chain_code(), &[&[0x03], &public, &index_le])?,
            )
        };

        let zl = truncate_top_bits(&z[..32], derivation.truncated_bits());
        let child_kl = add_multiple_of_eight(&kl, &zl).ok_or_else(|| {
            HDWalletError::sdk("child scalar overflows 2^255, derivation path is unsafe")
        })?;
        kl.zeroize();

        let mut bytes = Zeroizing::new([0u8; EXTENDED_KEY_LEN]);
        bytes[..32].copy_from_slice(&child_kl);
        add_mod_2_256(kr, &z[32..], &mut bytes[32..64]);
        bytes[64..].copy_from_slice(&child_chain[32..]);
        Ok(Self { bytes })
    }

    /// Walk a full path of raw (already hardened where needed) indices.
    pub fn derive_path(&self, indices: &[u32], derivation: DerivationType) -> HDWalletResult<Self> {
        let mut current = Self::from_bytes(&self.bytes[..])?;
        for index in indices {
            current = current.derive_child(*index, derivation)?;
        }
        Ok(current)
    }

    /// Ed25519 public key `kL * B`.
    pub fn public_key(&self) -> [u8; 32] {
        public_key_from_scalar(&self.scalar_bytes())
    }

    /// Produce an Ed25519 signature `R || S` with the unclamped scalar.
    ///
    /// The nonce is `SHA512(kR || message)`, so signing is deterministic.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        let mut kl = self.scalar_bytes();
        let a = Scalar::from_bytes_mod_order(kl);
        kl.zeroize();
        let public = EdwardsPoint::mul_base(&a).compress();

        let mut hasher = Sha512::new();
        hasher.update(self.nonce_key());
        hasher.update(message);
        let r = wide_scalar(hasher);
        let big_r = EdwardsPoint::mul_base(&r).compress();

        let mut hasher = Sha512::new();
        hasher.update(big_r.as_bytes());
        hasher.update(public.as_bytes());
        hasher.update(message);
        let h = wide_scalar(hasher);

        let s = r + h * a;

        let mut signature = [0u8; 64];
        signature[..32].copy_from_slice(big_r.as_bytes());
        signature[32..].copy_from_slice(s.as_bytes());
        signature
    }

    /// X25519 shared secret with another party's Ed25519 public key.
    ///
    /// Output is `BLAKE2b-256(shared || first || second)` where the two
    /// Montgomery public keys are ordered by `me_first`.
    pub fn ecdh(&self, other_public: &[u8; 32], me_first: bool) -> HDWalletResult<[u8; 32]> {
        use blake2::{digest::consts::U32, Blake2b};

        let other = CompressedEdwardsY(*other_public)
            .decompress()
            .ok_or(HDWalletError::InvalidPublicKey)?
            .to_montgomery();
        let ours = CompressedEdwardsY(self.public_key())
            .decompress()
            .ok_or(HDWalletError::InvalidPublicKey)?
            .to_montgomery();

        let mut kl = self.scalar_bytes();
        let shared = other.mul_clamped(kl);
        kl.zeroize();

        let (first, second) = if me_first {
            (ours, other)
        } else {
            (other, ours)
        };

        let mut hasher = Blake2b::<U32>::new();
        hasher.update(shared.as_bytes());
        hasher.update(first.as_bytes());
        hasher.update(second.as_bytes());
        Ok(hasher.finalize().into())
    }
}

/// `kL * B` without clamping (the scalar is reduced mod l first).
pub fn public_key_from_scalar(kl: &[u8; 32]) -> [u8; 32] {
    let scalar = Scalar::from_bytes_mod_order(*kl);
    EdwardsPoint::mul_base(&scalar).compress().to_bytes()
}

fn wide_scalar(hasher: Sha512) -> Scalar {
    let mut wide = Zeroizing::new([0u8; 64]);
    wide.copy_from_slice(&hasher.finalize());
    Scalar::from_bytes_mod_order_wide(&wide)
}

fn hmac_sha512(key: &[u8], parts: &[&[u8]]) -> HDWalletResult<Zeroizing<[u8; 64]>> {
    let mut mac = HmacSha512::new_from_slice(key)
        .map_err(|e| HDWalletError::sdk(format!("HMAC init failed: {}", e)))?;
    for part in parts {
        mac.update(part);
    }
    let mut out = Zeroizing::new([0u8; 64]);
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

/// Clear the top `bits` bits of a little-endian 256-bit value.
fn truncate_top_bits(zl: &[u8], bits: usize) -> Zeroizing<[u8; 32]> {
    let mut out = Zeroizing::new([0u8; 32]);
    out.copy_from_slice(zl);

    let mut remaining = bits;
    for byte in out.iter_mut().rev() {
        if remaining == 0 {
            break;
        }
        if remaining >= 8 {
            *byte = 0;
            remaining -= 8;
        } else {
            *byte &= 0xFF >> remaining;
            remaining = 0;
        }
    }
    out
}

/// `kl + 8 * zl` as little-endian integers. `None` if the result reaches 2^255.
fn add_multiple_of_eight(kl: &[u8; 32], zl: &[u8; 32]) -> Option<[u8; 32]> {
    let mut shifted = [0u8; 32];
    let mut carry_bits = 0u8;
    for (out, byte) in shifted.iter_mut().zip(zl.iter()) {
        *out = (byte << 3) | carry_bits;
        carry_bits = byte >> 5;
    }
    if carry_bits != 0 {
        return None;
    }

    let mut sum = [0u8; 32];
    let mut carry = 0u16;
    for i in 0..32 {
        let total = u16::from(kl[i]) + u16::from(shifted[i]) + carry;
        sum[i] = total as u8;
        carry = total >> 8;
    }
    shifted.zeroize();

    if carry != 0 || sum[31] & 0x80 != 0 {
        return None;
    }
    Some(sum)
}

/// `out = a + b mod 2^256`, little-endian.
fn add_mod_2_256(a: &[u8], b: &[u8], out: &mut [u8]) {
    let mut carry = 0u16;
    for i in 0..32 {
        let total = u16::from(a[i]) + u16::from(b[i]) + carry;
        out[i] = total as u8;
        carry = total >> 8;
    }
}
