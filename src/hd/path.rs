// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! BIP44 derivation coordinates.

use std::fmt;

use super::bip32_ed25519::HARDENED_OFFSET;
use crate::models::{HDWalletAddressDetail, KeyContext};

const PURPOSE: u32 = 44;

/// `m/44'/coin'/account'/change/key_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bip44Path {
    pub context: KeyContext,
    pub account: u32,
    pub change: u32,
    pub key_index: u32,
}

impl Bip44Path {
    pub fn new(context: KeyContext, account: u32, change: u32, key_index: u32) -> Self {
        Self {
            context,
            account,
            change,
            key_index,
        }
    }

    /// Path of an Algorand address detail.
    pub fn for_address(detail: &HDWalletAddressDetail) -> Self {
        Self::new(
            KeyContext::Address,
            detail.account,
            detail.change,
            detail.key_index,
        )
    }

    /// Raw indices with purpose, coin type and account hardened.
    pub fn indices(&self) -> [u32; 5] {
        [
            harden(PURPOSE),
            harden(self.context.coin_type()),
            harden(self.account),
            self.change,
            self.key_index,
        ]
    }
}

impl fmt::Display for Bip44Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "m/{}'/{}'/{}'/{}/{}",
            PURPOSE,
            self.context.coin_type(),
            self.account,
            self.change,
            self.key_index
        )
    }
}

pub const fn harden(index: u32) -> u32 {
    index | HARDENED_OFFSET
}
