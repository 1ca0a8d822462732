// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Inbound WalletConnect signing requests.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::SignMetadata;

/// Chain id a dApp uses to address every Algorand network at once.
pub const ALL_NETWORKS_CHAIN_ID: u64 = 4160;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlgorandNetwork {
    #[default]
    Mainnet,
    Testnet,
    Betanet,
}

impl AlgorandNetwork {
    pub fn chain_id(self) -> u64 {
        match self {
            Self::Mainnet => 416001,
            Self::Testnet => 416002,
            Self::Betanet => 416003,
        }
    }

    /// Chain ids a request may carry while this network is selected.
    pub fn allowed_chain_ids(self) -> [u64; 2] {
        [self.chain_id(), ALL_NETWORKS_CHAIN_ID]
    }
}

impl fmt::Display for AlgorandNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
            Self::Betanet => "betanet",
        })
    }
}

impl FromStr for AlgorandNetwork {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            "betanet" => Ok(Self::Betanet),
            other => Err(format!("unknown Algorand network: {other}")),
        }
    }
}

/// What the validator needs to know about any signing request.
pub trait WCSigningRequest {
    /// `None` when the dApp did not name a chain.
    fn chain_id(&self) -> Option<u64>;

    /// Address the dApp asks to sign with.
    fn requested_signer(&self) -> Option<&str>;

    /// Whether a Ledger account may sign this kind of request.
    fn supports_hardware_signing(&self) -> bool;

    /// Address the dApp expects to produce the signature, if it named one.
    fn expected_auth_address(&self) -> Option<&str> {
        None
    }
}

/// Request to sign a non-transaction payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WCArbitraryDataRequest {
    pub chain_id: Option<u64>,
    pub signer: Option<String>,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    /// Text shown to the user alongside the payload.
    pub message: Option<String>,
    #[serde(default = "SignMetadata::any_object")]
    pub metadata: SignMetadata,
}

impl WCSigningRequest for WCArbitraryDataRequest {
    fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    fn requested_signer(&self) -> Option<&str> {
        self.signer.as_deref()
    }

    fn supports_hardware_signing(&self) -> bool {
        false
    }
}

/// Request to sign one prefix-encoded transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WCTransactionRequest {
    pub chain_id: Option<u64>,
    /// Sender of the transaction.
    pub signer: Option<String>,
    /// Auth address the dApp expects to sign, if it knows of a rekey.
    pub auth_address: Option<String>,
    #[serde(with = "base64_bytes")]
    pub transaction: Vec<u8>,
}

impl WCSigningRequest for WCTransactionRequest {
    fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    fn requested_signer(&self) -> Option<&str> {
        self.signer.as_deref()
    }

    fn supports_hardware_signing(&self) -> bool {
        true
    }

    fn expected_auth_address(&self) -> Option<&str> {
        self.auth_address.as_deref()
    }
}

mod base64_bytes {
    use base64ct::{Base64, Encoding};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&Base64::encode_string(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Base64::decode_vec(&encoded).map_err(serde::de::Error::custom)
    }
}
