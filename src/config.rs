// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names and defaults for the wallet core. The host
//! application loads a [`CoreConfig`] once at launch.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Directory holding the secure store file | `./data` |
//! | `ALGORAND_NETWORK` | `mainnet`, `testnet` or `betanet` | `mainnet` |
//! | `WC_MAX_REQUEST_COUNT` | Max WalletConnect requests per batch | `1000` |
//! | `LEDGER_TIMEOUT_SECS` | Seconds to wait on a Ledger device | `10` |
//! | `WC_SESSION_LIMIT` | Max stored WalletConnect sessions | `30` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{CoreError, CoreResult};
use crate::logging::LogFormat;
use crate::walletconnect::request::AlgorandNetwork;

/// Directory holding `secure_store.redb`.
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const DEFAULT_DATA_DIR: &str = "./data";

/// File name of the secure store inside the data directory.
pub const SECURE_STORE_FILE: &str = "secure_store.redb";

/// Network whose chain id WalletConnect requests must carry.
pub const ALGORAND_NETWORK_ENV: &str = "ALGORAND_NETWORK";

pub const WC_MAX_REQUEST_COUNT_ENV: &str = "WC_MAX_REQUEST_COUNT";

pub const LEDGER_TIMEOUT_SECS_ENV: &str = "LEDGER_TIMEOUT_SECS";

pub const WC_SESSION_LIMIT_ENV: &str = "WC_SESSION_LIMIT";

/// `json` for production, `pretty` for development.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub data_dir: PathBuf,
    pub network: AlgorandNetwork,
    pub max_request_count: usize,
    pub ledger_timeout: Duration,
    pub session_limit: usize,
    pub log_format: LogFormat,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            network: AlgorandNetwork::Mainnet,
            max_request_count: crate::walletconnect::validator::MAX_REQUEST_COUNT,
            ledger_timeout: crate::signing::ledger::DEFAULT_TIMEOUT,
            session_limit: crate::walletconnect::session_store::DEFAULT_SESSION_LIMIT,
            log_format: LogFormat::Pretty,
        }
    }
}

impl CoreConfig {
    pub fn from_env() -> CoreResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; unset variables take their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CoreResult<Self> {
        let defaults = Self::default();

        let parse_usize = |name: &str, default: usize| -> CoreResult<usize> {
            match lookup(name) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|e| CoreError::Config(format!("{name}: {e}"))),
                None => Ok(default),
            }
        };

        let network = match lookup(ALGORAND_NETWORK_ENV) {
            Some(raw) => raw.parse().map_err(CoreError::Config)?,
            None => defaults.network,
        };

        let log_format = match lookup(LOG_FORMAT_ENV) {
            Some(raw) => raw.parse().map_err(CoreError::Config)?,
            None => defaults.log_format,
        };

        let timeout_secs = parse_usize(
            LEDGER_TIMEOUT_SECS_ENV,
            defaults.ledger_timeout.as_secs() as usize,
        )?;

        Ok(Self {
            data_dir: lookup(DATA_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            network,
            max_request_count: parse_usize(WC_MAX_REQUEST_COUNT_ENV, defaults.max_request_count)?,
            ledger_timeout: Duration::from_secs(timeout_secs as u64),
            session_limit: parse_usize(WC_SESSION_LIMIT_ENV, defaults.session_limit)?,
            log_format,
        })
    }

    pub fn secure_store_path(&self) -> PathBuf {
        self.data_dir.join(SECURE_STORE_FILE)
    }
}
