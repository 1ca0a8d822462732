// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use serde::Serialize;

use crate::address::AddressError;
use crate::hd::HDWalletError;
use crate::signing::{LedgerOperationError, SigningError};
use crate::storage::StorageError;
use crate::walletconnect::ValidationRejection;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    HdWallet(#[from] HDWalletError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("request rejected: {0}")]
    Rejected(#[from] ValidationRejection),

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<LedgerOperationError> for CoreError {
    fn from(error: LedgerOperationError) -> Self {
        Self::Signing(SigningError::Ledger(error))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Error payload handed back to the requesting dApp or UI layer.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub error: String,
}

impl CoreError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::HdWallet(HDWalletError::InvalidSeed) => "invalid_seed",
            Self::HdWallet(_) => "sdk_error",
            Self::Storage(_) => "storage_error",
            Self::Rejected(ValidationRejection::Unauthorized(_)) => "unauthorized",
            Self::Rejected(ValidationRejection::InvalidInput(_)) => "invalid_input",
            Self::Rejected(ValidationRejection::Unsupported(_)) => "unsupported",
            Self::Signing(SigningError::Ledger(LedgerOperationError::Cancelled)) => "user_rejected",
            Self::Signing(SigningError::Ledger(LedgerOperationError::TimedOut)) => "timed_out",
            Self::Signing(SigningError::Ledger(_)) => "device_error",
            Self::Signing(SigningError::HdWallet(HDWalletError::InvalidSeed)) => "invalid_seed",
            Self::Signing(_) => "signing_error",
            Self::Address(_) => "invalid_address",
            Self::Config(_) => "config_error",
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code(),
            error: self.to_string(),
        }
    }
}
