// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # WalletConnect
//!
//! Signing requests arriving from dApps over WalletConnect.
//!
//! - [`request`]: request shapes and Algorand chain ids
//! - [`validator`]: accept/reject decision taken before any key is touched
//! - [`signer`]: validated requests through to signatures, with auditing
//! - [`session_store`]: persisted dApp sessions with a size limit

pub mod request;
pub mod session_store;
pub mod signer;
pub mod validator;

pub use request::{AlgorandNetwork, WCArbitraryDataRequest, WCSigningRequest, WCTransactionRequest};
pub use session_store::{WCSession, WCSessionStore};
pub use signer::{WCSignedTransaction, WCSigningCoordinator};
pub use validator::{RequestValidator, ValidationRejection};
