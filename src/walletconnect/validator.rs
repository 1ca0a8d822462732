// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Request Validator
//!
//! Decides whether a batch of WalletConnect signing requests may reach the
//! signer. Checks run in a fixed order and stop at the first failure:
//!
//! | # | Check      | Rejection                              |
//! |---|------------|----------------------------------------|
//! | 1 | Network    | `Unauthorized(NodeMismatch)`           |
//! | 2 | Volume     | `InvalidInput(DataCount)`              |
//! | 3 | Capability | `Unsupported(None)`                    |
//! | 4 | Ownership  | `Unauthorized(DataSignerNotFound)`     |
//!
//! The network check passes when at least one request names an allowed
//! chain and no request names a chain outside the allowed set. A request
//! without a chain id neither satisfies nor violates it, so an empty batch
//! or a batch with no chain ids is rejected.
//!
//! The capability check applies to requests a Ledger cannot sign (arbitrary
//! data); transactions from Ledger accounts pass on to the device. Ownership
//! also holds a request to the auth address it names: the wallet's signing
//! address for that sender must be exactly that address.
//!
//! Validation reads the account collection only; it never touches key
//! material and is safe to run concurrently.

use serde::Serialize;

use super::request::{AlgorandNetwork, WCSigningRequest};
use crate::accounts::AccountCollection;

/// Upper bound on requests in one batch.
pub const MAX_REQUEST_COUNT: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnauthorizedReason {
    NodeMismatch,
    DataSignerNotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidInputReason {
    DataCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsupportedReason {
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum ValidationRejection {
    #[error("unauthorized: {0:?}")]
    Unauthorized(UnauthorizedReason),

    #[error("invalid input: {0:?}")]
    InvalidInput(InvalidInputReason),

    #[error("unsupported request")]
    Unsupported(UnsupportedReason),
}

pub struct RequestValidator<'a> {
    accounts: &'a AccountCollection,
    network: AlgorandNetwork,
    max_request_count: usize,
}

impl<'a> RequestValidator<'a> {
    pub fn new(accounts: &'a AccountCollection, network: AlgorandNetwork) -> Self {
        Self {
            accounts,
            network,
            max_request_count: MAX_REQUEST_COUNT,
        }
    }

    pub fn with_max_request_count(mut self, max_request_count: usize) -> Self {
        self.max_request_count = max_request_count;
        self
    }

    pub fn validate<R: WCSigningRequest>(&self, requests: &[R]) -> Result<(), ValidationRejection> {
        self.check_network(requests)?;
        self.check_volume(requests)?;
        self.check_capability(requests)?;
        self.check_ownership(requests)
    }

    fn check_network<R: WCSigningRequest>(&self, requests: &[R]) -> Result<(), ValidationRejection> {
        let allowed = self.network.allowed_chain_ids();
        let chain_ids = || requests.iter().filter_map(WCSigningRequest::chain_id);

        let any_allowed = chain_ids().any(|id| allowed.contains(&id));
        let any_foreign = chain_ids().any(|id| !allowed.contains(&id));

        if any_allowed && !any_foreign {
            Ok(())
        } else {
            Err(ValidationRejection::Unauthorized(
                UnauthorizedReason::NodeMismatch,
            ))
        }
    }

    fn check_volume<R: WCSigningRequest>(&self, requests: &[R]) -> Result<(), ValidationRejection> {
        if requests.len() > self.max_request_count {
            return Err(ValidationRejection::InvalidInput(
                InvalidInputReason::DataCount,
            ));
        }
        Ok(())
    }

    fn check_capability<R: WCSigningRequest>(
        &self,
        requests: &[R],
    ) -> Result<(), ValidationRejection> {
        let needs_device = requests
            .iter()
            .filter(|request| !request.supports_hardware_signing())
            .filter_map(|request| request.requested_signer())
            .filter_map(|signer| self.accounts.find_signer(signer))
            .any(|account| self.accounts.requires_ledger(account));

        if needs_device {
            return Err(ValidationRejection::Unsupported(UnsupportedReason::None));
        }
        Ok(())
    }

    fn check_ownership<R: WCSigningRequest>(
        &self,
        requests: &[R],
    ) -> Result<(), ValidationRejection> {
        let all_owned = requests.iter().all(|request| {
            let Some(account) = request
                .requested_signer()
                .and_then(|signer| self.accounts.find_signer(signer))
            else {
                return false;
            };
            match request.expected_auth_address() {
                Some(expected) => self
                    .accounts
                    .signing_authority(account)
                    .is_some_and(|authority| authority.address() == expected),
                None => true,
            }
        });

        if all_owned {
            Ok(())
        } else {
            Err(ValidationRejection::Unauthorized(
                UnauthorizedReason::DataSignerNotFound,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::tests::{hd_detail, nano_x};
    use crate::accounts::Account;
    use crate::models::SignMetadata;
    use crate::walletconnect::request::{WCArbitraryDataRequest, WCTransactionRequest};

    const MAINNET: u64 = 416001;
    const TESTNET: u64 = 416002;

    fn accounts() -> AccountCollection {
        let mut accounts = AccountCollection::new();
        accounts.insert(Account::hd("OWNED", hd_detail("w1", 0)));
        accounts.insert(Account::ledger("DEVICE", nano_x(0)));
        accounts.insert(Account::new("REKEYED").rekeyed_to("OWNED"));
        accounts.insert(Account::watch("WATCHED"));
        accounts
    }

    fn data(chain_id: Option<u64>, signer: &str) -> WCArbitraryDataRequest {
        WCArbitraryDataRequest {
            chain_id,
            signer: Some(signer.to_string()),
            data: br#"{"nonce":1}"#.to_vec(),
            message: None,
            metadata: SignMetadata::any_object(),
        }
    }

    fn validate<R: WCSigningRequest>(requests: &[R]) -> Result<(), ValidationRejection> {
        let accounts = accounts();
        RequestValidator::new(&accounts, AlgorandNetwork::Mainnet).validate(requests)
    }

    const NODE_MISMATCH: ValidationRejection =
        ValidationRejection::Unauthorized(UnauthorizedReason::NodeMismatch);
    const SIGNER_NOT_FOUND: ValidationRejection =
        ValidationRejection::Unauthorized(UnauthorizedReason::DataSignerNotFound);

    #[test]
    fn accepts_owned_signer_on_current_network() {
        assert_eq!(validate(&[data(Some(MAINNET), "OWNED")]), Ok(()));
        assert_eq!(validate(&[data(Some(4160), "OWNED")]), Ok(()));
    }

    #[test]
    fn network_rules() {
        assert_eq!(validate(&[data(Some(TESTNET), "OWNED")]), Err(NODE_MISMATCH));
        assert_eq!(validate(&[data(None, "OWNED")]), Err(NODE_MISMATCH));
        assert_eq!(validate::<WCArbitraryDataRequest>(&[]), Err(NODE_MISMATCH));

        // One named chain is enough, but a foreign chain anywhere fails.
        assert_eq!(
            validate(&[data(None, "OWNED"), data(Some(MAINNET), "OWNED")]),
            Ok(())
        );
        assert_eq!(
            validate(&[data(Some(MAINNET), "OWNED"), data(Some(TESTNET), "OWNED")]),
            Err(NODE_MISMATCH)
        );
    }

    #[test]
    fn network_is_checked_before_volume() {
        let batch = vec![data(Some(TESTNET), "OWNED"); MAX_REQUEST_COUNT + 1];
        assert_eq!(validate(&batch), Err(NODE_MISMATCH));
    }

    #[test]
    fn volume_cap() {
        let at_cap = vec![data(Some(MAINNET), "OWNED"); MAX_REQUEST_COUNT];
        assert_eq!(validate(&at_cap), Ok(()));

        let over = vec![data(Some(MAINNET), "OWNED"); MAX_REQUEST_COUNT + 1];
        assert_eq!(
            validate(&over),
            Err(ValidationRejection::InvalidInput(InvalidInputReason::DataCount))
        );

        let accounts = accounts();
        let small = RequestValidator::new(&accounts, AlgorandNetwork::Mainnet)
            .with_max_request_count(1);
        assert_eq!(
            small.validate(&[data(Some(MAINNET), "OWNED"), data(Some(MAINNET), "OWNED")]),
            Err(ValidationRejection::InvalidInput(InvalidInputReason::DataCount))
        );
    }

    #[test]
    fn ledger_signer_unsupported_for_data_only() {
        assert_eq!(
            validate(&[data(Some(MAINNET), "DEVICE")]),
            Err(ValidationRejection::Unsupported(UnsupportedReason::None))
        );

        let transaction = WCTransactionRequest {
            chain_id: Some(MAINNET),
            signer: Some("DEVICE".to_string()),
            auth_address: None,
            transaction: b"TX".to_vec(),
        };
        assert_eq!(validate(&[transaction]), Ok(()));
    }

    #[test]
    fn ownership_gate() {
        assert_eq!(validate(&[data(Some(MAINNET), "STRANGER")]), Err(SIGNER_NOT_FOUND));
        assert_eq!(validate(&[data(Some(MAINNET), "WATCHED")]), Err(SIGNER_NOT_FOUND));
        assert_eq!(validate(&[data(Some(MAINNET), "REKEYED")]), Ok(()));

        let mut anonymous = data(Some(MAINNET), "OWNED");
        anonymous.signer = None;
        assert_eq!(validate(&[anonymous]), Err(SIGNER_NOT_FOUND));
    }

    #[test]
    fn auth_address_of_controlled_rekeyed_account_is_accepted() {
        let mut accounts = AccountCollection::new();
        let mut rekeyed = Account::standard("ORIGIN").rekeyed_to("DEVICE_AUTH");
        rekeyed
            .rekey_detail
            .insert("DEVICE_AUTH".to_string(), nano_x(4));
        accounts.insert(rekeyed);

        let transaction = WCTransactionRequest {
            chain_id: Some(MAINNET),
            signer: Some("DEVICE_AUTH".to_string()),
            auth_address: None,
            transaction: b"TX".to_vec(),
        };
        let validator = RequestValidator::new(&accounts, AlgorandNetwork::Mainnet);
        assert_eq!(validator.validate(&[transaction]), Ok(()));
    }

    #[test]
    fn named_auth_address_must_be_the_signing_address() {
        let transaction = |auth_address: Option<&str>| WCTransactionRequest {
            chain_id: Some(MAINNET),
            signer: Some("REKEYED".to_string()),
            auth_address: auth_address.map(str::to_string),
            transaction: b"TX".to_vec(),
        };

        assert_eq!(validate(&[transaction(Some("OWNED"))]), Ok(()));
        assert_eq!(validate(&[transaction(None)]), Ok(()));
        assert_eq!(validate(&[transaction(Some("REKEYED"))]), Err(SIGNER_NOT_FOUND));
        assert_eq!(validate(&[transaction(Some("DEVICE"))]), Err(SIGNER_NOT_FOUND));
    }
}
