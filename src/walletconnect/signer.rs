// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! WalletConnect signing flow: validate, resolve the signer, sign, audit.
//!
//! A batch is validated as a whole before any key material is loaded, and
//! signed all-or-nothing in request order. Within a batch each signing
//! address loads its key once.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;

use super::request::{AlgorandNetwork, WCArbitraryDataRequest, WCSigningRequest, WCTransactionRequest};
use super::validator::{RequestValidator, UnauthorizedReason, ValidationRejection};
use crate::accounts::AccountCollection;
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::signing::{LedgerSession, Signer, SigningError};
use crate::storage::{AuditEvent, AuditEventType, AuditLog, SecureStore};

/// Signature plus the auth address that produced it when it differs from
/// the transaction sender.
pub type WCSignedTransaction = (Vec<u8>, Option<String>);

/// Signers already built for a batch, keyed by signing address.
type SignerCache = HashMap<String, Signer>;

pub struct WCSigningCoordinator<'a, S: SecureStore + ?Sized> {
    accounts: &'a AccountCollection,
    store: &'a S,
    network: AlgorandNetwork,
    max_request_count: usize,
    ledger: Option<Arc<LedgerSession>>,
}

impl<'a, S: SecureStore + ?Sized> WCSigningCoordinator<'a, S> {
    pub fn new(accounts: &'a AccountCollection, store: &'a S, config: &CoreConfig) -> Self {
        Self {
            accounts,
            store,
            network: config.network,
            max_request_count: config.max_request_count,
            ledger: None,
        }
    }

    pub fn with_ledger(mut self, session: Arc<LedgerSession>) -> Self {
        self.ledger = Some(session);
        self
    }

    fn audit(&self) -> AuditLog<'a, S> {
        AuditLog::new(self.store)
    }

    fn validate<R: WCSigningRequest>(&self, request_id: &str, requests: &[R]) -> CoreResult<()> {
        let result = RequestValidator::new(self.accounts, self.network)
            .with_max_request_count(self.max_request_count)
            .validate(requests);

        if let Err(rejection) = result {
            tracing::warn!(
                request_id = %request_id,
                reason = %rejection,
                count = requests.len(),
                "rejected WalletConnect request"
            );
            self.audit().record(
                AuditEvent::new(AuditEventType::RequestRejected)
                    .with_resource("wc_request", request_id)
                    .failed(rejection.to_string()),
            );
            return Err(rejection.into());
        }
        Ok(())
    }

    fn signer_for<'c>(
        &self,
        requested: Option<&str>,
        cache: &'c mut SignerCache,
    ) -> CoreResult<&'c Signer> {
        let account = requested
            .and_then(|signer| self.accounts.find_signer(signer))
            .ok_or(ValidationRejection::Unauthorized(
                UnauthorizedReason::DataSignerNotFound,
            ))?;
        let signing_address = self
            .accounts
            .signing_authority(account)
            .map(|authority| authority.address().to_string())
            .ok_or_else(|| SigningError::NoSigningAuthority(account.address.clone()))?;

        match cache.entry(signing_address) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(Signer::for_account(
                account,
                self.accounts,
                self.store,
                self.ledger.clone(),
            )?)),
        }
    }

    fn record_failure(&self, request_id: &str, error: &CoreError) {
        tracing::warn!(request_id = %request_id, error = %error, "WalletConnect signing failed");
        let event_type = match error {
            CoreError::Signing(SigningError::Ledger(_)) => AuditEventType::LedgerSigningFailed,
            CoreError::Rejected(_) => AuditEventType::RequestRejected,
            _ => AuditEventType::SigningFailed,
        };
        self.audit().record(
            AuditEvent::new(event_type)
                .with_resource("wc_request", request_id)
                .failed(error.to_string()),
        );
    }

    /// Sign each arbitrary-data request with its signer's software key.
    pub fn sign_arbitrary_data(
        &self,
        request_id: &str,
        requests: &[WCArbitraryDataRequest],
    ) -> CoreResult<Vec<Vec<u8>>> {
        self.validate(request_id, requests)?;

        let mut cache = SignerCache::new();
        let mut signatures = Vec::with_capacity(requests.len());
        for request in requests {
            let signed = self
                .signer_for(request.requested_signer(), &mut cache)
                .and_then(|signer| Ok(signer.sign_data(&request.data, &request.metadata)?));
            match signed {
                Ok(signature) => signatures.push(signature),
                Err(error) => {
                    self.record_failure(request_id, &error);
                    return Err(error);
                }
            }
        }

        self.audit().record(
            AuditEvent::new(AuditEventType::DataSigned)
                .with_resource("wc_request", request_id)
                .with_details(json!({ "count": signatures.len() })),
        );
        Ok(signatures)
    }

    /// Validate and sign a single transaction request.
    pub async fn sign_wc_transaction(
        &self,
        request_id: &str,
        request: &WCTransactionRequest,
    ) -> CoreResult<WCSignedTransaction> {
        self.validate(request_id, std::slice::from_ref(request))?;
        let signed = self
            .sign_audited(request_id, request, &mut SignerCache::new())
            .await?;

        self.audit().record(
            AuditEvent::new(AuditEventType::TransactionSigned)
                .with_resource("wc_request", request_id)
                .with_details(json!({ "count": 1 })),
        );
        Ok(signed)
    }

    /// Validate and sign a batch of transaction requests, in order.
    pub async fn sign_wc_transactions(
        &self,
        request_id: &str,
        requests: &[WCTransactionRequest],
    ) -> CoreResult<Vec<WCSignedTransaction>> {
        self.validate(request_id, requests)?;

        let mut cache = SignerCache::new();
        let mut signed = Vec::with_capacity(requests.len());
        for request in requests {
            signed.push(self.sign_audited(request_id, request, &mut cache).await?);
        }

        self.audit().record(
            AuditEvent::new(AuditEventType::TransactionSigned)
                .with_resource("wc_request", request_id)
                .with_details(json!({ "count": signed.len() })),
        );
        Ok(signed)
    }

    async fn sign_audited(
        &self,
        request_id: &str,
        request: &WCTransactionRequest,
        cache: &mut SignerCache,
    ) -> CoreResult<WCSignedTransaction> {
        let result = self.sign_one(request, cache).await;
        if let Err(error) = &result {
            self.record_failure(request_id, error);
        }
        result
    }

    async fn sign_one(
        &self,
        request: &WCTransactionRequest,
        cache: &mut SignerCache,
    ) -> CoreResult<WCSignedTransaction> {
        let sender = request.requested_signer();
        let signer = self.signer_for(sender, cache)?;
        let signature = signer.sign(&request.transaction).await?;

        let auth_address = match sender {
            Some(sender) if sender != signer.address() => Some(signer.address().to_string()),
            _ => None,
        };
        Ok((signature, auth_address))
    }
}
