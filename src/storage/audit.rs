// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit trail for security-sensitive operations.
//!
//! Wallet lifecycle changes, signatures and rejected signing requests are
//! recorded in the secure store, one entry per event under
//! `audit.{yyyy-mm-dd}.{event_id}`. Events never carry key material or
//! payload bytes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{keys, SecureStore, StorageError, StorageResult};

/// Types of auditable events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Wallet events
    WalletCreated,
    WalletDeleted,
    AddressSaved,
    AddressDeleted,

    // Signing events
    TransactionSigned,
    DataSigned,
    RequestRejected,
    /// Software signing failed after the request was accepted.
    SigningFailed,
    LedgerSigningFailed,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    /// Resource affected (wallet id, address, WalletConnect request id).
    pub resource_id: Option<String>,
    /// Resource type (wallet, address, wc_request).
    pub resource_type: Option<String>,
    pub details: Option<serde_json::Value>,
    pub success: bool,
    pub error: Option<String>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            resource_id: None,
            resource_type: None,
            details: None,
            success: true,
            error: None,
        }
    }

    pub fn with_resource(
        mut self,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark as failed with error message.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }

    fn date(&self) -> String {
        self.timestamp.format("%Y-%m-%d").to_string()
    }
}

/// Repository for audit events.
pub struct AuditLog<'a, S: SecureStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: SecureStore + ?Sized> AuditLog<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn log(&self, event: &AuditEvent) -> StorageResult<()> {
        let json = serde_json::to_vec(event)
            .map_err(|e| StorageError::Encode(format!("audit event: {e}")))?;
        self.store
            .set(&keys::audit_event(&event.date(), &event.event_id), &json)
    }

    /// Record an event, logging instead of propagating a storage failure.
    ///
    /// Used on signing paths where the audit write must not change the
    /// outcome handed back to the caller.
    pub fn record(&self, event: AuditEvent) {
        if let Err(e) = self.log(&event) {
            tracing::warn!(
                event_type = ?event.event_type,
                error = %e,
                "failed to persist audit event"
            );
        }
    }

    /// Events of one day, oldest first.
    pub fn read_events(&self, date: &str) -> StorageResult<Vec<AuditEvent>> {
        let mut events = Vec::new();
        for key in self.store.keys_with_prefix(&keys::audit_day(date))? {
            let Some(bytes) = self.store.get(&key)? else {
                continue;
            };
            let event: AuditEvent = serde_json::from_slice(&bytes)
                .map_err(|e| StorageError::Decode(format!("audit event {key}: {e}")))?;
            events.push(event);
        }
        events.sort_by_key(|e| e.timestamp);
        Ok(events)
    }

    /// Events of an inclusive date range. Days that fail to read are skipped.
    pub fn read_events_range(
        &self,
        start_date: &str,
        end_date: &str,
    ) -> StorageResult<Vec<AuditEvent>> {
        let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d")
            .map_err(|e| StorageError::Decode(format!("invalid start date: {e}")))?;
        let end = NaiveDate::parse_from_str(end_date, "%Y-%m-%d")
            .map_err(|e| StorageError::Decode(format!("invalid end date: {e}")))?;

        let mut all_events = Vec::new();
        let mut current = start;
        while current <= end {
            let date_str = current.format("%Y-%m-%d").to_string();
            if let Ok(events) = self.read_events(&date_str) {
                all_events.extend(events);
            }
            current = current
                .succ_opt()
                .ok_or_else(|| StorageError::Decode("date overflow".to_string()))?;
        }

        Ok(all_events)
    }

    pub fn search_by_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
        date: &str,
    ) -> StorageResult<Vec<AuditEvent>> {
        let events = self.read_events(date)?;
        Ok(events
            .into_iter()
            .filter(|e| {
                e.resource_type.as_deref() == Some(resource_type)
                    && e.resource_id.as_deref() == Some(resource_id)
            })
            .collect())
    }
}
