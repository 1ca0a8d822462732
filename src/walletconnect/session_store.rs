// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! WalletConnect session store.
//!
//! Sessions are loaded from the secure store once and written back on every
//! mutation. The store holds at most `limit` sessions; adding beyond that
//! evicts the oldest ones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{keys, SecureStore, StorageError, StorageResult};

pub const DEFAULT_SESSION_LIMIT: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WCSession {
    /// Pairing topic, unique per session.
    pub topic: String,
    pub peer_name: String,
    pub peer_url: Option<String>,
    /// Addresses shared with the dApp.
    pub accounts: Vec<String>,
    pub chain_ids: Vec<u64>,
    pub connected_at: DateTime<Utc>,
}

impl WCSession {
    pub fn new(topic: impl Into<String>, peer_name: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            peer_name: peer_name.into(),
            peer_url: None,
            accounts: Vec::new(),
            chain_ids: Vec::new(),
            connected_at: Utc::now(),
        }
    }
}

pub struct WCSessionStore<'a, S: SecureStore + ?Sized> {
    store: &'a S,
    sessions: Vec<WCSession>,
    limit: usize,
}

impl<'a, S: SecureStore + ?Sized> WCSessionStore<'a, S> {
    /// Load persisted sessions. Unreadable state starts an empty store.
    pub fn load(store: &'a S, limit: usize) -> Self {
        let mut sessions: Vec<WCSession> = match store.get(keys::WC_SESSIONS_KEY) {
            Ok(Some(bytes)) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "discarding undecodable WalletConnect sessions");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read WalletConnect sessions");
                Vec::new()
            }
        };
        let limit = limit.max(1);
        sort_and_prune(&mut sessions, limit);
        Self {
            store,
            sessions,
            limit,
        }
    }

    fn persist(&self, sessions: &[WCSession]) -> StorageResult<()> {
        let json =
            serde_json::to_vec(sessions).map_err(|e| StorageError::Encode(e.to_string()))?;
        self.store.set(keys::WC_SESSIONS_KEY, &json)
    }

    pub fn sessions(&self) -> &[WCSession] {
        &self.sessions
    }

    pub fn session(&self, topic: &str) -> Option<&WCSession> {
        self.sessions.iter().find(|s| s.topic == topic)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Add or replace a session, evicting the oldest beyond the limit.
    ///
    /// The in-memory list only changes once the new list is persisted.
    pub fn add(&mut self, session: WCSession) -> StorageResult<Vec<WCSession>> {
        let mut sessions: Vec<WCSession> = self
            .sessions
            .iter()
            .filter(|s| s.topic != session.topic)
            .cloned()
            .collect();
        sessions.push(session);
        let evicted = sort_and_prune(&mut sessions, self.limit);
        self.persist(&sessions)?;
        self.sessions = sessions;

        for old in &evicted {
            tracing::info!(topic = %old.topic, peer = %old.peer_name, "evicted WalletConnect session");
        }
        Ok(evicted)
    }

    pub fn remove(&mut self, topic: &str) -> StorageResult<Option<WCSession>> {
        let Some(position) = self.sessions.iter().position(|s| s.topic == topic) else {
            return Ok(None);
        };
        let mut sessions = self.sessions.clone();
        let removed = sessions.remove(position);
        self.persist(&sessions)?;
        self.sessions = sessions;
        Ok(Some(removed))
    }

    pub fn clear(&mut self) -> StorageResult<()> {
        self.store.remove(keys::WC_SESSIONS_KEY)?;
        self.sessions.clear();
        Ok(())
    }

    /// Sessions that shared `address`.
    pub fn sessions_for_account(&self, address: &str) -> Vec<&WCSession> {
        self.sessions
            .iter()
            .filter(|s| s.accounts.iter().any(|a| a == address))
            .collect()
    }
}

/// Oldest first; returns evicted sessions.
fn sort_and_prune(sessions: &mut Vec<WCSession>, limit: usize) -> Vec<WCSession> {
    sessions.sort_by_key(|s| s.connected_at);
    let excess = sessions.len().saturating_sub(limit);
    sessions.drain(..excess).collect()
}
