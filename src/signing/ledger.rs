// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Signing Session
//!
//! Hardware signing runs as a small state machine:
//!
//! ```text
//! Idle -> Connecting -> AwaitingApproval -> Idle
//! ```
//!
//! Every request ends back in `Idle`, whether it produced a signature, was
//! rejected on the device, failed, timed out or was cancelled with
//! [`LedgerSession::reset`]. Progress is reported as [`LedgerEvent`]s on the
//! channel returned by [`LedgerSession::new`].
//!
//! ## Wire Format
//!
//! | APDU            | CLA  | INS  | P1                 | P2                |
//! |-----------------|------|------|--------------------|-------------------|
//! | Get public key  | 0x80 | 0x03 | 0x00               | 0x00              |
//! | Sign payload    | 0x80 | 0x08 | 0x01 first / 0x80  | 0x80 more / 0x00  |
//!
//! The signed message is `account_index (u32 BE) || payload`, split into
//! chunks of at most 250 bytes. Each response ends with a 2-byte status word.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::address::encode_address;

// =============================================================================
// Constants
// =============================================================================

const CLA: u8 = 0x80;
const INS_GET_PUBLIC_KEY: u8 = 0x03;
const INS_SIGN_PAYLOAD: u8 = 0x08;
const P1_FIRST_WITH_ACCOUNT: u8 = 0x01;
const P1_MORE: u8 = 0x80;
const P2_LAST: u8 = 0x00;
const P2_MORE: u8 = 0x80;

/// Maximum data bytes per APDU.
pub const CHUNK_SIZE: usize = 250;

pub const SW_OK: u16 = 0x9000;
const SW_REJECTED: [u16; 2] = [0x6985, 0x6986];

/// Device accounts probed when matching a signer address.
pub const ADDRESS_SCAN_LIMIT: u32 = 20;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerOperationError {
    #[error("could not connect to the Ledger device")]
    Connection,

    #[error("failed to fetch address from the Ledger device")]
    FailedToFetchAddress,

    #[error("operation cancelled")]
    Cancelled,

    #[error("Algorand app is closed on the device")]
    ClosedApp,

    #[error("device did not return a signature")]
    FailedToSign,

    #[error("signer address not found on the device")]
    UnmatchedAddress,

    #[error("timed out waiting for the device")]
    TimedOut,

    #[error("another Ledger operation is in progress")]
    Busy,
}

/// Progress notifications from a [`LedgerSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    /// The payload is on the device; the user must approve it there.
    RequestUserApproval { device: String },
    Signed {
        signature: Vec<u8>,
        transaction_index: usize,
    },
    /// The user declined on the device.
    Rejected,
    Failed(LedgerOperationError),
    /// Session returned to idle after a failure or cancellation.
    Reset,
    /// Session returned to idle after a signature.
    ResetOnSuccess,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerSessionState {
    Idle,
    Connecting,
    AwaitingApproval,
}

/// APDU exchange with one device.
#[async_trait]
pub trait LedgerTransport: Send + Sync {
    /// Human-readable device name.
    fn device_name(&self) -> String;

    async fn connect(&self, device_id: &str) -> Result<(), LedgerOperationError>;

    /// Send one APDU and return the raw response including the status word.
    async fn exchange(&self, apdu: &[u8]) -> Result<Vec<u8>, LedgerOperationError>;

    async fn disconnect(&self);
}

/// One payload to sign on a device.
#[derive(Debug, Clone, Copy)]
pub struct LedgerSignRequest<'a> {
    pub device_id: &'a str,
    /// Address whose key must sign; the auth address for rekeyed accounts.
    pub ledger_address: &'a str,
    pub payload: &'a [u8],
    /// Position of the payload in the caller's batch.
    pub transaction_index: usize,
}

struct Inner {
    state: LedgerSessionState,
    generation: u64,
    cancel: CancellationToken,
}

/// Signing session over one Ledger transport.
pub struct LedgerSession {
    transport: Arc<dyn LedgerTransport>,
    inner: Mutex<Inner>,
    /// Held from connect to disconnect; a cancelled request releases it
    /// only after its disconnect completes.
    device: tokio::sync::Mutex<()>,
    events: mpsc::UnboundedSender<LedgerEvent>,
    timeout: Duration,
}

// =============================================================================
// APDU helpers
// =============================================================================

fn status_word(response: &[u8]) -> Option<u16> {
    match response {
        [.., hi, lo] => Some(u16::from_be_bytes([*hi, *lo])),
        _ => None,
    }
}

/// Map a non-OK status word to an error.
fn check_status(response: &[u8]) -> Result<(), LedgerOperationError> {
    match status_word(response) {
        Some(SW_OK) => Ok(()),
        Some(sw) if SW_REJECTED.contains(&sw) => Err(LedgerOperationError::Cancelled),
        _ => Err(LedgerOperationError::ClosedApp),
    }
}

fn public_key_apdu(account_index: u32) -> Vec<u8> {
    let mut apdu = vec![CLA, INS_GET_PUBLIC_KEY, 0x00, 0x00, 4];
    apdu.extend_from_slice(&account_index.to_be_bytes());
    apdu
}

/// Split `account_index || payload` into sign APDUs.
pub fn sign_apdus(account_index: u32, payload: &[u8]) -> Vec<Vec<u8>> {
    let mut message = Vec::with_capacity(4 + payload.len());
    message.extend_from_slice(&account_index.to_be_bytes());
    message.extend_from_slice(payload);

    let chunks: Vec<&[u8]> = message.chunks(CHUNK_SIZE).collect();
    let last = chunks.len() - 1;
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            let p1 = if i == 0 { P1_FIRST_WITH_ACCOUNT } else { P1_MORE };
            let p2 = if i == last { P2_LAST } else { P2_MORE };
            let mut apdu = Vec::with_capacity(5 + chunk.len());
            // chunk.len() <= CHUNK_SIZE < 256
            apdu.extend_from_slice(&[CLA, INS_SIGN_PAYLOAD, p1, p2, chunk.len() as u8]);
            apdu.extend_from_slice(chunk);
            apdu
        })
        .collect()
}

// =============================================================================
// Session
// =============================================================================

/// Returns the session to `Idle` when a request ends, unless a reset has
/// already handed the session to a newer request.
struct RequestGuard<'a> {
    session: &'a LedgerSession,
    generation: u64,
}

impl Drop for RequestGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.session.lock();
        if inner.generation == self.generation {
            inner.state = LedgerSessionState::Idle;
        }
    }
}

impl LedgerSession {
    pub fn new(
        transport: Arc<dyn LedgerTransport>,
        timeout: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<LedgerEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let session = Self {
            transport,
            inner: Mutex::new(Inner {
                state: LedgerSessionState::Idle,
                generation: 0,
                cancel: CancellationToken::new(),
            }),
            device: tokio::sync::Mutex::new(()),
            events,
            timeout,
        };
        (session, receiver)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: LedgerEvent) {
        // A dropped receiver only means nobody is watching.
        let _ = self.events.send(event);
    }

    fn set_state(&self, generation: u64, state: LedgerSessionState) {
        let mut inner = self.lock();
        if inner.generation == generation {
            inner.state = state;
        }
    }

    pub fn state(&self) -> LedgerSessionState {
        self.lock().state
    }

    pub fn device_name(&self) -> String {
        self.transport.device_name()
    }

    /// Cancel the in-flight request, if any, and return to `Idle`.
    pub fn reset(&self) {
        {
            let mut inner = self.lock();
            inner.cancel.cancel();
            inner.cancel = CancellationToken::new();
            inner.generation += 1;
            inner.state = LedgerSessionState::Idle;
        }
        tracing::debug!("ledger session reset");
        self.emit(LedgerEvent::Reset);
    }

    fn begin(&self) -> Result<(RequestGuard<'_>, CancellationToken), LedgerOperationError> {
        let mut inner = self.lock();
        if inner.state != LedgerSessionState::Idle {
            return Err(LedgerOperationError::Busy);
        }
        inner.generation += 1;
        inner.state = LedgerSessionState::Connecting;
        inner.cancel = CancellationToken::new();
        let guard = RequestGuard {
            session: self,
            generation: inner.generation,
        };
        Ok((guard, inner.cancel.clone()))
    }

    /// Sign one payload on the device.
    pub async fn sign(&self, request: LedgerSignRequest<'_>) -> Result<Vec<u8>, LedgerOperationError> {
        let (guard, cancel) = self.begin()?;
        let generation = guard.generation;
        let _device = self.device.lock().await;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.transport.disconnect().await;
                // reset() has already reported the cancellation.
                return Err(LedgerOperationError::Cancelled);
            }
            result = tokio::time::timeout(self.timeout, self.run(generation, &request)) => {
                result.unwrap_or(Err(LedgerOperationError::TimedOut))
            }
        };

        self.transport.disconnect().await;
        drop(guard);

        match outcome {
            Ok(signature) => {
                tracing::info!(
                    address = %request.ledger_address,
                    transaction_index = request.transaction_index,
                    "ledger signed payload"
                );
                self.emit(LedgerEvent::Signed {
                    signature: signature.clone(),
                    transaction_index: request.transaction_index,
                });
                self.emit(LedgerEvent::ResetOnSuccess);
                Ok(signature)
            }
            Err(error) => {
                tracing::warn!(
                    address = %request.ledger_address,
                    error = %error,
                    "ledger signing failed"
                );
                if error == LedgerOperationError::Cancelled {
                    self.emit(LedgerEvent::Rejected);
                }
                self.emit(LedgerEvent::Failed(error.clone()));
                self.emit(LedgerEvent::Reset);
                Err(error)
            }
        }
    }

    async fn run(
        &self,
        generation: u64,
        request: &LedgerSignRequest<'_>,
    ) -> Result<Vec<u8>, LedgerOperationError> {
        self.transport.connect(request.device_id).await?;

        let account_index = self.find_account_index(request.ledger_address).await?;

        self.set_state(generation, LedgerSessionState::AwaitingApproval);
        self.emit(LedgerEvent::RequestUserApproval {
            device: self.transport.device_name(),
        });

        let mut response = Vec::new();
        for apdu in sign_apdus(account_index, request.payload) {
            response = self.transport.exchange(&apdu).await?;
            check_status(&response)?;
        }

        response.truncate(response.len().saturating_sub(2));
        if response.is_empty() {
            return Err(LedgerOperationError::FailedToSign);
        }
        Ok(response)
    }

    /// Index of the device account whose address is `address`.
    async fn find_account_index(&self, address: &str) -> Result<u32, LedgerOperationError> {
        for index in 0..ADDRESS_SCAN_LIMIT {
            let response = self.transport.exchange(&public_key_apdu(index)).await?;
            check_status(&response)?;
            let public_key: [u8; 32] = response[..response.len() - 2]
                .try_into()
                .map_err(|_| LedgerOperationError::FailedToFetchAddress)?;
            if encode_address(&public_key) == address {
                return Ok(index);
            }
        }
        Err(LedgerOperationError::UnmatchedAddress)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Scripted device holding a fixed list of accounts.
    pub(crate) struct MockLedger {
        pub accounts: Vec<[u8; 32]>,
        pub sign_status: u16,
        pub signature: Vec<u8>,
        pub approval_delay: Duration,
        /// Number of sign approvals that wait `approval_delay`.
        pub delayed_approvals: AtomicUsize,
        pub disconnect_delay: Duration,
        pub connected: AtomicBool,
        pub exchanged: Mutex<Vec<Vec<u8>>>,
    }

    impl MockLedger {
        pub(crate) fn with_accounts(accounts: Vec<[u8; 32]>) -> Self {
            Self {
                accounts,
                sign_status: SW_OK,
                signature: vec![0xAB; 64],
                approval_delay: Duration::ZERO,
                delayed_approvals: AtomicUsize::new(usize::MAX),
                disconnect_delay: Duration::ZERO,
                connected: AtomicBool::new(false),
                exchanged: Mutex::new(Vec::new()),
            }
        }

        fn sign_apdus_seen(&self) -> Vec<Vec<u8>> {
            self.exchanged
                .lock()
                .unwrap()
                .iter()
                .filter(|apdu| apdu[1] == INS_SIGN_PAYLOAD)
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl LedgerTransport for MockLedger {
        fn device_name(&self) -> String {
            "Nano X".to_string()
        }

        async fn connect(&self, device_id: &str) -> Result<(), LedgerOperationError> {
            if device_id == "offline" {
                return Err(LedgerOperationError::Connection);
            }
            self.connected.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn exchange(&self, apdu: &[u8]) -> Result<Vec<u8>, LedgerOperationError> {
            if !self.connected.load(Ordering::SeqCst) {
                return Err(LedgerOperationError::Connection);
            }
            self.exchanged.lock().unwrap().push(apdu.to_vec());
            let ok = SW_OK.to_be_bytes();
            match apdu[1] {
                INS_GET_PUBLIC_KEY => {
                    let index = u32::from_be_bytes([apdu[5], apdu[6], apdu[7], apdu[8]]) as usize;
                    let key = self.accounts.get(index).copied().unwrap_or([0xEE; 32]);
                    Ok([&key[..], &ok[..]].concat())
                }
                _ if apdu[3] == P2_MORE => Ok(ok.to_vec()),
                _ => {
                    let delayed = self
                        .delayed_approvals
                        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                        .is_ok();
                    if delayed {
                        tokio::time::sleep(self.approval_delay).await;
                    }
                    if self.sign_status == SW_OK {
                        Ok([&self.signature[..], &ok[..]].concat())
                    } else {
                        Ok(self.sign_status.to_be_bytes().to_vec())
                    }
                }
            }
        }

        async fn disconnect(&self) {
            tokio::time::sleep(self.disconnect_delay).await;
            self.connected.store(false, Ordering::SeqCst);
        }
    }

    fn drain(receiver: &mut mpsc::UnboundedReceiver<LedgerEvent>) -> Vec<LedgerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            events.push(event);
        }
        events
    }

    fn request<'a>(address: &'a str, payload: &'a [u8]) -> LedgerSignRequest<'a> {
        LedgerSignRequest {
            device_id: "device-1",
            ledger_address: address,
            payload,
            transaction_index: 0,
        }
    }

    #[test]
    fn sign_apdus_chunk_account_index_and_payload() {
        let payload = vec![7u8; 600];
        let apdus = sign_apdus(3, &payload);

        // 4 + 600 bytes -> 250 + 250 + 104
        assert_eq!(apdus.len(), 3);
        assert_eq!(&apdus[0][..5], &[CLA, INS_SIGN_PAYLOAD, P1_FIRST_WITH_ACCOUNT, P2_MORE, 250]);
        assert_eq!(&apdus[0][5..9], &3u32.to_be_bytes());
        assert_eq!(&apdus[1][..5], &[CLA, INS_SIGN_PAYLOAD, P1_MORE, P2_MORE, 250]);
        assert_eq!(&apdus[2][..5], &[CLA, INS_SIGN_PAYLOAD, P1_MORE, P2_LAST, 104]);
    }

    #[test]
    fn short_payload_is_a_single_last_chunk() {
        let apdus = sign_apdus(0, b"TX");
        assert_eq!(apdus.len(), 1);
        assert_eq!(apdus[0][2], P1_FIRST_WITH_ACCOUNT);
        assert_eq!(apdus[0][3], P2_LAST);
        assert_eq!(apdus[0][4], 6);
    }

    #[test]
    fn status_words() {
        assert_eq!(check_status(&[0x90, 0x00]), Ok(()));
        assert_eq!(check_status(&[0x69, 0x85]), Err(LedgerOperationError::Cancelled));
        assert_eq!(check_status(&[0x69, 0x86]), Err(LedgerOperationError::Cancelled));
        assert_eq!(check_status(&[0x6E, 0x00]), Err(LedgerOperationError::ClosedApp));
        assert_eq!(check_status(&[]), Err(LedgerOperationError::ClosedApp));
    }

    #[tokio::test]
    async fn signs_with_matching_device_account() {
        let accounts = vec![[1u8; 32], [2u8; 32]];
        let address = encode_address(&accounts[1]);
        let transport = Arc::new(MockLedger::with_accounts(accounts));
        let (session, mut events) = LedgerSession::new(transport.clone(), DEFAULT_TIMEOUT);

        let signature = session.sign(request(&address, b"TXpayload")).await.unwrap();

        assert_eq!(signature, vec![0xAB; 64]);
        assert_eq!(session.state(), LedgerSessionState::Idle);
        assert_eq!(&transport.sign_apdus_seen()[0][5..9], &1u32.to_be_bytes());
        assert_eq!(
            drain(&mut events),
            vec![
                LedgerEvent::RequestUserApproval {
                    device: "Nano X".to_string()
                },
                LedgerEvent::Signed {
                    signature: vec![0xAB; 64],
                    transaction_index: 0
                },
                LedgerEvent::ResetOnSuccess,
            ]
        );
    }

    #[tokio::test]
    async fn user_rejection_is_reported_distinctly() {
        let accounts = vec![[1u8; 32]];
        let address = encode_address(&accounts[0]);
        let mut mock = MockLedger::with_accounts(accounts);
        mock.sign_status = 0x6985;
        let (session, mut events) = LedgerSession::new(Arc::new(mock), DEFAULT_TIMEOUT);

        let result = session.sign(request(&address, b"TX")).await;

        assert_eq!(result, Err(LedgerOperationError::Cancelled));
        let events = drain(&mut events);
        assert_eq!(
            &events[1..],
            &[
                LedgerEvent::Rejected,
                LedgerEvent::Failed(LedgerOperationError::Cancelled),
                LedgerEvent::Reset,
            ]
        );
    }

    #[tokio::test]
    async fn closed_app_and_empty_signature() {
        let accounts = vec![[1u8; 32]];
        let address = encode_address(&accounts[0]);

        let mut closed = MockLedger::with_accounts(accounts.clone());
        closed.sign_status = 0x6E01;
        let (session, _events) = LedgerSession::new(Arc::new(closed), DEFAULT_TIMEOUT);
        assert_eq!(
            session.sign(request(&address, b"TX")).await,
            Err(LedgerOperationError::ClosedApp)
        );

        let mut empty = MockLedger::with_accounts(accounts);
        empty.signature = Vec::new();
        let (session, _events) = LedgerSession::new(Arc::new(empty), DEFAULT_TIMEOUT);
        assert_eq!(
            session.sign(request(&address, b"TX")).await,
            Err(LedgerOperationError::FailedToSign)
        );
        assert_eq!(session.state(), LedgerSessionState::Idle);
    }

    #[tokio::test]
    async fn unknown_address_and_connection_failures() {
        let transport = Arc::new(MockLedger::with_accounts(vec![[1u8; 32]]));
        let (session, _events) = LedgerSession::new(transport, DEFAULT_TIMEOUT);

        let other = encode_address(&[9u8; 32]);
        assert_eq!(
            session.sign(request(&other, b"TX")).await,
            Err(LedgerOperationError::UnmatchedAddress)
        );

        let offline = LedgerSignRequest {
            device_id: "offline",
            ..request(&other, b"TX")
        };
        assert_eq!(
            session.sign(offline).await,
            Err(LedgerOperationError::Connection)
        );
    }

    #[tokio::test]
    async fn approval_timeout() {
        let accounts = vec![[1u8; 32]];
        let address = encode_address(&accounts[0]);
        let mut slow = MockLedger::with_accounts(accounts);
        slow.approval_delay = Duration::from_secs(30);
        let (session, mut events) = LedgerSession::new(Arc::new(slow), Duration::from_millis(50));

        assert_eq!(
            session.sign(request(&address, b"TX")).await,
            Err(LedgerOperationError::TimedOut)
        );
        assert_eq!(session.state(), LedgerSessionState::Idle);
        assert!(drain(&mut events).contains(&LedgerEvent::Failed(LedgerOperationError::TimedOut)));
    }

    #[tokio::test]
    async fn reset_cancels_pending_request_and_allows_a_new_one() {
        let accounts = vec![[1u8; 32]];
        let address = encode_address(&accounts[0]);
        let mut slow = MockLedger::with_accounts(accounts.clone());
        slow.approval_delay = Duration::from_secs(30);
        let (session, mut events) = LedgerSession::new(Arc::new(slow), Duration::from_secs(60));
        let session = Arc::new(session);

        let pending = {
            let session = Arc::clone(&session);
            let address = address.clone();
            tokio::spawn(async move { session.sign(request(&address, b"TX")).await })
        };

        while session.state() != LedgerSessionState::AwaitingApproval {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(
            session.sign(request(&address, b"TX")).await,
            Err(LedgerOperationError::Busy)
        );

        session.reset();
        assert_eq!(pending.await.unwrap(), Err(LedgerOperationError::Cancelled));
        assert_eq!(session.state(), LedgerSessionState::Idle);
        assert_eq!(drain(&mut events).last(), Some(&LedgerEvent::Reset));
    }

    #[tokio::test]
    async fn session_is_reusable_after_reset() {
        let accounts = vec![[1u8; 32]];
        let address = encode_address(&accounts[0]);
        let (session, _events) = LedgerSession::new(
            Arc::new(MockLedger::with_accounts(accounts)),
            DEFAULT_TIMEOUT,
        );

        session.reset();
        assert!(session.sign(request(&address, b"TX")).await.is_ok());
    }

    #[tokio::test]
    async fn cancelled_request_does_not_disconnect_the_next_one() {
        let accounts = vec![[1u8; 32]];
        let address = encode_address(&accounts[0]);
        let mut mock = MockLedger::with_accounts(accounts);
        mock.approval_delay = Duration::from_secs(30);
        mock.delayed_approvals = AtomicUsize::new(1);
        mock.disconnect_delay = Duration::from_millis(20);
        let (session, _events) = LedgerSession::new(Arc::new(mock), Duration::from_secs(60));
        let session = Arc::new(session);

        let first = {
            let session = Arc::clone(&session);
            let address = address.clone();
            tokio::spawn(async move { session.sign(request(&address, b"TX")).await })
        };
        while session.state() != LedgerSessionState::AwaitingApproval {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        session.reset();
        let second = session.sign(request(&address, b"TX")).await;

        assert_eq!(first.await.unwrap(), Err(LedgerOperationError::Cancelled));
        assert_eq!(second, Ok(vec![0xAB; 64]));
        assert_eq!(session.state(), LedgerSessionState::Idle);
    }
}
