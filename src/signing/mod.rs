// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Signing
//!
//! One [`Signer`] capability over two kinds of key material:
//!
//! - **Software**: an HD wallet key re-derived from the stored seed, or the
//!   raw key of a standard account. Signing is synchronous.
//! - **Hardware**: a Ledger device. The payload is dispatched to the device
//!   and the signature arrives once the user approves it there.
//!
//! Callers only branch on [`Signer::requires_device_approval`] to pick an
//! interaction flow. Rekeyed accounts are resolved before a signer is built,
//! so the signer always holds the auth address's key material.

pub mod ledger;
pub mod transaction;
pub mod verify;

use std::sync::Arc;

use ed25519_dalek::{Signer as _, SigningKey};
use zeroize::Zeroizing;

use crate::accounts::{Account, AccountCollection, SigningAuthority};
use crate::hd::{sdk::validate_data, HDWalletError};
use crate::models::{HDWalletAddressDetail, SignMetadata};
use crate::storage::{keys, HDWalletStorage, SecureStore};

pub use ledger::{LedgerEvent, LedgerOperationError, LedgerSession, LedgerSignRequest};
pub use transaction::HDWalletTransactionSigner;
pub use verify::verify_signature;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SigningError {
    #[error(transparent)]
    HdWallet(#[from] HDWalletError),

    #[error("ledger: {0}")]
    Ledger(#[from] LedgerOperationError),

    /// The wallet holds no key material for the account or its auth address.
    #[error("no signing authority for {0}")]
    NoSigningAuthority(String),

    #[error("arbitrary data cannot be signed on a hardware device")]
    HardwareDataUnsupported,
}

pub type SigningResult<T> = Result<T, SigningError>;

/// Key material held in process.
pub enum SoftwareKey {
    Hd {
        signer: Arc<HDWalletTransactionSigner>,
        detail: HDWalletAddressDetail,
    },
    Raw(SigningKey),
}

/// Signing capability for one address.
pub enum Signer {
    Software {
        address: String,
        key: SoftwareKey,
    },
    Hardware {
        session: Arc<LedgerSession>,
        device_id: String,
        /// Device account that signs.
        ledger_address: String,
    },
}

impl Signer {
    /// Build the signer for `account`, following its rekey link.
    ///
    /// HD seeds and standard account keys are read from `store`; Ledger
    /// accounts need a `ledger` session.
    pub fn for_account<S: SecureStore + ?Sized>(
        account: &Account,
        accounts: &AccountCollection,
        store: &S,
        ledger: Option<Arc<LedgerSession>>,
    ) -> SigningResult<Self> {
        let authority = accounts
            .signing_authority(account)
            .ok_or_else(|| SigningError::NoSigningAuthority(account.address.clone()))?;

        match authority {
            SigningAuthority::Hd { address, detail } => {
                let wallet = HDWalletStorage::new(store)
                    .wallet(&detail.wallet_id)
                    .ok_or(HDWalletError::InvalidSeed)?;
                Ok(Self::Software {
                    address: address.to_string(),
                    key: SoftwareKey::Hd {
                        signer: Arc::new(HDWalletTransactionSigner::new(&wallet)),
                        detail: detail.clone(),
                    },
                })
            }
            SigningAuthority::Ledger { address, detail } => {
                let session = ledger.ok_or(LedgerOperationError::Connection)?;
                Ok(Self::Hardware {
                    session,
                    device_id: detail.id.clone(),
                    ledger_address: address.to_string(),
                })
            }
            SigningAuthority::Standard { address } => {
                let secret = match store.get(&keys::account_key(address)) {
                    Ok(Some(secret)) => secret,
                    Ok(None) => return Err(SigningError::NoSigningAuthority(address.to_string())),
                    Err(e) => {
                        tracing::warn!(address = %address, error = %e, "account key unreadable");
                        return Err(SigningError::NoSigningAuthority(address.to_string()));
                    }
                };
                let secret: Zeroizing<[u8; 32]> = Zeroizing::new(
                    secret
                        .as_slice()
                        .try_into()
                        .map_err(|_| SigningError::NoSigningAuthority(address.to_string()))?,
                );
                Ok(Self::Software {
                    address: address.to_string(),
                    key: SoftwareKey::Raw(SigningKey::from_bytes(&secret)),
                })
            }
        }
    }

    /// Whether signing waits for approval on an external device.
    pub fn requires_device_approval(&self) -> bool {
        matches!(self, Self::Hardware { .. })
    }

    /// Address whose key produces the signatures.
    pub fn address(&self) -> &str {
        match self {
            Self::Software { address, .. } => address,
            Self::Hardware { ledger_address, .. } => ledger_address,
        }
    }

    /// Sign one prefix-encoded transaction.
    pub async fn sign(&self, payload: &[u8]) -> SigningResult<Vec<u8>> {
        self.sign_at(payload, 0).await
    }

    async fn sign_at(&self, payload: &[u8], transaction_index: usize) -> SigningResult<Vec<u8>> {
        match self {
            Self::Software {
                key: SoftwareKey::Hd { signer, detail },
                ..
            } => Ok(signer.sign_transaction(payload, detail)?),
            Self::Software {
                key: SoftwareKey::Raw(key),
                ..
            } => {
                if payload.is_empty() {
                    return Err(HDWalletError::sdk("transaction payload is empty").into());
                }
                Ok(key.sign(payload).to_bytes().to_vec())
            }
            Self::Hardware {
                session,
                device_id,
                ledger_address,
            } => Ok(session
                .sign(LedgerSignRequest {
                    device_id,
                    ledger_address,
                    payload,
                    transaction_index,
                })
                .await?),
        }
    }

    /// Sign every payload in order; the first failure aborts the batch.
    pub async fn sign_all<P: AsRef<[u8]>>(&self, payloads: &[P]) -> SigningResult<Vec<Vec<u8>>> {
        let mut signatures = Vec::with_capacity(payloads.len());
        for (index, payload) in payloads.iter().enumerate() {
            signatures.push(self.sign_at(payload.as_ref(), index).await?);
        }
        Ok(signatures)
    }

    /// Sign arbitrary data after validating it against `metadata`.
    pub fn sign_data(&self, payload: &[u8], metadata: &SignMetadata) -> SigningResult<Vec<u8>> {
        match self {
            Self::Software {
                key: SoftwareKey::Hd { signer, detail },
                ..
            } => Ok(signer.sign_data(payload, detail, metadata)?),
            Self::Software {
                key: SoftwareKey::Raw(key),
                ..
            } => {
                validate_data(payload, metadata)?;
                Ok(key.sign(payload).to_bytes().to_vec())
            }
            Self::Hardware { .. } => Err(SigningError::HardwareDataUnsupported),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::tests::{hd_detail, nano_x};
    use crate::address::{decode_address, encode_address};
    use crate::hd::XHdWalletSdk;
    use crate::hd::{HDWalletSdk, KeyGenDraft};
    use crate::models::HDWalletSeed;
    use crate::signing::ledger::tests::MockLedger;
    use crate::storage::MemorySecureStore;

    fn hd_setup() -> (MemorySecureStore, AccountCollection, String) {
        let store = MemorySecureStore::new();
        let wallet = HDWalletSeed::with_id("w1", vec![0x21; 32]);
        HDWalletStorage::new(&store).save_wallet(&wallet).unwrap();

        let sdk = XHdWalletSdk::from_wallet(&wallet).unwrap();
        let public_key = sdk
            .generate_key(&KeyGenDraft::for_address(&hd_detail("w1", 0)))
            .unwrap();
        let address = encode_address(&public_key);

        let mut accounts = AccountCollection::new();
        accounts.insert(Account::hd(address.clone(), hd_detail("w1", 0)));
        (store, accounts, address)
    }

    #[tokio::test]
    async fn hd_account_signs_in_software() {
        let (store, accounts, address) = hd_setup();
        let account = accounts.get(&address).unwrap();

        let signer = Signer::for_account(account, &accounts, &store, None).unwrap();
        assert!(!signer.requires_device_approval());

        let signature = signer.sign(b"TXpayload").await.unwrap();
        let public_key = decode_address(&address).unwrap();
        assert!(verify_signature(&signature, b"TXpayload", &public_key));
    }

    #[tokio::test]
    async fn rekeyed_account_signs_with_auth_key() {
        let (store, mut accounts, auth_address) = hd_setup();
        accounts.insert(Account::new("REKEYED").rekeyed_to(auth_address.clone()));

        let rekeyed = accounts.get("REKEYED").unwrap();
        let signer = Signer::for_account(rekeyed, &accounts, &store, None).unwrap();
        assert_eq!(signer.address(), auth_address);

        let signature = signer.sign(b"TXpayload").await.unwrap();
        let auth_key = decode_address(&auth_address).unwrap();
        assert!(verify_signature(&signature, b"TXpayload", &auth_key));
    }

    #[tokio::test]
    async fn raw_key_account() {
        let store = MemorySecureStore::new();
        let key = SigningKey::from_bytes(&[5u8; 32]);
        let address = encode_address(key.verifying_key().as_bytes());
        store.set(&keys::account_key(&address), &[5u8; 32]).unwrap();

        let mut accounts = AccountCollection::new();
        accounts.insert(Account::standard(address.clone()));

        let signer =
            Signer::for_account(accounts.get(&address).unwrap(), &accounts, &store, None).unwrap();
        let batch = signer.sign_all(&[b"TXa".to_vec(), b"TXb".to_vec()]).await.unwrap();
        assert!(verify_signature(&batch[1], b"TXb", key.verifying_key().as_bytes()));
        assert!(signer.sign(b"").await.is_err());
    }

    #[tokio::test]
    async fn missing_material_is_reported() {
        let store = MemorySecureStore::new();
        let mut accounts = AccountCollection::new();
        accounts.insert(Account::standard("NOKEY"));
        accounts.insert(Account::watch("WATCH"));

        let no_key = Signer::for_account(accounts.get("NOKEY").unwrap(), &accounts, &store, None);
        assert!(matches!(no_key, Err(SigningError::NoSigningAuthority(_))));

        let watch = Signer::for_account(accounts.get("WATCH").unwrap(), &accounts, &store, None);
        assert!(matches!(watch, Err(SigningError::NoSigningAuthority(_))));
    }

    #[test]
    fn malformed_account_key_is_rejected() {
        let store = MemorySecureStore::new();
        store.set(&keys::account_key("SHORT"), &[5u8; 31]).unwrap();
        let mut accounts = AccountCollection::new();
        accounts.insert(Account::standard("SHORT"));

        let short = Signer::for_account(accounts.get("SHORT").unwrap(), &accounts, &store, None);
        assert!(matches!(short, Err(SigningError::NoSigningAuthority(_))));
    }

    #[tokio::test]
    async fn hd_account_without_stored_seed_is_invalid_seed() {
        let store = MemorySecureStore::new();
        let mut accounts = AccountCollection::new();
        accounts.insert(Account::hd("H", hd_detail("w1", 0)));

        let result = Signer::for_account(accounts.get("H").unwrap(), &accounts, &store, None);
        assert!(matches!(result, Err(SigningError::HdWallet(HDWalletError::InvalidSeed))));
    }

    #[tokio::test]
    async fn ledger_account_signs_on_device() {
        let device_key = [3u8; 32];
        let address = encode_address(&device_key);
        let (session, _events) = LedgerSession::new(
            Arc::new(MockLedger::with_accounts(vec![device_key])),
            ledger::DEFAULT_TIMEOUT,
        );
        let session = Arc::new(session);

        let mut accounts = AccountCollection::new();
        accounts.insert(Account::ledger(address.clone(), nano_x(0)));
        let account = accounts.get(&address).unwrap();

        assert!(matches!(
            Signer::for_account(account, &accounts, &MemorySecureStore::new(), None),
            Err(SigningError::Ledger(LedgerOperationError::Connection))
        ));

        let signer =
            Signer::for_account(account, &accounts, &MemorySecureStore::new(), Some(session))
                .unwrap();
        assert!(signer.requires_device_approval());
        assert_eq!(
            signer.sign_all(&[b"TX1", b"TX2"]).await.unwrap(),
            vec![vec![0xAB; 64], vec![0xAB; 64]]
        );
        assert_eq!(
            signer.sign_data(b"{}", &SignMetadata::any_object()),
            Err(SigningError::HardwareDataUnsupported)
        );
    }
}
