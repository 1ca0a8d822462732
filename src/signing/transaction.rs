// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Software signer over one HD wallet.
//!
//! The signer is built from a stored [`HDWalletSeed`]. If the seed cannot
//! produce a derivation engine the signer is still constructed, but every
//! signing call fails with [`HDWalletError::InvalidSeed`] and verification
//! returns `false`.

use crate::hd::{
    HDWalletError, HDWalletResult, HDWalletSdk, KeyGenDraft, SignDataDraft, SignTransactionDraft,
    VerifySignatureDraft, XHdWalletSdk,
};
use crate::models::{HDWalletAddressDetail, HDWalletSeed, SignMetadata};

pub struct HDWalletTransactionSigner {
    sdk: Option<Box<dyn HDWalletSdk>>,
}

impl HDWalletTransactionSigner {
    pub fn new(wallet: &HDWalletSeed) -> Self {
        let sdk = match XHdWalletSdk::from_wallet(wallet) {
            Ok(sdk) => Some(Box::new(sdk) as Box<dyn HDWalletSdk>),
            Err(e) => {
                tracing::warn!(wallet_id = %wallet.id, error = %e, "wallet seed unusable, signer disabled");
                None
            }
        };
        Self { sdk }
    }

    pub fn with_sdk(sdk: Box<dyn HDWalletSdk>) -> Self {
        Self { sdk: Some(sdk) }
    }

    pub fn is_usable(&self) -> bool {
        self.sdk.is_some()
    }

    fn engine(&self) -> HDWalletResult<&dyn HDWalletSdk> {
        self.sdk.as_deref().ok_or(HDWalletError::InvalidSeed)
    }

    /// Sign prefix-encoded transaction bytes with the key at `detail`.
    pub fn sign_transaction(
        &self,
        payload: &[u8],
        detail: &HDWalletAddressDetail,
    ) -> HDWalletResult<Vec<u8>> {
        self.engine()?.sign_transaction(&SignTransactionDraft {
            key: KeyGenDraft::for_address(detail),
            prefix_encoded_tx: payload,
        })
    }

    /// Sign arbitrary data after validating it against `metadata`.
    pub fn sign_data(
        &self,
        payload: &[u8],
        detail: &HDWalletAddressDetail,
        metadata: &SignMetadata,
    ) -> HDWalletResult<Vec<u8>> {
        self.engine()?.sign_data(&SignDataDraft {
            key: KeyGenDraft::for_address(detail),
            data: payload,
            metadata,
        })
    }

    /// Sign every payload in order. The first failure aborts the batch.
    pub fn sign_transactions<P: AsRef<[u8]>>(
        &self,
        payloads: &[P],
        detail: &HDWalletAddressDetail,
    ) -> HDWalletResult<Vec<Vec<u8>>> {
        payloads
            .iter()
            .map(|payload| self.sign_transaction(payload.as_ref(), detail))
            .collect()
    }

    /// Public key at `detail`.
    pub fn public_key(&self, detail: &HDWalletAddressDetail) -> HDWalletResult<[u8; 32]> {
        self.engine()?.generate_key(&KeyGenDraft::for_address(detail))
    }

    pub fn verify_signature(&self, signature: &[u8], message: &[u8], public_key: &[u8]) -> bool {
        match &self.sdk {
            Some(sdk) => sdk.verify_signature(&VerifySignatureDraft {
                signature,
                message,
                public_key,
            }),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataEncoding, DerivationType};
    use base64ct::{Base64, Encoding};
    use serde_json::json;

    fn wallet() -> HDWalletSeed {
        HDWalletSeed::with_id("w1", vec![0x11; 32])
    }

    fn detail(key_index: u32) -> HDWalletAddressDetail {
        HDWalletAddressDetail {
            wallet_id: "w1".to_string(),
            account: 0,
            change: 0,
            key_index,
            derivation_type: DerivationType::Peikert,
        }
    }

    #[test]
    fn sign_and_verify_base64_payload() {
        let signer = HDWalletTransactionSigner::new(&wallet());
        let payload = Base64::decode_vec("AAAA").unwrap();
        let altered = Base64::decode_vec("AAAB").unwrap();

        let signature = signer.sign_transaction(&payload, &detail(0)).unwrap();
        let public_key = signer.public_key(&detail(0)).unwrap();

        assert_eq!(signature.len(), 64);
        assert!(signer.verify_signature(&signature, &payload, &public_key));
        assert!(!signer.verify_signature(&signature, &altered, &public_key));
    }

    #[test]
    fn signing_is_deterministic() {
        let a = HDWalletTransactionSigner::new(&wallet());
        let b = HDWalletTransactionSigner::new(&wallet());
        assert_eq!(
            a.sign_transaction(b"TXpayload", &detail(3)).unwrap(),
            b.sign_transaction(b"TXpayload", &detail(3)).unwrap()
        );
    }

    #[test]
    fn invalid_seed_fails_closed() {
        let signer = HDWalletTransactionSigner::new(&HDWalletSeed::with_id("bad", vec![1, 2, 3]));
        assert!(!signer.is_usable());
        assert_eq!(
            signer.sign_transaction(b"TX", &detail(0)),
            Err(HDWalletError::InvalidSeed)
        );
        assert_eq!(
            signer.sign_transactions(&[b"TX".to_vec()], &detail(0)),
            Err(HDWalletError::InvalidSeed)
        );
        assert!(!signer.verify_signature(&[0u8; 64], b"TX", &[0u8; 32]));
    }

    #[test]
    fn batch_preserves_order() {
        let signer = HDWalletTransactionSigner::new(&wallet());
        let payloads = [b"TXone".to_vec(), b"TXtwo".to_vec(), b"TXthree".to_vec()];

        let batch = signer.sign_transactions(&payloads, &detail(0)).unwrap();
        assert_eq!(batch.len(), 3);
        for (payload, signature) in payloads.iter().zip(&batch) {
            assert_eq!(
                *signature,
                signer.sign_transaction(payload, &detail(0)).unwrap()
            );
        }
    }

    #[test]
    fn batch_fails_as_a_whole() {
        let signer = HDWalletTransactionSigner::new(&wallet());
        let payloads: [&[u8]; 3] = [b"TXone", b"", b"TXthree"];

        let result = signer.sign_transactions(&payloads, &detail(0));
        assert!(matches!(result, Err(HDWalletError::SdkError(_))));
    }

    #[test]
    fn sign_data_checks_metadata() {
        let signer = HDWalletTransactionSigner::new(&wallet());
        let metadata = SignMetadata {
            encoding: DataEncoding::None,
            schema: json!({ "type": "object", "required": ["nonce"] }),
        };

        let signature = signer
            .sign_data(br#"{"nonce":"abc"}"#, &detail(0), &metadata)
            .unwrap();
        assert_eq!(signature.len(), 64);

        assert!(signer.sign_data(br#"{"other":1}"#, &detail(0), &metadata).is_err());
        assert!(signer.sign_data(b"TX{}", &detail(0), &metadata).is_err());
    }
}
