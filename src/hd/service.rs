// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet-level HD operations.
//!
//! Creates wallets, derives their Algorand addresses and recovers accounts
//! from a mnemonic. A fresh [`XHdWalletSdk`] is built per wallet unless an
//! engine is injected (tests).

use std::sync::Arc;

use async_trait::async_trait;
use zeroize::Zeroizing;

use super::mnemonic::{self, ENTROPY_LEN};
use super::path::Bip44Path;
use super::sdk::{HDWalletSdk, KeyGenDraft, XHdWalletSdk};
use super::{HDWalletError, HDWalletResult};
use crate::address::encode_address;
use crate::error::CoreResult;
use crate::models::{
    DerivationType, HDWalletAddress, HDWalletAddressDetail, HDWalletSeed, KeyContext,
    RecoveredAddress,
};
use crate::storage::{HDWalletStorage, SecureStore};

/// Consecutive empty accounts/addresses scanned before recovery stops.
pub const GAP_LIMIT: u32 = 5;

const DEFAULT_ACCOUNT: u32 = 0;
const CHANGE_INDEX: u32 = 0;
const ADDRESS_INDEX: u32 = 0;

// =============================================================================
// Account lookup
// =============================================================================

/// On-chain summary of an address, as returned by the indexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountFastLookup {
    pub account_exists: bool,
    pub algo_value: String,
    pub usd_value: String,
}

/// Source of on-chain history for account recovery.
#[async_trait]
pub trait AccountLookup: Send + Sync {
    async fn fast_lookup(&self, address: &str) -> HDWalletResult<AccountFastLookup>;
}

/// One address found during recovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoverResult {
    pub recovered: RecoveredAddress,
    /// `None` for the fallback first address of an empty wallet.
    pub lookup: Option<AccountFastLookup>,
}

// =============================================================================
// Service
// =============================================================================

pub struct HDWalletService {
    sdk: Option<Arc<dyn HDWalletSdk>>,
    derivation_type: DerivationType,
}

impl Default for HDWalletService {
    fn default() -> Self {
        Self::new(DerivationType::default())
    }
}

impl HDWalletService {
    pub fn new(derivation_type: DerivationType) -> Self {
        Self {
            sdk: None,
            derivation_type,
        }
    }

    /// Use `sdk` for every wallet instead of deriving one per seed.
    pub fn with_sdk(sdk: Arc<dyn HDWalletSdk>, derivation_type: DerivationType) -> Self {
        Self {
            sdk: Some(sdk),
            derivation_type,
        }
    }

    pub fn derivation_type(&self) -> DerivationType {
        self.derivation_type
    }

    fn engine_for(&self, wallet: &HDWalletSeed) -> HDWalletResult<Arc<dyn HDWalletSdk>> {
        match &self.sdk {
            Some(sdk) => Ok(Arc::clone(sdk)),
            None => Ok(Arc::new(XHdWalletSdk::from_wallet(wallet)?)),
        }
    }

    fn key_draft(&self, account: u32, key_index: u32) -> KeyGenDraft {
        KeyGenDraft {
            context: KeyContext::Address,
            account,
            change: CHANGE_INDEX,
            key_index,
            derivation_type: self.derivation_type,
        }
    }

    pub fn generate_mnemonic(&self) -> HDWalletResult<Zeroizing<String>> {
        mnemonic::generate_mnemonic().map_err(|_| HDWalletError::EntropyGenerationFailed)
    }

    /// Wrap caller-supplied entropy in a new wallet record.
    pub fn create_wallet(&self, entropy: &[u8]) -> HDWalletResult<HDWalletSeed> {
        if entropy.len() != ENTROPY_LEN {
            return Err(HDWalletError::InvalidEntropy);
        }
        Ok(HDWalletSeed::new(entropy.to_vec()))
    }

    /// First address (`change = 0`, `key_index = 0`) of `account`.
    pub fn generate_address(&self, wallet: &HDWalletSeed, account: u32) -> HDWalletResult<HDWalletAddress> {
        let sdk = self.engine_for(wallet)?;
        let draft = self.key_draft(account, ADDRESS_INDEX);
        let public_key = sdk.generate_key(&draft)?;

        Ok(HDWalletAddress {
            wallet_id: wallet.id.clone(),
            address: encode_address(&public_key),
            public_key,
            account,
            change: CHANGE_INDEX,
            key_index: ADDRESS_INDEX,
            derivation_type: self.derivation_type,
        })
    }

    /// Re-derive a recovered address inside `wallet`.
    ///
    /// Fails if the coordinates do not reproduce the recovered address.
    pub fn import_address(
        &self,
        recovered: &RecoveredAddress,
        wallet: &HDWalletSeed,
    ) -> HDWalletResult<HDWalletAddress> {
        let sdk = self.engine_for(wallet)?;
        let mut draft = self.key_draft(recovered.account, recovered.key_index);
        draft.change = recovered.change;
        let public_key = sdk.generate_key(&draft)?;

        let address = encode_address(&public_key);
        if address != recovered.address {
            return Err(HDWalletError::sdk(
                "recovered address does not match its derivation path",
            ));
        }

        Ok(HDWalletAddress {
            wallet_id: wallet.id.clone(),
            address,
            public_key,
            account: recovered.account,
            change: recovered.change,
            key_index: recovered.key_index,
            derivation_type: self.derivation_type,
        })
    }

    /// Create a wallet, persist it with its first address and return the
    /// address detail plus the encoded address.
    ///
    /// Without `entropy`, fresh entropy is generated.
    pub fn save_wallet_and_compose_address_detail<S: SecureStore + ?Sized>(
        &self,
        storage: &HDWalletStorage<'_, S>,
        entropy: Option<&[u8]>,
    ) -> CoreResult<(HDWalletAddressDetail, String)> {
        let wallet = match entropy {
            Some(entropy) => self.create_wallet(entropy)?,
            None => self.create_wallet(&mnemonic::generate_entropy()?)?,
        };
        let initial = self.generate_address(&wallet, DEFAULT_ACCOUNT)?;

        storage.save_wallet(&wallet)?;
        storage.save_address(&initial)?;

        tracing::info!(
            wallet_id = %wallet.id,
            address = %initial.address,
            "created HD wallet"
        );

        Ok((initial.detail(), initial.address))
    }

    pub fn create_address_detail(&self, wallet_id: &str, account: u32) -> HDWalletAddressDetail {
        HDWalletAddressDetail {
            wallet_id: wallet_id.to_string(),
            account,
            change: CHANGE_INDEX,
            key_index: ADDRESS_INDEX,
            derivation_type: self.derivation_type,
        }
    }

    /// `m/44'/283'/account'/0/index`
    pub fn calculate_derivation_path(account: u32, key_index: u32) -> String {
        Bip44Path::new(KeyContext::Address, account, CHANGE_INDEX, key_index).to_string()
    }

    /// Scan accounts and address indices for on-chain history.
    ///
    /// Each account is scanned until [`GAP_LIMIT`] consecutive empty
    /// addresses; scanning stops after [`GAP_LIMIT`] consecutive empty
    /// accounts. Lookup failures count as empty. When nothing has history
    /// the first address `(0, 0)` is returned on its own.
    pub async fn recover_accounts(
        &self,
        phrase: &str,
        lookup: Option<&dyn AccountLookup>,
    ) -> HDWalletResult<Vec<RecoverResult>> {
        let sdk: Arc<dyn HDWalletSdk> = match &self.sdk {
            Some(sdk) => Arc::clone(sdk),
            None => {
                let seed = mnemonic::seed_from_mnemonic(phrase).map_err(|_| HDWalletError::InvalidSeed)?;
                Arc::new(XHdWalletSdk::new(seed.as_slice())?)
            }
        };

        let mut recovered = Vec::new();
        let mut first_address = None;

        let mut empty_accounts = 0;
        let mut account = 0u32;

        while empty_accounts < GAP_LIMIT {
            let mut key_index = 0u32;
            let mut empty_addresses = 0;

            while empty_addresses < GAP_LIMIT {
                let public_key = sdk.generate_key(&self.key_draft(account, key_index))?;
                let address = encode_address(&public_key);
                let coordinates = RecoveredAddress {
                    address: address.clone(),
                    account,
                    change: CHANGE_INDEX,
                    key_index,
                };

                if account == 0 && key_index == 0 {
                    first_address = Some(coordinates.clone());
                }

                let found = match lookup {
                    Some(lookup) => match lookup.fast_lookup(&address).await {
                        Ok(result) if result.account_exists => Some(result),
                        Ok(_) => None,
                        Err(e) => {
                            tracing::debug!(address = %address, error = %e, "account lookup failed");
                            None
                        }
                    },
                    None => None,
                };

                match found {
                    Some(result) => {
                        recovered.push(RecoverResult {
                            recovered: coordinates,
                            lookup: Some(result),
                        });
                        empty_addresses = 0;
                        empty_accounts = 0;
                    }
                    None => empty_addresses += 1,
                }
                key_index += 1;
            }

            account += 1;
            empty_accounts += 1;
        }

        if recovered.is_empty() {
            if let Some(first) = first_address {
                recovered.push(RecoverResult {
                    recovered: first,
                    lookup: None,
                });
            }
        }

        tracing::info!(accounts = recovered.len(), "recovered HD wallet accounts");
        Ok(recovered)
    }
}
