// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account authorization: can this wallet sign for an account, and how.

use super::{Account, AccountCollection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountAuthorization {
    Watch,
    /// Account state is not loaded.
    Unknown,
    Standard,
    Ledger,
    /// Neither a key nor a device is known locally.
    NoAuthInLocal,

    StandardToLedgerRekeyed,
    StandardToStandardRekeyed,
    StandardToNoAuthInLocalRekeyed,

    LedgerToLedgerRekeyed,
    LedgerToStandardRekeyed,
    LedgerToNoAuthInLocalRekeyed,

    UnknownToLedgerRekeyed,
    UnknownToStandardRekeyed,
    UnknownToNoAuthInLocalRekeyed,
}

impl AccountAuthorization {
    /// The wallet can produce a signature for the account.
    pub fn is_authorized(self) -> bool {
        matches!(
            self,
            Self::Standard
                | Self::Ledger
                | Self::StandardToLedgerRekeyed
                | Self::StandardToStandardRekeyed
                | Self::LedgerToLedgerRekeyed
                | Self::LedgerToStandardRekeyed
                | Self::UnknownToLedgerRekeyed
                | Self::UnknownToStandardRekeyed
        )
    }

    pub fn is_rekeyed(self) -> bool {
        !matches!(
            self,
            Self::Watch | Self::Unknown | Self::Standard | Self::Ledger | Self::NoAuthInLocal
        )
    }

    /// The signing key lives on a Ledger device.
    pub fn is_ledger(self) -> bool {
        matches!(
            self,
            Self::Ledger
                | Self::StandardToLedgerRekeyed
                | Self::LedgerToLedgerRekeyed
                | Self::UnknownToLedgerRekeyed
        )
    }
}

/// What the rekeyed-to account is, from the wallet's point of view.
enum RekeyTarget {
    Ledger,
    Standard,
    NoAuthInLocal,
}

impl AccountCollection {
    pub fn authorization(&self, account: &Account) -> AccountAuthorization {
        if account.is_watch {
            return AccountAuthorization::Watch;
        }

        if self.get(&account.address).is_some_and(|held| !held.is_available) {
            return AccountAuthorization::Unknown;
        }

        if let Some(detail) = &account.hd_wallet_address_detail {
            return self.hd_authorization(account, &detail.wallet_id);
        }

        if account.is_rekeyed() {
            return self.rekeyed_authorization(account);
        }

        if account.ledger_detail.is_some() {
            return AccountAuthorization::Ledger;
        }

        if account.has_private_data {
            AccountAuthorization::Standard
        } else {
            AccountAuthorization::NoAuthInLocal
        }
    }

    fn hd_authorization(&self, account: &Account, wallet_id: &str) -> AccountAuthorization {
        let Some(auth) = account.rekeyed_auth_address() else {
            return if self.has_wallet(wallet_id) {
                AccountAuthorization::Standard
            } else {
                AccountAuthorization::NoAuthInLocal
            };
        };

        let auth_wallet = self
            .get(auth)
            .and_then(|auth_account| auth_account.hd_wallet_address_detail.as_ref());
        match auth_wallet {
            Some(detail) if self.has_wallet(&detail.wallet_id) => {
                AccountAuthorization::StandardToStandardRekeyed
            }
            Some(_) => AccountAuthorization::StandardToNoAuthInLocalRekeyed,
            None => self.rekeyed_authorization(account),
        }
    }

    fn rekeyed_authorization(&self, account: &Account) -> AccountAuthorization {
        use AccountAuthorization::*;

        let origin_has_key = self.has_private_data(account);
        let origin_is_ledger = account.ledger_detail.is_some();

        match (self.rekey_target(account), origin_has_key, origin_is_ledger) {
            (RekeyTarget::Ledger, true, _) => StandardToLedgerRekeyed,
            (RekeyTarget::Ledger, false, true) => LedgerToLedgerRekeyed,
            (RekeyTarget::Ledger, false, false) => UnknownToLedgerRekeyed,
            (RekeyTarget::Standard, true, _) => StandardToStandardRekeyed,
            (RekeyTarget::Standard, false, true) => LedgerToStandardRekeyed,
            (RekeyTarget::Standard, false, false) => UnknownToStandardRekeyed,
            (RekeyTarget::NoAuthInLocal, true, _) => StandardToNoAuthInLocalRekeyed,
            (RekeyTarget::NoAuthInLocal, false, true) => LedgerToNoAuthInLocalRekeyed,
            (RekeyTarget::NoAuthInLocal, false, false) => UnknownToNoAuthInLocalRekeyed,
        }
    }

    fn rekey_target(&self, account: &Account) -> RekeyTarget {
        let Some(auth) = account.rekeyed_auth_address() else {
            return RekeyTarget::NoAuthInLocal;
        };
        let auth_account = self.get(auth);

        let known_device = account.rekey_detail.contains_key(auth)
            || auth_account.is_some_and(|a| a.ledger_detail.is_some());
        if known_device {
            return RekeyTarget::Ledger;
        }

        match auth_account {
            Some(a) if !a.is_watch && self.has_private_data(a) => RekeyTarget::Standard,
            _ => RekeyTarget::NoAuthInLocal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::tests::{hd_detail, nano_x};
    use crate::accounts::Account;
    use AccountAuthorization::*;

    fn collection(accounts: impl IntoIterator<Item = Account>) -> AccountCollection {
        let mut collection = AccountCollection::new();
        for account in accounts {
            collection.insert(account);
        }
        collection
    }

    fn authorization_of(collection: &AccountCollection, address: &str) -> AccountAuthorization {
        collection.authorization(collection.get(address).unwrap())
    }

    #[test]
    fn plain_accounts() {
        let accounts = collection([
            Account::watch("W"),
            Account::standard("S"),
            Account::ledger("L", nano_x(0)),
            Account::new("N"),
            Account::hd("H", hd_detail("w1", 0)),
        ]);

        assert_eq!(authorization_of(&accounts, "W"), Watch);
        assert_eq!(authorization_of(&accounts, "S"), Standard);
        assert_eq!(authorization_of(&accounts, "L"), Ledger);
        assert_eq!(authorization_of(&accounts, "N"), NoAuthInLocal);
        assert_eq!(authorization_of(&accounts, "H"), Standard);
    }

    #[test]
    fn unavailable_account_is_unknown() {
        let mut account = Account::standard("S");
        account.is_available = false;
        let accounts = collection([account]);
        assert_eq!(authorization_of(&accounts, "S"), Unknown);
        assert!(!Unknown.is_authorized());
    }

    #[test]
    fn hd_wallet_missing_locally() {
        let accounts = AccountCollection::new();
        let account = Account::hd("H", hd_detail("gone", 0));
        assert_eq!(accounts.authorization(&account), NoAuthInLocal);
    }

    #[test]
    fn hd_rekeyed_to_hd() {
        let accounts = collection([
            Account::hd("AUTH", hd_detail("w1", 1)),
            Account::hd("H", hd_detail("w1", 0)).rekeyed_to("AUTH"),
        ]);
        assert_eq!(authorization_of(&accounts, "H"), StandardToStandardRekeyed);
    }

    #[test]
    fn rekeyed_combinations() {
        let mut to_device = Account::standard("S2L").rekeyed_to("DEVICE");
        to_device.rekey_detail.insert("DEVICE".to_string(), nano_x(1));

        let accounts = collection([
            Account::standard("KEY"),
            Account::ledger("LEDGER", nano_x(0)),
            Account::standard("S2S").rekeyed_to("KEY"),
            Account::ledger("L2S", nano_x(3)).rekeyed_to("KEY"),
            Account::new("U2S").rekeyed_to("KEY"),
            Account::new("U2L").rekeyed_to("LEDGER"),
            Account::standard("S2N").rekeyed_to("ELSEWHERE"),
            Account::new("U2N").rekeyed_to("ELSEWHERE"),
            to_device,
        ]);

        assert_eq!(authorization_of(&accounts, "S2S"), StandardToStandardRekeyed);
        assert_eq!(authorization_of(&accounts, "L2S"), LedgerToStandardRekeyed);
        assert_eq!(authorization_of(&accounts, "U2S"), UnknownToStandardRekeyed);
        assert_eq!(authorization_of(&accounts, "U2L"), UnknownToLedgerRekeyed);
        assert_eq!(authorization_of(&accounts, "S2L"), StandardToLedgerRekeyed);
        assert_eq!(authorization_of(&accounts, "S2N"), StandardToNoAuthInLocalRekeyed);
        assert_eq!(authorization_of(&accounts, "U2N"), UnknownToNoAuthInLocalRekeyed);
    }

    #[test]
    fn authorized_states() {
        assert!(StandardToLedgerRekeyed.is_authorized());
        assert!(UnknownToStandardRekeyed.is_authorized());
        assert!(!StandardToNoAuthInLocalRekeyed.is_authorized());
        assert!(!Watch.is_authorized());
        assert!(!NoAuthInLocal.is_authorized());

        assert!(UnknownToLedgerRekeyed.is_ledger());
        assert!(!StandardToStandardRekeyed.is_ledger());
        assert!(LedgerToStandardRekeyed.is_rekeyed());
        assert!(!Ledger.is_rekeyed());
    }
}
