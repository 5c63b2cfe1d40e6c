//! Trait interfaces for the Tlock ledger.
//!
//! These traits are the seams to the host:
//! - [`AssetLedger`]: fallible debit/credit of fungible assets
//! - [`Clock`]: the timestamp at which the host orders an operation

use crate::error::AssetError;
use crate::types::{AccountId, AssetId};

/// Fungible asset custody.
///
/// The ledger never assumes a transfer succeeds. Any error is propagated
/// unchanged to the caller of the pool operation that requested it.
pub trait AssetLedger: Send + Sync {
    /// Pull `amount` of `asset` from `payer` into `recipient`.
    ///
    /// `recipient` is the spender: it must hold an allowance from `payer`
    /// of at least `amount`.
    fn transfer_from(
        &mut self,
        asset: AssetId,
        payer: &AccountId,
        recipient: &AccountId,
        amount: u128,
    ) -> Result<(), AssetError>;

    /// Send `amount` of `asset` held by `sender` to `recipient`.
    fn transfer(
        &mut self,
        asset: AssetId,
        sender: &AccountId,
        recipient: &AccountId,
        amount: u128,
    ) -> Result<(), AssetError>;

    /// Let `spender` pull up to `amount` of `asset` from `owner`.
    fn approve(&mut self, asset: AssetId, owner: &AccountId, spender: &AccountId, amount: u128);

    /// Current balance of `account`.
    fn balance_of(&self, asset: AssetId, account: &AccountId) -> u128;
}

/// Source of the current timestamp in Unix seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    // ------------------------------------------------------------------
    // Mock: AssetLedger that rejects everything for one account
    // ------------------------------------------------------------------

    struct FrozenLedger {
        frozen: AccountId,
        balances: HashMap<AccountId, u128>,
    }

    impl AssetLedger for FrozenLedger {
        fn transfer_from(
            &mut self,
            asset: AssetId,
            payer: &AccountId,
            recipient: &AccountId,
            amount: u128,
        ) -> Result<(), AssetError> {
            self.transfer(asset, payer, recipient, amount)
        }

        fn transfer(
            &mut self,
            _asset: AssetId,
            sender: &AccountId,
            recipient: &AccountId,
            amount: u128,
        ) -> Result<(), AssetError> {
            if *sender == self.frozen || *recipient == self.frozen {
                return Err(AssetError::Rejected("frozen".into()));
            }
            *self.balances.entry(*sender).or_default() -= amount;
            *self.balances.entry(*recipient).or_default() += amount;
            Ok(())
        }

        fn approve(&mut self, _: AssetId, _: &AccountId, _: &AccountId, _: u128) {}

        fn balance_of(&self, _asset: AssetId, account: &AccountId) -> u128 {
            self.balances.get(account).copied().unwrap_or(0)
        }
    }

    struct FixedClock(u64);

    impl Clock for FixedClock {
        fn now(&self) -> u64 {
            self.0
        }
    }

    #[test]
    fn ledger_errors_surface_to_caller() {
        let frozen = AccountId::from_label("frozen");
        let alice = AccountId::from_label("alice");
        let mut ledger = FrozenLedger {
            frozen,
            balances: HashMap::from([(alice, 10)]),
        };
        let err = ledger
            .transfer(AssetId(0), &alice, &frozen, 1)
            .unwrap_err();
        assert_eq!(err, AssetError::Rejected("frozen".into()));
        assert_eq!(ledger.balance_of(AssetId(0), &alice), 10);
    }

    #[test]
    fn clock_is_object_safe() {
        let clock: Box<dyn Clock> = Box::new(FixedClock(42));
        assert_eq!(clock.now(), 42);
    }
}
