//! In-memory multi-asset ledger.
//!
//! Balances and allowances live in `HashMap`s. An allowance of `u128::MAX`
//! is treated as unlimited and never decremented.

use std::collections::HashMap;

use tracing::debug;

use crate::error::AssetError;
use crate::traits::AssetLedger;
use crate::types::{AccountId, AssetId};

#[derive(Clone, Debug, Default)]
pub struct MemoryAssetLedger {
    balances: HashMap<(AssetId, AccountId), u128>,
    allowances: HashMap<(AssetId, AccountId, AccountId), u128>,
    supply: HashMap<AssetId, u128>,
}

impl MemoryAssetLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `amount` of `asset` out of thin air for `account`.
    pub fn mint(&mut self, asset: AssetId, account: &AccountId, amount: u128) -> Result<(), AssetError> {
        let balance = self.balances.entry((asset, *account)).or_default();
        *balance = balance.checked_add(amount).ok_or(AssetError::Overflow)?;
        let supply = self.supply.entry(asset).or_default();
        *supply = supply.checked_add(amount).ok_or(AssetError::Overflow)?;
        Ok(())
    }

    /// Total amount of `asset` ever minted.
    pub fn total_supply(&self, asset: AssetId) -> u128 {
        self.supply.get(&asset).copied().unwrap_or(0)
    }

    /// Remaining allowance from `owner` to `spender`.
    pub fn allowance(&self, asset: AssetId, owner: &AccountId, spender: &AccountId) -> u128 {
        self.allowances
            .get(&(asset, *owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    fn move_balance(
        &mut self,
        asset: AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: u128,
    ) -> Result<(), AssetError> {
        let have = self.balance_of(asset, from);
        if have < amount {
            return Err(AssetError::InsufficientBalance {
                asset,
                account: *from,
                have,
                need: amount,
            });
        }
        if from == to || amount == 0 {
            return Ok(());
        }
        let to_balance = self.balance_of(asset, to);
        let new_to = to_balance.checked_add(amount).ok_or(AssetError::Overflow)?;
        self.balances.insert((asset, *from), have - amount);
        self.balances.insert((asset, *to), new_to);
        debug!(%asset, %from, %to, amount, "asset: transfer");
        Ok(())
    }
}

impl AssetLedger for MemoryAssetLedger {
    fn transfer_from(
        &mut self,
        asset: AssetId,
        payer: &AccountId,
        recipient: &AccountId,
        amount: u128,
    ) -> Result<(), AssetError> {
        let allowance = self.allowance(asset, payer, recipient);
        if allowance < amount {
            return Err(AssetError::InsufficientAllowance {
                asset,
                owner: *payer,
                spender: *recipient,
                have: allowance,
                need: amount,
            });
        }
        self.move_balance(asset, payer, recipient, amount)?;
        if allowance != u128::MAX {
            self.allowances
                .insert((asset, *payer, *recipient), allowance - amount);
        }
        Ok(())
    }

    fn transfer(
        &mut self,
        asset: AssetId,
        sender: &AccountId,
        recipient: &AccountId,
        amount: u128,
    ) -> Result<(), AssetError> {
        self.move_balance(asset, sender, recipient, amount)
    }

    fn approve(&mut self, asset: AssetId, owner: &AccountId, spender: &AccountId, amount: u128) {
        self.allowances.insert((asset, *owner, *spender), amount);
    }

    fn balance_of(&self, asset: AssetId, account: &AccountId) -> u128 {
        self.balances.get(&(asset, *account)).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DPST: AssetId = AssetId(1);

    fn alice() -> AccountId {
        AccountId::from_label("alice")
    }

    fn pool() -> AccountId {
        AccountId::from_label("pool")
    }

    #[test]
    fn mint_tracks_supply() {
        let mut l = MemoryAssetLedger::new();
        l.mint(DPST, &alice(), 100).unwrap();
        l.mint(DPST, &pool(), 50).unwrap();
        assert_eq!(l.total_supply(DPST), 150);
        assert_eq!(l.balance_of(DPST, &alice()), 100);
    }

    #[test]
    fn transfer_from_requires_allowance() {
        let mut l = MemoryAssetLedger::new();
        l.mint(DPST, &alice(), 100).unwrap();
        let err = l.transfer_from(DPST, &alice(), &pool(), 10).unwrap_err();
        assert!(matches!(err, AssetError::InsufficientAllowance { have: 0, need: 10, .. }));

        l.approve(DPST, &alice(), &pool(), 30);
        l.transfer_from(DPST, &alice(), &pool(), 10).unwrap();
        assert_eq!(l.allowance(DPST, &alice(), &pool()), 20);
        assert_eq!(l.balance_of(DPST, &pool()), 10);
        assert_eq!(l.balance_of(DPST, &alice()), 90);
    }

    #[test]
    fn unlimited_allowance_is_not_spent() {
        let mut l = MemoryAssetLedger::new();
        l.mint(DPST, &alice(), 100).unwrap();
        l.approve(DPST, &alice(), &pool(), u128::MAX);
        l.transfer_from(DPST, &alice(), &pool(), 60).unwrap();
        assert_eq!(l.allowance(DPST, &alice(), &pool()), u128::MAX);
    }

    #[test]
    fn transfer_checks_balance() {
        let mut l = MemoryAssetLedger::new();
        l.mint(DPST, &pool(), 5).unwrap();
        let err = l.transfer(DPST, &pool(), &alice(), 6).unwrap_err();
        assert!(matches!(err, AssetError::InsufficientBalance { have: 5, need: 6, .. }));
        // failed transfer leaves balances untouched
        assert_eq!(l.balance_of(DPST, &pool()), 5);
        assert_eq!(l.balance_of(DPST, &alice()), 0);
    }

    #[test]
    fn failed_transfer_from_keeps_allowance() {
        let mut l = MemoryAssetLedger::new();
        l.mint(DPST, &alice(), 5).unwrap();
        l.approve(DPST, &alice(), &pool(), 10);
        assert!(l.transfer_from(DPST, &alice(), &pool(), 8).is_err());
        assert_eq!(l.allowance(DPST, &alice(), &pool()), 10);
    }

    #[test]
    fn clone_is_an_independent_checkpoint() {
        let mut l = MemoryAssetLedger::new();
        l.mint(DPST, &alice(), 5).unwrap();
        let checkpoint = l.clone();
        l.transfer(DPST, &alice(), &pool(), 5).unwrap();
        assert_eq!(checkpoint.balance_of(DPST, &alice()), 5);
        assert_eq!(l.balance_of(DPST, &alice()), 0);
    }
}
