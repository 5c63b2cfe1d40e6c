//! Per-account lock positions.
//!
//! Positions are addressed by `(account, index)`. Removal swaps the last
//! position into the freed slot, so indices are not stable across
//! withdrawals.

use std::collections::BTreeMap;

use tlock_core::error::PoolError;
use tlock_core::types::{AccountId, LockPosition};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepositLedger {
    positions: BTreeMap<AccountId, Vec<LockPosition>>,
}

impl DepositLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deposits_of(&self, account: &AccountId) -> &[LockPosition] {
        self.positions.get(account).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn position_count(&self, account: &AccountId) -> usize {
        self.deposits_of(account).len()
    }

    pub fn get(&self, account: &AccountId, index: usize) -> Result<&LockPosition, PoolError> {
        let list = self.deposits_of(account);
        list.get(index).ok_or(PoolError::PositionNotFound {
            index,
            len: list.len(),
        })
    }

    pub fn get_mut(&mut self, account: &AccountId, index: usize) -> Result<&mut LockPosition, PoolError> {
        let len = self.position_count(account);
        self.positions
            .get_mut(account)
            .and_then(|list| list.get_mut(index))
            .ok_or(PoolError::PositionNotFound { index, len })
    }

    /// Append and return the new position's index.
    pub fn push(&mut self, account: AccountId, position: LockPosition) -> usize {
        let list = self.positions.entry(account).or_default();
        list.push(position);
        list.len() - 1
    }

    /// Remove position `index`, moving the last position into its slot.
    pub fn swap_remove(&mut self, account: &AccountId, index: usize) -> Result<LockPosition, PoolError> {
        self.get(account, index)?;
        let Some(list) = self.positions.get_mut(account) else {
            return Err(PoolError::PositionNotFound { index, len: 0 });
        };
        let removed = list.swap_remove(index);
        if list.is_empty() {
            self.positions.remove(account);
        }
        Ok(removed)
    }

    /// Sum of principal across an account's positions.
    pub fn total_deposit(&self, account: &AccountId) -> u128 {
        self.deposits_of(account)
            .iter()
            .fold(0u128, |acc, p| acc.saturating_add(p.amount))
    }

    /// Sum of `share_amount` across an account's positions.
    pub fn total_shares_of(&self, account: &AccountId) -> u128 {
        self.deposits_of(account)
            .iter()
            .fold(0u128, |acc, p| acc.saturating_add(p.share_amount))
    }

    pub fn accounts(&self) -> impl Iterator<Item = &AccountId> {
        self.positions.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AccountId, &Vec<LockPosition>)> {
        self.positions.iter()
    }
}

impl FromIterator<(AccountId, Vec<LockPosition>)> for DepositLedger {
    fn from_iter<I: IntoIterator<Item = (AccountId, Vec<LockPosition>)>>(iter: I) -> Self {
        Self {
            positions: iter.into_iter().filter(|(_, v)| !v.is_empty()).collect(),
        }
    }
}
