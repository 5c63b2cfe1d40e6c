//! Pull-based dividend accumulator.
//!
//! Distributions raise a global `points_per_share`, scaled by `2^128`.
//! Each account remembers the value it last saw (`points_snapshot`) and the
//! points it accrued up to then. Before an account's share count changes it
//! must be [settled](DividendAccumulator::settle): pending points at the old
//! share count are folded into `accrued_points`, so later claims neither
//! double-count nor lose rewards.
//!
//! Points are kept at full 256-bit scale; the only truncation is the final
//! division by `2^128` when turning points into reward units.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tlock_core::error::PoolError;
use tlock_core::math::U256;
use tlock_core::types::AccountId;
use tracing::debug;

/// Per-account accumulator record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardAccount {
    pub shares: u128,
    pub points_snapshot: U256,
    pub accrued_points: U256,
    pub withdrawn: u128,
}

impl RewardAccount {
    /// Points earned since the last settle at the current share count.
    fn pending_points(&self, points_per_share: U256) -> Result<U256, PoolError> {
        points_per_share
            .checked_sub(self.points_snapshot)
            .and_then(|delta| delta.checked_mul_u128(self.shares))
            .ok_or(PoolError::ArithmeticOverflow)
    }

    fn total_points(&self, points_per_share: U256) -> Result<U256, PoolError> {
        self.accrued_points
            .checked_add(self.pending_points(points_per_share)?)
            .ok_or(PoolError::ArithmeticOverflow)
    }
}

/// A share-count change, expressed as the delta only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShareDelta {
    Unchanged,
    Mint(u128),
    Burn(u128),
}

impl ShareDelta {
    /// Delta that turns `old` into `new`.
    pub fn between(old: u128, new: u128) -> Self {
        match new.cmp(&old) {
            std::cmp::Ordering::Greater => ShareDelta::Mint(new - old),
            std::cmp::Ordering::Less => ShareDelta::Burn(old - new),
            std::cmp::Ordering::Equal => ShareDelta::Unchanged,
        }
    }
}

/// Accumulator state after a distribution, computed before any asset moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingDistribution {
    points_per_share: U256,
    total_distributed: u128,
    amount: u128,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DividendAccumulator {
    points_per_share: U256,
    total_shares: u128,
    accounts: BTreeMap<AccountId, RewardAccount>,
    total_distributed: u128,
    total_claimed: u128,
}

impl DividendAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points_per_share(&self) -> U256 {
        self.points_per_share
    }

    pub fn total_shares(&self) -> u128 {
        self.total_shares
    }

    pub fn shares_of(&self, account: &AccountId) -> u128 {
        self.accounts.get(account).map_or(0, |r| r.shares)
    }

    /// Sum of every accepted distribution.
    pub fn total_distributed(&self) -> u128 {
        self.total_distributed
    }

    /// Sum of every claim, direct and escrowed.
    pub fn total_claimed(&self) -> u128 {
        self.total_claimed
    }

    pub fn account(&self, account: &AccountId) -> Option<&RewardAccount> {
        self.accounts.get(account)
    }

    pub fn accounts(&self) -> impl Iterator<Item = (&AccountId, &RewardAccount)> {
        self.accounts.iter()
    }

    /// Fold pending points into `accrued_points` and move the snapshot to
    /// the current `points_per_share`. Does not change what is withdrawable.
    ///
    /// Accounts without a record have nothing to settle and stay absent.
    pub fn settle(&mut self, account: &AccountId) -> Result<(), PoolError> {
        let pps = self.points_per_share;
        let Some(record) = self.accounts.get_mut(account) else {
            return Ok(());
        };
        record.accrued_points = record.total_points(pps)?;
        record.points_snapshot = pps;
        debug!(%account, shares = record.shares, "rewards: settled");
        Ok(())
    }

    /// Check that `account` can be settled and `delta` applied without
    /// underflow or overflow. Once this passes, [`apply`](Self::apply)
    /// cannot fail.
    pub fn check(&self, account: &AccountId, delta: ShareDelta) -> Result<(), PoolError> {
        if let Some(record) = self.accounts.get(account) {
            record.total_points(self.points_per_share)?;
        }
        match delta {
            ShareDelta::Unchanged => Ok(()),
            ShareDelta::Mint(amount) => self
                .total_shares
                .checked_add(amount)
                .map(|_| ())
                .ok_or(PoolError::ArithmeticOverflow),
            ShareDelta::Burn(amount) => {
                if self.shares_of(account) < amount {
                    Err(PoolError::ArithmeticOverflow)
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Settle `account`, then apply `delta` to its shares and the total.
    pub fn apply(&mut self, account: &AccountId, delta: ShareDelta) -> Result<(), PoolError> {
        self.check(account, delta)?;
        self.settle(account)?;
        let pps = self.points_per_share;
        let record = self.accounts.entry(*account).or_insert_with(|| RewardAccount {
            points_snapshot: pps,
            ..RewardAccount::default()
        });
        match delta {
            ShareDelta::Unchanged => {}
            ShareDelta::Mint(amount) => {
                record.shares += amount;
                self.total_shares += amount;
                debug!(%account, amount, total = self.total_shares, "rewards: minted shares");
            }
            ShareDelta::Burn(amount) => {
                record.shares -= amount;
                self.total_shares -= amount;
                debug!(%account, amount, total = self.total_shares, "rewards: burned shares");
            }
        }
        Ok(())
    }

    /// Compute the effect of distributing `amount` without applying it.
    ///
    /// # Errors
    ///
    /// [`PoolError::ZeroShareSupply`] when no shares are outstanding.
    pub fn prepare_distribution(&self, amount: u128) -> Result<PendingDistribution, PoolError> {
        if self.total_shares == 0 {
            return Err(PoolError::ZeroShareSupply);
        }
        let increment = U256::from_high(amount)
            .checked_div_u128(self.total_shares)
            .ok_or(PoolError::ArithmeticOverflow)?;
        let points_per_share = self
            .points_per_share
            .checked_add(increment)
            .ok_or(PoolError::ArithmeticOverflow)?;
        let total_distributed = self
            .total_distributed
            .checked_add(amount)
            .ok_or(PoolError::ArithmeticOverflow)?;
        Ok(PendingDistribution {
            points_per_share,
            total_distributed,
            amount,
        })
    }

    pub fn commit_distribution(&mut self, pending: PendingDistribution) {
        debug_assert!(pending.points_per_share >= self.points_per_share);
        self.points_per_share = pending.points_per_share;
        self.total_distributed = pending.total_distributed;
        debug!(amount = pending.amount, pps = %self.points_per_share, "rewards: distributed");
    }

    /// Prepare and commit in one step.
    pub fn distribute(&mut self, amount: u128) -> Result<(), PoolError> {
        let pending = self.prepare_distribution(amount)?;
        self.commit_distribution(pending);
        Ok(())
    }

    /// `accumulated / 2^128 - withdrawn`.
    pub fn withdrawable_of(&self, account: &AccountId) -> Result<u128, PoolError> {
        let Some(record) = self.accounts.get(account) else {
            return Ok(0);
        };
        let earned = record.total_points(self.points_per_share)?.high();
        Ok(earned.saturating_sub(record.withdrawn))
    }

    pub fn withdrawn_of(&self, account: &AccountId) -> u128 {
        self.accounts.get(account).map_or(0, |r| r.withdrawn)
    }

    /// Mark everything withdrawable as withdrawn and return it.
    pub fn claim(&mut self, account: &AccountId) -> Result<u128, PoolError> {
        let amount = self.withdrawable_of(account)?;
        if amount == 0 {
            return Ok(0);
        }
        let total_claimed = self
            .total_claimed
            .checked_add(amount)
            .ok_or(PoolError::ArithmeticOverflow)?;
        self.settle(account)?;
        let record = self
            .accounts
            .get_mut(account)
            .ok_or(PoolError::ArithmeticOverflow)?;
        record.withdrawn = record
            .withdrawn
            .checked_add(amount)
            .ok_or(PoolError::ArithmeticOverflow)?;
        self.total_claimed = total_claimed;
        debug!(%account, amount, "rewards: claimed");
        Ok(amount)
    }

    /// Rebuild from persisted parts.
    pub fn from_parts(
        points_per_share: U256,
        accounts: BTreeMap<AccountId, RewardAccount>,
        total_distributed: u128,
        total_claimed: u128,
    ) -> Self {
        let total_shares = accounts.values().map(|r| r.shares).sum();
        Self {
            points_per_share,
            total_shares,
            accounts,
            total_distributed,
            total_claimed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tlock_core::constants::WAD;

    fn alice() -> AccountId {
        AccountId::from_label("alice")
    }

    fn bob() -> AccountId {
        AccountId::from_label("bob")
    }

    #[test]
    fn distribute_without_shares_fails() {
        let mut acc = DividendAccumulator::new();
        assert_eq!(acc.distribute(100), Err(PoolError::ZeroShareSupply));
        assert!(acc.points_per_share().is_zero());
    }

    #[test]
    fn single_holder_loses_one_unit_to_rounding() {
        let mut acc = DividendAccumulator::new();
        acc.apply(&alice(), ShareDelta::Mint(1337 * WAD)).unwrap();
        acc.distribute(100 * WAD).unwrap();
        assert_eq!(acc.withdrawable_of(&alice()).unwrap(), 100 * WAD - 1);
    }

    #[test]
    fn equal_holders_split_evenly() {
        let mut acc = DividendAccumulator::new();
        acc.apply(&alice(), ShareDelta::Mint(10 * WAD)).unwrap();
        acc.apply(&bob(), ShareDelta::Mint(10 * WAD)).unwrap();
        acc.distribute(100 * WAD).unwrap();
        assert_eq!(acc.withdrawable_of(&alice()).unwrap(), 50 * WAD);
        assert_eq!(acc.withdrawable_of(&bob()).unwrap(), 50 * WAD);
    }

    #[test]
    fn late_minter_does_not_earn_past_distribution() {
        let mut acc = DividendAccumulator::new();
        acc.apply(&alice(), ShareDelta::Mint(10 * WAD)).unwrap();
        acc.distribute(100 * WAD).unwrap();
        acc.apply(&bob(), ShareDelta::Mint(10 * WAD)).unwrap();
        assert_eq!(acc.withdrawable_of(&bob()).unwrap(), 0);
        acc.distribute(100 * WAD).unwrap();
        assert_eq!(acc.withdrawable_of(&alice()).unwrap(), 150 * WAD);
        assert_eq!(acc.withdrawable_of(&bob()).unwrap(), 50 * WAD);
    }

    #[test]
    fn burn_keeps_earned_rewards() {
        let mut acc = DividendAccumulator::new();
        acc.apply(&alice(), ShareDelta::Mint(10 * WAD)).unwrap();
        acc.distribute(30 * WAD).unwrap();
        acc.apply(&alice(), ShareDelta::Burn(10 * WAD)).unwrap();
        assert_eq!(acc.total_shares(), 0);
        assert_eq!(acc.withdrawable_of(&alice()).unwrap(), 30 * WAD);
    }

    #[test]
    fn burn_more_than_held_fails() {
        let mut acc = DividendAccumulator::new();
        acc.apply(&alice(), ShareDelta::Mint(5)).unwrap();
        assert_eq!(
            acc.apply(&alice(), ShareDelta::Burn(6)),
            Err(PoolError::ArithmeticOverflow)
        );
        assert_eq!(acc.shares_of(&alice()), 5);
    }

    #[test]
    fn claim_records_withdrawn_once() {
        let mut acc = DividendAccumulator::new();
        acc.apply(&alice(), ShareDelta::Mint(10 * WAD)).unwrap();
        acc.distribute(40 * WAD).unwrap();
        assert_eq!(acc.claim(&alice()).unwrap(), 40 * WAD);
        assert_eq!(acc.claim(&alice()).unwrap(), 0);
        assert_eq!(acc.withdrawn_of(&alice()), 40 * WAD);
        assert_eq!(acc.total_claimed(), 40 * WAD);
        assert_eq!(acc.total_distributed(), 40 * WAD);
    }

    #[test]
    fn settle_is_neutral() {
        let mut acc = DividendAccumulator::new();
        acc.apply(&alice(), ShareDelta::Mint(3 * WAD)).unwrap();
        acc.distribute(7 * WAD).unwrap();
        let before = acc.withdrawable_of(&alice()).unwrap();
        acc.settle(&alice()).unwrap();
        acc.settle(&alice()).unwrap();
        assert_eq!(acc.withdrawable_of(&alice()).unwrap(), before);
    }

    #[test]
    fn settle_of_unknown_account_leaves_no_record() {
        let mut acc = DividendAccumulator::new();
        acc.settle(&alice()).unwrap();
        assert!(acc.account(&alice()).is_none());
        assert_eq!(acc, DividendAccumulator::new());
    }

    #[test]
    fn share_delta_between() {
        assert_eq!(ShareDelta::between(5, 8), ShareDelta::Mint(3));
        assert_eq!(ShareDelta::between(8, 5), ShareDelta::Burn(3));
        assert_eq!(ShareDelta::between(5, 5), ShareDelta::Unchanged);
    }

    #[test]
    fn from_parts_recomputes_total() {
        let mut acc = DividendAccumulator::new();
        acc.apply(&alice(), ShareDelta::Mint(4)).unwrap();
        acc.apply(&bob(), ShareDelta::Mint(6)).unwrap();
        let rebuilt = DividendAccumulator::from_parts(
            acc.points_per_share(),
            acc.accounts().map(|(a, r)| (*a, *r)).collect(),
            acc.total_distributed(),
            acc.total_claimed(),
        );
        assert_eq!(rebuilt, acc);
    }

    proptest! {
        #[test]
        fn claims_never_exceed_distributions(
            shares in prop::collection::vec(1u128..1_000 * WAD, 1..6),
            amounts in prop::collection::vec(1u128..1_000 * WAD, 1..6),
        ) {
            let mut acc = DividendAccumulator::new();
            let holders: Vec<AccountId> = (0..shares.len())
                .map(|i| AccountId::from_label(&format!("holder-{i}")))
                .collect();
            for (h, s) in holders.iter().zip(&shares) {
                acc.apply(h, ShareDelta::Mint(*s)).unwrap();
            }
            for a in &amounts {
                acc.distribute(*a).unwrap();
            }
            let mut claimed = 0u128;
            for h in &holders {
                claimed += acc.claim(h).unwrap();
            }
            let distributed: u128 = amounts.iter().sum();
            prop_assert!(claimed <= distributed);
            // at most one unit of dust per holder per distribution
            prop_assert!(distributed - claimed <= (holders.len() * amounts.len()) as u128);
        }
    }
}
