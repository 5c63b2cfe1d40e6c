//! A single time-lock pool.
//!
//! Combines the curve store, multiplier engine, deposit ledger, dividend
//! accumulator and role table of one pool. Every command follows the same
//! order: validate and compute with checked math, run the fallible asset
//! transfer, then commit. The affected account is settled only in the
//! commit step, right before its share count changes, so a failed command
//! leaves the pool unchanged.
//!
//! Claims with escrow forwarding touch two pools and live in
//! [`PoolSystem`](crate::system::PoolSystem).

use tlock_core::error::PoolError;
use tlock_core::traits::AssetLedger;
use tlock_core::types::{AccountId, AssetId, LockPosition, PoolId, Role};
use tlock_curve::{Curve, CurveEdit, CurveStore, MultiplierEngine};
use tracing::{debug, info};

use crate::access::RoleTable;
use crate::config::PoolConfig;
use crate::escrow::EscrowLink;
use crate::events::PoolEvent;
use crate::ledger::DepositLedger;
use crate::rewards::{DividendAccumulator, ShareDelta};

#[derive(Debug, Clone)]
pub struct TimeLockPool {
    id: PoolId,
    name: String,
    custody: AccountId,
    deposit_asset: AssetId,
    reward_asset: AssetId,
    engine: MultiplierEngine,
    curve: CurveStore,
    ledger: DepositLedger,
    rewards: DividendAccumulator,
    roles: RoleTable,
    escrow: Option<EscrowLink>,
    events: Vec<PoolEvent>,
}

/// Everything needed to rebuild a pool from persisted state.
pub struct PoolParts {
    pub id: PoolId,
    pub name: String,
    pub deposit_asset: AssetId,
    pub reward_asset: AssetId,
    pub engine: MultiplierEngine,
    pub curve: CurveStore,
    pub ledger: DepositLedger,
    pub rewards: DividendAccumulator,
    pub roles: RoleTable,
    pub escrow: Option<EscrowLink>,
}

impl TimeLockPool {
    /// Create an empty pool. `creator` receives every role.
    ///
    /// The escrow section of `config` is ignored here; escrow pools are
    /// wired by the system once both pools exist.
    pub fn new(id: PoolId, config: &PoolConfig, creator: AccountId) -> Result<Self, PoolError> {
        config.validate()?;
        let pool = Self {
            id,
            name: config.name.clone(),
            custody: id.custody_account(),
            deposit_asset: config.deposit_asset,
            reward_asset: config.reward_asset,
            engine: config.engine()?,
            curve: CurveStore::new(config.initial_curve()?),
            ledger: DepositLedger::new(),
            rewards: DividendAccumulator::new(),
            roles: RoleTable::with_owner(creator),
            escrow: None,
            events: Vec::new(),
        };
        info!(pool = %id, name = %pool.name, custody = %pool.custody, "pool created");
        Ok(pool)
    }

    pub fn from_parts(parts: PoolParts) -> Self {
        Self {
            id: parts.id,
            name: parts.name,
            custody: parts.id.custody_account(),
            deposit_asset: parts.deposit_asset,
            reward_asset: parts.reward_asset,
            engine: parts.engine,
            curve: parts.curve,
            ledger: parts.ledger,
            rewards: parts.rewards,
            roles: parts.roles,
            escrow: parts.escrow,
            events: Vec::new(),
        }
    }

    // --- accessors ---

    pub fn id(&self) -> PoolId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Account holding deposited principal and undistributed rewards.
    pub fn custody(&self) -> AccountId {
        self.custody
    }

    pub fn deposit_asset(&self) -> AssetId {
        self.deposit_asset
    }

    pub fn reward_asset(&self) -> AssetId {
        self.reward_asset
    }

    pub fn engine(&self) -> &MultiplierEngine {
        &self.engine
    }

    pub fn curve_store(&self) -> &CurveStore {
        &self.curve
    }

    pub fn ledger(&self) -> &DepositLedger {
        &self.ledger
    }

    pub fn rewards(&self) -> &DividendAccumulator {
        &self.rewards
    }

    pub fn roles(&self) -> &RoleTable {
        &self.roles
    }

    pub fn escrow(&self) -> Option<&EscrowLink> {
        self.escrow.as_ref()
    }

    pub(crate) fn set_escrow(&mut self, link: Option<EscrowLink>) {
        self.escrow = link;
    }

    pub fn events(&self) -> &[PoolEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<PoolEvent> {
        std::mem::take(&mut self.events)
    }

    // --- queries ---

    pub fn get_multiplier(&self, duration: u64) -> u128 {
        self.engine.get_multiplier(duration, &self.curve.snapshot())
    }

    /// Curve sample at `index`.
    pub fn curve_point(&self, index: usize) -> Option<u128> {
        self.curve.get(index)
    }

    pub fn curve(&self) -> std::sync::Arc<Curve> {
        self.curve.snapshot()
    }

    pub fn deposits_of(&self, account: &AccountId) -> &[LockPosition] {
        self.ledger.deposits_of(account)
    }

    pub fn position_count(&self, account: &AccountId) -> usize {
        self.ledger.position_count(account)
    }

    pub fn total_deposit(&self, account: &AccountId) -> u128 {
        self.ledger.total_deposit(account)
    }

    /// Non-transferable share balance.
    pub fn shares_of(&self, account: &AccountId) -> u128 {
        self.rewards.shares_of(account)
    }

    pub fn total_shares(&self) -> u128 {
        self.rewards.total_shares()
    }

    pub fn withdrawable_rewards_of(&self, account: &AccountId) -> Result<u128, PoolError> {
        self.rewards.withdrawable_of(account)
    }

    pub fn withdrawn_rewards_of(&self, account: &AccountId) -> u128 {
        self.rewards.withdrawn_of(account)
    }

    // --- deposit ledger commands ---

    /// Lock `amount` for `duration` on behalf of `receiver`, paid by `payer`.
    ///
    /// The duration is clamped to `[min_lock, max_lock]`. Returns the index
    /// of the new position.
    pub fn deposit<L: AssetLedger + ?Sized>(
        &mut self,
        assets: &mut L,
        payer: &AccountId,
        amount: u128,
        duration: u64,
        receiver: &AccountId,
        now: u64,
    ) -> Result<usize, PoolError> {
        if amount == 0 {
            return Err(PoolError::ZeroAmount);
        }
        let duration = self.engine.clamp_duration(duration);
        let shares = self.engine.shares_for(amount, duration, &self.curve.snapshot())?;
        let end = now.checked_add(duration).ok_or(PoolError::ArithmeticOverflow)?;
        let delta = ShareDelta::Mint(shares);

        self.rewards.check(receiver, delta)?;
        assets.transfer_from(self.deposit_asset, payer, &self.custody, amount)?;

        let index = self.ledger.push(
            *receiver,
            LockPosition {
                amount,
                start: now,
                end,
                share_amount: shares,
            },
        );
        self.rewards.apply(receiver, delta)?;
        self.events.push(PoolEvent::mint(*receiver, shares));
        self.events.push(PoolEvent::Deposited {
            amount,
            duration,
            receiver: *receiver,
            from: *payer,
        });
        info!(pool = %self.id, %receiver, amount, duration, shares, index, "deposit");
        Ok(index)
    }

    /// Close an unlocked position and release its principal to `receiver`.
    ///
    /// The last position of `owner` moves into slot `index`.
    pub fn withdraw<L: AssetLedger + ?Sized>(
        &mut self,
        assets: &mut L,
        owner: &AccountId,
        index: usize,
        receiver: &AccountId,
        now: u64,
    ) -> Result<LockPosition, PoolError> {
        let position = *self.ledger.get(owner, index)?;
        if !position.is_unlocked(now) {
            return Err(PoolError::TooSoon {
                end: position.end,
                now,
            });
        }
        let delta = ShareDelta::Burn(position.share_amount);

        self.rewards.check(owner, delta)?;
        assets.transfer(self.deposit_asset, &self.custody, receiver, position.amount)?;

        self.ledger.swap_remove(owner, index)?;
        self.rewards.apply(owner, delta)?;
        self.events.push(PoolEvent::burn(*owner, position.share_amount));
        self.events.push(PoolEvent::Withdrawn {
            index,
            owner: *owner,
            receiver: *receiver,
            amount: position.amount,
        });
        info!(pool = %self.id, %owner, %receiver, index, amount = position.amount, "withdraw");
        Ok(position)
    }

    /// Restart the lock of an open position from `now`.
    ///
    /// New duration is `min(max_lock, remaining + additional)`. Shares are
    /// resampled against the current curve and only the difference is
    /// minted or burned; a curve lowered since the deposit can make this a
    /// net burn.
    pub fn extend_lock(
        &mut self,
        owner: &AccountId,
        index: usize,
        additional: u64,
        now: u64,
    ) -> Result<ShareDelta, PoolError> {
        let position = self.extendable(owner, index, additional, now)?;
        let new_duration = position
            .remaining(now)
            .saturating_add(additional)
            .min(self.engine.max_lock_duration());
        self.relock(owner, index, additional, now, new_duration)
    }

    /// Push the end of an open position out by `additional`, keeping its
    /// start.
    ///
    /// Shares are resampled at the whole new lock length,
    /// `min(max_lock, (end - start) + additional)`, with the same
    /// mint-or-burn-the-difference rule as [`extend_lock`](Self::extend_lock).
    pub fn extend_lock_end(
        &mut self,
        owner: &AccountId,
        index: usize,
        additional: u64,
        now: u64,
    ) -> Result<ShareDelta, PoolError> {
        let position = self.extendable(owner, index, additional, now)?;
        let new_duration = position
            .duration()
            .saturating_add(additional)
            .min(self.engine.max_lock_duration());
        self.relock(owner, index, additional, position.start, new_duration)
    }

    fn extendable(
        &self,
        owner: &AccountId,
        index: usize,
        additional: u64,
        now: u64,
    ) -> Result<LockPosition, PoolError> {
        if additional == 0 {
            return Err(PoolError::ZeroDuration);
        }
        let position = *self.ledger.get(owner, index)?;
        if position.is_unlocked(now) {
            return Err(PoolError::DepositExpired {
                end: position.end,
                now,
            });
        }
        Ok(position)
    }

    /// Move position `index` to `[start, start + new_duration]` and settle
    /// the share difference.
    fn relock(
        &mut self,
        owner: &AccountId,
        index: usize,
        additional: u64,
        start: u64,
        new_duration: u64,
    ) -> Result<ShareDelta, PoolError> {
        let position = *self.ledger.get(owner, index)?;
        let new_end = start.checked_add(new_duration).ok_or(PoolError::ArithmeticOverflow)?;
        let new_shares = self
            .engine
            .shares_for(position.amount, new_duration, &self.curve.snapshot())?;
        let delta = ShareDelta::between(position.share_amount, new_shares);

        self.rewards.check(owner, delta)?;

        let slot = self.ledger.get_mut(owner, index)?;
        slot.start = start;
        slot.end = new_end;
        slot.share_amount = new_shares;
        self.rewards.apply(owner, delta)?;

        match delta {
            ShareDelta::Mint(amount) => self.events.push(PoolEvent::mint(*owner, amount)),
            ShareDelta::Burn(amount) => self.events.push(PoolEvent::burn(*owner, amount)),
            ShareDelta::Unchanged => {}
        }
        self.events.push(PoolEvent::LockExtended {
            index,
            owner: *owner,
            additional,
            new_duration,
        });
        info!(pool = %self.id, %owner, index, start, new_duration, ?delta, "lock extended");
        Ok(delta)
    }

    /// Add principal to an open position of `owner`, paid by `payer`.
    ///
    /// The added amount is weighted at the position's remaining duration;
    /// start and end do not move. Returns the shares minted.
    #[allow(clippy::too_many_arguments)]
    pub fn increase_lock<L: AssetLedger + ?Sized>(
        &mut self,
        assets: &mut L,
        payer: &AccountId,
        owner: &AccountId,
        index: usize,
        amount: u128,
        now: u64,
    ) -> Result<u128, PoolError> {
        if amount == 0 {
            return Err(PoolError::ZeroAmount);
        }
        let position = *self.ledger.get(owner, index)?;
        if position.is_unlocked(now) {
            return Err(PoolError::DepositExpired {
                end: position.end,
                now,
            });
        }
        let remaining = position.remaining(now);
        let added_shares = self
            .engine
            .shares_for(amount, remaining, &self.curve.snapshot())?;
        let new_amount = position
            .amount
            .checked_add(amount)
            .ok_or(PoolError::ArithmeticOverflow)?;
        let new_shares = position
            .share_amount
            .checked_add(added_shares)
            .ok_or(PoolError::ArithmeticOverflow)?;
        let delta = ShareDelta::Mint(added_shares);

        self.rewards.check(owner, delta)?;
        assets.transfer_from(self.deposit_asset, payer, &self.custody, amount)?;

        let slot = self.ledger.get_mut(owner, index)?;
        slot.amount = new_amount;
        slot.share_amount = new_shares;
        self.rewards.apply(owner, delta)?;
        self.events.push(PoolEvent::mint(*owner, added_shares));
        self.events.push(PoolEvent::LockIncreased {
            index,
            owner: *owner,
            payer: *payer,
            amount,
        });
        info!(pool = %self.id, %owner, %payer, index, amount, added_shares, remaining, "lock increased");
        Ok(added_shares)
    }

    /// Shares cannot move between accounts.
    pub fn transfer_shares(&self, _from: &AccountId, _to: &AccountId, _amount: u128) -> Result<(), PoolError> {
        Err(PoolError::NonTransferable)
    }

    // --- rewards ---

    /// Pull `amount` of the reward asset from `caller` and spread it over
    /// the outstanding shares.
    pub fn distribute_rewards<L: AssetLedger + ?Sized>(
        &mut self,
        assets: &mut L,
        caller: &AccountId,
        amount: u128,
    ) -> Result<(), PoolError> {
        self.roles.require(Role::RewardDistributor, caller)?;
        let pending = self.rewards.prepare_distribution(amount)?;
        assets.transfer_from(self.reward_asset, caller, &self.custody, amount)?;
        self.rewards.commit_distribution(pending);
        self.events.push(PoolEvent::RewardsDistributed {
            from: *caller,
            amount,
        });
        info!(pool = %self.id, %caller, amount, total_shares = self.rewards.total_shares(), "rewards distributed");
        Ok(())
    }

    /// Mark all of `owner`'s withdrawable rewards as withdrawn.
    ///
    /// Only the bookkeeping half of a claim; the caller moves the assets.
    pub(crate) fn take_claim(&mut self, owner: &AccountId) -> Result<u128, PoolError> {
        self.rewards.claim(owner)
    }

    /// Send reward asset out of custody.
    pub(crate) fn pay_reward<L: AssetLedger + ?Sized>(
        &self,
        assets: &mut L,
        receiver: &AccountId,
        amount: u128,
    ) -> Result<(), PoolError> {
        assets.transfer(self.reward_asset, &self.custody, receiver, amount)?;
        Ok(())
    }

    pub(crate) fn record(&mut self, event: PoolEvent) {
        self.events.push(event);
    }

    // --- curve ---

    pub fn set_curve(&mut self, caller: &AccountId, points: Vec<u128>) -> Result<(), PoolError> {
        self.roles.require(Role::CurveAuthority, caller)?;
        self.curve.replace(points)?;
        let version = self.curve.version();
        self.events.push(PoolEvent::CurveChanged { by: *caller, version });
        info!(pool = %self.id, %caller, len = self.curve.sample_count(), version, "curve replaced");
        Ok(())
    }

    /// See [`CurveStore::set_point`] for the meaning of `index`.
    pub fn set_curve_point(
        &mut self,
        caller: &AccountId,
        value: u128,
        index: usize,
    ) -> Result<CurveEdit, PoolError> {
        self.roles.require(Role::CurveAuthority, caller)?;
        let edit = self.curve.set_point(value, index)?;
        let version = self.curve.version();
        self.events.push(PoolEvent::CurveChanged { by: *caller, version });
        info!(pool = %self.id, %caller, index, ?edit, version, "curve point set");
        Ok(edit)
    }

    // --- roles ---

    pub fn grant_role(&mut self, caller: &AccountId, role: Role, account: AccountId) -> Result<(), PoolError> {
        self.roles.require(Role::Admin, caller)?;
        if self.roles.grant(role, account) {
            self.events.push(PoolEvent::RoleGranted {
                role,
                account,
                by: *caller,
            });
            info!(pool = %self.id, %role, %account, "role granted");
        }
        Ok(())
    }

    pub fn revoke_role(&mut self, caller: &AccountId, role: Role, account: &AccountId) -> Result<(), PoolError> {
        self.roles.require(Role::Admin, caller)?;
        if self.roles.revoke(role, account) {
            self.events.push(PoolEvent::RoleRevoked {
                role,
                account: *account,
                by: *caller,
            });
            info!(pool = %self.id, %role, %account, "role revoked");
        } else {
            debug!(pool = %self.id, %role, %account, "revoke of missing role ignored");
        }
        Ok(())
    }
}
