//! The multi-pool system: every pool, the asset ledger and the clock.
//!
//! Commands are methods taking the caller explicitly. Single-pool commands
//! are atomic on their own (see [`TimeLockPool`]). Claims, which may deposit
//! into an escrow pool, and atomic batches run under a checkpoint of all
//! pools and the asset ledger that is restored on error.

use tlock_core::error::PoolError;
use tlock_core::traits::{AssetLedger, Clock};
use tlock_core::types::{AccountId, LockPosition, PoolId, Role};
use tlock_curve::CurveEdit;
use tracing::{info, warn};

use crate::batch::{ClaimReceipt, CommandOutcome, PoolCommand};
use crate::config::{PoolConfig, SystemConfig};
use crate::escrow::EscrowLink;
use crate::events::PoolEvent;
use crate::pool::TimeLockPool;
use crate::rewards::ShareDelta;

pub struct PoolSystem<L, C> {
    pools: Vec<TimeLockPool>,
    assets: L,
    clock: C,
}

impl<L: AssetLedger + Clone, C: Clock> PoolSystem<L, C> {
    pub fn new(assets: L, clock: C) -> Self {
        Self {
            pools: Vec::new(),
            assets,
            clock,
        }
    }

    /// Create every configured pool, owned by `creator`, then wire escrow
    /// links by pool name.
    pub fn from_config(config: &SystemConfig, creator: AccountId, assets: L, clock: C) -> Result<Self, PoolError> {
        config.validate()?;
        let mut system = Self::new(assets, clock);
        for pool in &config.pools {
            system.create_pool(creator, pool)?;
        }
        for pool in &config.pools {
            let Some(escrow) = &pool.escrow else {
                continue;
            };
            let base = system
                .pool_id(&pool.name)
                .ok_or_else(|| PoolError::InvalidConfig(format!("unknown pool {}", pool.name)))?;
            let target = system
                .pool_id(&escrow.pool_name)
                .ok_or_else(|| PoolError::InvalidConfig(format!("unknown escrow pool {}", escrow.pool_name)))?;
            let link = EscrowLink::new(target, escrow.portion, escrow.duration)?;
            system.link_escrow(&creator, base, Some(link))?;
        }
        Ok(system)
    }

    /// Rebuild a system around already constructed pools (snapshot restore).
    pub fn with_pools(pools: Vec<TimeLockPool>, assets: L, clock: C) -> Result<Self, PoolError> {
        for (i, pool) in pools.iter().enumerate() {
            if pool.id() != PoolId(i as u32) {
                return Err(PoolError::InvalidConfig(format!(
                    "pool {} stored at position {i}",
                    pool.id()
                )));
            }
        }
        Ok(Self { pools, assets, clock })
    }

    /// Add a pool. Its escrow section, if any, is wired separately with
    /// [`link_escrow`](Self::link_escrow).
    pub fn create_pool(&mut self, creator: AccountId, config: &PoolConfig) -> Result<PoolId, PoolError> {
        if self.pool_id(&config.name).is_some() {
            return Err(PoolError::InvalidConfig(format!("duplicate pool name {}", config.name)));
        }
        let id = PoolId(self.pools.len() as u32);
        self.pools.push(TimeLockPool::new(id, config, creator)?);
        Ok(id)
    }

    /// Set or clear the escrow link of `pool`.
    ///
    /// Approves the escrow pool to pull `pool`'s reward asset from its
    /// custody account, which is how escrowed claims are paid for.
    pub fn link_escrow(&mut self, caller: &AccountId, pool: PoolId, link: Option<EscrowLink>) -> Result<(), PoolError> {
        let base = self.pool(pool)?;
        base.roles().require(Role::Admin, caller)?;
        let (reward_asset, custody, old) = (base.reward_asset(), base.custody(), base.escrow().copied());

        let new_custody = match &link {
            Some(link) => {
                if link.pool == pool {
                    return Err(PoolError::InvalidConfig(format!("{pool} cannot escrow into itself")));
                }
                let target = self.pool(link.pool)?;
                if target.deposit_asset() != reward_asset {
                    return Err(PoolError::InvalidConfig(format!(
                        "escrow {} takes {}, {pool} pays {reward_asset}",
                        link.pool,
                        target.deposit_asset()
                    )));
                }
                Some(target.custody())
            }
            None => None,
        };

        if let Some(old) = old {
            let old_custody = self.pool(old.pool)?.custody();
            self.assets.approve(reward_asset, &custody, &old_custody, 0);
        }
        if let (Some(link), Some(target_custody)) = (&link, new_custody) {
            self.assets.approve(reward_asset, &custody, &target_custody, u128::MAX);
            info!(%pool, escrow = %link.pool, portion = link.portion, duration = link.duration, "escrow linked");
        }
        self.pool_mut(pool)?.set_escrow(link);
        Ok(())
    }

    // --- access ---

    pub fn pool(&self, id: PoolId) -> Result<&TimeLockPool, PoolError> {
        self.pools.get(id.0 as usize).ok_or(PoolError::UnknownPool(id))
    }

    fn pool_mut(&mut self, id: PoolId) -> Result<&mut TimeLockPool, PoolError> {
        self.pools.get_mut(id.0 as usize).ok_or(PoolError::UnknownPool(id))
    }

    pub fn pool_id(&self, name: &str) -> Option<PoolId> {
        self.pools.iter().find(|p| p.name() == name).map(TimeLockPool::id)
    }

    pub fn pools(&self) -> &[TimeLockPool] {
        &self.pools
    }

    pub fn assets(&self) -> &L {
        &self.assets
    }

    /// Direct access to the asset ledger, e.g. to fund accounts.
    pub fn assets_mut(&mut self) -> &mut L {
        &mut self.assets
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    pub fn take_events(&mut self, pool: PoolId) -> Result<Vec<PoolEvent>, PoolError> {
        Ok(self.pool_mut(pool)?.take_events())
    }

    /// Run `f` against a checkpoint; restore pools and assets if it fails.
    fn atomically<T>(
        &mut self,
        op: &'static str,
        f: impl FnOnce(&mut Self) -> Result<T, PoolError>,
    ) -> Result<T, PoolError> {
        let pools = self.pools.clone();
        let assets = self.assets.clone();
        match f(self) {
            Ok(value) => Ok(value),
            Err(e) => {
                self.pools = pools;
                self.assets = assets;
                warn!(op, error = %e, "operation rolled back");
                Err(e)
            }
        }
    }

    // --- commands ---

    pub fn deposit(
        &mut self,
        caller: &AccountId,
        pool: PoolId,
        amount: u128,
        duration: u64,
        receiver: &AccountId,
    ) -> Result<usize, PoolError> {
        let now = self.clock.now();
        let pool = self.pools.get_mut(pool.0 as usize).ok_or(PoolError::UnknownPool(pool))?;
        pool.deposit(&mut self.assets, caller, amount, duration, receiver, now)
    }

    pub fn withdraw(
        &mut self,
        caller: &AccountId,
        pool: PoolId,
        index: usize,
        receiver: &AccountId,
    ) -> Result<LockPosition, PoolError> {
        let now = self.clock.now();
        let pool = self.pools.get_mut(pool.0 as usize).ok_or(PoolError::UnknownPool(pool))?;
        pool.withdraw(&mut self.assets, caller, index, receiver, now)
    }

    pub fn extend_lock(
        &mut self,
        caller: &AccountId,
        pool: PoolId,
        index: usize,
        additional: u64,
    ) -> Result<ShareDelta, PoolError> {
        let now = self.clock.now();
        self.pool_mut(pool)?.extend_lock(caller, index, additional, now)
    }

    /// Push the end of `caller`'s position `index` out, keeping its start.
    pub fn extend_lock_end(
        &mut self,
        caller: &AccountId,
        pool: PoolId,
        index: usize,
        additional: u64,
    ) -> Result<ShareDelta, PoolError> {
        let now = self.clock.now();
        self.pool_mut(pool)?.extend_lock_end(caller, index, additional, now)
    }

    /// Top up `owner`'s position `index`, paid by `caller`.
    pub fn increase_lock(
        &mut self,
        caller: &AccountId,
        pool: PoolId,
        index: usize,
        owner: &AccountId,
        amount: u128,
    ) -> Result<u128, PoolError> {
        let now = self.clock.now();
        let pool = self.pools.get_mut(pool.0 as usize).ok_or(PoolError::UnknownPool(pool))?;
        pool.increase_lock(&mut self.assets, caller, owner, index, amount, now)
    }

    pub fn distribute_rewards(&mut self, caller: &AccountId, pool: PoolId, amount: u128) -> Result<(), PoolError> {
        let pool = self.pools.get_mut(pool.0 as usize).ok_or(PoolError::UnknownPool(pool))?;
        pool.distribute_rewards(&mut self.assets, caller, amount)
    }

    /// Claim everything `caller` can withdraw from `pool`.
    ///
    /// The escrowed part is deposited into the escrow pool for `receiver`
    /// with the link's fixed duration; the rest is paid to `receiver`.
    /// Zero parts are skipped.
    pub fn claim_rewards(&mut self, caller: &AccountId, pool: PoolId, receiver: &AccountId) -> Result<ClaimReceipt, PoolError> {
        let now = self.clock.now();
        self.atomically("claim_rewards", |sys| sys.claim_inner(caller, pool, receiver, now))
    }

    fn claim_inner(
        &mut self,
        caller: &AccountId,
        pool: PoolId,
        receiver: &AccountId,
        now: u64,
    ) -> Result<ClaimReceipt, PoolError> {
        let base = pool.0 as usize;
        let amount = self.pool_mut(pool)?.take_claim(caller)?;
        let link = self.pools[base].escrow().copied();
        let (escrowed, direct) = match &link {
            Some(link) => link.split(amount)?,
            None => (0, amount),
        };

        if direct > 0 {
            self.pools[base].pay_reward(&mut self.assets, receiver, direct)?;
        }

        let mut escrow_position = None;
        if let Some(link) = link.filter(|_| escrowed > 0) {
            let payer = self.pools[base].custody();
            let target = self
                .pools
                .get_mut(link.pool.0 as usize)
                .ok_or(PoolError::UnknownPool(link.pool))?;
            let index = target.deposit(&mut self.assets, &payer, escrowed, link.duration, receiver, now)?;
            escrow_position = Some((link.pool, index));
        }

        self.pools[base].record(PoolEvent::RewardsClaimed {
            owner: *caller,
            receiver: *receiver,
            escrowed,
            direct,
        });
        info!(%pool, owner = %caller, %receiver, amount, direct, escrowed, "rewards claimed");
        Ok(ClaimReceipt {
            amount,
            direct,
            escrowed,
            escrow_position,
        })
    }

    pub fn set_curve(&mut self, caller: &AccountId, pool: PoolId, points: Vec<u128>) -> Result<(), PoolError> {
        self.pool_mut(pool)?.set_curve(caller, points)
    }

    pub fn set_curve_point(
        &mut self,
        caller: &AccountId,
        pool: PoolId,
        value: u128,
        index: usize,
    ) -> Result<CurveEdit, PoolError> {
        self.pool_mut(pool)?.set_curve_point(caller, value, index)
    }

    pub fn grant_role(&mut self, caller: &AccountId, pool: PoolId, role: Role, account: AccountId) -> Result<(), PoolError> {
        self.pool_mut(pool)?.grant_role(caller, role, account)
    }

    pub fn revoke_role(&mut self, caller: &AccountId, pool: PoolId, role: Role, account: &AccountId) -> Result<(), PoolError> {
        self.pool_mut(pool)?.revoke_role(caller, role, account)
    }

    /// Run one command on behalf of `caller`.
    pub fn execute(&mut self, caller: &AccountId, pool: PoolId, command: PoolCommand) -> Result<CommandOutcome, PoolError> {
        match command {
            PoolCommand::Deposit {
                amount,
                duration,
                receiver,
            } => self
                .deposit(caller, pool, amount, duration, &receiver)
                .map(|index| CommandOutcome::Deposited { index }),
            PoolCommand::Withdraw { index, receiver } => self
                .withdraw(caller, pool, index, &receiver)
                .map(CommandOutcome::Withdrawn),
            PoolCommand::ExtendLock { index, additional } => self
                .extend_lock(caller, pool, index, additional)
                .map(CommandOutcome::Extended),
            PoolCommand::ExtendLockEnd { index, additional } => self
                .extend_lock_end(caller, pool, index, additional)
                .map(CommandOutcome::Extended),
            PoolCommand::IncreaseLock { index, owner, amount } => self
                .increase_lock(caller, pool, index, &owner, amount)
                .map(|shares| CommandOutcome::Increased { shares }),
            PoolCommand::DistributeRewards { amount } => self
                .distribute_rewards(caller, pool, amount)
                .map(|()| CommandOutcome::Distributed),
            PoolCommand::ClaimRewards { receiver } => self
                .claim_rewards(caller, pool, &receiver)
                .map(CommandOutcome::Claimed),
            PoolCommand::SetCurve { points } => self
                .set_curve(caller, pool, points)
                .map(|()| CommandOutcome::CurveReplaced),
            PoolCommand::SetCurvePoint { value, index } => self
                .set_curve_point(caller, pool, value, index)
                .map(CommandOutcome::CurvePointSet),
        }
    }

    /// Run `commands` in order as one logical step.
    ///
    /// With `atomic`, the first failure discards every effect of the batch
    /// and is returned as [`PoolError::BatchFailed`]. Otherwise each command
    /// stands alone: failures are reported per call and successes are kept.
    pub fn batch(
        &mut self,
        caller: &AccountId,
        pool: PoolId,
        commands: Vec<PoolCommand>,
        atomic: bool,
    ) -> Result<Vec<Result<CommandOutcome, PoolError>>, PoolError> {
        self.pool(pool)?;
        if atomic {
            self.atomically("batch", |sys| {
                let mut outcomes = Vec::with_capacity(commands.len());
                for (index, command) in commands.into_iter().enumerate() {
                    let outcome = sys.execute(caller, pool, command).map_err(|e| PoolError::BatchFailed {
                        index,
                        source: Box::new(e),
                    })?;
                    outcomes.push(Ok(outcome));
                }
                Ok(outcomes)
            })
        } else {
            Ok(commands
                .into_iter()
                .map(|command| {
                    let name = command.name();
                    let result = self.execute(caller, pool, command);
                    if let Err(e) = &result {
                        warn!(%pool, %caller, command = name, error = %e, "batch call failed");
                    }
                    result
                })
                .collect())
        }
    }

    // --- queries ---

    pub fn get_multiplier(&self, pool: PoolId, duration: u64) -> Result<u128, PoolError> {
        Ok(self.pool(pool)?.get_multiplier(duration))
    }

    pub fn deposits_of(&self, pool: PoolId, account: &AccountId) -> Result<&[LockPosition], PoolError> {
        Ok(self.pool(pool)?.deposits_of(account))
    }

    pub fn position_count(&self, pool: PoolId, account: &AccountId) -> Result<usize, PoolError> {
        Ok(self.pool(pool)?.position_count(account))
    }

    pub fn total_deposit(&self, pool: PoolId, account: &AccountId) -> Result<u128, PoolError> {
        Ok(self.pool(pool)?.total_deposit(account))
    }

    pub fn shares_of(&self, pool: PoolId, account: &AccountId) -> Result<u128, PoolError> {
        Ok(self.pool(pool)?.shares_of(account))
    }

    pub fn total_shares(&self, pool: PoolId) -> Result<u128, PoolError> {
        Ok(self.pool(pool)?.total_shares())
    }

    pub fn withdrawable_rewards_of(&self, pool: PoolId, account: &AccountId) -> Result<u128, PoolError> {
        self.pool(pool)?.withdrawable_rewards_of(account)
    }

    pub fn withdrawn_rewards_of(&self, pool: PoolId, account: &AccountId) -> Result<u128, PoolError> {
        Ok(self.pool(pool)?.withdrawn_rewards_of(account))
    }

    /// Curve sample `index` of `pool`, `None` past the end.
    pub fn curve_point(&self, pool: PoolId, index: usize) -> Result<Option<u128>, PoolError> {
        Ok(self.pool(pool)?.curve_point(index))
    }
}
