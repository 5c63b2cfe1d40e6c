//! Thread-safe handle to a [`PoolSystem`].
//!
//! Every command takes the write lock for its whole duration, so commands
//! are serialized and none observes another's intermediate state. Queries
//! share the read lock.

use std::sync::Arc;

use parking_lot::RwLock;
use tlock_core::error::PoolError;
use tlock_core::traits::{AssetLedger, Clock};
use tlock_core::types::{AccountId, LockPosition, PoolId};

use crate::batch::{ClaimReceipt, CommandOutcome, PoolCommand};
use crate::storage::PoolSnapshot;
use crate::system::PoolSystem;

pub struct SharedPoolSystem<L, C> {
    inner: Arc<RwLock<PoolSystem<L, C>>>,
}

impl<L, C> Clone for SharedPoolSystem<L, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L: AssetLedger + Clone, C: Clock> SharedPoolSystem<L, C> {
    pub fn new(system: PoolSystem<L, C>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(system)),
        }
    }

    /// Run `f` under the read lock.
    pub fn read<T>(&self, f: impl FnOnce(&PoolSystem<L, C>) -> T) -> T {
        f(&self.inner.read())
    }

    /// Run `f` under the write lock.
    pub fn write<T>(&self, f: impl FnOnce(&mut PoolSystem<L, C>) -> T) -> T {
        f(&mut self.inner.write())
    }

    pub fn deposit(
        &self,
        caller: &AccountId,
        pool: PoolId,
        amount: u128,
        duration: u64,
        receiver: &AccountId,
    ) -> Result<usize, PoolError> {
        self.write(|sys| sys.deposit(caller, pool, amount, duration, receiver))
    }

    pub fn withdraw(
        &self,
        caller: &AccountId,
        pool: PoolId,
        index: usize,
        receiver: &AccountId,
    ) -> Result<LockPosition, PoolError> {
        self.write(|sys| sys.withdraw(caller, pool, index, receiver))
    }

    pub fn distribute_rewards(&self, caller: &AccountId, pool: PoolId, amount: u128) -> Result<(), PoolError> {
        self.write(|sys| sys.distribute_rewards(caller, pool, amount))
    }

    pub fn claim_rewards(&self, caller: &AccountId, pool: PoolId, receiver: &AccountId) -> Result<ClaimReceipt, PoolError> {
        self.write(|sys| sys.claim_rewards(caller, pool, receiver))
    }

    pub fn execute(&self, caller: &AccountId, pool: PoolId, command: PoolCommand) -> Result<CommandOutcome, PoolError> {
        self.write(|sys| sys.execute(caller, pool, command))
    }

    pub fn withdrawable_rewards_of(&self, pool: PoolId, account: &AccountId) -> Result<u128, PoolError> {
        self.read(|sys| sys.withdrawable_rewards_of(pool, account))
    }

    pub fn total_shares(&self, pool: PoolId) -> Result<u128, PoolError> {
        self.read(|sys| sys.total_shares(pool))
    }

    /// Consistent snapshot taken under the read lock.
    pub fn snapshot(&self) -> PoolSnapshot {
        self.read(PoolSnapshot::capture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tlock_core::asset::MemoryAssetLedger;
    use tlock_core::clock::ManualClock;
    use tlock_core::constants::WAD;
    use tlock_core::types::AssetId;

    use crate::config::PoolConfig;

    #[test]
    fn concurrent_deposits_are_all_recorded() {
        let owner = AccountId::from_label("owner");
        let mut sys = PoolSystem::new(MemoryAssetLedger::new(), ManualClock::new(0));
        let pool = sys
            .create_pool(owner, &PoolConfig::flat("p", AssetId(1), AssetId(1)))
            .unwrap();
        let custody = sys.pool(pool).unwrap().custody();
        let users: Vec<AccountId> = (0..4).map(|i| AccountId::from_label(&format!("u{i}"))).collect();
        for u in &users {
            sys.assets_mut().mint(AssetId(1), u, 100 * WAD).unwrap();
            sys.assets_mut().approve(AssetId(1), u, &custody, u128::MAX);
        }
        let shared = SharedPoolSystem::new(sys);

        let handles: Vec<_> = users
            .iter()
            .map(|u| {
                let shared = shared.clone();
                let u = *u;
                thread::spawn(move || {
                    for _ in 0..10 {
                        shared.deposit(&u, pool, WAD, 0, &u).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(shared.total_shares(pool).unwrap(), 40 * WAD);
        assert_eq!(shared.snapshot().pools[0].positions.len(), 4);
    }
}
