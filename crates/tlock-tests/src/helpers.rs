//! Shared fixtures for the integration tests.

use tlock_core::asset::MemoryAssetLedger;
use tlock_core::clock::ManualClock;
use tlock_core::constants::SECONDS_PER_YEAR;
use tlock_core::math::parse_wad;
use tlock_core::traits::AssetLedger;
use tlock_core::types::{AccountId, AssetId, PoolId};
use tlock_pool::{EscrowConfig, PoolConfig, PoolSystem, SystemConfig};

pub const DEPOSIT_ASSET: AssetId = AssetId(1);
pub const REWARD_ASSET: AssetId = AssetId(2);

/// Clock start used by every fixture.
pub const GENESIS: u64 = 1_700_000_000;

pub type TestSystem = PoolSystem<MemoryAssetLedger, ManualClock>;

/// Deterministic account for a label.
pub fn acct(label: &str) -> AccountId {
    AccountId::from_label(label)
}

/// The account that creates every pool and holds every role.
pub fn owner() -> AccountId {
    acct("owner")
}

/// WAD value from a decimal literal. Panics on malformed input.
pub fn wad(s: &str) -> u128 {
    parse_wad(s).unwrap_or_else(|| panic!("bad wad literal {s}"))
}

/// WAD values from decimal literals.
pub fn wads(values: &[&str]) -> Vec<u128> {
    values.iter().map(|s| wad(s)).collect()
}

/// Bonus curve used across the scenarios: 0, 0.65, 1.5, 3, 5 over 4 years.
pub fn reference_curve() -> Vec<u128> {
    wads(&["0", "0.65", "1.5", "3", "5"])
}

/// Base pool named "staking" taking [`DEPOSIT_ASSET`], paying
/// [`REWARD_ASSET`], with `curve` and `max_bonus`.
pub fn staking_pool(curve: Vec<u128>, max_bonus: u128) -> PoolConfig {
    let mut pool = PoolConfig::flat("staking", DEPOSIT_ASSET, REWARD_ASSET);
    pool.curve = curve;
    pool.max_bonus = max_bonus;
    pool
}

/// Staking pool forwarding `portion` of each claim into a flat "escrow"
/// pool for one year.
pub fn escrowed_config(staking: PoolConfig, portion: u128) -> SystemConfig {
    let mut staking = staking;
    staking.escrow = Some(EscrowConfig {
        pool_name: "escrow".into(),
        portion,
        duration: SECONDS_PER_YEAR,
    });
    SystemConfig {
        log_level: "warn".into(),
        pools: vec![staking, PoolConfig::flat("escrow", REWARD_ASSET, REWARD_ASSET)],
    }
}

/// A built system plus the handle that drives its clock.
pub struct Harness {
    pub sys: TestSystem,
    pub clock: ManualClock,
}

impl Harness {
    pub fn new(config: &SystemConfig) -> Self {
        let clock = ManualClock::new(GENESIS);
        let sys = PoolSystem::from_config(config, owner(), MemoryAssetLedger::new(), clock.clone())
            .unwrap_or_else(|e| panic!("fixture config rejected: {e}"));
        Self { sys, clock }
    }

    pub fn pool(&self, name: &str) -> PoolId {
        self.sys
            .pool_id(name)
            .unwrap_or_else(|| panic!("no pool named {name}"))
    }

    /// Mint `amount` of `asset` to `account` and approve `pool` to pull it.
    pub fn fund(&mut self, account: &AccountId, asset: AssetId, amount: u128, pool: PoolId) {
        let custody = pool.custody_account();
        let assets = self.sys.assets_mut();
        assets
            .mint(asset, account, amount)
            .unwrap_or_else(|e| panic!("mint failed: {e}"));
        assets.approve(asset, account, &custody, u128::MAX);
    }

    /// Fund the owner with `amount` rewards for `pool` and distribute them.
    pub fn distribute(&mut self, pool: PoolId, amount: u128) {
        let owner = owner();
        self.fund(&owner, REWARD_ASSET, amount, pool);
        self.sys
            .distribute_rewards(&owner, pool, amount)
            .unwrap_or_else(|e| panic!("distribution failed: {e}"));
    }

    pub fn balance(&self, asset: AssetId, account: &AccountId) -> u128 {
        self.sys.assets().balance_of(asset, account)
    }
}
