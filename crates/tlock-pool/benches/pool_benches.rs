//! Criterion benchmarks for pool operations.
//!
//! Covers: deposit, distribute + claim with escrow forwarding, and snapshot
//! encoding.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use tlock_core::asset::MemoryAssetLedger;
use tlock_core::clock::ManualClock;
use tlock_core::constants::{SECONDS_PER_YEAR, WAD};
use tlock_core::types::{AccountId, AssetId, PoolId};
use tlock_pool::{EscrowConfig, PoolConfig, PoolSnapshot, PoolSystem, SystemConfig};

const DPST: AssetId = AssetId(1);
const RWRD: AssetId = AssetId(2);

type System = PoolSystem<MemoryAssetLedger, ManualClock>;

/// Staking pool escrowing half of each claim into a flat escrow pool, with
/// `holders` funded accounts each holding one position.
fn build_system(holders: usize) -> (System, Vec<AccountId>, PoolId) {
    let owner = AccountId::from_label("owner");
    let mut staking = PoolConfig::flat("staking", DPST, RWRD);
    staking.curve = vec![0, WAD, 3 * WAD];
    staking.max_bonus = 5 * WAD;
    staking.escrow = Some(EscrowConfig {
        pool_name: "escrow".into(),
        portion: WAD / 2,
        duration: SECONDS_PER_YEAR,
    });
    let config = SystemConfig {
        log_level: "warn".into(),
        pools: vec![staking, PoolConfig::flat("escrow", RWRD, RWRD)],
    };
    let mut sys = System::from_config(&config, owner, MemoryAssetLedger::new(), ManualClock::new(1_000)).unwrap();
    let pool = sys.pool_id("staking").unwrap();
    let custody = sys.pool(pool).unwrap().custody();

    sys.assets_mut().mint(RWRD, &owner, u128::MAX / 4).unwrap();
    sys.assets_mut().approve(RWRD, &owner, &custody, u128::MAX);

    let accounts: Vec<AccountId> = (0..holders)
        .map(|i| AccountId::from_label(&format!("holder-{i}")))
        .collect();
    for a in &accounts {
        sys.assets_mut().mint(DPST, a, 1_000_000 * WAD).unwrap();
        sys.assets_mut().approve(DPST, a, &custody, u128::MAX);
        sys.deposit(a, pool, 100 * WAD, SECONDS_PER_YEAR, a).unwrap();
    }
    (sys, accounts, pool)
}

fn bench_deposit(c: &mut Criterion) {
    c.bench_function("deposit", |b| {
        let (mut sys, accounts, pool) = build_system(16);
        let a = accounts[0];
        b.iter(|| sys.deposit(&a, pool, black_box(WAD), black_box(SECONDS_PER_YEAR), &a).unwrap())
    });
}

fn bench_distribute_and_claim(c: &mut Criterion) {
    let owner = AccountId::from_label("owner");
    c.bench_function("distribute_and_claim_escrowed", |b| {
        b.iter_with_setup(
            || build_system(16),
            |(mut sys, accounts, pool)| {
                sys.distribute_rewards(&owner, pool, black_box(1_000 * WAD)).unwrap();
                for a in &accounts {
                    sys.claim_rewards(a, pool, a).unwrap();
                }
            },
        )
    });
}

fn bench_snapshot_encode(c: &mut Criterion) {
    let (sys, _, _) = build_system(256);
    c.bench_function("snapshot_encode_256_holders", |b| {
        b.iter(|| PoolSnapshot::capture(black_box(&sys)).encode().unwrap())
    });
}

criterion_group!(
    benches,
    bench_deposit,
    bench_distribute_and_claim,
    bench_snapshot_encode,
);
criterion_main!(benches);
