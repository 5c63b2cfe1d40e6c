//! Snapshot save/load against a real filesystem.

use tempfile::TempDir;

use tlock_core::asset::MemoryAssetLedger;
use tlock_core::clock::ManualClock;
use tlock_core::constants::{SECONDS_PER_YEAR, WAD};
use tlock_core::traits::AssetLedger;
use tlock_core::types::{AccountId, AssetId, LegacyLockPosition, PoolId};
use tlock_pool::view::PositionSource;
use tlock_pool::{
    EscrowConfig, LegacyPool, PoolConfig, PoolSnapshot, PoolSystem, SnapshotStore, StorageError, SystemConfig,
    fetch_positions,
};

const DPST: AssetId = AssetId(1);
const RWRD: AssetId = AssetId(2);

fn owner() -> AccountId {
    AccountId::from_label("owner")
}

fn alice() -> AccountId {
    AccountId::from_label("alice")
}

fn bob() -> AccountId {
    AccountId::from_label("bob")
}

fn populated() -> (PoolSystem<MemoryAssetLedger, ManualClock>, ManualClock) {
    let mut staking = PoolConfig::flat("staking", DPST, RWRD);
    staking.escrow = Some(EscrowConfig {
        pool_name: "escrow".into(),
        portion: WAD / 2,
        duration: SECONDS_PER_YEAR,
    });
    let config = SystemConfig {
        log_level: "info".into(),
        pools: vec![staking, PoolConfig::flat("escrow", RWRD, RWRD)],
    };
    let clock = ManualClock::new(10_000);
    let mut sys = PoolSystem::from_config(&config, owner(), MemoryAssetLedger::new(), clock.clone()).unwrap();
    let staking = PoolId(0);
    let custody = sys.pool(staking).unwrap().custody();
    for a in [alice(), bob()] {
        sys.assets_mut().mint(DPST, &a, 100 * WAD).unwrap();
        sys.assets_mut().approve(DPST, &a, &custody, u128::MAX);
    }
    sys.assets_mut().mint(RWRD, &owner(), 100 * WAD).unwrap();
    sys.assets_mut().approve(RWRD, &owner(), &custody, u128::MAX);

    // 64 shares in total so the 8 distributed divide without dust
    sys.deposit(&alice(), staking, 48 * WAD, 0, &alice()).unwrap();
    sys.deposit(&bob(), staking, 16 * WAD, 0, &bob()).unwrap();
    sys.distribute_rewards(&owner(), staking, 8 * WAD).unwrap();
    sys.claim_rewards(&alice(), staking, &alice()).unwrap();
    (sys, clock)
}

#[test]
fn save_then_load_restores_every_pool() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path().join("state").join("pools.snap"));
    assert!(!store.exists());

    let (sys, clock) = populated();
    let snapshot = PoolSnapshot::capture(&sys);
    store.save(&snapshot).unwrap();
    assert!(store.exists());
    assert!(!store.path().with_extension("tmp").exists());

    let loaded = store.load().unwrap();
    assert_eq!(loaded, snapshot);

    let (restored, legacy) = loaded.restore(sys.assets().clone(), clock).unwrap();
    assert!(legacy.is_empty());
    let staking = PoolId(0);
    let escrow = PoolId(1);
    assert_eq!(restored.total_shares(staking).unwrap(), 64 * WAD);
    assert_eq!(restored.withdrawn_rewards_of(staking, &alice()).unwrap(), 6 * WAD);
    assert_eq!(restored.withdrawable_rewards_of(staking, &bob()).unwrap(), 2 * WAD);
    assert_eq!(restored.deposits_of(escrow, &alice()).unwrap()[0].amount, 3 * WAD);
    assert_eq!(
        restored.pool(staking).unwrap().escrow(),
        sys.pool(staking).unwrap().escrow()
    );
}

#[test]
fn restored_system_keeps_working() {
    let (sys, clock) = populated();
    let bytes = PoolSnapshot::capture(&sys).encode().unwrap();
    let (mut restored, _) = PoolSnapshot::decode(&bytes)
        .unwrap()
        .restore(sys.assets().clone(), clock.clone())
        .unwrap();

    let staking = PoolId(0);
    let receipt = restored.claim_rewards(&bob(), staking, &bob()).unwrap();
    assert_eq!(receipt.amount, 2 * WAD);
    assert_eq!(receipt.direct, WAD);
    assert_eq!(restored.assets().balance_of(RWRD, &bob()), WAD);

    clock.advance(600);
    restored.withdraw(&alice(), staking, 0, &alice()).unwrap();
    assert_eq!(restored.total_shares(staking).unwrap(), 16 * WAD);
}

#[test]
fn load_rejects_truncated_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.snap");
    std::fs::write(&path, b"TLCK").unwrap();
    assert!(matches!(SnapshotStore::new(&path).load(), Err(StorageError::Truncated)));
}

#[test]
fn missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path().join("absent.snap"));
    assert!(matches!(store.load(), Err(StorageError::Io(_))));
}

#[test]
fn legacy_pools_survive_round_trip_and_feed_views() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path().join("pools.snap"));
    let (sys, clock) = populated();

    let v1 = LegacyPool {
        id: PoolId(100),
        name: "v1".into(),
        positions: vec![(
            alice(),
            vec![LegacyLockPosition {
                amount: 7 * WAD,
                start: 1,
                end: 2,
            }],
        )],
    };
    store
        .save(&PoolSnapshot::capture_with_legacy(&sys, vec![v1.clone()]))
        .unwrap();
    let (restored, legacy) = store.load().unwrap().restore(sys.assets().clone(), clock).unwrap();
    assert_eq!(legacy, vec![v1]);

    let staking = restored.pool(PoolId(0)).unwrap();
    let escrow = restored.pool(PoolId(1)).unwrap();
    let sources: [&dyn PositionSource; 3] = [staking, escrow, &legacy[0]];
    let views = fetch_positions(&alice(), &sources);
    assert_eq!(views.len(), 3);
    assert_eq!(views[0].positions[0].amount, 48 * WAD);
    assert_eq!(views[1].positions[0].amount, 3 * WAD);
    assert!(views[2].legacy);
    assert_eq!(views[2].positions[0].amount, 7 * WAD);
}
