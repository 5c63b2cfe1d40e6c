//! # tlock-pool
//! Time-locked staking pools.
//!
//! Composes the pool subsystems:
//! - [`ledger::DepositLedger`]: per-account lock positions
//! - [`rewards::DividendAccumulator`]: pull-based reward points per share
//! - [`pool::TimeLockPool`]: deposit, withdraw, extend, increase, distribute
//! - [`system::PoolSystem`]: multiple pools, escrow forwarding of claims, batches
//! - [`storage::SnapshotStore`]: versioned snapshots on disk
//! - [`view`]: position lookups across current and legacy pools
//! - [`config::SystemConfig`]: pool configuration

pub mod access;
pub mod batch;
pub mod config;
pub mod escrow;
pub mod events;
pub mod ledger;
pub mod pool;
pub mod rewards;
pub mod shared;
pub mod storage;
pub mod system;
pub mod view;

pub use batch::{ClaimReceipt, CommandOutcome, PoolCommand};
pub use config::{EscrowConfig, PoolConfig, SystemConfig};
pub use escrow::EscrowLink;
pub use events::PoolEvent;
pub use pool::TimeLockPool;
pub use shared::SharedPoolSystem;
pub use storage::{PoolSnapshot, SnapshotStore, StorageError};
pub use system::PoolSystem;
pub use view::{LegacyPool, PoolPositions, PositionView, fetch_positions};
