//! Snapshot persistence for a whole pool system.
//!
//! A [`PoolSnapshot`] captures every pool's ledger, accumulator, curve,
//! roles and escrow link. It is written as a 4-byte magic, a little-endian
//! `u32` format version and a bincode body. Saving goes through a temporary
//! file and a rename so a crash never leaves a half-written snapshot.
//!
//! The asset ledger and clock are not part of a snapshot; the caller
//! supplies them on restore.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use tlock_core::constants::SNAPSHOT_VERSION;
use tlock_core::error::PoolError;
use tlock_core::math::U256;
use tlock_core::traits::{AssetLedger, Clock};
use tlock_core::types::{AccountId, AssetId, LockPosition, PoolId, Role};
use tlock_curve::{Curve, CurveStore, MultiplierEngine};

use crate::access::RoleTable;
use crate::escrow::EscrowLink;
use crate::ledger::DepositLedger;
use crate::pool::{PoolParts, TimeLockPool};
use crate::rewards::{DividendAccumulator, RewardAccount};
use crate::system::PoolSystem;
use crate::view::LegacyPool;

const MAGIC: &[u8; 4] = b"TLCK";
const HEADER_LEN: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("encode: {0}")]
    Encode(String),
    #[error("decode: {0}")]
    Decode(String),
    #[error("not a snapshot file")]
    BadMagic,
    #[error("snapshot truncated")]
    Truncated,
    #[error("unsupported snapshot version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("inconsistent snapshot: {0}")]
    Inconsistent(String),
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Persisted form of one [`TimeLockPool`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolState {
    pub id: PoolId,
    pub name: String,
    pub deposit_asset: AssetId,
    pub reward_asset: AssetId,
    pub engine: MultiplierEngine,
    pub curve: Curve,
    pub curve_version: u64,
    pub positions: Vec<(AccountId, Vec<LockPosition>)>,
    pub points_per_share: U256,
    pub reward_accounts: Vec<(AccountId, RewardAccount)>,
    pub total_distributed: u128,
    pub total_claimed: u128,
    pub roles: Vec<(Role, AccountId)>,
    pub escrow: Option<EscrowLink>,
}

impl From<&TimeLockPool> for PoolState {
    fn from(pool: &TimeLockPool) -> Self {
        let rewards = pool.rewards();
        Self {
            id: pool.id(),
            name: pool.name().to_string(),
            deposit_asset: pool.deposit_asset(),
            reward_asset: pool.reward_asset(),
            engine: *pool.engine(),
            curve: (*pool.curve()).clone(),
            curve_version: pool.curve_store().version(),
            positions: pool.ledger().iter().map(|(a, p)| (*a, p.clone())).collect(),
            points_per_share: rewards.points_per_share(),
            reward_accounts: rewards.accounts().map(|(a, r)| (*a, *r)).collect(),
            total_distributed: rewards.total_distributed(),
            total_claimed: rewards.total_claimed(),
            roles: pool.roles().iter().copied().collect(),
            escrow: pool.escrow().copied(),
        }
    }
}

impl PoolState {
    /// Rebuild the pool, checking that the accumulator's share balances
    /// match the positions they were minted for.
    pub fn into_pool(self) -> Result<TimeLockPool, StorageError> {
        let engine = MultiplierEngine::new(
            self.engine.min_lock_duration(),
            self.engine.max_lock_duration(),
            self.engine.max_bonus(),
        )?;
        let ledger: DepositLedger = self.positions.into_iter().collect();
        let accounts: BTreeMap<AccountId, RewardAccount> = self.reward_accounts.into_iter().collect();

        for account in ledger.accounts() {
            let held = accounts.get(account).map(|r| r.shares).unwrap_or(0);
            let expected = ledger.total_shares_of(account);
            if held != expected {
                return Err(StorageError::Inconsistent(format!(
                    "{account} in {} holds {held} shares, positions back {expected}",
                    self.id
                )));
            }
        }
        if let Some((account, r)) = accounts
            .iter()
            .find(|(a, r)| r.shares > 0 && ledger.position_count(a) == 0)
        {
            return Err(StorageError::Inconsistent(format!(
                "{account} in {} holds {} shares without positions",
                self.id, r.shares
            )));
        }

        Ok(TimeLockPool::from_parts(PoolParts {
            id: self.id,
            name: self.name,
            deposit_asset: self.deposit_asset,
            reward_asset: self.reward_asset,
            engine,
            curve: CurveStore::with_version(self.curve, self.curve_version),
            ledger,
            rewards: DividendAccumulator::from_parts(
                self.points_per_share,
                accounts,
                self.total_distributed,
                self.total_claimed,
            ),
            roles: self.roles.into_iter().collect::<RoleTable>(),
            escrow: self.escrow,
        }))
    }
}

/// Every pool of a system at one instant, plus any legacy pools kept for
/// position lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub version: u32,
    pub taken_at: u64,
    pub pools: Vec<PoolState>,
    #[serde(default)]
    pub legacy: Vec<LegacyPool>,
}

impl PoolSnapshot {
    pub fn capture<L: AssetLedger + Clone, C: Clock>(system: &PoolSystem<L, C>) -> Self {
        Self::capture_with_legacy(system, Vec::new())
    }

    /// Capture `system` together with legacy pools kept for position
    /// lookups. The system itself never holds legacy pools.
    pub fn capture_with_legacy<L: AssetLedger + Clone, C: Clock>(
        system: &PoolSystem<L, C>,
        legacy: Vec<LegacyPool>,
    ) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            taken_at: system.now(),
            pools: system.pools().iter().map(PoolState::from).collect(),
            legacy,
        }
    }

    /// Rebuild a system around the given asset ledger and clock.
    ///
    /// Legacy pools are handed back alongside it, ready to be used as
    /// [`PositionSource`](crate::view::PositionSource)s.
    pub fn restore<L: AssetLedger + Clone, C: Clock>(
        self,
        assets: L,
        clock: C,
    ) -> Result<(PoolSystem<L, C>, Vec<LegacyPool>), StorageError> {
        let pools = self
            .pools
            .into_iter()
            .map(PoolState::into_pool)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((PoolSystem::with_pools(pools, assets, clock)?, self.legacy))
    }

    pub fn encode(&self) -> Result<Vec<u8>, StorageError> {
        let body = bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| StorageError::Encode(e.to_string()))?;
        let mut out = Vec::with_capacity(HEADER_LEN + body.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&body);
        Ok(out)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, StorageError> {
        if bytes.len() < HEADER_LEN {
            return Err(StorageError::Truncated);
        }
        let (header, body) = bytes.split_at(HEADER_LEN);
        if &header[..4] != MAGIC {
            return Err(StorageError::BadMagic);
        }
        let mut version = [0u8; 4];
        version.copy_from_slice(&header[4..]);
        let found = u32::from_le_bytes(version);
        if found != SNAPSHOT_VERSION {
            return Err(StorageError::UnsupportedVersion {
                found,
                expected: SNAPSHOT_VERSION,
            });
        }
        let (snapshot, _): (Self, usize) = bincode::serde::decode_from_slice(body, bincode::config::standard())
            .map_err(|e| StorageError::Decode(e.to_string()))?;
        Ok(snapshot)
    }

    /// Human-readable dump, for inspection only.
    pub fn to_json(&self) -> Result<String, StorageError> {
        serde_json::to_string_pretty(self).map_err(|e| StorageError::Encode(e.to_string()))
    }
}

/// A snapshot file on disk.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Write `snapshot`, replacing any previous one atomically.
    pub fn save(&self, snapshot: &PoolSnapshot) -> Result<(), StorageError> {
        let bytes = snapshot.encode()?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, &self.path)?;
        info!(path = %self.path.display(), pools = snapshot.pools.len(), bytes = bytes.len(), "snapshot saved");
        Ok(())
    }

    pub fn load(&self) -> Result<PoolSnapshot, StorageError> {
        let bytes = fs::read(&self.path)?;
        let snapshot = PoolSnapshot::decode(&bytes)?;
        debug!(path = %self.path.display(), pools = snapshot.pools.len(), "snapshot loaded");
        Ok(snapshot)
    }
}
