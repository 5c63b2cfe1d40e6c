//! Read-only aggregation of an account's positions across pools.
//!
//! Sources may use the current position schema or the legacy one without
//! per-position shares; both are returned in a single call.

use serde::{Deserialize, Serialize};
use tlock_core::types::{AccountId, LegacyLockPosition, LockPosition, PoolId};

use crate::pool::TimeLockPool;

/// Positions of one account in one source, in whichever schema it uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionList {
    Current(Vec<LockPosition>),
    Legacy(Vec<LegacyLockPosition>),
}

/// Anything that can enumerate an account's positions.
pub trait PositionSource {
    fn source_id(&self) -> PoolId;
    fn positions_of(&self, account: &AccountId) -> PositionList;
}

impl PositionSource for TimeLockPool {
    fn source_id(&self) -> PoolId {
        self.id()
    }

    fn positions_of(&self, account: &AccountId) -> PositionList {
        PositionList::Current(self.deposits_of(account).to_vec())
    }
}

/// Positions of a pool that predates per-position share tracking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyPool {
    pub id: PoolId,
    pub name: String,
    pub positions: Vec<(AccountId, Vec<LegacyLockPosition>)>,
}

impl PositionSource for LegacyPool {
    fn source_id(&self) -> PoolId {
        self.id
    }

    fn positions_of(&self, account: &AccountId) -> PositionList {
        let list = self
            .positions
            .iter()
            .find(|(a, _)| a == account)
            .map(|(_, p)| p.clone())
            .unwrap_or_default();
        PositionList::Legacy(list)
    }
}

/// Unified position row. `share_amount` is `None` for legacy sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionView {
    pub amount: u128,
    pub start: u64,
    pub end: u64,
    pub share_amount: Option<u128>,
}

impl From<&LockPosition> for PositionView {
    fn from(p: &LockPosition) -> Self {
        Self {
            amount: p.amount,
            start: p.start,
            end: p.end,
            share_amount: Some(p.share_amount),
        }
    }
}

impl From<&LegacyLockPosition> for PositionView {
    fn from(p: &LegacyLockPosition) -> Self {
        Self {
            amount: p.amount,
            start: p.start,
            end: p.end,
            share_amount: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolPositions {
    pub pool: PoolId,
    pub legacy: bool,
    pub positions: Vec<PositionView>,
}

/// Every position of `account` in every source, in source order.
pub fn fetch_positions(account: &AccountId, sources: &[&dyn PositionSource]) -> Vec<PoolPositions> {
    sources
        .iter()
        .map(|source| match source.positions_of(account) {
            PositionList::Current(list) => PoolPositions {
                pool: source.source_id(),
                legacy: false,
                positions: list.iter().map(PositionView::from).collect(),
            },
            PositionList::Legacy(list) => PoolPositions {
                pool: source.source_id(),
                legacy: true,
                positions: list.iter().map(PositionView::from).collect(),
            },
        })
        .collect()
}
