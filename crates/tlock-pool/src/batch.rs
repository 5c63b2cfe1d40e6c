//! Commands that can be submitted alone or as an ordered batch.

use serde::{Deserialize, Serialize};
use tlock_core::types::{AccountId, LockPosition, PoolId};
use tlock_curve::CurveEdit;

use crate::rewards::ShareDelta;

/// One pool command issued by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolCommand {
    Deposit {
        amount: u128,
        duration: u64,
        receiver: AccountId,
    },
    Withdraw {
        index: usize,
        receiver: AccountId,
    },
    ExtendLock {
        index: usize,
        additional: u64,
    },
    ExtendLockEnd {
        index: usize,
        additional: u64,
    },
    IncreaseLock {
        index: usize,
        owner: AccountId,
        amount: u128,
    },
    DistributeRewards {
        amount: u128,
    },
    ClaimRewards {
        receiver: AccountId,
    },
    SetCurve {
        points: Vec<u128>,
    },
    SetCurvePoint {
        value: u128,
        index: usize,
    },
}

impl PoolCommand {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            PoolCommand::Deposit { .. } => "deposit",
            PoolCommand::Withdraw { .. } => "withdraw",
            PoolCommand::ExtendLock { .. } => "extend_lock",
            PoolCommand::ExtendLockEnd { .. } => "extend_lock_end",
            PoolCommand::IncreaseLock { .. } => "increase_lock",
            PoolCommand::DistributeRewards { .. } => "distribute_rewards",
            PoolCommand::ClaimRewards { .. } => "claim_rewards",
            PoolCommand::SetCurve { .. } => "set_curve",
            PoolCommand::SetCurvePoint { .. } => "set_curve_point",
        }
    }
}

/// Result of a claim, split into its direct and escrowed parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClaimReceipt {
    pub amount: u128,
    pub direct: u128,
    pub escrowed: u128,
    /// Escrow pool and index of the position created there, if any.
    pub escrow_position: Option<(PoolId, usize)>,
}

/// What a successful [`PoolCommand`] returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandOutcome {
    Deposited { index: usize },
    Withdrawn(LockPosition),
    Extended(ShareDelta),
    Increased { shares: u128 },
    Distributed,
    Claimed(ClaimReceipt),
    CurveReplaced,
    CurvePointSet(CurveEdit),
}
