//! Pool event log.
//!
//! Events are appended as operations commit and drained by the host with
//! `take_events`. An operation that fails or is rolled back leaves none.

use serde::{Deserialize, Serialize};
use tlock_core::types::{AccountId, Role};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolEvent {
    Deposited {
        amount: u128,
        duration: u64,
        receiver: AccountId,
        from: AccountId,
    },
    Withdrawn {
        index: usize,
        owner: AccountId,
        receiver: AccountId,
        amount: u128,
    },
    LockExtended {
        index: usize,
        owner: AccountId,
        additional: u64,
        new_duration: u64,
    },
    LockIncreased {
        index: usize,
        owner: AccountId,
        payer: AccountId,
        amount: u128,
    },
    RewardsDistributed {
        from: AccountId,
        amount: u128,
    },
    RewardsClaimed {
        owner: AccountId,
        receiver: AccountId,
        escrowed: u128,
        direct: u128,
    },
    CurveChanged {
        by: AccountId,
        version: u64,
    },
    /// Share mint (`from` is zero) or burn (`to` is zero).
    SharesTransferred {
        from: AccountId,
        to: AccountId,
        amount: u128,
    },
    RoleGranted {
        role: Role,
        account: AccountId,
        by: AccountId,
    },
    RoleRevoked {
        role: Role,
        account: AccountId,
        by: AccountId,
    },
}

impl PoolEvent {
    pub fn mint(to: AccountId, amount: u128) -> Self {
        PoolEvent::SharesTransferred {
            from: AccountId::ZERO,
            to,
            amount,
        }
    }

    pub fn burn(from: AccountId, amount: u128) -> Self {
        PoolEvent::SharesTransferred {
            from,
            to: AccountId::ZERO,
            amount,
        }
    }
}
