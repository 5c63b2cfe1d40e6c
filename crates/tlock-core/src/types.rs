//! Core ledger types: accounts, assets, pools, lock positions.
//!
//! Amounts and shares are `u128` base units. Timestamps and durations are
//! `u64` seconds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-byte account identifier.
///
/// Pools own an account of their own (the custody address that holds
/// deposited principal and undistributed rewards).
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    /// The zero account. Never owns positions; used as "nobody".
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create an AccountId from a byte array.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive a deterministic account from a human-readable label.
    ///
    /// BLAKE3 of the label bytes. Used by the CLI and tests to address
    /// accounts by name.
    pub fn from_label(label: &str) -> Self {
        Self(*blake3::hash(label.as_bytes()).as_bytes())
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check if this is the zero account.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form is enough to tell accounts apart in logs.
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

impl From<[u8; 32]> for AccountId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// Identifier of a fungible asset tracked by an [`AssetLedger`](crate::traits::AssetLedger).
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
    bincode::Encode, bincode::Decode,
)]
pub struct AssetId(pub u32);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset#{}", self.0)
    }
}

/// Index of a pool inside a pool system.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct PoolId(pub u32);

impl PoolId {
    /// Custody account of the pool.
    ///
    /// Derived from the pool index so it is stable across restarts.
    pub fn custody_account(&self) -> AccountId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"tlock/pool/");
        hasher.update(&self.0.to_le_bytes());
        AccountId(*hasher.finalize().as_bytes())
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool#{}", self.0)
    }
}

/// A single timed deposit of principal plus its derived share weight.
///
/// Invariants: `start <= end <= start + max_lock_duration`, and
/// `share_amount == amount * multiplier(end - start)` sampled when the
/// duration was last fixed (deposit, extend) or topped up (increase).
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct LockPosition {
    /// Principal in deposit-asset base units.
    pub amount: u128,
    /// Unix timestamp the current lock started.
    pub start: u64,
    /// Unix timestamp the lock ends. Withdrawal is allowed from here on.
    pub end: u64,
    /// Shares minted for this position.
    pub share_amount: u128,
}

impl LockPosition {
    /// Locked duration in seconds.
    pub fn duration(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Whether the lock has ended at `now`.
    pub fn is_unlocked(&self, now: u64) -> bool {
        now >= self.end
    }

    /// Seconds left until `end`, zero once unlocked.
    pub fn remaining(&self, now: u64) -> u64 {
        self.end.saturating_sub(now)
    }
}

/// Position schema of pools that predate per-position share tracking.
///
/// Still produced by old pool instances and accepted by the aggregation view.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct LegacyLockPosition {
    pub amount: u128,
    pub start: u64,
    pub end: u64,
}

impl From<LockPosition> for LegacyLockPosition {
    fn from(p: LockPosition) -> Self {
        Self {
            amount: p.amount,
            start: p.start,
            end: p.end,
        }
    }
}

/// Privileged roles of a pool.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
    bincode::Encode, bincode::Decode,
)]
pub enum Role {
    /// Grants and revokes roles.
    Admin,
    /// Replaces and edits the multiplier curve.
    CurveAuthority,
    /// Funds the dividend accumulator.
    RewardDistributor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Admin => "admin",
            Role::CurveAuthority => "curve-authority",
            Role::RewardDistributor => "reward-distributor",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_from_label_is_deterministic() {
        assert_eq!(AccountId::from_label("alice"), AccountId::from_label("alice"));
        assert_ne!(AccountId::from_label("alice"), AccountId::from_label("bob"));
        assert!(!AccountId::from_label("alice").is_zero());
    }

    #[test]
    fn account_display_is_short_hex() {
        let a = AccountId([0xAB; 32]);
        assert_eq!(a.to_string(), "abababababababab");
    }

    #[test]
    fn custody_accounts_differ_per_pool() {
        assert_ne!(PoolId(0).custody_account(), PoolId(1).custody_account());
        assert_eq!(PoolId(7).custody_account(), PoolId(7).custody_account());
    }

    #[test]
    fn position_duration_and_remaining() {
        let p = LockPosition {
            amount: 10,
            start: 100,
            end: 700,
            share_amount: 10,
        };
        assert_eq!(p.duration(), 600);
        assert_eq!(p.remaining(400), 300);
        assert_eq!(p.remaining(900), 0);
        assert!(!p.is_unlocked(699));
        assert!(p.is_unlocked(700));
    }

    #[test]
    fn legacy_position_drops_shares() {
        let p = LockPosition {
            amount: 5,
            start: 1,
            end: 2,
            share_amount: 9,
        };
        let legacy = LegacyLockPosition::from(p);
        assert_eq!(legacy.amount, 5);
        assert_eq!(legacy.end, 2);
    }

    #[test]
    fn role_display() {
        assert_eq!(Role::CurveAuthority.to_string(), "curve-authority");
    }
}
