//! Escrow forwarding of claimed rewards.

use serde::{Deserialize, Serialize};
use tlock_core::constants::WAD;
use tlock_core::error::PoolError;
use tlock_core::math::wad_mul;
use tlock_core::types::PoolId;

/// Link from a pool to the pool that receives the escrowed part of its
/// claims.
///
/// The escrow pool's deposit asset must be this pool's reward asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowLink {
    pub pool: PoolId,
    /// WAD-scaled fraction in `[0, 1]`.
    pub portion: u128,
    /// Lock length of every escrow deposit.
    pub duration: u64,
}

impl EscrowLink {
    pub fn new(pool: PoolId, portion: u128, duration: u64) -> Result<Self, PoolError> {
        if portion > WAD {
            return Err(PoolError::InvalidConfig(format!(
                "escrow portion {portion} above 1.0"
            )));
        }
        Ok(Self {
            pool,
            portion,
            duration,
        })
    }

    /// Split a claim into `(escrowed, direct)`.
    ///
    /// The escrowed part truncates; the remainder is paid directly, so the
    /// two always add up to `amount`.
    pub fn split(&self, amount: u128) -> Result<(u128, u128), PoolError> {
        let escrowed = wad_mul(amount, self.portion).ok_or(PoolError::ArithmeticOverflow)?;
        Ok((escrowed, amount - escrowed))
    }
}
