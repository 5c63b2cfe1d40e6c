//! Multiplier engine: lock duration to share multiplier.
//!
//! The curve is read as a piecewise-linear function over
//! `[0, max_lock_duration]` with `len - 1` equal segments. All arithmetic is
//! integer-only; interpolation uses a 256-bit intermediate and truncates.

use serde::{Deserialize, Serialize};
use tlock_core::constants::{DEFAULT_MAX_LOCK_DURATION, MIN_LOCK_DURATION, WAD};
use tlock_core::error::PoolError;
use tlock_core::math::{mul_div, wad_mul};

use crate::curve::Curve;

/// Duration bounds and bonus cap of one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiplierEngine {
    min_lock_duration: u64,
    max_lock_duration: u64,
    max_bonus: u128,
}

impl MultiplierEngine {
    /// # Errors
    ///
    /// [`PoolError::InvalidConfig`] if `max_lock_duration < min_lock_duration`.
    pub fn new(
        min_lock_duration: u64,
        max_lock_duration: u64,
        max_bonus: u128,
    ) -> Result<Self, PoolError> {
        if max_lock_duration < min_lock_duration {
            return Err(PoolError::InvalidConfig(format!(
                "max lock duration {max_lock_duration}s is below min lock duration {min_lock_duration}s"
            )));
        }
        Ok(Self {
            min_lock_duration,
            max_lock_duration,
            max_bonus,
        })
    }

    pub fn min_lock_duration(&self) -> u64 {
        self.min_lock_duration
    }

    pub fn max_lock_duration(&self) -> u64 {
        self.max_lock_duration
    }

    pub fn max_bonus(&self) -> u128 {
        self.max_bonus
    }

    /// Clamp to `[min_lock_duration, max_lock_duration]`.
    ///
    /// Zero is floored to the minimum lock like any other short duration.
    pub fn clamp_duration(&self, duration: u64) -> u64 {
        duration.min(self.max_lock_duration).max(self.min_lock_duration)
    }

    /// Bonus (without the base 1.0) for `duration`, capped at `max_bonus`.
    pub fn bonus(&self, duration: u64, curve: &Curve) -> u128 {
        let duration = self.clamp_duration(duration);
        let last = curve.last_index();
        let unit = self.max_lock_duration / last as u64;

        let raw = if unit == 0 {
            curve.points()[last]
        } else {
            let n = ((duration / unit) as usize).min(last);
            if n == last {
                curve.points()[last]
            } else {
                let lo = curve.points()[n];
                let hi = curve.points()[n + 1];
                let offset = duration - n as u64 * unit;
                interpolate(lo, hi, offset as u128, unit as u128)
            }
        };
        raw.min(self.max_bonus)
    }

    /// Share multiplier for `duration`: `1.0 + bonus`, WAD-scaled.
    ///
    /// Pure in `(curve, duration)`; never below `WAD`, never above
    /// `WAD + max_bonus`.
    pub fn get_multiplier(&self, duration: u64, curve: &Curve) -> u128 {
        self.bonus(duration, curve).saturating_add(WAD)
    }

    /// Shares minted for `amount` locked for `duration`.
    pub fn shares_for(&self, amount: u128, duration: u64, curve: &Curve) -> Result<u128, PoolError> {
        wad_mul(amount, self.get_multiplier(duration, curve)).ok_or(PoolError::ArithmeticOverflow)
    }
}

impl Default for MultiplierEngine {
    /// 10 minute floor, 4 year ceiling, uncapped bonus.
    fn default() -> Self {
        Self {
            min_lock_duration: MIN_LOCK_DURATION,
            max_lock_duration: DEFAULT_MAX_LOCK_DURATION,
            max_bonus: u128::MAX - WAD,
        }
    }
}

/// Linear interpolation from `lo` to `hi` at `offset / unit`.
///
/// Handles falling segments. `offset < unit`, so the step is strictly below
/// `|hi - lo|` and the fallback is never taken.
fn interpolate(lo: u128, hi: u128, offset: u128, unit: u128) -> u128 {
    if hi >= lo {
        let diff = hi - lo;
        lo + mul_div(diff, offset, unit).unwrap_or(diff)
    } else {
        let diff = lo - hi;
        lo - mul_div(diff, offset, unit).unwrap_or(diff)
    }
}
