//! Protocol constants. All fixed-point values are WAD-scaled (1.0 = 10^18).

/// Fixed-point unit: `1.0` in curve samples, multipliers, bonuses and portions.
///
/// # Examples
///
/// ```
/// use tlock_core::constants::WAD;
/// assert_eq!(WAD, 1_000_000_000_000_000_000);
/// ```
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Scale of the points-per-share accumulator (`2^128`).
///
/// Accumulated points are stored as 256-bit values, so dividing by this
/// constant is taking the high 128-bit word.
pub const POINTS_MULTIPLIER_LOG2: u32 = 128;

/// Minimum lock applied to every deposit (10 minutes).
///
/// A zero-duration deposit is floored to this value so shares cannot be
/// minted and burned within a single ordering slot.
pub const MIN_LOCK_DURATION: u64 = 600;

pub const SECONDS_PER_DAY: u64 = 86_400;
pub const SECONDS_PER_YEAR: u64 = 365 * SECONDS_PER_DAY;

/// Default maximum lock for a freshly configured pool (4 years).
pub const DEFAULT_MAX_LOCK_DURATION: u64 = 4 * SECONDS_PER_YEAR;

/// Minimum number of samples in a multiplier curve.
pub const MIN_CURVE_LEN: usize = 2;

/// Version tag of the persisted pool snapshot schema.
///
/// Bumped only when the meaning of a persisted field changes. Older
/// versions must keep decoding to the same values.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Default log filter for binaries.
pub const DEFAULT_LOG_LEVEL: &str = "info";
