//! # tlock-core
//! Foundation types, fixed-point math and traits for the Tlock staking ledger.

pub mod asset;
pub mod clock;
pub mod constants;
pub mod error;
pub mod math;
pub mod traits;
pub mod types;

pub use asset::MemoryAssetLedger;
pub use clock::{ManualClock, SystemClock};
pub use error::{AssetError, CurveError, PoolError};
pub use traits::{AssetLedger, Clock};
pub use types::{AccountId, AssetId, LegacyLockPosition, LockPosition, PoolId, Role};
