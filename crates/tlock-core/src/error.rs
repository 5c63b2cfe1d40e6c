//! Error types for the Tlock ledger.
use thiserror::Error;

use crate::types::{AccountId, AssetId, PoolId, Role};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CurveError {
    #[error("curve needs at least {min} points, got {len}")] ShortCurve { len: usize, min: usize },
    #[error("curve index {index} out of range for length {len}")] IndexOutOfRange { index: usize, len: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("insufficient {asset} balance of {account}: have {have}, need {need}")] InsufficientBalance { asset: AssetId, account: AccountId, have: u128, need: u128 },
    #[error("insufficient {asset} allowance from {owner} to {spender}: have {have}, need {need}")] InsufficientAllowance { asset: AssetId, owner: AccountId, spender: AccountId, have: u128, need: u128 },
    #[error("balance overflow")] Overflow,
    #[error("transfer rejected: {0}")] Rejected(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("amount must be positive")] ZeroAmount,
    #[error("duration must be positive")] ZeroDuration,
    #[error("position expired at {end}, now {now}")] DepositExpired { end: u64, now: u64 },
    #[error("position locked until {end}, now {now}")] TooSoon { end: u64, now: u64 },
    #[error("no shares outstanding")] ZeroShareSupply,
    #[error("{account} lacks role {role}")] NotAuthorized { role: Role, account: AccountId },
    #[error("position {index} not found (account has {len})")] PositionNotFound { index: usize, len: usize },
    #[error("shares are non-transferable")] NonTransferable,
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error("unknown pool: {0}")] UnknownPool(PoolId),
    #[error("invalid config: {0}")] InvalidConfig(String),
    #[error("batch call {index} failed: {source}")] BatchFailed { index: usize, source: Box<PoolError> },
    #[error(transparent)] Curve(#[from] CurveError),
    #[error(transparent)] Asset(#[from] AssetError),
}

impl PoolError {
    /// Whether this error means "curve would drop below two points".
    pub fn is_short_curve(&self) -> bool {
        matches!(self, PoolError::Curve(CurveError::ShortCurve { .. }))
    }
}
