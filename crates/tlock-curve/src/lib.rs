//! # tlock-curve
//! Multiplier curve store and engine.
//!
//! All calculations use integer arithmetic only for determinism.
//!
//! - **Curve store**: an ordered sequence of at least two WAD-scaled bonus
//!   samples spanning `[0, max_lock_duration]` at equal intervals. Replaced
//!   wholesale or edited one point at a time; every mutation bumps a version.
//! - **Multiplier engine**: maps a lock duration onto the curve by linear
//!   interpolation between neighbouring samples, caps the bonus at
//!   `max_bonus` and adds the 1.0 principal weight.

pub mod curve;
pub mod engine;

pub use curve::{Curve, CurveEdit, CurveStore};
pub use engine::MultiplierEngine;
