//! Multiplier curve samples and the store that owns them.
//!
//! A curve is an ordered sequence of WAD-scaled bonus samples. Sample `i`
//! is the bonus at duration `i * unit`, where
//! `unit = max_lock_duration / (len - 1)`. The store is the single owner of
//! the current curve; readers take an `Arc` snapshot and never observe a
//! half-applied edit.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tlock_core::constants::{MIN_CURVE_LEN, WAD};
use tlock_core::error::CurveError;
use tracing::debug;

/// Validated curve: always at least [`MIN_CURVE_LEN`] samples.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(try_from = "Vec<u128>", into = "Vec<u128>")]
pub struct Curve(Vec<u128>);

impl Curve {
    /// Build a curve from raw WAD samples.
    ///
    /// # Errors
    ///
    /// [`CurveError::ShortCurve`] if fewer than two samples are given.
    pub fn new(points: Vec<u128>) -> Result<Self, CurveError> {
        if points.len() < MIN_CURVE_LEN {
            return Err(CurveError::ShortCurve {
                len: points.len(),
                min: MIN_CURVE_LEN,
            });
        }
        Ok(Self(points))
    }

    /// Two identical samples: the same bonus at every duration.
    pub fn flat(bonus: u128) -> Self {
        Self(vec![bonus; MIN_CURVE_LEN])
    }

    /// Flat curve with no bonus; shares equal principal.
    pub fn no_bonus() -> Self {
        Self::flat(0)
    }

    pub fn sample_count(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, index: usize) -> Option<u128> {
        self.0.get(index).copied()
    }

    pub fn points(&self) -> &[u128] {
        &self.0
    }

    /// Index of the final sample.
    pub fn last_index(&self) -> usize {
        self.0.len() - 1
    }

    /// Largest sample, the highest bonus the curve can ask for before capping.
    pub fn peak(&self) -> u128 {
        self.0.iter().copied().max().unwrap_or(0)
    }
}

impl TryFrom<Vec<u128>> for Curve {
    type Error = CurveError;

    fn try_from(points: Vec<u128>) -> Result<Self, Self::Error> {
        Curve::new(points)
    }
}

impl From<Curve> for Vec<u128> {
    fn from(curve: Curve) -> Self {
        curve.0
    }
}

/// What a [`CurveStore::set_point`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurveEdit {
    /// An existing sample was overwritten.
    Updated,
    /// `index == len`: the curve grew by one.
    Appended,
    /// `index == len - 1`: the last sample was dropped.
    Removed,
}

/// Owner of the current curve.
///
/// Mutations replace the shared `Arc`, so snapshots taken before a change
/// keep reading the old curve. `version` starts at 0 and increments on
/// every successful mutation.
#[derive(Clone, Debug)]
pub struct CurveStore {
    current: Arc<Curve>,
    version: u64,
}

impl CurveStore {
    pub fn new(curve: Curve) -> Self {
        Self {
            current: Arc::new(curve),
            version: 0,
        }
    }

    /// Restore a store at a known version (used when loading snapshots).
    pub fn with_version(curve: Curve, version: u64) -> Self {
        Self {
            current: Arc::new(curve),
            version,
        }
    }

    /// Immutable view of the current curve.
    pub fn snapshot(&self) -> Arc<Curve> {
        Arc::clone(&self.current)
    }

    pub fn curve(&self) -> &Curve {
        &self.current
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn sample_count(&self) -> usize {
        self.current.sample_count()
    }

    /// Sample at `index`, `None` past the end.
    pub fn get(&self, index: usize) -> Option<u128> {
        self.current.get(index)
    }

    /// Swap in a whole new curve.
    ///
    /// Open positions keep their shares until their next mutation, which
    /// resamples against whatever curve is current at that time.
    pub fn replace(&mut self, points: Vec<u128>) -> Result<(), CurveError> {
        let curve = Curve::new(points)?;
        debug!(len = curve.sample_count(), version = self.version + 1, "curve: replaced");
        self.current = Arc::new(curve);
        self.version += 1;
        Ok(())
    }

    /// Edit a single sample, with position-dependent meaning:
    ///
    /// - `index < len - 1`: overwrite the sample;
    /// - `index == len`: append `value`;
    /// - `index == len - 1`: drop the last sample (`value` is ignored),
    ///   only while more than two samples remain.
    ///
    /// # Errors
    ///
    /// - [`CurveError::ShortCurve`] if removal would leave fewer than two samples
    /// - [`CurveError::IndexOutOfRange`] if `index > len`
    pub fn set_point(&mut self, value: u128, index: usize) -> Result<CurveEdit, CurveError> {
        let len = self.current.sample_count();
        let edit = if index == len {
            CurveEdit::Appended
        } else if index == len - 1 {
            if len <= MIN_CURVE_LEN {
                return Err(CurveError::ShortCurve {
                    len: len - 1,
                    min: MIN_CURVE_LEN,
                });
            }
            CurveEdit::Removed
        } else if index < len {
            CurveEdit::Updated
        } else {
            return Err(CurveError::IndexOutOfRange { index, len });
        };

        let points = &mut Arc::make_mut(&mut self.current).0;
        match edit {
            CurveEdit::Appended => points.push(value),
            CurveEdit::Removed => {
                points.pop();
            }
            CurveEdit::Updated => points[index] = value,
        }
        self.version += 1;
        debug!(index, value, ?edit, len = points.len(), "curve: point edited");
        Ok(edit)
    }
}

impl Default for CurveStore {
    /// Flat curve granting a 1.0 bonus everywhere.
    fn default() -> Self {
        Self::new(Curve::flat(WAD))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wad(x: u128) -> u128 {
        x * WAD
    }

    fn five_point() -> CurveStore {
        CurveStore::new(Curve::new(vec![0, wad(1), wad(2), wad(3), wad(5)]).unwrap())
    }

    #[test]
    fn curve_rejects_short_input() {
        assert_eq!(
            Curve::new(vec![wad(1)]),
            Err(CurveError::ShortCurve { len: 1, min: 2 })
        );
        assert!(Curve::new(vec![]).is_err());
        assert!(Curve::new(vec![0, 0]).is_ok());
    }

    #[test]
    fn replace_swaps_whole_curve_and_bumps_version() {
        let mut store = five_point();
        store.replace(vec![wad(1), wad(1)]).unwrap();
        assert_eq!(store.sample_count(), 2);
        assert_eq!(store.get(0), Some(wad(1)));
        assert_eq!(store.version(), 1);
    }

    #[test]
    fn replace_with_short_curve_fails_without_change() {
        let mut store = five_point();
        let err = store.replace(vec![wad(9)]).unwrap_err();
        assert_eq!(err, CurveError::ShortCurve { len: 1, min: 2 });
        assert_eq!(store.sample_count(), 5);
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn set_point_overwrites_interior() {
        let mut store = five_point();
        assert_eq!(store.set_point(wad(7), 1).unwrap(), CurveEdit::Updated);
        assert_eq!(store.get(1), Some(wad(7)));
        assert_eq!(store.sample_count(), 5);
    }

    #[test]
    fn set_point_at_len_appends() {
        let mut store = five_point();
        assert_eq!(store.set_point(wad(8), 5).unwrap(), CurveEdit::Appended);
        assert_eq!(store.sample_count(), 6);
        assert_eq!(store.get(5), Some(wad(8)));
    }

    #[test]
    fn set_point_at_last_index_removes() {
        let mut store = five_point();
        assert_eq!(store.set_point(wad(123), 4).unwrap(), CurveEdit::Removed);
        assert_eq!(store.sample_count(), 4);
        assert_eq!(store.get(3), Some(wad(3)));
        assert_eq!(store.get(4), None);
    }

    #[test]
    fn set_point_cannot_shrink_below_two() {
        let mut store = CurveStore::new(Curve::flat(wad(1)));
        let err = store.set_point(0, 1).unwrap_err();
        assert!(matches!(err, CurveError::ShortCurve { .. }));
        assert_eq!(store.sample_count(), 2);
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn set_point_past_len_is_out_of_range() {
        let mut store = five_point();
        assert_eq!(
            store.set_point(0, 9),
            Err(CurveError::IndexOutOfRange { index: 9, len: 5 })
        );
    }

    #[test]
    fn snapshot_is_isolated_from_later_edits() {
        let mut store = five_point();
        let before = store.snapshot();
        store.set_point(wad(42), 0).unwrap();
        assert_eq!(before.get(0), Some(0));
        assert_eq!(store.get(0), Some(wad(42)));
    }

    #[test]
    fn serde_rejects_short_curve() {
        let ok: Curve = serde_json::from_str("[0, 1]").unwrap();
        assert_eq!(ok.sample_count(), 2);
        assert!(serde_json::from_str::<Curve>("[1]").is_err());
    }

    #[test]
    fn peak_is_largest_sample() {
        let curve = Curve::new(vec![wad(3), wad(1), wad(2)]).unwrap();
        assert_eq!(curve.peak(), wad(3));
        assert_eq!(curve.last_index(), 2);
    }
}
