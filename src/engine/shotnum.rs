//! Shot number selection and normalization.
//!
//! Every form of selection normalizes to a sorted, duplicate-free array of
//! strictly positive `u32` shot numbers.

use std::collections::BTreeSet;
use std::ops::{Range, RangeFrom, RangeFull};

use crate::error::{ExtractError, ExtractResult};
use crate::types::{ColumnValues, TypeClass};

/// A start/stop/step range with Python slice semantics.
///
/// Negative `start`/`stop` count back from the bound, which is one past the
/// largest shot number recorded by the candidate streams (or `stop`, when larger).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShotRange {
    /// First value, inclusive.
    pub start: Option<i64>,
    /// End value, exclusive.
    pub stop: Option<i64>,
    /// Stride, 1 when absent.
    pub step: Option<i64>,
}

impl ShotRange {
    /// Range from its three slice components.
    pub fn new(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Self {
        Self { start, stop, step }
    }

    /// Every recorded shot number.
    pub fn all() -> Self {
        Self::default()
    }

    /// Resolve against `bound` the way a Python slice resolves against a length.
    fn indices(&self, bound: i64) -> ExtractResult<(i64, i64, i64)> {
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Err(ExtractError::InvalidSelection(
                "range step cannot be zero".to_string(),
            ));
        }
        let (lower, upper) = if step < 0 { (-1, bound - 1) } else { (0, bound) };
        let clamp = |value: Option<i64>, default: i64| match value {
            None => default,
            Some(v) if v < 0 => (v + bound).max(lower),
            Some(v) => v.min(upper),
        };
        let start = clamp(self.start, if step < 0 { upper } else { lower });
        let stop = clamp(self.stop, if step < 0 { lower } else { upper });
        Ok((start, stop, step))
    }
}

/// A pre-built integer array, possibly carrying unit axes.
#[derive(Debug, Clone, PartialEq)]
pub struct ShotArray {
    /// Array shape; every axis but one must have extent 1.
    pub shape: Vec<usize>,
    /// Row-major values.
    pub values: ColumnValues,
}

impl ShotArray {
    /// Array of `values` with the given `shape`.
    pub fn new(shape: Vec<usize>, values: ColumnValues) -> Self {
        Self { shape, values }
    }
}

/// The caller's shot number selection.
///
/// Lists, ranges and arrays silently drop values that are zero or negative,
/// while a single shot number must be positive. Any form holding a value
/// beyond `u32::MAX` is rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum ShotSelection {
    /// One shot number.
    Single(i64),
    /// Arbitrary shot numbers in any order.
    List(Vec<i64>),
    /// Slice-style range over the recorded shot numbers.
    Range(ShotRange),
    /// Integer array with unit axes.
    Array(ShotArray),
}

impl ShotSelection {
    /// Normalize into a sorted, duplicate-free array of positive shot numbers.
    ///
    /// `recorded_max` yields the largest shot number recorded by the candidate
    /// streams; it is only consulted for range selections.
    pub fn normalize<F>(&self, recorded_max: F) -> ExtractResult<Vec<u32>>
    where
        F: FnOnce() -> ExtractResult<u32>,
    {
        match self {
            ShotSelection::Single(sn) => {
                if *sn <= 0 {
                    return Err(ExtractError::InvalidSelection(format!(
                        "shot number must be positive, got {}",
                        sn
                    )));
                }
                let sn = u32::try_from(*sn).map_err(|_| {
                    ExtractError::InvalidSelection(format!("shot number {} exceeds u32", sn))
                })?;
                Ok(vec![sn])
            }
            ShotSelection::List(values) => positive_sorted(values.iter().copied()),
            ShotSelection::Range(range) => {
                let recorded_bound = i64::from(recorded_max()?) + 1;
                let bound = match range.stop {
                    Some(stop) => recorded_bound.max(stop),
                    None => recorded_bound,
                };
                if bound > i64::from(u32::MAX) + 1 {
                    return Err(ExtractError::InvalidSelection(format!(
                        "range stop {} exceeds u32",
                        bound
                    )));
                }
                let (start, stop, step) = range.indices(bound)?;
                let values = std::iter::successors(Some(start), |v| Some(v + step))
                    .take_while(|v| if step > 0 { *v < stop } else { *v > stop });
                positive_sorted(values)
            }
            ShotSelection::Array(array) => {
                let extents: Vec<usize> =
                    array.shape.iter().copied().filter(|&d| d != 1).collect();
                if extents.len() > 1 {
                    return Err(ExtractError::InvalidSelection(format!(
                        "shot number array must be one-dimensional, got shape {:?}",
                        array.shape
                    )));
                }
                let expected: usize = array.shape.iter().product();
                if expected != array.values.len() {
                    return Err(ExtractError::InvalidSelection(format!(
                        "shape {:?} does not match {} values",
                        array.shape,
                        array.values.len()
                    )));
                }
                if !matches!(array.values.class(), TypeClass::Signed | TypeClass::Unsigned) {
                    return Err(ExtractError::InvalidSelection(format!(
                        "shot number array must be integer-typed, got {:?}",
                        array.values.class()
                    )));
                }
                let values = array.values.to_i64_vec().unwrap_or_default();
                positive_sorted(values)
            }
        }
    }
}

/// Non-positive values are dropped; values beyond `u32::MAX` are an error.
fn positive_sorted<I: IntoIterator<Item = i64>>(values: I) -> ExtractResult<Vec<u32>> {
    let mut set = BTreeSet::new();
    for v in values.into_iter().filter(|&v| v > 0) {
        let sn = u32::try_from(v).map_err(|_| {
            ExtractError::InvalidSelection(format!("shot number {} exceeds u32", v))
        })?;
        set.insert(sn);
    }
    if set.is_empty() {
        return Err(ExtractError::EmptySelection);
    }
    Ok(set.into_iter().collect())
}

impl From<i64> for ShotSelection {
    fn from(sn: i64) -> Self {
        ShotSelection::Single(sn)
    }
}

impl From<u32> for ShotSelection {
    fn from(sn: u32) -> Self {
        ShotSelection::Single(i64::from(sn))
    }
}

impl From<Vec<i64>> for ShotSelection {
    fn from(values: Vec<i64>) -> Self {
        ShotSelection::List(values)
    }
}

impl From<&[i64]> for ShotSelection {
    fn from(values: &[i64]) -> Self {
        ShotSelection::List(values.to_vec())
    }
}

impl From<Range<i64>> for ShotSelection {
    fn from(range: Range<i64>) -> Self {
        ShotSelection::Range(ShotRange::new(Some(range.start), Some(range.end), None))
    }
}

impl From<RangeFrom<i64>> for ShotSelection {
    fn from(range: RangeFrom<i64>) -> Self {
        ShotSelection::Range(ShotRange::new(Some(range.start), None, None))
    }
}

impl From<RangeFull> for ShotSelection {
    fn from(_: RangeFull) -> Self {
        ShotSelection::Range(ShotRange::all())
    }
}

impl From<ShotRange> for ShotSelection {
    fn from(range: ShotRange) -> Self {
        ShotSelection::Range(range)
    }
}

impl From<ShotArray> for ShotSelection {
    fn from(array: ShotArray) -> Self {
        ShotSelection::Array(array)
    }
}
