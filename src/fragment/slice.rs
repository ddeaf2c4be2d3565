//! Slice index normalization
//!
//! Reproduces Python slice semantics as a documented function: nullable
//! `start`/`stop`, negative indices counted from the end, positive or
//! negative `step`. The normalization mirrors CPython's
//! `PySlice_AdjustIndices` so `slice(None, None, -1)` reverses, out-of-range
//! bounds clamp instead of failing, and an empty range yields no indices.

use super::{FragmentError, FragmentResult};

/// Normalized, clamped bounds for one slice request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceBounds {
    start: i64,
    stop: i64,
    step: i64,
}

impl SliceBounds {
    /// Normalize raw slice arguments against a sequence of `len` records.
    ///
    /// `None` bounds default to the full sequence in the direction of `step`.
    /// Negative bounds are first shifted by `len`, then clamped to the valid
    /// range for the step direction.
    ///
    /// # Errors
    /// Returns [`FragmentError::ZeroStep`] when `step == 0`.
    pub fn normalize(
        start: Option<i64>,
        stop: Option<i64>,
        step: i64,
        len: usize,
    ) -> FragmentResult<Self> {
        if step == 0 {
            return Err(FragmentError::ZeroStep);
        }

        let len = len as i64;
        // Iteration runs from `lower` up to `upper` for a positive step and
        // from `upper` down past `lower` for a negative one.
        let (lower, upper) = if step > 0 { (0, len) } else { (-1, len - 1) };

        let start = match start {
            None => {
                if step > 0 {
                    lower
                } else {
                    upper
                }
            }
            Some(start) => clamp_bound(start, len, lower, upper),
        };

        let stop = match stop {
            None => {
                if step > 0 {
                    upper
                } else {
                    lower
                }
            }
            Some(stop) => clamp_bound(stop, len, lower, upper),
        };

        Ok(Self { start, stop, step })
    }

    /// Global record indices selected by the slice, in iteration order.
    /// For a negative step the indices descend.
    pub fn indices(&self) -> impl Iterator<Item = usize> {
        let Self { start, stop, step } = *self;
        std::iter::successors(Some(start), move |&i| Some(i + step))
            .take_while(move |&i| if step > 0 { i < stop } else { i > stop })
            .map(|i| i as usize)
    }

    /// Number of records the slice selects.
    pub fn len(&self) -> usize {
        let span = if self.step > 0 {
            self.stop - self.start
        } else {
            self.start - self.stop
        };
        if span <= 0 {
            0
        } else {
            ((span - 1) / self.step.abs() + 1) as usize
        }
    }

    /// Whether the slice selects no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn clamp_bound(bound: i64, len: i64, lower: i64, upper: i64) -> i64 {
    if bound < 0 {
        (bound + len).max(lower)
    } else {
        bound.min(upper)
    }
}
