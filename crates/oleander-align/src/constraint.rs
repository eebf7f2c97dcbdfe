//! Warping window constraints for the cost matrix.

use std::ops::Range;

/// Constraint on how far the warping path may deviate from the diagonal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BandConstraint {
    /// No constraint — full cost matrix is computed.
    #[default]
    Unconstrained,

    /// Sakoe-Chiba band: cell (i,j) is valid only if |i - j| <= window.
    ///
    /// A window narrower than `|n - m|` leaves the terminal cell unreachable;
    /// the aligner reports that as
    /// [`AlignError::UnreachablePath`](crate::AlignError::UnreachablePath).
    Window(usize),
}

impl BandConstraint {
    /// Return the valid column range for a given row in the cost matrix.
    ///
    /// For unconstrained alignment, returns `0..n_cols`.
    /// For a window `w`, returns the intersection of `[row - w, row + w]` with `[0, n_cols)`.
    #[must_use]
    pub fn column_range(&self, row: usize, n_cols: usize) -> Range<usize> {
        match self {
            Self::Unconstrained => 0..n_cols,
            Self::Window(w) => {
                let start = row.saturating_sub(*w);
                let end = (row + w + 1).min(n_cols);
                start..end
            }
        }
    }

    /// Return true if cell `(row, col)` lies inside the band.
    #[must_use]
    pub fn contains(&self, row: usize, col: usize) -> bool {
        match self {
            Self::Unconstrained => true,
            Self::Window(w) => row.abs_diff(col) <= *w,
        }
    }
}
