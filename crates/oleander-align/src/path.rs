//! Warping path types for alignment output.

/// A single step in a warping path, matching index `reference` in the first
/// series to index `target` in the second series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarpingStep {
    /// Index in the reference series.
    pub reference: usize,
    /// Index in the target series.
    pub target: usize,
}

/// An ordered sequence of warping steps from `(0, 0)` to `(n-1, m-1)`.
///
/// Both indices are non-decreasing step to step and every step advances at
/// least one index by exactly one. Paths are produced by the aligner with a
/// deterministic tie-break (diagonal, then insertion, then deletion), so the
/// same inputs yield the same path on every platform.
#[derive(Debug, Clone, PartialEq)]
pub struct WarpingPath(Vec<WarpingStep>);

impl WarpingPath {
    /// Create a new warping path from a vector of steps.
    pub(crate) fn new(steps: Vec<WarpingStep>) -> Self {
        Self(steps)
    }

    /// Return the warping steps as a slice.
    #[must_use]
    pub fn steps(&self) -> &[WarpingStep] {
        &self.0
    }

    /// Return the number of steps in the path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return true if the path contains no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Return the ratio of path length to the summed series lengths.
    ///
    /// A perfectly diagonal alignment of equal-length series gives 0.5; heavy
    /// warping pushes the ratio toward 1.
    #[must_use]
    pub fn compression_ratio(&self, len_reference: usize, len_target: usize) -> f64 {
        self.0.len() as f64 / (len_reference + len_target) as f64
    }
}

impl<'a> IntoIterator for &'a WarpingPath {
    type Item = &'a WarpingStep;
    type IntoIter = std::slice::Iter<'a, WarpingStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compression_ratio_diagonal() {
        let path = WarpingPath::new(vec![
            WarpingStep { reference: 0, target: 0 },
            WarpingStep { reference: 1, target: 1 },
            WarpingStep { reference: 2, target: 2 },
        ]);
        assert!((path.compression_ratio(3, 3) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn iterate_steps() {
        let path = WarpingPath::new(vec![
            WarpingStep { reference: 0, target: 0 },
            WarpingStep { reference: 1, target: 0 },
        ]);
        let collected: Vec<_> = path.into_iter().copied().collect();
        assert_eq!(collected.len(), 2);
        assert_eq!(collected[1], WarpingStep { reference: 1, target: 0 });
    }
}
