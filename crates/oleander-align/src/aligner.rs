//! Dynamic time warping alignment with deterministic path reconstruction.

use rayon::prelude::*;
use tracing::instrument;

use crate::constraint::BandConstraint;
use crate::error::AlignError;
use crate::matrix::DistanceMatrix;
use crate::metric::DistanceMetric;
use crate::path::{WarpingPath, WarpingStep};
use crate::report::AlignmentReport;
use crate::series::{TimeSeries, TimeSeriesView};

/// Cooperative cancellation check, evaluated once per outer cost-matrix row.
///
/// Returning `true` aborts the alignment with [`AlignError::Cancelled`].
pub type CancelCheck<'a> = &'a (dyn Fn() -> bool + Sync);

/// A completed alignment: the optimal warping path and its total cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    /// The optimal warping path from `(0, 0)` to `(n-1, m-1)`.
    pub path: WarpingPath,
    /// Accumulated metric cost at the terminal cell of the cost matrix.
    pub distance: f64,
}

impl Alignment {
    /// Summarize this alignment as an [`AlignmentReport`].
    #[must_use]
    pub fn report(&self, len_reference: usize, len_target: usize) -> AlignmentReport {
        AlignmentReport::plain(
            self.distance,
            self.path.len(),
            self.path.compression_ratio(len_reference, len_target),
        )
    }
}

/// Immutable aligner configuration. Thread-safe and copyable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesAligner {
    constraint: BandConstraint,
    metric: DistanceMetric,
}

impl SeriesAligner {
    /// Create an unconstrained aligner with the squared-difference metric.
    #[must_use]
    pub fn unconstrained() -> Self {
        Self {
            constraint: BandConstraint::Unconstrained,
            metric: DistanceMetric::SquaredDifference,
        }
    }

    /// Create an aligner with a Sakoe-Chiba window constraint.
    #[must_use]
    pub fn with_window(window: usize) -> Self {
        Self {
            constraint: BandConstraint::Window(window),
            metric: DistanceMetric::SquaredDifference,
        }
    }

    /// Set the point distance metric.
    #[must_use]
    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Return the band constraint configuration.
    #[must_use]
    pub fn constraint(&self) -> BandConstraint {
        self.constraint
    }

    /// Return the point distance metric.
    #[must_use]
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Align two series, returning the optimal warping path and total cost.
    ///
    /// Runs in O(n·m) time and space unconstrained, O(n·w) time with a window.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`AlignError::UnreachablePath`] | Window narrower than the length difference |
    #[instrument(skip(self, reference, target), fields(n = reference.len(), m = target.len()))]
    pub fn align(
        &self,
        reference: TimeSeriesView<'_>,
        target: TimeSeriesView<'_>,
    ) -> Result<Alignment, AlignError> {
        let a = reference.as_slice();
        let b = target.as_slice();
        self.align_costed(a.len(), b.len(), |i, j| self.metric.point_cost(a[i], b[j]), None)
    }

    /// Align two series with a cooperative cancellation check.
    ///
    /// `cancel` is evaluated once per outer cost-matrix row; returning `true`
    /// aborts with [`AlignError::Cancelled`]. No locking is involved — the
    /// check is an ordinary closure supplied by the caller.
    ///
    /// # Errors
    ///
    /// As [`align`](Self::align), plus [`AlignError::Cancelled`].
    pub fn align_with_cancel(
        &self,
        reference: TimeSeriesView<'_>,
        target: TimeSeriesView<'_>,
        cancel: CancelCheck<'_>,
    ) -> Result<Alignment, AlignError> {
        let a = reference.as_slice();
        let b = target.as_slice();
        self.align_costed(
            a.len(),
            b.len(),
            |i, j| self.metric.point_cost(a[i], b[j]),
            Some(cancel),
        )
    }

    /// Align two sequences of feature rows using Euclidean point distance.
    ///
    /// Used by the noise-robust aligner, which matches derived feature vectors
    /// rather than raw samples. Rows must all have the same width.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`AlignError::EmptySeries`] | Either sequence is empty |
    /// | [`AlignError::UnreachablePath`] | Window narrower than the length difference |
    pub fn align_features(
        &self,
        reference: &[Vec<f64>],
        target: &[Vec<f64>],
    ) -> Result<Alignment, AlignError> {
        if reference.is_empty() || target.is_empty() {
            return Err(AlignError::EmptySeries);
        }
        self.align_costed(
            reference.len(),
            target.len(),
            |i, j| {
                reference[i]
                    .iter()
                    .zip(target[j].iter())
                    .map(|(x, y)| (x - y).powi(2))
                    .sum::<f64>()
                    .sqrt()
            },
            None,
        )
    }

    /// Compute pairwise alignment distances for a collection of series.
    ///
    /// Returns a symmetric [`DistanceMatrix`] over all unique pairs,
    /// parallelized with rayon. Every pair is an independent alignment call
    /// with no shared mutable state.
    ///
    /// # Errors
    ///
    /// Returns the first alignment error encountered (a banded aligner can
    /// fail on pairs whose lengths differ by more than the window).
    #[instrument(skip(self, series), fields(n = series.len()))]
    pub fn pairwise(&self, series: &[TimeSeries]) -> Result<DistanceMatrix, AlignError> {
        let n = series.len();
        // saturating_sub keeps the pair count at 0 for empty input.
        let total_pairs = n * n.saturating_sub(1) / 2;

        let views: Vec<TimeSeriesView<'_>> = series.iter().map(|s| s.as_view()).collect();

        let distances: Vec<f64> = (0..total_pairs)
            .into_par_iter()
            .map(|flat_idx| {
                // Map flat index back to (i, j) where i > j:
                // flat_idx = i*(i-1)/2 + j, so i = floor((1 + sqrt(1 + 8*flat_idx)) / 2)
                let i = ((1.0 + (1.0 + 8.0 * flat_idx as f64).sqrt()) / 2.0).floor() as usize;
                let j = flat_idx - i * (i - 1) / 2;
                self.align(views[i], views[j]).map(|al| al.distance)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DistanceMatrix::from_raw(n, distances))
    }

    /// Core dynamic program over an abstract cost function.
    ///
    /// Builds an (n+1)×(m+1) accumulated-cost matrix with `D[0][0] = 0` and
    /// all other border cells infinite, filling only cells inside the band.
    /// Backtracks from `(n, m)` choosing the minimum-cost predecessor with the
    /// fixed tie-break order **diagonal, insertion (row-1), deletion (col-1)**
    /// so that warping paths are reproducible across platforms.
    fn align_costed<F>(
        &self,
        n: usize,
        m: usize,
        cost_fn: F,
        cancel: Option<CancelCheck<'_>>,
    ) -> Result<Alignment, AlignError>
    where
        F: Fn(usize, usize) -> f64,
    {
        let width = m + 1;
        let mut cost = vec![f64::INFINITY; (n + 1) * width];
        cost[0] = 0.0;

        for i in 1..=n {
            if let Some(check) = cancel
                && check()
            {
                return Err(AlignError::Cancelled);
            }
            // Band is expressed on zero-based sample indices.
            for j in self.constraint.column_range(i - 1, m) {
                let j = j + 1;
                let local = cost_fn(i - 1, j - 1);
                let best = cost[(i - 1) * width + j]
                    .min(cost[i * width + j - 1])
                    .min(cost[(i - 1) * width + j - 1]);
                cost[i * width + j] = local + best;
            }
        }

        let total = cost[n * width + m];
        if !total.is_finite() {
            let window = match self.constraint {
                BandConstraint::Window(w) => w,
                BandConstraint::Unconstrained => unreachable!("unconstrained matrix is fully reachable"),
            };
            return Err(AlignError::UnreachablePath {
                window,
                len_reference: n,
                len_target: m,
            });
        }

        // Backtrack from (n, m) to (1, 1) in matrix coordinates; emitted steps
        // use zero-based sample indices.
        let mut steps = Vec::new();
        let mut i = n;
        let mut j = m;
        loop {
            steps.push(WarpingStep { reference: i - 1, target: j - 1 });
            if i == 1 && j == 1 {
                break;
            }
            if i == 1 {
                j -= 1;
                continue;
            }
            if j == 1 {
                i -= 1;
                continue;
            }
            let diagonal = cost[(i - 1) * width + j - 1];
            let insertion = cost[(i - 1) * width + j];
            let deletion = cost[i * width + j - 1];
            if diagonal <= insertion && diagonal <= deletion {
                i -= 1;
                j -= 1;
            } else if insertion <= deletion {
                i -= 1;
            } else {
                j -= 1;
            }
        }
        steps.reverse();

        Ok(Alignment {
            path: WarpingPath::new(steps),
            distance: total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(values: Vec<f64>) -> TimeSeries {
        TimeSeries::new(values).unwrap()
    }

    #[test]
    fn identical_series_distance_zero() {
        let aligner = SeriesAligner::unconstrained();
        let s = ts(vec![1.0, 2.0, 3.0]);
        let al = aligner.align(s.as_view(), s.as_view()).unwrap();
        assert!(al.distance.abs() < 1e-10);
        for step in al.path.steps() {
            assert_eq!(step.reference, step.target);
        }
    }

    #[test]
    fn hand_computed_2x2() {
        // a=[0,1], b=[1,0]
        // D[1][1] = (0-1)² = 1
        // D[1][2] = (0-0)² + D[1][1] = 1
        // D[2][1] = (1-1)² + D[1][1] = 1
        // D[2][2] = (1-0)² + min(1, 1, 1) = 2
        let aligner = SeriesAligner::unconstrained();
        let a = ts(vec![0.0, 1.0]);
        let b = ts(vec![1.0, 0.0]);
        let al = aligner.align(a.as_view(), b.as_view()).unwrap();
        assert!((al.distance - 2.0).abs() < 1e-10);
    }

    #[test]
    fn absolute_difference_metric() {
        let aligner = SeriesAligner::unconstrained().with_metric(DistanceMetric::AbsoluteDifference);
        let a = ts(vec![0.0, 0.0, 0.0]);
        let b = ts(vec![1.0, 1.0, 1.0]);
        let al = aligner.align(a.as_view(), b.as_view()).unwrap();
        // Diagonal path, each cell costs |0-1| = 1
        assert!((al.distance - 3.0).abs() < 1e-10);
    }

    #[test]
    fn zero_window_forces_diagonal() {
        let aligner = SeriesAligner::with_window(0);
        let a = ts(vec![1.0, 2.0, 3.0]);
        let b = ts(vec![1.0, 2.0, 3.0]);
        let al = aligner.align(a.as_view(), b.as_view()).unwrap();
        assert!(al.distance.abs() < 1e-10);
        let expected: Vec<WarpingStep> = (0..3)
            .map(|k| WarpingStep { reference: k, target: k })
            .collect();
        assert_eq!(al.path.steps(), expected.as_slice());
    }

    #[test]
    fn narrow_window_unreachable() {
        let aligner = SeriesAligner::with_window(0);
        let a = ts(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let b = ts(vec![1.0, 2.0]);
        let result = aligner.align(a.as_view(), b.as_view());
        assert!(matches!(
            result,
            Err(AlignError::UnreachablePath { window: 0, len_reference: 5, len_target: 2 })
        ));
    }

    #[test]
    fn banded_distance_geq_unconstrained() {
        let a = ts(vec![0.0, 1.0, 0.0, 1.0, 0.0]);
        let b = ts(vec![1.0, 0.0, 1.0, 0.0, 1.0]);
        let unconstrained = SeriesAligner::unconstrained()
            .align(a.as_view(), b.as_view())
            .unwrap();
        let banded = SeriesAligner::with_window(1)
            .align(a.as_view(), b.as_view())
            .unwrap();
        assert!(banded.distance >= unconstrained.distance - 1e-10);
    }

    #[test]
    fn warping_path_endpoints() {
        let aligner = SeriesAligner::unconstrained();
        let a = ts(vec![1.0, 2.0, 3.0, 4.0]);
        let b = ts(vec![1.0, 3.0, 4.0]);
        let al = aligner.align(a.as_view(), b.as_view()).unwrap();
        let steps = al.path.steps();
        assert_eq!(steps.first().unwrap(), &WarpingStep { reference: 0, target: 0 });
        assert_eq!(steps.last().unwrap(), &WarpingStep { reference: 3, target: 2 });
    }

    #[test]
    fn warping_path_monotonic_and_continuous() {
        let aligner = SeriesAligner::unconstrained();
        let a = ts(vec![1.0, 5.0, 2.0, 8.0, 3.0]);
        let b = ts(vec![2.0, 4.0, 7.0]);
        let al = aligner.align(a.as_view(), b.as_view()).unwrap();
        for pair in al.path.steps().windows(2) {
            let dr = pair[1].reference - pair[0].reference;
            let dt = pair[1].target - pair[0].target;
            assert!(dr <= 1, "reference step too large: {dr}");
            assert!(dt <= 1, "target step too large: {dt}");
            assert!(dr + dt >= 1, "no progress in step");
        }
    }

    #[test]
    fn single_element_series() {
        let aligner = SeriesAligner::unconstrained();
        let a = ts(vec![5.0]);
        let b = ts(vec![3.0]);
        let al = aligner.align(a.as_view(), b.as_view()).unwrap();
        assert!((al.distance - 4.0).abs() < 1e-10);
        assert_eq!(al.path.steps(), &[WarpingStep { reference: 0, target: 0 }]);
    }

    #[test]
    fn length_one_against_longer() {
        let aligner = SeriesAligner::unconstrained();
        let a = ts(vec![2.0]);
        let b = ts(vec![2.0, 2.0, 2.0]);
        let al = aligner.align(a.as_view(), b.as_view()).unwrap();
        assert!(al.distance.abs() < 1e-10);
        assert_eq!(al.path.len(), 3);
        assert!(al.path.steps().iter().all(|s| s.reference == 0));
    }

    #[test]
    fn cancellation_aborts() {
        let aligner = SeriesAligner::unconstrained();
        let a = ts(vec![1.0; 50]);
        let b = ts(vec![2.0; 50]);
        let cancel = || true;
        let result = aligner.align_with_cancel(a.as_view(), b.as_view(), &cancel);
        assert!(matches!(result, Err(AlignError::Cancelled)));
    }

    #[test]
    fn no_cancellation_matches_plain_align(){
        let aligner = SeriesAligner::unconstrained();
        let a = ts(vec![1.0, 3.0, 5.0, 2.0]);
        let b = ts(vec![2.0, 4.0, 1.0]);
        let cancel = || false;
        let plain = aligner.align(a.as_view(), b.as_view()).unwrap();
        let with_cancel = aligner
            .align_with_cancel(a.as_view(), b.as_view(), &cancel)
            .unwrap();
        assert_eq!(plain, with_cancel);
    }

    #[test]
    fn feature_alignment_euclidean() {
        let aligner = SeriesAligner::unconstrained();
        let a = vec![vec![0.0, 0.0], vec![1.0, 1.0]];
        let b = vec![vec![0.0, 0.0], vec![1.0, 1.0]];
        let al = aligner.align_features(&a, &b).unwrap();
        assert!(al.distance.abs() < 1e-10);
        assert_eq!(al.path.len(), 2);
    }

    #[test]
    fn feature_alignment_rejects_empty() {
        let aligner = SeriesAligner::unconstrained();
        let a: Vec<Vec<f64>> = vec![];
        let b = vec![vec![1.0]];
        assert!(matches!(
            aligner.align_features(&a, &b),
            Err(AlignError::EmptySeries)
        ));
    }

    #[test]
    fn pairwise_matches_individual() {
        let a = ts(vec![1.0, 2.0, 3.0]);
        let b = ts(vec![4.0, 5.0, 6.0]);
        let c = ts(vec![1.0, 3.0, 2.0]);
        let aligner = SeriesAligner::unconstrained();

        let matrix = aligner.pairwise(&[a.clone(), b.clone(), c.clone()]).unwrap();
        assert_eq!(matrix.len(), 3);

        let d_ab = aligner.align(a.as_view(), b.as_view()).unwrap().distance;
        let d_ac = aligner.align(a.as_view(), c.as_view()).unwrap().distance;
        let d_bc = aligner.align(b.as_view(), c.as_view()).unwrap().distance;

        assert!((matrix.get(1, 0) - d_ab).abs() < 1e-10);
        assert!((matrix.get(2, 0) - d_ac).abs() < 1e-10);
        assert!((matrix.get(2, 1) - d_bc).abs() < 1e-10);
    }

    #[test]
    fn pairwise_symmetry_zero_diagonal() {
        let series: Vec<TimeSeries> = vec![
            ts(vec![1.0, 2.0, 3.0]),
            ts(vec![3.0, 2.0, 1.0]),
            ts(vec![1.0, 1.0, 1.0]),
            ts(vec![0.0, 5.0, 0.0]),
        ];
        let aligner = SeriesAligner::unconstrained();
        let matrix = aligner.pairwise(&series).unwrap();

        for i in 0..4 {
            for j in 0..4 {
                assert!(
                    (matrix.get(i, j) - matrix.get(j, i)).abs() < 1e-10,
                    "asymmetry at ({i}, {j})"
                );
            }
            assert!(matrix.get(i, i).abs() < 1e-10);
        }
    }

    #[test]
    fn pairwise_degenerate_inputs() {
        let aligner = SeriesAligner::unconstrained();

        let empty = aligner.pairwise(&[]).unwrap();
        assert!(empty.is_empty());

        let single = aligner.pairwise(&[ts(vec![1.0, 2.0])]).unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single.get(0, 0), 0.0);
    }

    #[test]
    fn pairwise_banded_error_on_length_mismatch() {
        let series = vec![ts(vec![1.0, 2.0, 3.0, 4.0, 5.0]), ts(vec![1.0])];
        let aligner = SeriesAligner::with_window(1);
        assert!(matches!(
            aligner.pairwise(&series),
            Err(AlignError::UnreachablePath { .. })
        ));
    }

    #[test]
    fn report_fields() {
        let aligner = SeriesAligner::unconstrained();
        let a = ts(vec![1.0, 2.0, 3.0]);
        let al = aligner.align(a.as_view(), a.as_view()).unwrap();
        let report = al.report(3, 3);
        assert_eq!(report.path_len, 3);
        assert!((report.compression_ratio - 0.5).abs() < 1e-12);
        assert_eq!(report.outliers_reference, 0);
        assert!((report.quality - 1.0).abs() < 1e-12);
    }
}
