//! Noise-robust alignment: outlier suppression, smoothing, and feature-space
//! matching with projection back onto the raw samples.

use tracing::{debug, instrument};

use crate::aligner::SeriesAligner;
use crate::constraint::BandConstraint;
use crate::error::AlignError;
use crate::path::{WarpingPath, WarpingStep};
use crate::report::AlignmentReport;
use crate::series::TimeSeriesView;

/// Configuration for the noise-robust aligner.
///
/// Construct via [`RobustConfig::new`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobustConfig {
    pub(crate) window_size: usize,
    pub(crate) outlier_z_threshold: f64,
    pub(crate) smoothing_factor: f64,
}

impl RobustConfig {
    /// Create a new robust aligner configuration.
    ///
    /// `window_size` drives outlier replacement and feature extraction;
    /// `outlier_z_threshold` is the |z| above which a sample is treated as an
    /// outlier; `smoothing_factor` of 0 disables smoothing, larger values
    /// widen the moving-average window.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`AlignError::InvalidRobustParameter`] | `window_size` is 0, `outlier_z_threshold <= 0`, or `smoothing_factor < 0` |
    pub fn new(
        window_size: usize,
        outlier_z_threshold: f64,
        smoothing_factor: f64,
    ) -> Result<Self, AlignError> {
        if window_size == 0 {
            return Err(AlignError::InvalidRobustParameter {
                parameter: "window_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(outlier_z_threshold > 0.0) {
            return Err(AlignError::InvalidRobustParameter {
                parameter: "outlier_z_threshold",
                reason: format!("must be positive, got {outlier_z_threshold}"),
            });
        }
        if !(smoothing_factor >= 0.0) {
            return Err(AlignError::InvalidRobustParameter {
                parameter: "smoothing_factor",
                reason: format!("must be non-negative, got {smoothing_factor}"),
            });
        }
        Ok(Self { window_size, outlier_z_threshold, smoothing_factor })
    }
}

/// A completed noise-robust alignment: the warping path over the raw samples
/// and the summary report (outlier counts, quality score).
#[derive(Debug, Clone, PartialEq)]
pub struct RobustAlignment {
    /// Warping path expressed in raw (pre-cleaning) sample indices.
    pub path: WarpingPath,
    /// Alignment summary including outlier counts and quality in [0, 1].
    pub report: AlignmentReport,
}

/// Aligner that suppresses outliers and smooths both series, matches derived
/// feature vectors, and projects the resulting path back onto the raw values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseRobustAligner {
    config: RobustConfig,
    constraint: BandConstraint,
}

impl NoiseRobustAligner {
    /// Create an unconstrained noise-robust aligner.
    #[must_use]
    pub fn new(config: RobustConfig) -> Self {
        Self { config, constraint: BandConstraint::Unconstrained }
    }

    /// Set the band constraint applied during feature-space matching.
    #[must_use]
    pub fn with_constraint(mut self, constraint: BandConstraint) -> Self {
        self.constraint = constraint;
        self
    }

    /// Align two series robustly.
    ///
    /// Pipeline: z-score outlier suppression with windowed median replacement,
    /// optional moving-average smoothing, feature extraction (moving average,
    /// trend, zero-crossing density), feature-space DTW with Euclidean point
    /// distance, and projection of the path back onto the raw samples. The
    /// quality score is the Pearson correlation of the aligned values after
    /// outlier suppression, floored at 0 — a suppressed spike must not drag
    /// the score down for an otherwise good path.
    ///
    /// Series shorter than 3 samples skip the feature pipeline and are aligned
    /// directly on raw values.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`AlignError::UnreachablePath`] | Constraint too narrow for the feature lengths |
    #[instrument(skip(self, reference, target), fields(n = reference.len(), m = target.len()))]
    pub fn align(
        &self,
        reference: TimeSeriesView<'_>,
        target: TimeSeriesView<'_>,
    ) -> Result<RobustAlignment, AlignError> {
        let raw_ref = reference.as_slice();
        let raw_tgt = target.as_slice();
        let n = raw_ref.len();
        let m = raw_tgt.len();

        // The trend feature needs at least two moving-average points.
        if n < 3 || m < 3 {
            let aligner = SeriesAligner::unconstrained();
            let alignment = aligner.align(reference, target)?;
            let quality = aligned_correlation(raw_ref, raw_tgt, alignment.path.steps());
            let mut report = alignment.report(n, m);
            report.quality = quality;
            return Ok(RobustAlignment { path: alignment.path, report });
        }

        let (clean_ref, outliers_reference) =
            suppress_outliers(raw_ref, self.config.outlier_z_threshold, self.config.window_size);
        let (clean_tgt, outliers_target) =
            suppress_outliers(raw_tgt, self.config.outlier_z_threshold, self.config.window_size);
        debug!(outliers_reference, outliers_target, "outlier suppression complete");

        let smooth_ref = smooth(&clean_ref, self.config.smoothing_factor);
        let smooth_tgt = smooth(&clean_tgt, self.config.smoothing_factor);

        let features_ref = extract_features(&smooth_ref, self.config.window_size);
        let features_tgt = extract_features(&smooth_tgt, self.config.window_size);

        let aligner = match self.constraint {
            BandConstraint::Unconstrained => SeriesAligner::unconstrained(),
            BandConstraint::Window(w) => SeriesAligner::with_window(w),
        };
        let feature_alignment = aligner.align_features(&features_ref, &features_tgt)?;

        // Feature index i corresponds to raw index i (features are one shorter
        // than the raw series), so the projected path only needs the terminal
        // raw pair appended to end at (n-1, m-1).
        let mut steps: Vec<WarpingStep> = feature_alignment.path.steps().to_vec();
        steps.push(WarpingStep { reference: n - 1, target: m - 1 });
        let path = WarpingPath::new(steps);

        let quality = aligned_correlation(&clean_ref, &clean_tgt, path.steps());

        let report = AlignmentReport {
            total_distance: feature_alignment.distance,
            path_len: path.len(),
            compression_ratio: path.compression_ratio(n, m),
            outliers_reference,
            outliers_target,
            quality,
        };

        Ok(RobustAlignment { path, report })
    }
}

/// Per-sample z-scores. All zeros for a constant series.
fn z_scores(data: &[f64]) -> Vec<f64> {
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    let variance = data.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();
    if std == 0.0 {
        return vec![0.0; data.len()];
    }
    data.iter().map(|&x| (x - mean) / std).collect()
}

/// Replace samples with |z| above `threshold` by the median of non-outlier
/// values in a centered window of width `window_size`. Returns the cleaned
/// series and the number of replacements.
fn suppress_outliers(data: &[f64], threshold: f64, window_size: usize) -> (Vec<f64>, usize) {
    let z = z_scores(data);
    let is_outlier: Vec<bool> = z.iter().map(|&v| v.abs() > threshold).collect();

    let half = (window_size / 2).max(1);
    let mut cleaned = data.to_vec();
    let mut replaced = 0;

    for i in 0..data.len() {
        if !is_outlier[i] {
            continue;
        }
        let start = i.saturating_sub(half);
        let end = (i + half + 1).min(data.len());
        let mut neighbors: Vec<f64> = (start..end)
            .filter(|&k| !is_outlier[k])
            .map(|k| data[k])
            .collect();
        if neighbors.is_empty() {
            // Every neighbor is an outlier too; leave the sample in place.
            continue;
        }
        neighbors.sort_by(f64::total_cmp);
        let mid = neighbors.len() / 2;
        let median = if neighbors.len() % 2 == 1 {
            neighbors[mid]
        } else {
            (neighbors[mid - 1] + neighbors[mid]) / 2.0
        };
        cleaned[i] = median;
        replaced += 1;
    }

    (cleaned, replaced)
}

/// Centered moving-average smoother. A factor of 0 returns the input
/// unchanged; otherwise the window length scales with the factor, clamped to
/// an odd value of at least 3.
fn smooth(data: &[f64], smoothing_factor: f64) -> Vec<f64> {
    if smoothing_factor <= 0.0 {
        return data.to_vec();
    }
    let mut window = (smoothing_factor.round() as usize).max(3);
    if window % 2 == 0 {
        window += 1;
    }
    moving_average(data, window)
}

/// Centered moving average with edge windows truncated to the available samples.
fn moving_average(data: &[f64], window: usize) -> Vec<f64> {
    let half = window / 2;
    (0..data.len())
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(data.len());
            data[start..end].iter().sum::<f64>() / (end - start) as f64
        })
        .collect()
}

/// Zero-crossing density of the mean-centered series in a centered window.
fn zero_crossing_density(data: &[f64], window: usize) -> Vec<f64> {
    let mean = data.iter().sum::<f64>() / data.len() as f64;
    let centered: Vec<f64> = data.iter().map(|&x| x - mean).collect();
    let half = (window / 2).max(1);
    (0..data.len())
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(data.len());
            if end - start < 2 {
                return 0.0;
            }
            let crossings = centered[start..end]
                .windows(2)
                .filter(|pair| pair[0] * pair[1] < 0.0)
                .count();
            crossings as f64 / (end - start - 1) as f64
        })
        .collect()
}

/// Stack moving average, trend, and zero-crossing density into per-position
/// feature rows, trimmed to a common length of `len - 1`.
fn extract_features(data: &[f64], window_size: usize) -> Vec<Vec<f64>> {
    let ma = moving_average(data, window_size.max(2));
    let trend: Vec<f64> = ma.windows(2).map(|pair| pair[1] - pair[0]).collect();
    let zcd = zero_crossing_density(data, window_size);

    let len = trend.len(); // shortest of the three
    (0..len)
        .map(|i| vec![ma[i], trend[i], zcd[i]])
        .collect()
}

/// Pearson correlation of the two series sampled along the path, floored at
/// 0. Degenerate (zero-variance) inputs score 0.
fn aligned_correlation(ref_values: &[f64], tgt_values: &[f64], steps: &[WarpingStep]) -> f64 {
    let xs: Vec<f64> = steps.iter().map(|s| ref_values[s.reference]).collect();
    let ys: Vec<f64> = steps.iter().map(|s| tgt_values[s.target]).collect();
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys.iter()) {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
        var_y += (y - mean_y).powi(2);
    }

    let denom = (var_x * var_y).sqrt();
    if denom == 0.0 {
        return 0.0;
    }
    (cov / denom).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::TimeSeries;

    fn ts(values: Vec<f64>) -> TimeSeries {
        TimeSeries::new(values).unwrap()
    }

    fn config() -> RobustConfig {
        RobustConfig::new(5, 2.5, 0.0).unwrap()
    }

    #[test]
    fn config_rejects_zero_window() {
        assert!(matches!(
            RobustConfig::new(0, 2.5, 0.0),
            Err(AlignError::InvalidRobustParameter { parameter: "window_size", .. })
        ));
    }

    #[test]
    fn config_rejects_non_positive_z() {
        assert!(matches!(
            RobustConfig::new(5, 0.0, 0.0),
            Err(AlignError::InvalidRobustParameter { parameter: "outlier_z_threshold", .. })
        ));
    }

    #[test]
    fn config_rejects_negative_smoothing() {
        assert!(matches!(
            RobustConfig::new(5, 2.5, -1.0),
            Err(AlignError::InvalidRobustParameter { parameter: "smoothing_factor", .. })
        ));
    }

    #[test]
    fn identical_clean_series_high_quality() {
        let aligner = NoiseRobustAligner::new(config());
        let s = ts(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 5.0, 4.0, 3.0, 2.0]);
        let result = aligner.align(s.as_view(), s.as_view()).unwrap();
        assert_eq!(result.report.outliers_reference, 0);
        assert_eq!(result.report.outliers_target, 0);
        assert!(result.report.quality > 0.99, "quality was {}", result.report.quality);
    }

    #[test]
    fn path_endpoints_are_raw_indices() {
        let aligner = NoiseRobustAligner::new(config());
        let a = ts(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        let b = ts(vec![1.0, 3.0, 5.0, 7.0, 8.0]);
        let result = aligner.align(a.as_view(), b.as_view()).unwrap();
        let steps = result.path.steps();
        assert_eq!(steps.first().unwrap(), &WarpingStep { reference: 0, target: 0 });
        assert_eq!(steps.last().unwrap(), &WarpingStep { reference: 7, target: 4 });
    }

    #[test]
    fn detects_single_spike() {
        let mut values = vec![1.0, 1.1, 0.9, 1.0, 1.05, 0.95, 1.0, 1.1, 0.9, 1.0];
        values[4] = 50.0;
        let spiked = ts(values);
        let clean = ts(vec![1.0, 1.1, 0.9, 1.0, 1.05, 0.95, 1.0, 1.1, 0.9, 1.0]);

        let aligner = NoiseRobustAligner::new(config());
        let result = aligner.align(spiked.as_view(), clean.as_view()).unwrap();
        assert_eq!(result.report.outliers_reference, 1);
        assert_eq!(result.report.outliers_target, 0);
    }

    #[test]
    fn suppressed_spikes_do_not_collapse_quality() {
        let clean: Vec<f64> = (0..40).map(|i| (i as f64 * 0.3).sin()).collect();
        let mut spiked = clean.clone();
        spiked[10] = 25.0;
        spiked[30] = -20.0;

        let aligner = NoiseRobustAligner::new(RobustConfig::new(5, 3.0, 2.0).unwrap());
        let result = aligner
            .align(ts(spiked).as_view(), ts(clean).as_view())
            .unwrap();
        assert_eq!(result.report.outliers_reference, 2);
        assert!(
            result.report.quality > 0.9,
            "quality was {}",
            result.report.quality
        );
    }

    #[test]
    fn short_series_falls_back_to_raw_alignment() {
        let aligner = NoiseRobustAligner::new(config());
        let a = ts(vec![1.0, 2.0]);
        let b = ts(vec![1.0, 2.0]);
        let result = aligner.align(a.as_view(), b.as_view()).unwrap();
        assert_eq!(result.path.len(), 2);
        assert!(result.report.total_distance.abs() < 1e-10);
    }

    #[test]
    fn quality_in_unit_interval() {
        let aligner = NoiseRobustAligner::new(RobustConfig::new(3, 2.0, 2.0).unwrap());
        let a = ts(vec![0.0, 1.0, 0.0, -1.0, 0.0, 1.0, 0.0, -1.0]);
        let b = ts(vec![1.0, 0.0, -1.0, 0.0, 1.0, 0.0, -1.0, 0.0]);
        let result = aligner.align(a.as_view(), b.as_view()).unwrap();
        assert!(result.report.quality >= 0.0);
        assert!(result.report.quality <= 1.0);
    }

    #[test]
    fn suppress_outliers_uses_window_median() {
        let data = [1.0, 1.0, 100.0, 1.0, 1.0];
        let (cleaned, replaced) = suppress_outliers(&data, 1.5, 5);
        assert_eq!(replaced, 1);
        assert!((cleaned[2] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn suppress_outliers_constant_series_untouched() {
        let data = [3.0; 6];
        let (cleaned, replaced) = suppress_outliers(&data, 2.0, 3);
        assert_eq!(replaced, 0);
        assert_eq!(cleaned, data.to_vec());
    }

    #[test]
    fn smooth_zero_factor_is_identity() {
        let data = [1.0, 5.0, 2.0, 8.0];
        assert_eq!(smooth(&data, 0.0), data.to_vec());
    }

    #[test]
    fn smooth_reduces_variance() {
        let data = [0.0, 10.0, 0.0, 10.0, 0.0, 10.0, 0.0, 10.0];
        let smoothed = smooth(&data, 3.0);
        let var = |xs: &[f64]| {
            let mean = xs.iter().sum::<f64>() / xs.len() as f64;
            xs.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / xs.len() as f64
        };
        assert!(var(&smoothed) < var(&data));
    }

    #[test]
    fn moving_average_constant_preserved() {
        let data = [2.0; 5];
        let ma = moving_average(&data, 3);
        for &v in &ma {
            assert!((v - 2.0).abs() < 1e-10);
        }
    }

    #[test]
    fn zero_crossing_density_flat_is_zero() {
        let data = [5.0, 5.0, 5.0, 5.0];
        let zcd = zero_crossing_density(&data, 3);
        assert!(zcd.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn zero_crossing_density_alternating_is_high() {
        let data = [1.0, -1.0, 1.0, -1.0, 1.0, -1.0];
        let zcd = zero_crossing_density(&data, 5);
        assert!(zcd[2] > 0.5, "density was {}", zcd[2]);
    }

    #[test]
    fn extract_features_length_and_width() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        let features = extract_features(&data, 3);
        assert_eq!(features.len(), 4);
        assert!(features.iter().all(|row| row.len() == 3));
    }

    #[test]
    fn correlation_perfect_positive() {
        let steps: Vec<WarpingStep> = (0..4)
            .map(|k| WarpingStep { reference: k, target: k })
            .collect();
        let xs = [1.0, 2.0, 3.0, 4.0];
        let q = aligned_correlation(&xs, &xs, &steps);
        assert!((q - 1.0).abs() < 1e-10);
    }

    #[test]
    fn correlation_negative_floored_at_zero() {
        let steps: Vec<WarpingStep> = (0..4)
            .map(|k| WarpingStep { reference: k, target: k })
            .collect();
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [4.0, 3.0, 2.0, 1.0];
        assert_eq!(aligned_correlation(&xs, &ys, &steps), 0.0);
    }
}
