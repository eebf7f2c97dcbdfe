//! Alignment summary statistics.

/// Summary of a completed alignment.
///
/// Produced by both aligners. The outlier counts and quality score are only
/// meaningful for the noise-robust variant; the plain aligner reports zero
/// outliers and a quality of 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentReport {
    /// Total accumulated cost at the terminal cell of the cost matrix.
    pub total_distance: f64,
    /// Number of steps in the warping path.
    pub path_len: usize,
    /// `path_len / (n + m)` — 0.5 for a perfect diagonal, approaching 1 under
    /// heavy warping.
    pub compression_ratio: f64,
    /// Samples replaced as outliers in the reference series.
    pub outliers_reference: usize,
    /// Samples replaced as outliers in the target series.
    pub outliers_target: usize,
    /// Pearson correlation of the aligned raw values, floored at 0.
    pub quality: f64,
}

impl AlignmentReport {
    /// Build a report for a plain (non-robust) alignment.
    pub(crate) fn plain(total_distance: f64, path_len: usize, compression_ratio: f64) -> Self {
        Self {
            total_distance,
            path_len,
            compression_ratio,
            outliers_reference: 0,
            outliers_target: 0,
            quality: 1.0,
        }
    }
}
