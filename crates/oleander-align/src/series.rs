//! Time series types with validation guarantees.

use std::ops::Index;

use crate::error::AlignError;

/// Owned, validated series of sample values. Guaranteed non-empty with all
/// finite values.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries(Vec<f64>);

impl TimeSeries {
    /// Create a new time series, validating that it is non-empty and all values are finite.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`AlignError::EmptySeries`] | `values` is empty |
    /// | [`AlignError::NonFiniteValue`] | Any value is NaN or infinite |
    pub fn new(values: Vec<f64>) -> Result<Self, AlignError> {
        if values.is_empty() {
            return Err(AlignError::EmptySeries);
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(AlignError::NonFiniteValue { index });
        }
        Ok(Self(values))
    }

    /// Borrow this series as a zero-copy view.
    #[must_use]
    pub fn as_view(&self) -> TimeSeriesView<'_> {
        TimeSeriesView::new_unchecked(&self.0)
    }

    /// Return the number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return true if the series has no samples.
    ///
    /// A [`TimeSeries`] constructed via [`TimeSeries::new`] is always non-empty,
    /// so this always returns `false` for valid instances. Provided to satisfy
    /// the `len_without_is_empty` convention.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume and return the inner vector.
    #[must_use]
    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl AsRef<[f64]> for TimeSeries {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

impl TryFrom<Vec<f64>> for TimeSeries {
    type Error = AlignError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

/// Borrowed, validated view into a time series. Zero-copy reference.
#[derive(Debug, Clone, Copy)]
pub struct TimeSeriesView<'a>(&'a [f64]);

impl<'a> TimeSeriesView<'a> {
    /// Create a new view, validating that the slice is non-empty and all values are finite.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`AlignError::EmptySeries`] | `slice` is empty |
    /// | [`AlignError::NonFiniteValue`] | Any value is NaN or infinite |
    pub fn new(slice: &'a [f64]) -> Result<Self, AlignError> {
        if slice.is_empty() {
            return Err(AlignError::EmptySeries);
        }
        if let Some(index) = slice.iter().position(|v| !v.is_finite()) {
            return Err(AlignError::NonFiniteValue { index });
        }
        Ok(Self(slice))
    }

    /// Create a view without validation. For internal use where data is already validated.
    pub(crate) fn new_unchecked(slice: &'a [f64]) -> Self {
        Self(slice)
    }

    /// Return the underlying slice.
    #[must_use]
    pub fn as_slice(&self) -> &'a [f64] {
        self.0
    }

    /// Return the number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return true if the view has no samples.
    ///
    /// A [`TimeSeriesView`] constructed via [`TimeSeriesView::new`] is always
    /// non-empty, so this always returns `false` for valid instances.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Index<usize> for TimeSeriesView<'_> {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl AsRef<[f64]> for TimeSeriesView<'_> {
    fn as_ref(&self) -> &[f64] {
        self.0
    }
}

/// A time series paired with explicit sample timestamps.
///
/// Timestamps are unit-agnostic floats (the CLI documents hours) and must be
/// strictly increasing. Sensors recording at different rates produce
/// `SampledSeries` of different lengths; the aligner itself operates on the
/// value sequences and leaves timestamp interpretation to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledSeries {
    timestamps: Vec<f64>,
    values: TimeSeries,
}

impl SampledSeries {
    /// Create a new sampled series, validating shape and timestamp ordering.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`AlignError::EmptySeries`] | `values` is empty |
    /// | [`AlignError::NonFiniteValue`] | Any value or timestamp is NaN or infinite |
    /// | [`AlignError::TimestampLengthMismatch`] | Array lengths differ |
    /// | [`AlignError::NonMonotonicTimestamps`] | Timestamps not strictly increasing |
    pub fn new(timestamps: Vec<f64>, values: Vec<f64>) -> Result<Self, AlignError> {
        if timestamps.len() != values.len() {
            return Err(AlignError::TimestampLengthMismatch {
                timestamps: timestamps.len(),
                values: values.len(),
            });
        }
        let values = TimeSeries::new(values)?;
        if let Some(index) = timestamps.iter().position(|t| !t.is_finite()) {
            return Err(AlignError::NonFiniteValue { index });
        }
        for (index, pair) in timestamps.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(AlignError::NonMonotonicTimestamps {
                    index: index + 1,
                    value: pair[1],
                    previous: pair[0],
                });
            }
        }
        Ok(Self { timestamps, values })
    }

    /// Return the sample timestamps.
    #[must_use]
    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    /// Return the sample values.
    #[must_use]
    pub fn values(&self) -> &TimeSeries {
        &self.values
    }

    /// Return the number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Return true if the series has no samples (never for validated instances).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_vec() {
        let result = TimeSeries::new(vec![]);
        assert!(matches!(result, Err(AlignError::EmptySeries)));
    }

    #[test]
    fn rejects_nan() {
        let result = TimeSeries::new(vec![1.0, f64::NAN, 3.0]);
        assert!(matches!(result, Err(AlignError::NonFiniteValue { index: 1 })));
    }

    #[test]
    fn rejects_infinity() {
        let result = TimeSeries::new(vec![1.0, 2.0, f64::INFINITY]);
        assert!(matches!(result, Err(AlignError::NonFiniteValue { index: 2 })));
    }

    #[test]
    fn accepts_valid_series() {
        let ts = TimeSeries::new(vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(ts.len(), 3);
        assert_eq!(ts.as_ref(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn view_rejects_empty() {
        let result = TimeSeriesView::new(&[]);
        assert!(matches!(result, Err(AlignError::EmptySeries)));
    }

    #[test]
    fn view_indexing() {
        let data = [10.0, 20.0, 30.0];
        let view = TimeSeriesView::new(&data).unwrap();
        assert_eq!(view[0], 10.0);
        assert_eq!(view[2], 30.0);
    }

    #[test]
    fn try_from_vec() {
        let ts: Result<TimeSeries, _> = vec![1.0, 2.0].try_into();
        assert!(ts.is_ok());
    }

    #[test]
    fn sampled_series_valid() {
        let s = SampledSeries::new(vec![0.0, 1.0, 2.5], vec![4.0, 5.0, 6.0]).unwrap();
        assert_eq!(s.len(), 3);
        assert_eq!(s.timestamps(), &[0.0, 1.0, 2.5]);
        assert_eq!(s.values().as_ref(), &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn sampled_series_rejects_length_mismatch() {
        let result = SampledSeries::new(vec![0.0, 1.0], vec![4.0]);
        assert!(matches!(
            result,
            Err(AlignError::TimestampLengthMismatch { timestamps: 2, values: 1 })
        ));
    }

    #[test]
    fn sampled_series_rejects_equal_timestamps() {
        let result = SampledSeries::new(vec![0.0, 1.0, 1.0], vec![4.0, 5.0, 6.0]);
        assert!(matches!(
            result,
            Err(AlignError::NonMonotonicTimestamps { index: 2, .. })
        ));
    }

    #[test]
    fn sampled_series_rejects_backwards_timestamps() {
        let result = SampledSeries::new(vec![0.0, 2.0, 1.0], vec![4.0, 5.0, 6.0]);
        assert!(matches!(
            result,
            Err(AlignError::NonMonotonicTimestamps { index: 2, .. })
        ));
    }
}
