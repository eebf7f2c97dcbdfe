//! Pluggable point distance metrics for the cost matrix.

/// Scalar distance between two sample values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DistanceMetric {
    /// Squared difference: `(a - b)^2`.
    #[default]
    SquaredDifference,

    /// Absolute difference: `|a - b|`.
    AbsoluteDifference,
}

impl DistanceMetric {
    /// Return the local cost of matching sample `a` against sample `b`.
    #[must_use]
    pub fn point_cost(&self, a: f64, b: f64) -> f64 {
        match self {
            Self::SquaredDifference => (a - b).powi(2),
            Self::AbsoluteDifference => (a - b).abs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squared_difference() {
        let m = DistanceMetric::SquaredDifference;
        assert_eq!(m.point_cost(1.0, 4.0), 9.0);
        assert_eq!(m.point_cost(4.0, 1.0), 9.0);
        assert_eq!(m.point_cost(2.0, 2.0), 0.0);
    }

    #[test]
    fn absolute_difference() {
        let m = DistanceMetric::AbsoluteDifference;
        assert_eq!(m.point_cost(1.0, 4.0), 3.0);
        assert_eq!(m.point_cost(4.0, 1.0), 3.0);
    }

    #[test]
    fn default_is_squared() {
        assert_eq!(DistanceMetric::default(), DistanceMetric::SquaredDifference);
    }
}
