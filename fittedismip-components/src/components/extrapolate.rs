use fittedismip_core::errors::{IsmipError, IsmipResult};
use fittedismip_core::years::Year;
use ndarray::ArrayViewMut1;
use tracing::info;

/// Span assumed between the rate years when only one of them is given
pub const DEFAULT_RATE_SPAN: Year = 20;

/// Piecewise linear interpolation of `(xs, ys)` at `x`.
///
/// `xs` must be ascending. Values outside the range of `xs` take the nearest end value.
pub fn interpolate(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n == 0 {
        return f64::NAN;
    }
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[n - 1] {
        return ys[n - 1];
    }
    let i = xs[..n].partition_point(|v| *v <= x) - 1;
    let w = (x - xs[i]) / (xs[i + 1] - xs[i]);
    ys[i] + w * (ys[i + 1] - ys[i])
}

/// Continue a projection at a constant rate beyond `end`.
///
/// The rate is measured between the projected values at `start` and `end`, both
/// interpolated from the projection itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateExtrapolation {
    start: Year,
    end: Year,
}

impl RateExtrapolation {
    pub fn new(start: Year, end: Year) -> IsmipResult<Self> {
        if end <= start {
            return Err(IsmipError::Validation(format!(
                "constant rate end year {} must be after start year {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// Build from optional bounds.
    ///
    /// A missing bound is inferred [`DEFAULT_RATE_SPAN`] years from the given one. With
    /// neither bound there is nothing to extrapolate and `None` is returned.
    pub fn from_bounds(start: Option<Year>, end: Option<Year>) -> IsmipResult<Option<Self>> {
        let (start, end) = match (start, end) {
            (None, None) => return Ok(None),
            (Some(s), Some(e)) => (s, e),
            (Some(s), None) => {
                info!(
                    "Constant rate end year not given, using {}",
                    s + DEFAULT_RATE_SPAN
                );
                (s, s + DEFAULT_RATE_SPAN)
            }
            (None, Some(e)) => {
                info!(
                    "Constant rate start year not given, using {}",
                    e - DEFAULT_RATE_SPAN
                );
                (e - DEFAULT_RATE_SPAN, e)
            }
        };
        Self::new(start, end).map(Some)
    }

    pub fn start(&self) -> Year {
        self.start
    }

    pub fn end(&self) -> Year {
        self.end
    }

    /// Overwrite every value at or after the end year with the constant-rate continuation
    pub fn apply(&self, mut series: ArrayViewMut1<f64>, years: &[Year]) {
        let xs: Vec<f64> = years.iter().map(|y| *y as f64).collect();
        let ys = series.to_vec();

        let value_start = interpolate(self.start as f64, &xs, &ys);
        let value_end = interpolate(self.end as f64, &xs, &ys);
        let rate = (value_end - value_start) / (self.end - self.start) as f64;

        for (value, year) in series.iter_mut().zip(years) {
            if *year >= self.end {
                *value = value_end + rate * (*year - self.end) as f64;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array1};

    #[test]
    fn interpolation_clamps_at_the_ends() {
        let xs = [0.0, 10.0, 20.0];
        let ys = [1.0, 2.0, 4.0];
        assert_eq!(interpolate(-5.0, &xs, &ys), 1.0);
        assert_eq!(interpolate(25.0, &xs, &ys), 4.0);
        assert_relative_eq!(interpolate(15.0, &xs, &ys), 3.0);
    }

    #[test]
    fn infers_missing_bound() {
        let ext = RateExtrapolation::from_bounds(Some(2080), None).unwrap().unwrap();
        assert_eq!((ext.start(), ext.end()), (2080, 2100));

        let ext = RateExtrapolation::from_bounds(None, Some(2100)).unwrap().unwrap();
        assert_eq!((ext.start(), ext.end()), (2080, 2100));

        assert!(RateExtrapolation::from_bounds(None, None).unwrap().is_none());
    }

    #[test]
    fn rejects_inverted_bounds() {
        assert!(RateExtrapolation::from_bounds(Some(2100), Some(2100)).is_err());
    }

    #[test]
    fn tail_becomes_linear_and_head_is_untouched() {
        let years: Vec<Year> = (2020..=2100).step_by(10).collect();
        // Quadratic growth
        let original: Array1<f64> = years
            .iter()
            .map(|y| ((*y - 2020) as f64).powi(2) / 100.0)
            .collect();
        let mut series = original.clone();

        let ext = RateExtrapolation::new(2045, 2065).unwrap();
        ext.apply(series.view_mut(), &years);

        for (i, year) in years.iter().enumerate() {
            if *year < 2065 {
                assert_eq!(series[i], original[i]);
            }
        }

        // Constant first difference from 2070 onwards
        let tail: Vec<f64> = series.iter().skip(5).copied().collect();
        let diffs: Vec<f64> = tail.windows(2).map(|w| w[1] - w[0]).collect();
        for d in &diffs {
            assert_relative_eq!(*d, diffs[0], epsilon = 1e-9);
        }

        // Rate measured between interpolated values at 2045 and 2065
        let v_start = (4.0 + 9.0) / 2.0;
        let v_end = (16.0 + 25.0) / 2.0;
        let rate = (v_end - v_start) / 20.0;
        assert_relative_eq!(series[5], v_end + rate * 5.0, epsilon = 1e-9);
    }

    #[test]
    fn linear_series_is_a_fixed_point() {
        let years = vec![2020, 2030, 2040, 2050];
        let mut series = array![10.0, 20.0, 30.0, 40.0];
        RateExtrapolation::new(2025, 2035)
            .unwrap()
            .apply(series.view_mut(), &years);
        assert_eq!(series.to_vec(), vec![10.0, 20.0, 30.0, 40.0]);
    }
}
