//! Long-term trend term
//!
//! Each sample receives one trend rate drawn from a truncated normal distribution and
//! extends it linearly from the base year.

use fittedismip_core::errors::{IsmipError, IsmipResult};
use ndarray::Array2;
use statrs::distribution::{ContinuousCDF, Normal};

/// Lower truncation bound, in standard deviations from the mean
pub const TRUNCATION_LOWER: f64 = 0.0;
/// Upper truncation bound, in standard deviations from the mean (effectively unbounded)
pub const TRUNCATION_UPPER: f64 = 99999.9;

/// Truncated normal distribution of trend rates (mm/yr)
///
/// The truncation bounds are expressed in standardised units, so rates are drawn from
/// $[\mu + a\sigma, \mu + b\sigma]$ with $a = 0$ and $b$ effectively infinite. A sample
/// quantile $q$ maps to
///
/// $$ x = \mu + \sigma \, \Phi^{-1}\left(\Phi(a) + q \left(\Phi(b) - \Phi(a)\right)\right) $$
#[derive(Debug, Clone)]
pub struct TrendDistribution {
    mean: f64,
    sd: f64,
    standard: Normal,
}

impl TrendDistribution {
    pub fn new(mean: f64, sd: f64) -> IsmipResult<Self> {
        if !(sd >= 0.0) {
            return Err(IsmipError::Validation(format!(
                "trend standard deviation must be non-negative, got {}",
                sd
            )));
        }
        let standard =
            Normal::new(0.0, 1.0).map_err(|e| IsmipError::Validation(e.to_string()))?;
        Ok(Self { mean, sd, standard })
    }

    /// Trend rate at quantile `q` in `[0, 1)`
    pub fn rate(&self, q: f64) -> f64 {
        if self.sd == 0.0 {
            return self.mean;
        }
        let lower = self.standard.cdf(TRUNCATION_LOWER);
        let upper = self.standard.cdf(TRUNCATION_UPPER);
        let z = self.standard.inverse_cdf(lower + q * (upper - lower));
        self.mean + self.sd * z
    }

    /// Trend contribution for every sample and year, shape (samples, years)
    ///
    /// `offsets` are the projection years relative to the base year.
    pub fn contributions(&self, quantiles: &[f64], offsets: &[f64]) -> Array2<f64> {
        let rates: Vec<f64> = quantiles.iter().map(|q| self.rate(*q)).collect();
        Array2::from_shape_fn((rates.len(), offsets.len()), |(s, y)| rates[s] * offsets[y])
    }
}
