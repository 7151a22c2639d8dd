//! Fitted response of ice-sheet sea-level contribution to temperature
//!
//! The fitted rates are per year, so every yearly increment is scaled by the
//! projection step before being accumulated:
//!
//! $$ \Delta S_{const} = \beta_0 \, \Delta t $$
//! $$ \Delta S_{temp} = (\beta_1 T + \beta_2 T^2 + \beta_3 T^3) \, \Delta t $$
//! $$ \Delta S_{time} = (\beta_4 \tau + \beta_5 \tau^2) \, \Delta t $$
//!
//! where $T$ is the base-year referenced temperature and $\tau$ the number of years
//! since the base year. Each term is accumulated independently and the three
//! cumulative series are summed.

use fittedismip_core::errors::{IsmipError, IsmipResult};
use fittedismip_core::parameters::ParameterSet;
use fittedismip_core::rng::{Perturbations, ProjectionRng};
use fittedismip_core::years::Year;
use ndarray::Array1;

/// Cumulative sea-level change (mm) and its three parts
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseComponents {
    pub constant: Array1<f64>,
    pub temperature: Array1<f64>,
    pub time: Array1<f64>,
    pub total: Array1<f64>,
}

fn cumulative(increments: impl Iterator<Item = f64>) -> Array1<f64> {
    increments
        .scan(0.0, |acc, x| {
            *acc += x;
            Some(*acc)
        })
        .collect()
}

/// Replace a missing final temperature with a linear extrapolation of the two before it.
pub fn repair_trailing_temperature(temperature: &mut Array1<f64>) -> IsmipResult<()> {
    let n = temperature.len();
    if n == 0 || !temperature[n - 1].is_nan() {
        return Ok(());
    }
    if n < 3 {
        return Err(IsmipError::InsufficientData(format!(
            "need at least 3 years to extrapolate the final value, got {}",
            n
        )));
    }
    let (prev, prev2) = (temperature[n - 2], temperature[n - 3]);
    if prev.is_nan() || prev2.is_nan() {
        return Err(IsmipError::InsufficientData(
            "the two values before the final year are also missing".to_string(),
        ));
    }
    temperature[n - 1] = prev + (prev - prev2);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseModel {
    step: f64,
    sigma_scale: f64,
}

impl ResponseModel {
    /// `step` is the spacing of the projection years. `sigma_scale` converts a parameter
    /// set's residual spread into the half-width of the multiplicative perturbation
    /// (`spread = sigma * sigma_scale / 100`); zero disables the perturbation.
    pub fn new(step: Year, sigma_scale: f64) -> Self {
        Self {
            step: step as f64,
            sigma_scale,
        }
    }

    pub fn spread(&self, sigma: f64) -> f64 {
        sigma * self.sigma_scale / 100.0
    }

    /// Unperturbed cumulative response
    ///
    /// `temperature` and `offsets` cover the same projection years. A missing final
    /// temperature is repaired in place first.
    pub fn evaluate(
        &self,
        temperature: &mut Array1<f64>,
        parameters: &ParameterSet,
        offsets: &[f64],
    ) -> IsmipResult<ResponseComponents> {
        if temperature.len() != offsets.len() {
            return Err(IsmipError::Validation(format!(
                "temperature has {} years but {} year offsets were given",
                temperature.len(),
                offsets.len()
            )));
        }
        repair_trailing_temperature(temperature)?;

        let b = &parameters.beta;
        let dt = self.step;

        let constant = cumulative(std::iter::repeat(b[0] * dt).take(offsets.len()));
        let temperature = cumulative(
            temperature
                .iter()
                .map(|t| (b[1] * t + b[2] * t.powi(2) + b[3] * t.powi(3)) * dt),
        );
        let time = cumulative(
            offsets
                .iter()
                .map(|tau| (b[4] * tau + b[5] * tau.powi(2)) * dt),
        );
        let total = &temperature + &time + &constant;

        Ok(ResponseComponents {
            constant,
            temperature,
            time,
            total,
        })
    }

    /// Cumulative response scaled by `1 + u`, with `u` drawn from `[-spread, spread)`
    pub fn project(
        &self,
        mut temperature: Array1<f64>,
        parameters: &ParameterSet,
        offsets: &[f64],
        rng: &mut ProjectionRng<Perturbations>,
    ) -> IsmipResult<Array1<f64>> {
        let components = self.evaluate(&mut temperature, parameters, offsets)?;
        let pct_error = rng.draw_perturbation(self.spread(parameters.sigma));
        Ok(components.total * (1.0 + pct_error))
    }
}
