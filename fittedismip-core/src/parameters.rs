//! Fitted emulator parameters
//!
//! The fitting stage produces, for every ice source, an ensemble of regression
//! coefficient sets and the parameters of the long-term trend distribution.

use crate::errors::{require_file, IsmipError, IsmipResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Number of regression coefficients in one parameter set
pub const N_BETAS: usize = 6;

/// One fitted parameter set
///
/// `beta` holds the constant term, the linear, quadratic and cubic temperature
/// terms and the linear and quadratic time terms, all as rates per year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    pub beta: [f64; N_BETAS],
    /// Residual spread of the fit
    pub sigma: f64,
}

/// Ensemble of fitted parameter sets plus the trend distribution for one ice source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParameterEnsemble {
    betas: Vec<[f64; N_BETAS]>,
    sigmas: Vec<f64>,
    /// Mean of the trend rate distribution (mm/yr)
    pub trend_mean: f64,
    /// Standard deviation of the trend rate distribution (mm/yr)
    pub trend_sd: f64,
}

impl ModelParameterEnsemble {
    pub fn new(
        betas: Vec<[f64; N_BETAS]>,
        sigmas: Vec<f64>,
        trend_mean: f64,
        trend_sd: f64,
    ) -> IsmipResult<Self> {
        let ensemble = Self {
            betas,
            sigmas,
            trend_mean,
            trend_sd,
        };
        ensemble.validate()?;
        Ok(ensemble)
    }

    fn validate(&self) -> IsmipResult<()> {
        if self.betas.is_empty() {
            return Err(IsmipError::Validation(
                "parameter ensemble contains no parameter sets".to_string(),
            ));
        }
        if self.betas.len() != self.sigmas.len() {
            return Err(IsmipError::Validation(format!(
                "parameter ensemble has {} beta sets but {} sigmas",
                self.betas.len(),
                self.sigmas.len()
            )));
        }
        if !(self.trend_sd >= 0.0) {
            return Err(IsmipError::Validation(format!(
                "trend standard deviation must be non-negative, got {}",
                self.trend_sd
            )));
        }
        Ok(())
    }

    /// Load an ensemble written by the fitting stage
    pub fn from_json_file(path: &Path) -> IsmipResult<Self> {
        require_file(path)?;
        let text = fs::read_to_string(path)?;
        let ensemble: Self =
            serde_json::from_str(&text).map_err(|e| IsmipError::parse(path, e.to_string()))?;
        ensemble.validate()?;
        info!(
            "Loaded {} parameter sets from {}",
            ensemble.len(),
            path.display()
        );
        Ok(ensemble)
    }

    pub fn len(&self) -> usize {
        self.betas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.betas.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<ParameterSet> {
        Some(ParameterSet {
            beta: *self.betas.get(index)?,
            sigma: *self.sigmas.get(index)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn rejects_mismatched_lengths() {
        let res = ModelParameterEnsemble::new(vec![[0.0; N_BETAS]; 2], vec![1.0], 0.0, 0.0);
        assert!(matches!(res, Err(IsmipError::Validation(_))));
    }

    #[test]
    fn rejects_empty_ensemble() {
        let res = ModelParameterEnsemble::new(vec![], vec![], 0.0, 0.0);
        assert!(res.is_err());
    }

    #[test]
    fn reads_fit_output() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"betas": [[1, 2, 3, 4, 5, 6], [0, 0, 0, 0, 0, 0]], "sigmas": [0.5, 0.25], "trend_mean": 0.19, "trend_sd": 0.1}}"#
        )
        .unwrap();

        let ensemble = ModelParameterEnsemble::from_json_file(file.path()).unwrap();
        assert_eq!(ensemble.len(), 2);
        assert_eq!(
            ensemble.get(0),
            Some(ParameterSet {
                beta: [1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
                sigma: 0.5
            })
        );
        assert!(ensemble.get(2).is_none());
        assert_eq!(ensemble.trend_mean, 0.19);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"betas": [[1, 2, 3]], "sigmas": [0.5]}}"#).unwrap();

        let res = ModelParameterEnsemble::from_json_file(file.path());
        assert!(matches!(res, Err(IsmipError::Parse { .. })));
    }
}
