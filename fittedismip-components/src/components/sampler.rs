use fittedismip_core::errors::{IsmipError, IsmipResult};
use fittedismip_core::rng::{ParameterIndices, Perturbations, ProjectionRng};

/// Which temperature trajectory and parameter set each sample uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleIndices {
    pub temperature: Vec<usize>,
    pub parameters: Vec<usize>,
}

impl SampleIndices {
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.temperature
            .iter()
            .copied()
            .zip(self.parameters.iter().copied())
    }
}

/// Assigns temperature trajectories and parameter sets to ensemble samples
///
/// Sample `i` uses temperature member `i`; parameter sets are drawn uniformly with
/// replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrajectorySampler {
    nsamps: usize,
}

impl TrajectorySampler {
    pub fn new(nsamps: usize) -> IsmipResult<Self> {
        if nsamps == 0 {
            return Err(IsmipError::Validation(
                "number of samples must be positive".to_string(),
            ));
        }
        Ok(Self { nsamps })
    }

    pub fn nsamps(&self) -> usize {
        self.nsamps
    }

    /// Temperature members are consumed in order, so the ensemble needs at least `nsamps`
    pub fn check_temperature_members(&self, n_members: usize) -> IsmipResult<()> {
        if n_members < self.nsamps {
            return Err(IsmipError::Validation(format!(
                "{} samples requested but the temperature ensemble has only {} members",
                self.nsamps, n_members
            )));
        }
        Ok(())
    }

    pub fn draw(
        &self,
        n_parameter_sets: usize,
        rng: ProjectionRng<ParameterIndices>,
    ) -> IsmipResult<(SampleIndices, ProjectionRng<Perturbations>)> {
        if n_parameter_sets == 0 {
            return Err(IsmipError::Validation(
                "cannot sample from an empty parameter ensemble".to_string(),
            ));
        }
        let (parameters, rng) = rng.draw_parameter_indices(self.nsamps, n_parameter_sets);
        let indices = SampleIndices {
            temperature: (0..self.nsamps).collect(),
            parameters,
        };
        Ok((indices, rng))
    }
}
