//! Global projections
//!
//! Combines the fitted response to temperature with the sampled trend term for every
//! ensemble sample, optionally continues the projections at a constant rate, and
//! packages the result as a single-location [`SeaLevelDataset`].

use crate::components::extrapolate::RateExtrapolation;
use crate::components::ice_source::{IceSheet, IceSource};
use crate::components::response::ResponseModel;
use crate::components::sampler::{SampleIndices, TrajectorySampler};
use crate::components::trend::TrendDistribution;
use fittedismip_core::artifact::{Provenance, SeaLevelDataset};
use fittedismip_core::climate::TemperatureEnsemble;
use fittedismip_core::clock::Clock;
use fittedismip_core::errors::{IsmipError, IsmipResult};
use fittedismip_core::rng::{ParameterIndices, ProjectionRng, TrendQuantiles};
use fittedismip_core::years::{Year, YearGrid, YearOverlap};
use ndarray::{Array2, Axis};
use tracing::{debug, info};

/// Settings shared by every ice source in a projection run
#[derive(Debug, Clone)]
pub struct ProjectionSettings {
    pub nsamps: usize,
    pub years: YearGrid,
    pub baseyear: Year,
    pub extrapolation: Option<RateExtrapolation>,
    pub sigma_scale: f64,
}

/// Ensemble of global sea-level change for one ice source
#[derive(Debug, Clone)]
pub struct GlobalProjection {
    pub sheet: IceSheet,
    pub years: Vec<Year>,
    /// Cumulative sea-level change (mm), shape (samples, years)
    pub samples: Array2<f64>,
    pub indices: SampleIndices,
}

impl GlobalProjection {
    pub fn provenance(&self, scenario: &str, baseyear: Year, pipeline_id: &str) -> Provenance {
        Provenance {
            description: format!(
                "Global SLR contribution from {} according to FittedISMIP workflow",
                self.sheet
            ),
            source: format!("FittedISMIP: {}", pipeline_id),
            scenario: scenario.to_string(),
            baseyear,
        }
    }

    pub fn to_dataset(
        &self,
        scenario: &str,
        baseyear: Year,
        pipeline_id: &str,
        clock: &dyn Clock,
    ) -> IsmipResult<SeaLevelDataset> {
        let values = self.samples.view().insert_axis(Axis(2));
        let attributes = self
            .provenance(scenario, baseyear, pipeline_id)
            .attributes(clock);
        SeaLevelDataset::global(values, self.years.clone(), attributes)
    }
}

/// Projects each ice source from one temperature ensemble
#[derive(Debug)]
pub struct GlobalAssembler {
    settings: ProjectionSettings,
    sampler: TrajectorySampler,
    response: ResponseModel,
    /// Base-year referenced temperatures
    temperatures: TemperatureEnsemble,
    overlap: YearOverlap,
}

impl GlobalAssembler {
    /// Validate the inputs and prepare the temperature data.
    ///
    /// Fails if the base year is absent from the temperature data, if there are fewer
    /// temperature members than samples, or if no requested year has temperature data.
    pub fn new(settings: ProjectionSettings, temperatures: &TemperatureEnsemble) -> IsmipResult<Self> {
        let sampler = TrajectorySampler::new(settings.nsamps)?;
        let temperatures = temperatures.rebased(settings.baseyear)?;
        sampler.check_temperature_members(temperatures.n_members())?;

        let overlap = settings.years.overlap(temperatures.years());
        if overlap.is_empty() {
            return Err(IsmipError::Validation(format!(
                "none of the projection years {}..={} are present in the temperature data",
                settings.years.start(),
                settings.years.end()
            )));
        }

        let response = ResponseModel::new(settings.years.step(), settings.sigma_scale);
        Ok(Self {
            settings,
            sampler,
            response,
            temperatures,
            overlap,
        })
    }

    /// Years that are projected
    pub fn years(&self) -> &[Year] {
        &self.overlap.years
    }

    /// Project every source in order, drawing from `rng` in the fixed run sequence.
    pub fn project_all(
        &self,
        sources: &[IceSource],
        rng: ProjectionRng<TrendQuantiles>,
    ) -> IsmipResult<Vec<GlobalProjection>> {
        let (quantiles, mut rng) = rng.draw_trend_quantiles(self.settings.nsamps);

        let mut projections = Vec::with_capacity(sources.len());
        for source in sources {
            let (projection, next) = self.project_source(source, &quantiles, rng)?;
            projections.push(projection);
            rng = next;
        }
        Ok(projections)
    }

    fn project_source(
        &self,
        source: &IceSource,
        quantiles: &[f64],
        rng: ProjectionRng<ParameterIndices>,
    ) -> IsmipResult<(GlobalProjection, ProjectionRng<ParameterIndices>)> {
        info!(
            "Projecting {} samples for {} over {} years",
            self.settings.nsamps,
            source.sheet,
            self.overlap.len()
        );
        let offsets = self.overlap.offsets_from(self.settings.baseyear);

        let trend = TrendDistribution::new(source.parameters.trend_mean, source.parameters.trend_sd)?
            .contributions(quantiles, &offsets);

        let (indices, mut rng) = self.sampler.draw(source.parameters.len(), rng)?;

        let mut samples = Array2::<f64>::zeros((self.settings.nsamps, self.overlap.len()));
        for (i, (tidx, midx)) in indices.iter().enumerate() {
            let parameters = source.parameters.get(midx).ok_or_else(|| {
                IsmipError::Validation(format!("parameter set {} does not exist", midx))
            })?;
            let temperature = self
                .temperatures
                .trajectory(tidx, &self.overlap.data_indices);
            let series = self
                .response
                .project(temperature, &parameters, &offsets, &mut rng)?;
            samples.row_mut(i).assign(&series);
        }

        samples += &trend;

        if let Some(extrapolation) = &self.settings.extrapolation {
            debug!(
                "Extrapolating {} at a constant rate from {} using {}..{}",
                source.sheet,
                extrapolation.end(),
                extrapolation.start(),
                extrapolation.end()
            );
            for row in samples.rows_mut() {
                extrapolation.apply(row, &self.overlap.years);
            }
        }

        let projection = GlobalProjection {
            sheet: source.sheet,
            years: self.overlap.years.clone(),
            samples,
            indices,
        };
        Ok((projection, rng.next_source()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fittedismip_core::clock::FixedClock;
    use fittedismip_core::parameters::ModelParameterEnsemble;
    use fittedismip_core::artifact::{AttributeValue, GLOBAL_LOCATION_ID};
    use ndarray::Array2;
    use std::path::PathBuf;

    fn temperatures(n_members: usize, years: Vec<Year>) -> TemperatureEnsemble {
        let n_years = years.len();
        TemperatureEnsemble::new(
            years,
            Array2::from_shape_fn((n_members, n_years), |(m, y)| 0.01 * (m + y) as f64),
        )
        .unwrap()
    }

    fn source(beta: [f64; 6], trend_mean: f64, trend_sd: f64) -> IceSource {
        IceSource::new(
            IceSheet::Greenland,
            ModelParameterEnsemble::new(vec![beta; 3], vec![0.0; 3], trend_mean, trend_sd)
                .unwrap(),
            PathBuf::from("fprint_gis.fp"),
        )
    }

    fn settings(nsamps: usize) -> ProjectionSettings {
        ProjectionSettings {
            nsamps,
            years: YearGrid::new(2020, 2100, 10).unwrap(),
            baseyear: 2005,
            extrapolation: None,
            sigma_scale: 0.0,
        }
    }

    #[test]
    fn constant_term_only() {
        let temps = TemperatureEnsemble::new(
            (2000..=2100).collect(),
            Array2::zeros((5, 101)),
        )
        .unwrap();
        let assembler = GlobalAssembler::new(settings(5), &temps).unwrap();
        let projections = assembler
            .project_all(
                &[source([1.0, 0.0, 0.0, 0.0, 0.0, 0.0], 0.0, 0.0)],
                ProjectionRng::seeded(1234),
            )
            .unwrap();

        let samples = &projections[0].samples;
        assert_eq!(samples.dim(), (5, 9));
        for row in samples.rows() {
            let expected: Vec<f64> = (1..=9).map(|k| 10.0 * k as f64).collect();
            assert_eq!(row.to_vec(), expected);
        }
    }

    #[test]
    fn trend_term_is_added() {
        let temps = TemperatureEnsemble::new(
            (2000..=2100).collect(),
            Array2::zeros((2, 101)),
        )
        .unwrap();
        let assembler = GlobalAssembler::new(settings(2), &temps).unwrap();
        let projections = assembler
            .project_all(&[source([0.0; 6], 0.5, 0.0)], ProjectionRng::seeded(1))
            .unwrap();

        // 0.5 mm/yr from 2005
        assert_eq!(projections[0].samples[[0, 0]], 7.5);
        assert_eq!(projections[0].samples[[1, 8]], 47.5);
    }

    #[test]
    fn same_seed_same_ensemble() {
        let temps = temperatures(8, (2000..=2100).step_by(5).collect());
        let assembler = GlobalAssembler::new(settings(8), &temps).unwrap();
        let src = [source([0.1, 2.0, 0.5, 0.0, 0.001, 0.0], 0.2, 0.1)];

        let a = assembler.project_all(&src, ProjectionRng::seeded(42)).unwrap();
        let b = assembler.project_all(&src, ProjectionRng::seeded(42)).unwrap();
        assert_eq!(a[0].samples, b[0].samples);
        assert_eq!(a[0].indices, b[0].indices);
    }

    #[test]
    fn only_overlapping_years_are_projected() {
        let temps = temperatures(3, (2000..=2060).collect());
        let assembler = GlobalAssembler::new(settings(3), &temps).unwrap();
        assert_eq!(assembler.years(), &[2020, 2030, 2040, 2050, 2060]);

        let projections = assembler
            .project_all(&[source([1.0; 6], 0.0, 0.0)], ProjectionRng::seeded(3))
            .unwrap();
        assert_eq!(projections[0].samples.ncols(), 5);
    }

    #[test]
    fn missing_base_year_is_a_validation_error() {
        let temps = temperatures(3, (2010..=2100).collect());
        let res = GlobalAssembler::new(settings(3), &temps);
        assert!(matches!(res, Err(IsmipError::Validation(_))));
    }

    #[test]
    fn too_few_temperature_members() {
        let temps = temperatures(2, (2000..=2100).collect());
        assert!(GlobalAssembler::new(settings(3), &temps).is_err());
    }

    #[test]
    fn extrapolation_makes_tail_linear() {
        let temps = temperatures(4, (2000..=2100).collect());
        let mut s = settings(4);
        s.extrapolation = RateExtrapolation::from_bounds(None, Some(2060)).unwrap();
        let assembler = GlobalAssembler::new(s, &temps).unwrap();
        let projections = assembler
            .project_all(
                &[source([0.1, 1.0, 1.0, 1.0, 0.0, 0.0], 0.0, 0.0)],
                ProjectionRng::seeded(5),
            )
            .unwrap();

        for row in projections[0].samples.rows() {
            // 2060 is index 4; differences from there on are constant
            let d0 = row[5] - row[4];
            for k in 5..8 {
                approx::assert_relative_eq!(row[k + 1] - row[k], d0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn sources_draw_in_sequence() {
        let temps = temperatures(6, (2000..=2100).collect());
        let assembler = GlobalAssembler::new(settings(6), &temps).unwrap();
        let mut second = source([0.2, 0.0, 0.0, 0.0, 0.0, 0.0], 0.0, 0.0);
        second.sheet = IceSheet::EastAntarctic;
        second.parameters =
            ModelParameterEnsemble::new(vec![[0.0; 6]; 50], vec![0.0; 50], 0.0, 0.0).unwrap();

        let both = assembler
            .project_all(
                &[source([0.1, 0.0, 0.0, 0.0, 0.0, 0.0], 0.0, 0.0), second.clone()],
                ProjectionRng::seeded(11),
            )
            .unwrap();
        let alone = assembler
            .project_all(&[second], ProjectionRng::seeded(11))
            .unwrap();

        assert_eq!(both.len(), 2);
        assert_eq!(both[1].sheet, IceSheet::EastAntarctic);
        // The second source continues the stream rather than restarting it
        assert_ne!(both[1].indices.parameters, alone[0].indices.parameters);
    }

    #[test]
    fn dataset_has_global_location_and_metadata() {
        let temps = temperatures(2, (2000..=2100).collect());
        let assembler = GlobalAssembler::new(settings(2), &temps).unwrap();
        let projections = assembler
            .project_all(&[source([1.0; 6], 0.0, 0.0)], ProjectionRng::seeded(1))
            .unwrap();

        let ds = projections[0]
            .to_dataset("ssp585", 2005, "test", &FixedClock::from_timestamp(0))
            .unwrap();
        assert_eq!(ds.dim(), (2, 9, 1));
        assert_eq!(ds.locations, vec![GLOBAL_LOCATION_ID]);
        assert_eq!(
            ds.attribute("scenario"),
            Some(&AttributeValue::Text("ssp585".to_string()))
        );
        assert_eq!(
            ds.attribute("source"),
            Some(&AttributeValue::Text("FittedISMIP: test".to_string()))
        );
    }
}
