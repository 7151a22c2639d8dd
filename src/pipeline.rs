//! The four pipeline stages
//!
//! `Preprocess → Fit → Project → Postprocess` run strictly in sequence and each stage
//! hands its complete output to the next. A run either finishes with all artifacts
//! written or stops at the first error. Artifacts already written by earlier stages are
//! left in place.

use crate::config::PipelineConfig;
use fittedismip_components::components::{
    local_provenance, FingerprintLocalizer, GlobalAssembler, GlobalProjection, IceSource,
    ProjectionSettings, RateExtrapolation,
};
use fittedismip_core::climate::{TemperatureEnsemble, TemperatureSource};
use fittedismip_core::clock::Clock;
use fittedismip_core::errors::{IsmipError, IsmipResult};
use fittedismip_core::fingerprint::FingerprintGrid;
use fittedismip_core::locations::LocationSet;
use fittedismip_core::parameters::ModelParameterEnsemble;
use fittedismip_core::rng::ProjectionRng;
use fittedismip_core::years::{Year, YearGrid};
use std::fmt;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Preprocess,
    Fit,
    Project,
    Postprocess,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Preprocess => "preprocess",
            Stage::Fit => "fit",
            Stage::Project => "project",
            Stage::Postprocess => "postprocess",
        };
        f.write_str(name)
    }
}

/// Output of the preprocessing stage
#[derive(Debug, Clone)]
pub struct ClimateInput {
    pub scenario: String,
    pub temperatures: TemperatureEnsemble,
}

/// Output of the projection stage
#[derive(Debug, Clone)]
pub struct ProjectionOutput {
    pub scenario: String,
    pub baseyear: Year,
    pub years: Vec<Year>,
    pub projections: Vec<GlobalProjection>,
    pub global_files: Vec<PathBuf>,
}

/// Artifacts written by a complete run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub global_files: Vec<PathBuf>,
    pub local_files: Vec<PathBuf>,
}

/// Load the temperature ensemble for the configured scenario
pub fn preprocess(config: &PipelineConfig) -> IsmipResult<ClimateInput> {
    let source = TemperatureSource::from_flag(config.tlm_flag);
    let temperatures = source.load(&config.climate_file, &config.scenario)?;
    Ok(ClimateInput {
        scenario: config.scenario.clone(),
        temperatures,
    })
}

/// Load the fitted parameter ensembles of every configured ice source
pub fn fit(config: &PipelineConfig) -> IsmipResult<Vec<IceSource>> {
    config
        .sources
        .iter()
        .map(|source| {
            let parameters = ModelParameterEnsemble::from_json_file(&source.parameter_file)?;
            Ok(IceSource::new(
                source.sheet,
                parameters,
                source.fingerprint_path(&config.fp_dir),
            ))
        })
        .collect()
}

fn projection_settings(config: &PipelineConfig) -> IsmipResult<ProjectionSettings> {
    Ok(ProjectionSettings {
        nsamps: config.nsamps,
        years: YearGrid::new(config.pyear_start, config.pyear_end, config.pyear_step)?,
        baseyear: config.baseyear,
        extrapolation: RateExtrapolation::from_bounds(config.cyear_start, config.cyear_end)?,
        sigma_scale: config.sigma_scale,
    })
}

/// Project global sea-level change for every source and write the global artifacts.
///
/// All validation happens before the first artifact is written.
pub fn project(
    config: &PipelineConfig,
    climate: &ClimateInput,
    sources: &[IceSource],
    clock: &dyn Clock,
) -> IsmipResult<ProjectionOutput> {
    let settings = projection_settings(config)?;
    let assembler = GlobalAssembler::new(settings, &climate.temperatures)?;
    let projections =
        assembler.project_all(sources, ProjectionRng::seeded(config.rngseed))?;

    let mut global_files = Vec::with_capacity(projections.len());
    for (projection, source_config) in projections.iter().zip(&config.sources) {
        let path = source_config.global_out_path(&config.pipeline_id);
        projection
            .to_dataset(&climate.scenario, config.baseyear, &config.pipeline_id, clock)?
            .write(&path)?;
        global_files.push(path);
    }

    Ok(ProjectionOutput {
        scenario: climate.scenario.clone(),
        baseyear: config.baseyear,
        years: assembler.years().to_vec(),
        projections,
        global_files,
    })
}

/// Apply fingerprints to the global projections and write the local artifacts
pub fn postprocess(
    config: &PipelineConfig,
    output: &ProjectionOutput,
    sources: &[IceSource],
    clock: &dyn Clock,
) -> IsmipResult<Vec<PathBuf>> {
    let localizer = FingerprintLocalizer::new(config.chunksize)?;
    let locations = LocationSet::from_file(&config.locationfile)?;
    info!("Localizing to {} locations", locations.len());

    let mut local_files = Vec::with_capacity(output.projections.len());
    for ((projection, source), source_config) in output
        .projections
        .iter()
        .zip(sources)
        .zip(&config.sources)
    {
        if projection.sheet != source.sheet {
            return Err(IsmipError::Validation(format!(
                "projection for {} does not match ice source {}",
                projection.sheet, source.sheet
            )));
        }
        let fingerprint = FingerprintGrid::read(&source.fingerprint)?.assign(&locations);
        let provenance = local_provenance(projection, &output.scenario, output.baseyear);
        let path = source_config.local_out_path(&config.pipeline_id);
        localizer
            .localize_projection(projection, &fingerprint, &locations, &provenance, clock)?
            .write(&path)?;
        local_files.push(path);
    }
    Ok(local_files)
}

/// Run all four stages
pub fn run(config: &PipelineConfig, clock: &dyn Clock) -> IsmipResult<RunSummary> {
    config.validate()?;

    info!("Stage: {}", Stage::Preprocess);
    let climate = preprocess(config)?;

    info!("Stage: {}", Stage::Fit);
    let sources = fit(config)?;

    info!("Stage: {}", Stage::Project);
    let output = project(config, &climate, &sources, clock)?;

    info!("Stage: {}", Stage::Postprocess);
    let local_files = postprocess(config, &output, &sources, clock)?;

    Ok(RunSummary {
        global_files: output.global_files,
        local_files,
    })
}
