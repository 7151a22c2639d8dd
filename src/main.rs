//! FittedISMIP projection pipeline
//!
//! Runs `Preprocess → Fit → Project → Postprocess` for the Greenland ice sheet and,
//! when their parameter files are given, the Antarctic sources.
//!
//! # Usage
//!
//! ```bash
//! fittedismip --climate-file climate.json --gris-parm-file gis_fit.json \
//!   --locationfile location.lst --fp-dir fingerprints
//! ```
//!
//! Every option can also be set through a `FITTEDISMIP_GRIS_*` environment variable, or
//! the whole run can be described by a TOML file passed with `--config`.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use fittedismip::config::{PipelineConfig, SourceConfig};
use fittedismip::pipeline;
use fittedismip_components::components::IceSheet;
use fittedismip_core::clock::SystemClock;
use fittedismip_core::years::Year;
use std::io;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fittedismip")]
#[command(about = "Project ice-sheet sea-level contributions from fitted ISMIP emulators")]
struct Args {
    /// TOML file describing the whole run. Other options are ignored when set
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emissions scenario of interest
    #[arg(long, env = "FITTEDISMIP_GRIS_SCENARIO", default_value = "ssp585")]
    scenario: String,

    /// Non-zero uses two-layer model temperature trajectories, zero the forcing table
    #[arg(long, env = "FITTEDISMIP_GRIS_TLM_FLAG", default_value_t = 1)]
    tlm_flag: i32,

    /// File containing surface temperature data
    #[arg(long, env = "FITTEDISMIP_GRIS_CLIMATE_FILE", required_unless_present = "config")]
    climate_file: Option<PathBuf>,

    /// Unique identifier for this instance of the module
    #[arg(long, env = "FITTEDISMIP_GRIS_PIPELINE_ID", default_value = "fittedismip")]
    pipeline_id: String,

    /// Greenland ice sheet model parameters
    #[arg(long, env = "FITTEDISMIP_GRIS_GRIS_PARMS", required_unless_present = "config")]
    gris_parm_file: Option<PathBuf>,

    /// West Antarctic ice sheet model parameters
    #[arg(long, env = "FITTEDISMIP_GRIS_WAIS_PARMS")]
    wais_parm_file: Option<PathBuf>,

    /// East Antarctic ice sheet model parameters
    #[arg(long, env = "FITTEDISMIP_GRIS_EAIS_PARMS")]
    eais_parm_file: Option<PathBuf>,

    /// Antarctic Peninsula ice sheet model parameters
    #[arg(long, env = "FITTEDISMIP_GRIS_PEN_PARMS")]
    pen_parm_file: Option<PathBuf>,

    /// Number of samples to draw
    #[arg(long, env = "FITTEDISMIP_GRIS_NSAMPS", default_value_t = 200)]
    nsamps: usize,

    #[arg(long, env = "FITTEDISMIP_GRIS_PYEAR_START", default_value_t = 2020)]
    pyear_start: Year,

    #[arg(long, env = "FITTEDISMIP_GRIS_PYEAR_END", default_value_t = 2300)]
    pyear_end: Year,

    #[arg(long, env = "FITTEDISMIP_GRIS_PYEAR_STEP", default_value_t = 10)]
    pyear_step: Year,

    /// Constant rate calculation for projections starts at this year
    #[arg(long, env = "FITTEDISMIP_GRIS_CYEAR_START")]
    cyear_start: Option<Year>,

    /// Constant rate calculation for projections ends at this year
    #[arg(long, env = "FITTEDISMIP_GRIS_CYEAR_END", default_value_t = 2100)]
    cyear_end: Year,

    /// Year to which projections are referenced
    #[arg(long, env = "FITTEDISMIP_GRIS_BASEYEAR", default_value_t = 2005)]
    baseyear: Year,

    #[arg(long, env = "FITTEDISMIP_GRIS_RNGSEED", default_value_t = 1234)]
    rngseed: u64,

    /// File that contains name, id, lat, and lon of points for localization
    #[arg(long, env = "FITTEDISMIP_GRIS_LOCATIONFILE", default_value = "location.lst")]
    locationfile: PathBuf,

    /// Number of locations to process at a time
    #[arg(long, env = "FITTEDISMIP_GRIS_CHUNKSIZE", default_value_t = 50)]
    chunksize: usize,

    /// Directory that contains fingerprint files
    #[arg(long, env = "FITTEDISMIP_GRIS_FP_DIR", default_value = ".")]
    fp_dir: PathBuf,

    /// Percentage of each parameter set's sigma used as the perturbation spread
    #[arg(long, env = "FITTEDISMIP_GRIS_SIGMA_SCALE", default_value_t = 0.0)]
    sigma_scale: f64,

    #[arg(long, env = "FITTEDISMIP_GRIS_GLOBAL_OUT_FILE")]
    gris_global_out_file: Option<PathBuf>,

    #[arg(long, env = "FITTEDISMIP_GRIS_LOCAL_OUT_FILE")]
    gris_local_out_file: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> Result<PipelineConfig> {
        if let Some(path) = &self.config {
            return PipelineConfig::from_toml_file(path)
                .with_context(|| format!("reading configuration from {}", path.display()));
        }

        let climate_file = self
            .climate_file
            .ok_or_else(|| anyhow!("--climate-file is required"))?;
        let gris_parm_file = self
            .gris_parm_file
            .ok_or_else(|| anyhow!("--gris-parm-file is required"))?;

        let mut greenland = SourceConfig::new(IceSheet::Greenland, gris_parm_file);
        greenland.global_out_file = self.gris_global_out_file;
        greenland.local_out_file = self.gris_local_out_file;

        let mut sources = vec![greenland];
        let antarctic = [
            (IceSheet::WestAntarctic, self.wais_parm_file),
            (IceSheet::EastAntarctic, self.eais_parm_file),
            (IceSheet::Peninsula, self.pen_parm_file),
        ];
        for (sheet, file) in antarctic {
            if let Some(file) = file {
                sources.push(SourceConfig::new(sheet, file));
            }
        }

        let config = PipelineConfig {
            scenario: self.scenario,
            tlm_flag: self.tlm_flag,
            climate_file,
            pipeline_id: self.pipeline_id,
            nsamps: self.nsamps,
            pyear_start: self.pyear_start,
            pyear_end: self.pyear_end,
            pyear_step: self.pyear_step,
            cyear_start: self.cyear_start,
            cyear_end: Some(self.cyear_end),
            baseyear: self.baseyear,
            rngseed: self.rngseed,
            locationfile: self.locationfile,
            chunksize: self.chunksize,
            fp_dir: self.fp_dir,
            sigma_scale: self.sigma_scale,
            sources,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Log to stderr, honouring `RUST_LOG` when it is set
fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to install the log subscriber: {}", e))
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    let config = args.into_config()?;
    info!(
        "Running {} for scenario {} with {} samples",
        config.pipeline_id, config.scenario, config.nsamps
    );

    let summary = pipeline::run(&config, &SystemClock).context("pipeline run failed")?;
    for path in summary.global_files.iter().chain(&summary.local_files) {
        info!("Wrote {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_logging_init_is_reported() {
        let _ = init_logging(false);
        assert!(init_logging(true).is_err());
    }

    #[test]
    fn command_line_describes_greenland_and_optional_sources() {
        let args = Args::parse_from([
            "fittedismip",
            "--climate-file",
            "climate.json",
            "--gris-parm-file",
            "gis.json",
            "--pen-parm-file",
            "pen.json",
        ]);
        let config = args.into_config().unwrap();

        let sheets: Vec<IceSheet> = config.sources.iter().map(|s| s.sheet).collect();
        assert_eq!(sheets, vec![IceSheet::Greenland, IceSheet::Peninsula]);
        assert_eq!(config.cyear_end, Some(2100));
        assert_eq!(config.nsamps, 200);
    }
}
