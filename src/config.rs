//! Pipeline configuration
//!
//! A [`PipelineConfig`] can be read from a TOML file or assembled from command-line
//! flags. Defaults follow the standard FittedISMIP experiment setup.
//!
//! ```toml
//! scenario = "ssp245"
//! climate_file = "climate.json"
//! nsamps = 500
//! fp_dir = "fingerprints"
//!
//! [[sources]]
//! sheet = "GIS"
//! parameter_file = "gis_fit.json"
//! ```

use fittedismip_components::components::IceSheet;
use fittedismip_core::errors::{IsmipError, IsmipResult};
use fittedismip_core::years::Year;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Inputs and outputs of one ice source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub sheet: IceSheet,
    /// Fitted parameters produced by the fitting stage
    pub parameter_file: PathBuf,
    /// Fingerprint file name inside `fp_dir`, defaults to `fprint_<sheet>.fp`
    #[serde(default)]
    pub fingerprint_file: Option<PathBuf>,
    #[serde(default)]
    pub global_out_file: Option<PathBuf>,
    #[serde(default)]
    pub local_out_file: Option<PathBuf>,
}

impl SourceConfig {
    pub fn new(sheet: IceSheet, parameter_file: PathBuf) -> Self {
        Self {
            sheet,
            parameter_file,
            fingerprint_file: None,
            global_out_file: None,
            local_out_file: None,
        }
    }

    pub fn fingerprint_path(&self, fp_dir: &Path) -> PathBuf {
        let name = self
            .fingerprint_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.sheet.default_fingerprint_file()));
        fp_dir.join(name)
    }

    pub fn global_out_path(&self, pipeline_id: &str) -> PathBuf {
        self.global_out_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}_{}_globalsl.bin", pipeline_id, self.sheet)))
    }

    pub fn local_out_path(&self, pipeline_id: &str) -> PathBuf {
        self.local_out_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}_{}_localsl.bin", pipeline_id, self.sheet)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Emissions scenario of interest
    pub scenario: String,
    /// Non-zero uses the two-layer model temperature ensemble, zero the forcing table
    pub tlm_flag: i32,
    pub climate_file: PathBuf,
    pub pipeline_id: String,
    pub nsamps: usize,
    pub pyear_start: Year,
    pub pyear_end: Year,
    pub pyear_step: Year,
    /// Constant rate calculation starts at this year
    pub cyear_start: Option<Year>,
    /// Constant rate calculation ends at this year. Rate extrapolation is skipped when
    /// neither year is set.
    pub cyear_end: Option<Year>,
    pub baseyear: Year,
    pub rngseed: u64,
    pub locationfile: PathBuf,
    /// Number of locations localized at a time
    pub chunksize: usize,
    pub fp_dir: PathBuf,
    /// Scale from a parameter set's sigma to the perturbation spread, in percent
    pub sigma_scale: f64,
    pub sources: Vec<SourceConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scenario: "ssp585".to_string(),
            tlm_flag: 1,
            climate_file: PathBuf::new(),
            pipeline_id: "fittedismip".to_string(),
            nsamps: 200,
            pyear_start: 2020,
            pyear_end: 2300,
            pyear_step: 10,
            cyear_start: None,
            cyear_end: None,
            baseyear: 2005,
            rngseed: 1234,
            locationfile: PathBuf::from("location.lst"),
            chunksize: 50,
            fp_dir: PathBuf::from("."),
            sigma_scale: 0.0,
            sources: Vec::new(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(text: &str) -> IsmipResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| IsmipError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> IsmipResult<Self> {
        let text = fs::read_to_string(path).map_err(|_| IsmipError::MissingFile(path.to_path_buf()))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> IsmipResult<()> {
        if self.climate_file.as_os_str().is_empty() {
            return Err(IsmipError::Config("climate_file is required".to_string()));
        }
        if self.sources.is_empty() {
            return Err(IsmipError::Config(
                "at least one ice source must be configured".to_string(),
            ));
        }
        for (i, a) in self.sources.iter().enumerate() {
            if self.sources[..i].iter().any(|b| b.sheet == a.sheet) {
                return Err(IsmipError::Config(format!(
                    "ice source {} is configured more than once",
                    a.sheet
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_standard_setup() {
        let config = PipelineConfig::default();
        assert_eq!(config.nsamps, 200);
        assert_eq!((config.pyear_start, config.pyear_end, config.pyear_step), (2020, 2300, 10));
        assert_eq!(config.cyear_end, None);
        assert_eq!(config.baseyear, 2005);
        assert_eq!(config.chunksize, 50);
    }

    #[test]
    fn parses_toml_with_sources() {
        let config = PipelineConfig::from_toml_str(
            r#"
            scenario = "ssp245"
            climate_file = "climate.json"
            nsamps = 10
            fp_dir = "fp"

            [[sources]]
            sheet = "GIS"
            parameter_file = "gis.json"

            [[sources]]
            sheet = "WAIS"
            parameter_file = "wais.json"
            fingerprint_file = "custom.fp"
            local_out_file = "wais_local.bin"
            "#,
        )
        .unwrap();

        assert_eq!(config.scenario, "ssp245");
        assert_eq!(config.nsamps, 10);
        assert_eq!(config.baseyear, 2005);
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[1].sheet, IceSheet::WestAntarctic);
        assert_eq!(
            config.sources[0].fingerprint_path(&config.fp_dir),
            PathBuf::from("fp/fprint_gis.fp")
        );
        assert_eq!(
            config.sources[1].fingerprint_path(&config.fp_dir),
            PathBuf::from("fp/custom.fp")
        );
        assert_eq!(
            config.sources[0].global_out_path("run1"),
            PathBuf::from("run1_GIS_globalsl.bin")
        );
        assert_eq!(
            config.sources[1].local_out_path("run1"),
            PathBuf::from("wais_local.bin")
        );
    }

    #[test]
    fn requires_climate_file_and_sources() {
        assert!(PipelineConfig::from_toml_str("nsamps = 5").is_err());

        let res = PipelineConfig::from_toml_str(r#"climate_file = "c.json""#);
        assert!(matches!(res, Err(IsmipError::Config(_))));
    }

    #[test]
    fn rejects_duplicate_sources() {
        let res = PipelineConfig::from_toml_str(
            r#"
            climate_file = "c.json"
            [[sources]]
            sheet = "GIS"
            parameter_file = "a.json"
            [[sources]]
            sheet = "GIS"
            parameter_file = "b.json"
            "#,
        );
        assert!(res.is_err());
    }
}
