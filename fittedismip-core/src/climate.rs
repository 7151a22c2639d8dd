//! Temperature trajectory ensembles
//!
//! The projection stage consumes an ensemble of global surface temperature
//! trajectories for a single scenario. Two on-disk layouts are understood:
//!
//! - [`TemperatureSource::TwoLayerModel`]: a JSON document holding the years and, per
//!   scenario, one array of temperatures per ensemble member (`null` marks a missing value)
//! - [`TemperatureSource::ForcingTable`]: a comma separated table with a
//!   `scenario,year,<member>...` header and one row per scenario and year

use crate::errors::{require_file, IsmipError, IsmipResult};
use crate::years::{base_year_index, Year};
use ndarray::{Array1, Array2, Axis};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Ensemble of temperature trajectories sharing a common, strictly increasing year axis
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureEnsemble {
    years: Vec<Year>,
    /// Shape (members, years)
    samples: Array2<f64>,
}

impl TemperatureEnsemble {
    pub fn new(years: Vec<Year>, samples: Array2<f64>) -> IsmipResult<Self> {
        if samples.ncols() != years.len() {
            return Err(IsmipError::Validation(format!(
                "temperature samples have {} years but the year axis has {}",
                samples.ncols(),
                years.len()
            )));
        }
        if years.windows(2).any(|w| w[1] <= w[0]) {
            return Err(IsmipError::Validation(
                "temperature years must be strictly increasing".to_string(),
            ));
        }
        Ok(Self { years, samples })
    }

    pub fn years(&self) -> &[Year] {
        &self.years
    }

    pub fn samples(&self) -> &Array2<f64> {
        &self.samples
    }

    pub fn n_members(&self) -> usize {
        self.samples.nrows()
    }

    /// Reference every trajectory to its value in `baseyear`.
    ///
    /// The fitted models have a zero intercept at the base year, so the base-year
    /// temperature is subtracted from each member.
    pub fn rebased(&self, baseyear: Year) -> IsmipResult<Self> {
        let idx = base_year_index(&self.years, baseyear)?;
        let base = self.samples.column(idx).to_owned().insert_axis(Axis(1));
        Ok(Self {
            years: self.years.clone(),
            samples: &self.samples - &base,
        })
    }

    /// Values of one member at the given year indices
    pub fn trajectory(&self, member: usize, year_indices: &[usize]) -> Array1<f64> {
        let row = self.samples.row(member);
        year_indices.iter().map(|i| row[*i]).collect()
    }
}

/// File layout of the temperature input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureSource {
    TwoLayerModel,
    ForcingTable,
}

impl TemperatureSource {
    /// Any non-zero flag selects the two-layer model trajectories
    pub fn from_flag(tlm_flag: i32) -> Self {
        if tlm_flag != 0 {
            TemperatureSource::TwoLayerModel
        } else {
            TemperatureSource::ForcingTable
        }
    }

    pub fn load(&self, path: &Path, scenario: &str) -> IsmipResult<TemperatureEnsemble> {
        require_file(path)?;
        info!(
            "Loading {:?} temperature data for {} from {}",
            self,
            scenario,
            path.display()
        );
        let ensemble = match self {
            TemperatureSource::TwoLayerModel => read_two_layer_file(path, scenario)?,
            TemperatureSource::ForcingTable => read_forcing_table(path, scenario)?,
        };
        debug!(
            "Loaded {} members over {} years",
            ensemble.n_members(),
            ensemble.years().len()
        );
        Ok(ensemble)
    }
}

#[derive(Deserialize)]
struct TwoLayerFile {
    years: Vec<Year>,
    scenarios: HashMap<String, Vec<Vec<Option<f64>>>>,
}

fn find_scenario<'a, V>(map: &'a HashMap<String, V>, scenario: &str) -> Option<&'a V> {
    map.get(scenario).or_else(|| {
        map.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(scenario))
            .map(|(_, v)| v)
    })
}

fn read_two_layer_file(path: &Path, scenario: &str) -> IsmipResult<TemperatureEnsemble> {
    let text = fs::read_to_string(path)?;
    let file: TwoLayerFile =
        serde_json::from_str(&text).map_err(|e| IsmipError::parse(path, e.to_string()))?;

    let members = find_scenario(&file.scenarios, scenario).ok_or_else(|| {
        IsmipError::Validation(format!(
            "scenario {} is not present in {}",
            scenario,
            path.display()
        ))
    })?;

    let n_years = file.years.len();
    let mut samples = Array2::from_elem((members.len(), n_years), f64::NAN);
    for (i, member) in members.iter().enumerate() {
        if member.len() != n_years {
            return Err(IsmipError::parse(
                path,
                format!(
                    "member {} of {} has {} values, expected {}",
                    i,
                    scenario,
                    member.len(),
                    n_years
                ),
            ));
        }
        for (j, value) in member.iter().enumerate() {
            samples[[i, j]] = value.unwrap_or(f64::NAN);
        }
    }

    TemperatureEnsemble::new(file.years, samples)
}

fn parse_cell(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Some(f64::NAN);
    }
    cell.parse().ok()
}

fn read_forcing_table(path: &Path, scenario: &str) -> IsmipResult<TemperatureEnsemble> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| IsmipError::parse(path, e.to_string()))?;

    let n_members = reader
        .headers()
        .map_err(|e| IsmipError::parse(path, e.to_string()))?
        .len()
        .saturating_sub(2);
    if n_members == 0 {
        return Err(IsmipError::parse(
            path,
            "header must be `scenario,year,<member>...`",
        ));
    }

    let mut rows: Vec<(Year, Vec<f64>)> = Vec::new();
    for record in reader.records() {
        // Records with the wrong number of fields are rejected by the reader
        let record = record.map_err(|e| IsmipError::parse(path, e.to_string()))?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        if !record[0].eq_ignore_ascii_case(scenario) {
            continue;
        }
        let year: Year = record[1].parse().map_err(|_| {
            IsmipError::parse(path, format!("line {}: invalid year {}", line, &record[1]))
        })?;
        let values = record
            .iter()
            .skip(2)
            .map(parse_cell)
            .collect::<Option<Vec<f64>>>()
            .ok_or_else(|| IsmipError::parse(path, format!("line {}: invalid temperature", line)))?;
        rows.push((year, values));
    }

    if rows.is_empty() {
        return Err(IsmipError::Validation(format!(
            "scenario {} is not present in {}",
            scenario,
            path.display()
        )));
    }
    rows.sort_by_key(|(year, _)| *year);

    let years: Vec<Year> = rows.iter().map(|(y, _)| *y).collect();
    let mut samples = Array2::from_elem((n_members, years.len()), f64::NAN);
    for (j, (_, values)) in rows.iter().enumerate() {
        for (i, v) in values.iter().enumerate() {
            samples[[i, j]] = *v;
        }
    }

    TemperatureEnsemble::new(years, samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use std::io::Write;

    #[test]
    fn rebasing_zeroes_the_base_year() {
        let ensemble = TemperatureEnsemble::new(
            vec![2000, 2005, 2010],
            array![[0.5, 1.0, 2.0], [1.0, 1.5, 1.0]],
        )
        .unwrap();
        let rebased = ensemble.rebased(2005).unwrap();

        assert_eq!(rebased.samples().column(1).to_vec(), vec![0.0, 0.0]);
        assert_relative_eq!(rebased.samples()[[0, 2]], 1.0);
        assert_relative_eq!(rebased.samples()[[1, 0]], -0.5);
    }

    #[test]
    fn rebasing_requires_the_base_year() {
        let ensemble = TemperatureEnsemble::new(vec![2000, 2010], array![[0.0, 1.0]]).unwrap();
        assert!(matches!(
            ensemble.rebased(2005),
            Err(IsmipError::Validation(_))
        ));
    }

    #[test]
    fn years_must_increase() {
        let res = TemperatureEnsemble::new(vec![2010, 2000], array![[0.0, 1.0]]);
        assert!(res.is_err());
    }

    #[test]
    fn reads_two_layer_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"years": [2000, 2010, 2020], "scenarios": {{"ssp585": [[0.0, 1.0, null], [0.5, 0.5, 0.5]]}}}}"#
        )
        .unwrap();

        let ensemble = TemperatureSource::TwoLayerModel
            .load(file.path(), "SSP585")
            .unwrap();
        assert_eq!(ensemble.n_members(), 2);
        assert_eq!(ensemble.years(), &[2000, 2010, 2020]);
        assert!(ensemble.samples()[[0, 2]].is_nan());
        assert_relative_eq!(ensemble.samples()[[1, 1]], 0.5);
    }

    #[test]
    fn reads_forcing_table_for_one_scenario() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "scenario,year,m0,m1").unwrap();
        writeln!(file, "SSP585,2010,1.0,2.0").unwrap();
        writeln!(file, "SSP126,2000,9.0,9.0").unwrap();
        writeln!(file, "SSP585,2000,0.0,nan").unwrap();

        let ensemble = TemperatureSource::ForcingTable
            .load(file.path(), "ssp585")
            .unwrap();
        assert_eq!(ensemble.years(), &[2000, 2010]);
        assert_relative_eq!(ensemble.samples()[[1, 1]], 2.0);
        assert!(ensemble.samples()[[1, 0]].is_nan());
    }

    #[test]
    fn reads_quoted_forcing_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "\"scenario\",\"year\",\"m0\"").unwrap();
        writeln!(file, "\"SSP585\",2010, 2.0").unwrap();
        writeln!(file, "\"SSP585\",2000,1.0").unwrap();
        writeln!(file).unwrap();

        let ensemble = TemperatureSource::ForcingTable
            .load(file.path(), "ssp585")
            .unwrap();
        assert_eq!(ensemble.years(), &[2000, 2010]);
        assert_eq!(ensemble.n_members(), 1);
        assert_relative_eq!(ensemble.samples()[[0, 1]], 2.0);
    }

    #[test]
    fn ragged_forcing_table_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "scenario,year,m0,m1").unwrap();
        writeln!(file, "ssp585,2000,1.0").unwrap();

        let res = TemperatureSource::ForcingTable.load(file.path(), "ssp585");
        assert!(matches!(res, Err(IsmipError::Parse { .. })));
    }

    #[test]
    fn unknown_scenario_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"years": [2000], "scenarios": {{"ssp126": [[0.0]]}}}}"#).unwrap();

        let res = TemperatureSource::TwoLayerModel.load(file.path(), "ssp585");
        assert!(matches!(res, Err(IsmipError::Validation(_))));
    }

    #[test]
    fn missing_file_is_reported() {
        let res = TemperatureSource::TwoLayerModel.load(Path::new("/nonexistent/climate.json"), "x");
        assert!(matches!(res, Err(IsmipError::MissingFile(_))));
    }
}
