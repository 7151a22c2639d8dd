//! Projection year grids
//!
//! Target years are requested as an arithmetic `(start, end, step)` sequence, but only
//! the years that also appear in the temperature input can be projected. [`YearOverlap`]
//! records which target years survive and where they live in the input series.

use crate::errors::{IsmipError, IsmipResult};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub type Year = i32;

/// Arithmetic sequence of requested projection years (inclusive of `end` when it falls on a step)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearGrid {
    start: Year,
    end: Year,
    step: Year,
}

impl YearGrid {
    pub fn new(start: Year, end: Year, step: Year) -> IsmipResult<Self> {
        if step <= 0 {
            return Err(IsmipError::Validation(format!(
                "projection year step must be positive, got {}",
                step
            )));
        }
        if end < start {
            return Err(IsmipError::Validation(format!(
                "projection end year {} is before start year {}",
                end, start
            )));
        }
        Ok(Self { start, end, step })
    }

    pub fn start(&self) -> Year {
        self.start
    }

    pub fn end(&self) -> Year {
        self.end
    }

    pub fn step(&self) -> Year {
        self.step
    }

    /// All requested years, `start, start + step, ...` up to and including `end`
    pub fn years(&self) -> Vec<Year> {
        (self.start..=self.end).step_by(self.step as usize).collect()
    }

    /// Intersect the requested years with the years available in the data
    pub fn overlap(&self, data_years: &[Year]) -> YearOverlap {
        YearOverlap::new(data_years, &self.years())
    }
}

/// Target years that are present in the input data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearOverlap {
    /// Years that will be projected, ascending
    pub years: Vec<Year>,
    /// Index of each projected year in the data series
    pub data_indices: Vec<usize>,
    /// Requested years with no matching data, which are not projected
    pub dropped: Vec<Year>,
}

impl YearOverlap {
    pub fn new(data_years: &[Year], target_years: &[Year]) -> Self {
        let mut targets = target_years.to_vec();
        targets.sort_unstable();
        targets.dedup();

        let mut years = Vec::with_capacity(targets.len());
        let mut data_indices = Vec::with_capacity(targets.len());
        let mut dropped = Vec::new();

        for year in targets {
            match data_years.iter().position(|y| *y == year) {
                Some(idx) => {
                    years.push(year);
                    data_indices.push(idx);
                }
                None => dropped.push(year),
            }
        }

        if !dropped.is_empty() {
            warn!(
                "{} requested projection years are absent from the temperature data and will not be projected: {:?}",
                dropped.len(),
                dropped
            );
        }

        Self {
            years,
            data_indices,
            dropped,
        }
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    /// Projected years relative to the base year
    pub fn offsets_from(&self, baseyear: Year) -> Vec<f64> {
        self.years.iter().map(|y| (y - baseyear) as f64).collect()
    }
}

/// Locate the base year within a data series.
pub fn base_year_index(years: &[Year], baseyear: Year) -> IsmipResult<usize> {
    years.iter().position(|y| *y == baseyear).ok_or_else(|| {
        IsmipError::Validation(format!(
            "baseyear is not found in temperature data. baseyear = {}",
            baseyear
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_includes_end_on_step() {
        let grid = YearGrid::new(2020, 2100, 10).unwrap();
        assert_eq!(
            grid.years(),
            vec![2020, 2030, 2040, 2050, 2060, 2070, 2080, 2090, 2100]
        );
    }

    #[test]
    fn grid_excludes_end_off_step() {
        let grid = YearGrid::new(2020, 2045, 10).unwrap();
        assert_eq!(grid.years(), vec![2020, 2030, 2040]);
    }

    #[test]
    fn grid_rejects_non_positive_step() {
        assert!(YearGrid::new(2020, 2100, 0).is_err());
        assert!(YearGrid::new(2100, 2020, 10).is_err());
    }

    #[test]
    fn overlap_drops_missing_years() {
        let data_years: Vec<Year> = (2000..=2050).step_by(5).collect();
        let grid = YearGrid::new(2020, 2070, 10).unwrap();
        let overlap = grid.overlap(&data_years);

        assert_eq!(overlap.years, vec![2020, 2030, 2040, 2050]);
        assert_eq!(overlap.data_indices, vec![4, 6, 8, 10]);
        assert_eq!(overlap.dropped, vec![2060, 2070]);
        assert_eq!(overlap.offsets_from(2005), vec![15.0, 25.0, 35.0, 45.0]);
    }

    #[test]
    fn overlap_of_disjoint_years_is_empty() {
        let overlap = YearOverlap::new(&[1990, 1991], &[2020, 2030]);
        assert!(overlap.is_empty());
        assert_eq!(overlap.dropped.len(), 2);
    }

    #[test]
    fn base_year_lookup() {
        let years = vec![2000, 2005, 2010];
        assert_eq!(base_year_index(&years, 2005).unwrap(), 1);

        let err = base_year_index(&years, 2004).unwrap_err();
        assert!(matches!(err, IsmipError::Validation(_)));
        assert!(err.to_string().contains("2004"));
    }
}
