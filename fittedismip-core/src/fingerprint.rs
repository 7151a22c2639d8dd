//! Sea-level fingerprints
//!
//! A fingerprint is the relative sea-level response at each point of a regular
//! latitude/longitude grid to a unit global-mean contribution from one ice source.
//! Values at arbitrary sites are obtained by bilinear interpolation, wrapping around
//! in longitude and clamping in latitude.

use crate::artifact::{read_container, write_container, ContentKind};
use crate::errors::{IsmipError, IsmipResult};
use crate::locations::LocationSet;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerprintGrid {
    /// Ascending latitudes (degrees north)
    lat: Vec<f64>,
    /// Ascending longitudes in `[0, 360)` (degrees east)
    lon: Vec<f64>,
    /// Shape (lat, lon)
    values: Array2<f64>,
}

fn strictly_increasing(v: &[f64]) -> bool {
    v.windows(2).all(|w| w[1] > w[0])
}

impl FingerprintGrid {
    pub fn new(lat: Vec<f64>, lon: Vec<f64>, values: Array2<f64>) -> IsmipResult<Self> {
        let grid = Self { lat, lon, values };
        grid.validate()?;
        Ok(grid)
    }

    fn validate(&self) -> IsmipResult<()> {
        if self.lat.is_empty() || self.lon.is_empty() {
            return Err(IsmipError::Validation(
                "fingerprint grid must have at least one latitude and longitude".to_string(),
            ));
        }
        if self.values.dim() != (self.lat.len(), self.lon.len()) {
            return Err(IsmipError::Validation(format!(
                "fingerprint values have shape {:?}, expected ({}, {})",
                self.values.dim(),
                self.lat.len(),
                self.lon.len()
            )));
        }
        if !strictly_increasing(&self.lat) || !strictly_increasing(&self.lon) {
            return Err(IsmipError::Validation(
                "fingerprint coordinates must be strictly increasing".to_string(),
            ));
        }
        if self.lon.iter().any(|l| !(0.0..360.0).contains(l)) {
            return Err(IsmipError::Validation(
                "fingerprint longitudes must lie in [0, 360)".to_string(),
            ));
        }
        Ok(())
    }

    pub fn read(path: &Path) -> IsmipResult<Self> {
        let grid: Self = read_container(path, ContentKind::Fingerprint)?;
        grid.validate()?;
        debug!(
            "Loaded {}x{} fingerprint grid from {}",
            grid.lat.len(),
            grid.lon.len(),
            path.display()
        );
        Ok(grid)
    }

    pub fn write(&self, path: &Path) -> IsmipResult<()> {
        write_container(path, ContentKind::Fingerprint, self)
    }

    fn lat_bracket(&self, lat: f64) -> (usize, usize, f64) {
        let n = self.lat.len();
        if n == 1 || lat <= self.lat[0] {
            return (0, 0, 0.0);
        }
        if lat >= self.lat[n - 1] {
            return (n - 1, n - 1, 0.0);
        }
        let j = self.lat.partition_point(|v| *v <= lat) - 1;
        let w = (lat - self.lat[j]) / (self.lat[j + 1] - self.lat[j]);
        (j, j + 1, w)
    }

    fn lon_bracket(&self, lon: f64) -> (usize, usize, f64) {
        let n = self.lon.len();
        if n == 1 {
            return (0, 0, 0.0);
        }
        let x = lon.rem_euclid(360.0);
        if x >= self.lon[0] && x < self.lon[n - 1] {
            let i = self.lon.partition_point(|v| *v <= x) - 1;
            let w = (x - self.lon[i]) / (self.lon[i + 1] - self.lon[i]);
            return (i, i + 1, w);
        }
        // Across the seam between the last longitude and the first one
        let lo = self.lon[n - 1];
        let hi = self.lon[0] + 360.0;
        let x = if x < self.lon[0] { x + 360.0 } else { x };
        (n - 1, 0, (x - lo) / (hi - lo))
    }

    /// Interpolated fingerprint value at a site, NaN when either coordinate is not finite
    pub fn value_at(&self, lat: f64, lon: f64) -> f64 {
        if !lat.is_finite() || !lon.is_finite() {
            return f64::NAN;
        }
        let (j0, j1, wy) = self.lat_bracket(lat);
        let (i0, i1, wx) = self.lon_bracket(lon);

        let v = &self.values;
        let south = v[[j0, i0]] * (1.0 - wx) + v[[j0, i1]] * wx;
        let north = v[[j1, i0]] * (1.0 - wx) + v[[j1, i1]] * wx;
        south * (1.0 - wy) + north * wy
    }

    /// Fingerprint values for every location, in location order
    pub fn assign(&self, locations: &LocationSet) -> Vec<f64> {
        locations
            .iter()
            .map(|loc| self.value_at(loc.lat, loc.lon))
            .collect()
    }
}
