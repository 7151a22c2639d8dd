use crate::errors::{require_file, IsmipError, IsmipResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A point at which local sea-level change is reported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
}

/// Ordered set of target locations
///
/// Order is significant: the i-th fingerprint value belongs to the i-th location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationSet {
    locations: Vec<Location>,
}

impl LocationSet {
    pub fn new(locations: Vec<Location>) -> Self {
        Self { locations }
    }

    /// Read a location list.
    ///
    /// Each record is `name id lat lon` separated by tabs or spaces. Blank lines
    /// and lines starting with `#` are ignored. Latitudes must lie in `[-90, 90]` and
    /// longitudes must be finite.
    pub fn from_file(path: &Path) -> IsmipResult<Self> {
        require_file(path)?;
        let text = fs::read_to_string(path)?;

        let mut locations = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            // Names may contain spaces, so the last three fields are the numeric ones
            if fields.len() < 4 {
                return Err(IsmipError::parse(
                    path,
                    format!("line {}: expected `name id lat lon`", line_no + 1),
                ));
            }
            let n = fields.len();
            let bad = |what: &str| {
                IsmipError::parse(path, format!("line {}: invalid {}", line_no + 1, what))
            };
            let lat: f64 = fields[n - 2].parse().map_err(|_| bad("latitude"))?;
            let lon: f64 = fields[n - 1].parse().map_err(|_| bad("longitude"))?;
            if !(-90.0..=90.0).contains(&lat) {
                return Err(bad("latitude"));
            }
            if !lon.is_finite() {
                return Err(bad("longitude"));
            }
            locations.push(Location {
                name: fields[..n - 3].join(" "),
                id: fields[n - 3].parse().map_err(|_| bad("id"))?,
                lat,
                lon,
            });
        }

        Ok(Self { locations })
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.locations.iter()
    }

    pub fn ids(&self) -> Vec<i64> {
        self.locations.iter().map(|l| l.id).collect()
    }

    pub fn lats(&self) -> Vec<f64> {
        self.locations.iter().map(|l| l.lat).collect()
    }

    pub fn lons(&self) -> Vec<f64> {
        self.locations.iter().map(|l| l.lon).collect()
    }
}
