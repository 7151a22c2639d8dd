//! Compressed, self-describing array files
//!
//! Every file starts with an 8 byte magic tag and a one byte content kind, followed by a
//! gzip stream (fixed compression level) wrapping the `bincode` encoding of the payload.
//!
//! [`SeaLevelDataset`] is the payload of the global and local projection artifacts. It
//! carries a single `sea_level_change` variable with dimensions `(samples, years, locations)`
//! stored as `f32`, its coordinates, and ordered global attributes.

use crate::clock::Clock;
use crate::errors::{require_file, IsmipError, IsmipResult};
use crate::years::Year;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use indexmap::IndexMap;
use ndarray::{Array3, ArrayView3};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::info;

const MAGIC: &[u8; 8] = b"FISMIP01";
pub const COMPRESSION_LEVEL: u32 = 4;

/// Location id used for the single location of a global artifact
pub const GLOBAL_LOCATION_ID: i64 = -1;

/// Payload type stored in a container file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ContentKind {
    SeaLevel = 1,
    Fingerprint = 2,
}

pub fn write_container<T: Serialize>(path: &Path, kind: ContentKind, value: &T) -> IsmipResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(MAGIC)?;
    writer.write_all(&[kind as u8])?;

    let mut encoder = GzEncoder::new(writer, Compression::new(COMPRESSION_LEVEL));
    bincode::serialize_into(&mut encoder, value)
        .map_err(|e| IsmipError::Serialization(e.to_string()))?;
    encoder.finish()?.flush()?;
    Ok(())
}

pub fn read_container<T: DeserializeOwned>(path: &Path, kind: ContentKind) -> IsmipResult<T> {
    require_file(path)?;
    let mut reader = BufReader::new(File::open(path)?);

    let mut header = [0u8; 9];
    reader
        .read_exact(&mut header)
        .map_err(|_| IsmipError::parse(path, "file is too short to be an array artifact"))?;
    if &header[..8] != MAGIC {
        return Err(IsmipError::parse(path, "not an array artifact"));
    }
    if header[8] != kind as u8 {
        return Err(IsmipError::parse(
            path,
            format!("expected {:?} content, found kind {}", kind, header[8]),
        ));
    }

    let decoder = GzDecoder::new(reader);
    bincode::deserialize_from(decoder).map_err(|e| IsmipError::parse(path, e.to_string()))
}

/// Value of a global attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Text(String),
    Int(i64),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

/// Provenance attributes shared by the global and local artifacts
#[derive(Debug, Clone, PartialEq)]
pub struct Provenance {
    pub description: String,
    pub source: String,
    pub scenario: String,
    pub baseyear: Year,
}

impl Provenance {
    /// Attributes in the order `description, history, source, scenario, baseyear`
    pub fn attributes(&self, clock: &dyn Clock) -> IndexMap<String, AttributeValue> {
        IndexMap::from([
            ("description".to_string(), self.description.as_str().into()),
            ("history".to_string(), clock.history().into()),
            ("source".to_string(), self.source.as_str().into()),
            ("scenario".to_string(), self.scenario.as_str().into()),
            ("baseyear".to_string(), i64::from(self.baseyear).into()),
        ])
    }
}

/// Samples of sea-level change at a set of locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeaLevelDataset {
    /// Shape (samples, years, locations)
    sea_level_change: Array3<f32>,
    pub units: String,
    pub missing_value: f32,
    pub samples: Vec<i64>,
    pub years: Vec<Year>,
    pub locations: Vec<i64>,
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub attributes: IndexMap<String, AttributeValue>,
}

impl SeaLevelDataset {
    /// Package an in-memory `(samples, years, locations)` array.
    ///
    /// Values are stored in single precision. Sample coordinates are `0..n_samples`.
    pub fn new(
        values: ArrayView3<f64>,
        years: Vec<Year>,
        locations: Vec<i64>,
        lat: Vec<f64>,
        lon: Vec<f64>,
        attributes: IndexMap<String, AttributeValue>,
    ) -> IsmipResult<Self> {
        Self::from_f32(
            values.mapv(|v| v as f32),
            years,
            locations,
            lat,
            lon,
            attributes,
        )
    }

    /// Package an array that is already in single precision, taking ownership of it.
    pub fn from_f32(
        values: Array3<f32>,
        years: Vec<Year>,
        locations: Vec<i64>,
        lat: Vec<f64>,
        lon: Vec<f64>,
        attributes: IndexMap<String, AttributeValue>,
    ) -> IsmipResult<Self> {
        let (n_samples, n_years, n_locations) = values.dim();
        if years.len() != n_years {
            return Err(IsmipError::Validation(format!(
                "{} years given for an array with {} years",
                years.len(),
                n_years
            )));
        }
        if locations.len() != n_locations || lat.len() != n_locations || lon.len() != n_locations
        {
            return Err(IsmipError::Validation(format!(
                "location coordinates do not match the {} locations of the array",
                n_locations
            )));
        }

        Ok(Self {
            sea_level_change: values,
            units: "mm".to_string(),
            missing_value: f32::NAN,
            samples: (0..n_samples as i64).collect(),
            years,
            locations,
            lat,
            lon,
            attributes,
        })
    }

    /// Package a global ensemble with the sentinel "global" location.
    pub fn global(
        values: ArrayView3<f64>,
        years: Vec<Year>,
        attributes: IndexMap<String, AttributeValue>,
    ) -> IsmipResult<Self> {
        Self::new(
            values,
            years,
            vec![GLOBAL_LOCATION_ID],
            vec![f64::INFINITY],
            vec![f64::INFINITY],
            attributes,
        )
    }

    pub fn sea_level_change(&self) -> &Array3<f32> {
        &self.sea_level_change
    }

    /// `(samples, years, locations)`
    pub fn dim(&self) -> (usize, usize, usize) {
        self.sea_level_change.dim()
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    pub fn write(&self, path: &Path) -> IsmipResult<()> {
        write_container(path, ContentKind::SeaLevel, self)?;
        let (s, y, l) = self.dim();
        info!(
            "Wrote {} samples x {} years x {} locations to {}",
            s,
            y,
            l,
            path.display()
        );
        Ok(())
    }

    pub fn read(path: &Path) -> IsmipResult<Self> {
        read_container(path, ContentKind::SeaLevel)
    }
}
