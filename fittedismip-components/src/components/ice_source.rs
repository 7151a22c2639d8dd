use fittedismip_core::errors::IsmipError;
use fittedismip_core::parameters::ModelParameterEnsemble;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Ice sources with fitted emulators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IceSheet {
    /// Greenland ice sheet
    #[serde(rename = "GIS")]
    Greenland,
    /// West Antarctic ice sheet
    #[serde(rename = "WAIS")]
    WestAntarctic,
    /// East Antarctic ice sheet
    #[serde(rename = "EAIS")]
    EastAntarctic,
    /// Antarctic Peninsula
    #[serde(rename = "PEN")]
    Peninsula,
}

impl IceSheet {
    pub fn name(&self) -> &'static str {
        match self {
            IceSheet::Greenland => "GIS",
            IceSheet::WestAntarctic => "WAIS",
            IceSheet::EastAntarctic => "EAIS",
            IceSheet::Peninsula => "PEN",
        }
    }

    /// File name of the fingerprint for this source inside the fingerprint directory
    pub fn default_fingerprint_file(&self) -> String {
        format!("fprint_{}.fp", self.name().to_lowercase())
    }
}

impl fmt::Display for IceSheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IceSheet {
    type Err = IsmipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GIS" | "GRIS" => Ok(IceSheet::Greenland),
            "WAIS" => Ok(IceSheet::WestAntarctic),
            "EAIS" => Ok(IceSheet::EastAntarctic),
            "PEN" => Ok(IceSheet::Peninsula),
            _ => Err(IsmipError::Config(format!("unknown ice source {}", s))),
        }
    }
}

/// Everything needed to project and localize one ice source
#[derive(Debug, Clone)]
pub struct IceSource {
    pub sheet: IceSheet,
    pub parameters: ModelParameterEnsemble,
    pub fingerprint: PathBuf,
}

impl IceSource {
    pub fn new(sheet: IceSheet, parameters: ModelParameterEnsemble, fingerprint: PathBuf) -> Self {
        Self {
            sheet,
            parameters,
            fingerprint,
        }
    }
}
