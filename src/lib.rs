//! Probabilistic projections of ice-sheet contributions to global and local sea-level
//! rise from fitted ISMIP emulators.
//!
//! The heavy lifting lives in [`fittedismip_core`] (data types and file formats) and
//! [`fittedismip_components`] (sampling, response model and localization). This crate
//! wires them into the `Preprocess → Fit → Project → Postprocess` pipeline.

pub mod config;
pub mod pipeline;

pub use config::{PipelineConfig, SourceConfig};
pub use pipeline::{run, RunSummary, Stage};
