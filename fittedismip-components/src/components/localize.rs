//! Fingerprint localization
//!
//! Local sea-level change is the global contribution scaled by the fingerprint value at
//! each location:
//!
//! $$ S_{local}[s, y, l] = S_{global}[s, y] \cdot F[l] $$
//!
//! The output is allocated once, in single precision, and filled in blocks of at most
//! `chunk_size` locations, in parallel. Each block writes directly into its slice of the
//! output, so no intermediate arrays are built and the chunk size does not change the
//! result.

use crate::components::global::GlobalProjection;
use fittedismip_core::artifact::{Provenance, SeaLevelDataset};
use fittedismip_core::clock::Clock;
use fittedismip_core::errors::{IsmipError, IsmipResult};
use fittedismip_core::locations::LocationSet;
use fittedismip_core::years::Year;
use ndarray::{Array3, ArrayView2, Axis};
use rayon::prelude::*;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerprintLocalizer {
    chunk_size: usize,
}

impl FingerprintLocalizer {
    pub fn new(chunk_size: usize) -> IsmipResult<Self> {
        if chunk_size == 0 {
            return Err(IsmipError::Validation(
                "location chunk size must be positive".to_string(),
            ));
        }
        Ok(Self { chunk_size })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Outer product of a `(samples, years)` ensemble with per-location fingerprint values
    pub fn localize(&self, global: ArrayView2<f64>, fingerprint: &[f64]) -> Array3<f32> {
        let (n_samples, n_years) = global.dim();
        let mut local = Array3::<f32>::zeros((n_samples, n_years, fingerprint.len()));
        if fingerprint.is_empty() {
            return local;
        }

        let blocks: Vec<_> = local
            .axis_chunks_iter_mut(Axis(2), self.chunk_size)
            .zip(fingerprint.chunks(self.chunk_size))
            .collect();
        let n_blocks = blocks.len();
        blocks.into_par_iter().for_each(|(mut block, fp)| {
            for ((s, y, l), v) in block.indexed_iter_mut() {
                *v = (global[[s, y]] * fp[l]) as f32;
            }
        });
        debug!(
            "Localized {} locations in {} chunks",
            fingerprint.len(),
            n_blocks
        );
        local
    }

    /// Localize a global projection and package it with the location coordinates
    pub fn localize_projection(
        &self,
        projection: &GlobalProjection,
        fingerprint: &[f64],
        locations: &LocationSet,
        provenance: &Provenance,
        clock: &dyn Clock,
    ) -> IsmipResult<SeaLevelDataset> {
        if fingerprint.len() != locations.len() {
            return Err(IsmipError::Validation(format!(
                "{} fingerprint values for {} locations",
                fingerprint.len(),
                locations.len()
            )));
        }
        let local = self.localize(projection.samples.view(), fingerprint);
        SeaLevelDataset::from_f32(
            local,
            projection.years.clone(),
            locations.ids(),
            locations.lats(),
            locations.lons(),
            provenance.attributes(clock),
        )
    }
}

/// Provenance of the local artifact for one ice source
pub fn local_provenance(projection: &GlobalProjection, scenario: &str, baseyear: Year) -> Provenance {
    Provenance {
        description: format!(
            "Local SLR contributions from {} according to FittedISMIP workflow",
            projection.sheet
        ),
        source: "SLR Framework: FittedISMIP workflow".to_string(),
        scenario: scenario.to_string(),
        baseyear,
    }
}
