//! Seeded random stream for a projection run
//!
//! A run draws random numbers in a fixed sequence:
//!
//! 1. one trend quantile per sample, shared by every ice source
//! 2. for each ice source, one parameter-set index per sample
//! 3. for each ice source, one perturbation per sample
//!
//! [`ProjectionRng`] encodes this sequence in its type parameter. Each draw consumes the
//! stream and hands back the stream for the next stage, so a run cannot reorder the draws
//! and the same seed always reproduces the same ensemble.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::marker::PhantomData;

/// Stage: the trend quantiles have not been drawn yet
#[derive(Debug)]
pub struct TrendQuantiles;
/// Stage: ready to draw parameter indices for the next ice source
#[derive(Debug)]
pub struct ParameterIndices;
/// Stage: drawing per-sample perturbations for the current ice source
#[derive(Debug)]
pub struct Perturbations;

#[derive(Debug)]
pub struct ProjectionRng<S> {
    rng: ChaCha8Rng,
    _stage: PhantomData<S>,
}

impl<S> ProjectionRng<S> {
    fn advance<T>(self) -> ProjectionRng<T> {
        ProjectionRng {
            rng: self.rng,
            _stage: PhantomData,
        }
    }
}

impl ProjectionRng<TrendQuantiles> {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            _stage: PhantomData,
        }
    }

    /// Draw `n` uniform quantiles in `[0, 1)`
    pub fn draw_trend_quantiles(mut self, n: usize) -> (Vec<f64>, ProjectionRng<ParameterIndices>) {
        let quantiles = (0..n).map(|_| self.rng.gen::<f64>()).collect();
        (quantiles, self.advance())
    }
}

impl ProjectionRng<ParameterIndices> {
    /// Draw `n` indices uniformly from `[0, n_sets)` with replacement
    ///
    /// # Panics
    ///
    /// Panics if `n_sets` is zero.
    pub fn draw_parameter_indices(
        mut self,
        n: usize,
        n_sets: usize,
    ) -> (Vec<usize>, ProjectionRng<Perturbations>) {
        let indices = (0..n).map(|_| self.rng.gen_range(0..n_sets)).collect();
        (indices, self.advance())
    }
}

impl ProjectionRng<Perturbations> {
    /// Draw a uniform value in `[-spread, spread)`
    ///
    /// A draw is consumed even when `spread` is zero so the stream position does not
    /// depend on the configured spread.
    pub fn draw_perturbation(&mut self, spread: f64) -> f64 {
        let u: f64 = self.rng.gen();
        spread * (2.0 * u - 1.0)
    }

    /// Finish the current ice source
    pub fn next_source(self) -> ProjectionRng<ParameterIndices> {
        self.advance()
    }
}
