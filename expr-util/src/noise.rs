//! Randomness source contract for reparameterized sampling.

use ndarray::{ArrayD, IxDyn};
use rand::distr::StandardUniform;
use rand::rngs::{StdRng, ThreadRng};
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::error::{Error, Result};
use crate::expr::Value;

/// Supplier of raw base randomness.
///
/// Q distributions consume a noise source per draw but never own one;
/// the caller decides whether draws are seeded or from the thread RNG.
pub trait NoiseSource {
    /// Standard normal array of the given shape.
    fn draw_normal(&mut self, shape: &[usize]) -> Result<Value>;

    /// Uniform `[0, 1)` array of the given shape.
    fn draw_uniform(&mut self, shape: &[usize]) -> Result<Value>;
}

/// Any dimension of zero cannot be realized as a noise array.
fn validate_shape(shape: &[usize]) -> Result<()> {
    if shape.iter().any(|&d| d == 0) {
        return Err(Error::InvalidShape(shape.to_vec()));
    }
    Ok(())
}

/// `NoiseSource` backed by any `rand` RNG.
pub struct RngNoise<R: Rng> {
    rng: R,
}

impl RngNoise<ThreadRng> {
    /// Thread-local, OS-seeded source.
    pub fn new() -> Self {
        Self { rng: rand::rng() }
    }
}

impl Default for RngNoise<ThreadRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl RngNoise<StdRng> {
    /// Deterministic source for reproducible runs and tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> RngNoise<R> {
    pub fn from_rng(rng: R) -> Self {
        Self { rng }
    }

    fn fill(&mut self, shape: &[usize], mut draw: impl FnMut(&mut R) -> f64) -> Result<Value> {
        validate_shape(shape)?;
        let n: usize = shape.iter().product();
        let data: Vec<f64> = (0..n).map(|_| draw(&mut self.rng)).collect();
        ArrayD::from_shape_vec(IxDyn(shape), data)
            .map_err(|_| Error::InvalidShape(shape.to_vec()))
    }
}

impl<R: Rng> NoiseSource for RngNoise<R> {
    fn draw_normal(&mut self, shape: &[usize]) -> Result<Value> {
        self.fill(shape, |rng| rng.sample(StandardNormal))
    }

    fn draw_uniform(&mut self, shape: &[usize]) -> Result<Value> {
        self.fill(shape, |rng| rng.sample(StandardUniform))
    }
}
