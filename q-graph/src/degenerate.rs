//! Degenerate (non-random) variational distributions.

use expr_util::eval::Bindings;
use expr_util::expr::{Expr, Value};
use expr_util::noise::NoiseSource;

use crate::error::Result;
use crate::qdist::QDistribution;

/// Point mass on a fixed observed value.
///
/// Contributes its value to the sampling graph but no entropy and no
/// randomness.
#[derive(Debug)]
pub struct ObservedQ {
    shape: Vec<usize>,
    sample: Expr,
}

impl ObservedQ {
    pub fn new(observed: Value) -> Self {
        let shape = observed.shape().to_vec();
        Self {
            shape,
            sample: Expr::constant(observed),
        }
    }
}

impl QDistribution for ObservedQ {
    fn output_shape(&self) -> &[usize] {
        &self.shape
    }

    fn sample(&self) -> &Expr {
        &self.sample
    }

    fn sample_stochastic_inputs(&self, _noise: &mut dyn NoiseSource) -> Result<Bindings> {
        Ok(Bindings::new())
    }

    fn entropy(&self) -> Result<Expr> {
        Ok(Expr::scalar(0.0))
    }
}

/// Point mass on an expression defined elsewhere in the graph, e.g. a
/// deterministic function of other latents.
#[derive(Debug)]
pub struct DeltaQ {
    shape: Vec<usize>,
    sample: Expr,
}

impl DeltaQ {
    pub fn new(value: Expr) -> Self {
        let shape = value.shape().to_vec();
        Self {
            shape,
            sample: value,
        }
    }
}

impl QDistribution for DeltaQ {
    fn output_shape(&self) -> &[usize] {
        &self.shape
    }

    fn sample(&self) -> &Expr {
        &self.sample
    }

    fn sample_stochastic_inputs(&self, _noise: &mut dyn NoiseSource) -> Result<Bindings> {
        Ok(Bindings::new())
    }

    fn entropy(&self) -> Result<Expr> {
        Ok(Expr::scalar(0.0))
    }
}
