//! Mean-field Gaussian variational distribution.

use std::collections::HashMap;

use ndarray::{ArrayD, IxDyn};

use expr_util::dists;
use expr_util::eval::Bindings;
use expr_util::expr::{fresh_name, Expr, Parameter};
use expr_util::noise::NoiseSource;

use crate::error::Result;
use crate::qdist::QDistribution;

/// Warm-start bias: a strongly negative initial log-stddev makes the
/// initial distribution near-deterministic around its mean.
const INIT_LOG_STDDEV: f64 = -10.0;

/// How the entropy expression is formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntropyEstimate {
    /// Exact `0.5 · Σ ln(2πe·σ²)`.
    ClosedForm,
    /// `−Σ log q(sample)` over the realized sample. Biased but
    /// differentiable; the stand-in used when a closed form is not
    /// available for a family built on top of this one.
    MonteCarlo,
}

/// Diagonal Gaussian `q(θ) = N(μ, diag(σ²))` with the reparameterized
/// sample `θ = ε·σ + μ`, `ε ~ N(0, I)` drawn fresh per evaluation.
///
/// `σ = exp(log_stddev)` keeps the scale positive without constrained
/// optimization. The mean initializes from a standard-normal draw.
#[derive(Debug)]
pub struct GaussianQ {
    shape: Vec<usize>,
    mean: Parameter,
    log_stddev: Parameter,
    stddev: Expr,
    sample: Expr,
    eps_name: String,
    entropy: Expr,
}

impl GaussianQ {
    /// Closed-form entropy variant.
    pub fn new(shape: &[usize], noise: &mut dyn NoiseSource) -> Result<Self> {
        Self::with_entropy(shape, EntropyEstimate::ClosedForm, noise)
    }

    /// Choose the entropy estimator per instance.
    pub fn with_entropy(
        shape: &[usize],
        estimate: EntropyEstimate,
        noise: &mut dyn NoiseSource,
    ) -> Result<Self> {
        // also validates that the noise source can realize this shape
        let init_mean = noise.draw_normal(shape)?;
        let mean = Parameter::new("mean", init_mean);
        let log_stddev = Parameter::new(
            "log_stddev",
            ArrayD::from_elem(IxDyn(shape), INIT_LOG_STDDEV),
        );

        let mean_expr = Expr::param(&mean);
        let stddev = Expr::param(&log_stddev).exp()?;
        let variance = stddev.square()?;

        let eps_name = fresh_name("eps");
        let eps = Expr::placeholder(&eps_name, shape);
        let sample = eps.mul(&stddev)?.add(&mean_expr)?;

        let entropy = match estimate {
            EntropyEstimate::ClosedForm => dists::gaussian_entropy(&variance)?.sum_all()?,
            EntropyEstimate::MonteCarlo => {
                dists::gaussian_log_density(&sample, &mean_expr, &variance)?
                    .sum_all()?
                    .neg()?
            }
        };

        Ok(Self {
            shape: shape.to_vec(),
            mean,
            log_stddev,
            stddev,
            sample,
            eps_name,
            entropy,
        })
    }

    /// Mean parameter, for the optimizer.
    pub fn mean(&self) -> &Parameter {
        &self.mean
    }

    /// Log-stddev parameter, for the optimizer.
    pub fn log_stddev(&self) -> &Parameter {
        &self.log_stddev
    }
}

impl QDistribution for GaussianQ {
    fn output_shape(&self) -> &[usize] {
        &self.shape
    }

    fn sample(&self) -> &Expr {
        &self.sample
    }

    fn params(&self) -> HashMap<&'static str, Expr> {
        HashMap::from([
            ("mean", Expr::param(&self.mean)),
            ("stddev", self.stddev.clone()),
            ("sample", self.sample.clone()),
        ])
    }

    fn sample_stochastic_inputs(&self, noise: &mut dyn NoiseSource) -> Result<Bindings> {
        let eps = noise.draw_normal(&self.shape)?;
        Ok(Bindings::from([(self.eps_name.clone(), eps)]))
    }

    fn entropy(&self) -> Result<Expr> {
        Ok(self.entropy.clone())
    }
}
