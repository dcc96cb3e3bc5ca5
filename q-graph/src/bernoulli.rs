//! Bernoulli variational distribution.

use std::collections::HashMap;

use expr_util::dists;
use expr_util::eval::Bindings;
use expr_util::expr::{fresh_name, Expr, Parameter};
use expr_util::noise::NoiseSource;

use crate::error::Result;
use crate::qdist::QDistribution;

/// Elementwise Bernoulli `q(b) = Bernoulli(p)` with `p = sigmoid(log_odds)`.
///
/// The sample is the indicator `u < p` over fresh uniform noise, so it
/// is a 0/1 `Bool` value and is *not* reparameterized in the continuous
/// sense: gradients through the discrete draw are out of scope here and
/// need a score-function or relaxed estimator upstream. The entropy is
/// the closed-form Bernoulli entropy of `p`, summed over elements.
#[derive(Debug)]
pub struct BernoulliQ {
    shape: Vec<usize>,
    probs: Expr,
    sample: Expr,
    uniform_name: String,
    entropy: Expr,
}

impl BernoulliQ {
    pub fn new(shape: &[usize], noise: &mut dyn NoiseSource) -> Result<Self> {
        // also validates that the noise source can realize this shape
        let init_log_odds = noise.draw_normal(shape)?;
        let log_odds = Parameter::new("log_odds", init_log_odds);

        let (probs, _log_jacobian) = dists::logit(&Expr::param(&log_odds))?;

        let uniform_name = fresh_name("u");
        let uniform = Expr::placeholder(&uniform_name, shape);
        let sample = uniform.lt(&probs)?;

        let entropy = dists::bernoulli_entropy(&probs)?.sum_all()?;

        Ok(Self {
            shape: shape.to_vec(),
            probs,
            sample,
            uniform_name,
            entropy,
        })
    }

    /// The success probability expression `sigmoid(log_odds)`.
    pub fn probs(&self) -> &Expr {
        &self.probs
    }
}

impl QDistribution for BernoulliQ {
    fn output_shape(&self) -> &[usize] {
        &self.shape
    }

    fn sample(&self) -> &Expr {
        &self.sample
    }

    fn params(&self) -> HashMap<&'static str, Expr> {
        HashMap::from([
            ("probs", self.probs.clone()),
            ("sample", self.sample.clone()),
        ])
    }

    fn sample_stochastic_inputs(&self, noise: &mut dyn NoiseSource) -> Result<Bindings> {
        let u = noise.draw_uniform(&self.shape)?;
        Ok(Bindings::from([(self.uniform_name.clone(), u)]))
    }

    fn entropy(&self) -> Result<Expr> {
        Ok(self.entropy.clone())
    }
}
