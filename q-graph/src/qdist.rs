use std::collections::HashMap;

use expr_util::eval::Bindings;
use expr_util::expr::Expr;
use expr_util::noise::NoiseSource;

use crate::error::{Error, Result};

/// An approximating (variational) posterior attached to a graph node.
///
/// The sample expression must be a pure deterministic function of the
/// distribution's parameters and its declared free-noise placeholders:
/// all randomness enters through `sample_stochastic_inputs`, never
/// through hidden state. This is what lets gradients flow through the
/// sample (the reparameterization trick).
///
/// The three operations `params`, `sample_stochastic_inputs` and
/// `entropy` are the entire surface an ELBO optimizer needs: node
/// values come from the `"sample"` expression evaluated under the
/// returned bindings, and the entropy bonus is the sum of every
/// attached distribution's `entropy()`.
pub trait QDistribution: std::fmt::Debug {
    /// Shape of the sample, fixed at construction.
    fn output_shape(&self) -> &[usize];

    /// The sample expression; shape equals `output_shape`.
    fn sample(&self) -> &Expr;

    /// Named parameter expressions, always including `"sample"`.
    /// Infallible by contract.
    fn params(&self) -> HashMap<&'static str, Expr> {
        HashMap::from([("sample", self.sample().clone())])
    }

    /// Fresh concrete noise for one evaluation step, one entry per
    /// declared free-noise placeholder. Repeated calls draw independent
    /// noise; degenerate variants return an empty map.
    fn sample_stochastic_inputs(&self, noise: &mut dyn NoiseSource) -> Result<Bindings>;

    /// Scalar entropy contribution to the ELBO.
    fn entropy(&self) -> Result<Expr>;

    /// Log density of the distribution. Reserved for density-based
    /// objectives; no current variant implements it.
    fn density(&self) -> Result<Expr> {
        Err(Error::NotImplemented("density"))
    }
}
