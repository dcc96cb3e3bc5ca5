//! Pointwise (elementwise) transform functions.

use expr_util::dists;
use expr_util::expr::Expr;

use crate::error::Result;

/// An elementwise, shape-preserving change of variables.
///
/// `apply` returns the transformed expression together with the scalar
/// log-Jacobian `Σ ln |f'(x)|`, the correction a non-implicit
/// transformed distribution adds to its parent's entropy.
pub trait PointwiseTransform {
    fn name(&self) -> &'static str;

    fn apply(&self, input: &Expr) -> Result<(Expr, Expr)>;
}

/// `y = e^x`; turns a Gaussian parent into a log-normal.
/// Log-Jacobian is `Σ x`.
pub struct ExpTransform;

impl PointwiseTransform for ExpTransform {
    fn name(&self) -> &'static str {
        "exp"
    }

    fn apply(&self, input: &Expr) -> Result<(Expr, Expr)> {
        Ok((input.exp()?, input.sum_all()?))
    }
}

/// `y = sigmoid(x)`; squashes onto the open unit interval.
pub struct LogitTransform;

impl PointwiseTransform for LogitTransform {
    fn name(&self) -> &'static str {
        "logit"
    }

    fn apply(&self, input: &Expr) -> Result<(Expr, Expr)> {
        Ok(dists::logit(input)?)
    }
}
