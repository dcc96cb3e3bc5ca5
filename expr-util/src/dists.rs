//! Differentiable distribution primitives over expressions.
//!
//! Closed-form entropy and log-density pieces used by the variational
//! layer. Each function builds an expression; nothing here draws
//! randomness or owns parameters.
//!
//! Conventions: log-Jacobian terms are `Σ ln |f'(x)|` over all elements,
//! to be *added* to a parent entropy under a change of variables.

use std::f64::consts::PI;

use crate::error::Result;
use crate::expr::Expr;

/// Elementwise Gaussian differential entropy `0.5 · ln(2πe·σ²)`.
pub fn gaussian_entropy(variance: &Expr) -> Result<Expr> {
    let ln_2pi_e = Expr::scalar((2.0 * PI).ln() + 1.0);
    ln_2pi_e
        .add(&variance.ln()?)?
        .mul(&Expr::scalar(0.5))
}

/// Elementwise Gaussian log density `−0.5 · [(x−μ)²/σ² + ln σ² + ln 2π]`.
pub fn gaussian_log_density(x: &Expr, mean: &Expr, variance: &Expr) -> Result<Expr> {
    let resid = x.sub(mean)?.square()?.div(variance)?;
    resid
        .add(&variance.ln()?)?
        .add(&Expr::scalar((2.0 * PI).ln()))?
        .mul(&Expr::scalar(-0.5))
}

/// Elementwise Bernoulli entropy `−[p·ln p + (1−p)·ln(1−p)]`.
pub fn bernoulli_entropy(p: &Expr) -> Result<Expr> {
    let q = Expr::scalar(1.0).sub(p)?;
    p.mul(&p.ln()?)?.add(&q.mul(&q.ln()?)?)?.neg()
}

/// Sigmoid squashing of log-odds.
///
/// Returns `(p, log_jacobian)` where `p = 1 / (1 + e^{−x})` and the
/// log-Jacobian is `Σ [ln p + ln(1−p)]`, the summed log derivative of
/// the sigmoid.
pub fn logit(log_odds: &Expr) -> Result<(Expr, Expr)> {
    let p = log_odds.sigmoid()?;
    let one_minus_p = Expr::scalar(1.0).sub(&p)?;
    let log_jacobian = p.ln()?.add(&one_minus_p.ln()?)?.sum_all()?;
    Ok((p, log_jacobian))
}
