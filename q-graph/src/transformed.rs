//! Q distributions derived from a parent distribution.
//!
//! These are never attached explicitly: the transpose and implicit
//! pointwise forms are synthesized by the lazy-attachment mechanism on
//! the transform node (`crate::graph`), and the reparameterized
//! pointwise form is how new families (e.g. log-normal) are built from
//! an existing parent.

use std::collections::HashMap;
use std::rc::Rc;

use expr_util::eval::Bindings;
use expr_util::expr::Expr;
use expr_util::noise::NoiseSource;

use crate::error::{Error, Result};
use crate::qdist::QDistribution;
use crate::transforms::PointwiseTransform;

/// Structural transpose of a parent distribution.
///
/// Every entry of the parent's parameter registry is transposed, so the
/// derived sample is exactly the transpose of the parent's sample under
/// the same noise. Entropy is fixed at zero: a transpose is a
/// measure-preserving relabeling of elements, so it carries no
/// change-of-variables correction. That shortcut is NOT valid for
/// shape-changing transforms in general; do not extend this type beyond
/// permutations.
#[derive(Debug)]
pub struct TransposeQ {
    parent: Rc<dyn QDistribution>,
    shape: Vec<usize>,
    params: HashMap<&'static str, Expr>,
    sample: Expr,
}

impl TransposeQ {
    pub(crate) fn derive(parent: Rc<dyn QDistribution>) -> Result<Self> {
        let parent_shape = parent.output_shape();
        if parent_shape.len() != 2 {
            return Err(Error::ShapeMismatch(format!(
                "transpose requires a rank-2 parent, found shape {:?}",
                parent_shape
            )));
        }
        let shape = vec![parent_shape[1], parent_shape[0]];

        // explicit registry walk: whatever the parent names, transposed
        let mut params = HashMap::new();
        for (name, expr) in parent.params() {
            params.insert(name, expr.t()?);
        }
        let sample = parent.sample().t()?;

        Ok(Self {
            parent,
            shape,
            params,
            sample,
        })
    }
}

impl QDistribution for TransposeQ {
    fn output_shape(&self) -> &[usize] {
        &self.shape
    }

    fn sample(&self) -> &Expr {
        &self.sample
    }

    fn params(&self) -> HashMap<&'static str, Expr> {
        self.params.clone()
    }

    fn sample_stochastic_inputs(&self, noise: &mut dyn NoiseSource) -> Result<Bindings> {
        self.parent.sample_stochastic_inputs(noise)
    }

    fn entropy(&self) -> Result<Expr> {
        Ok(Expr::scalar(0.0))
    }
}

/// Shared state of both pointwise-transformed modes. Opaque: only the
/// constructors on `PointwiseTransformedQ` build one.
#[derive(Debug)]
pub struct TransformedCore {
    parent: Rc<dyn QDistribution>,
    shape: Vec<usize>,
    sample: Expr,
    log_jacobian: Expr,
}

impl TransformedCore {
    fn derive(parent: Rc<dyn QDistribution>, transform: &dyn PointwiseTransform) -> Result<Self> {
        let (sample, log_jacobian) = transform.apply(parent.sample())?;
        if sample.shape() != parent.output_shape() {
            return Err(Error::ShapeMismatch(format!(
                "pointwise transform `{}` changed shape {:?} to {:?}",
                transform.name(),
                parent.output_shape(),
                sample.shape()
            )));
        }
        let shape = parent.output_shape().to_vec();
        Ok(Self {
            parent,
            shape,
            sample,
            log_jacobian,
        })
    }
}

/// Pointwise transform of a parent distribution, in one of two modes
/// with non-overlapping entropy/noise accounting.
///
/// *Implicit*: a bookkeeping view over a deterministic transform node.
/// The ELBO expectation is taken with respect to the untransformed
/// parent, so the view contributes no entropy and requests no noise —
/// the parent already accounts for both.
///
/// *Reparameterized*: a genuinely new distribution (a new family such
/// as log-normal). Entropy is the parent's entropy plus the
/// log-Jacobian of the change of variables, and the noise request
/// passes through to the parent.
///
/// Exactly one of {parent, implicit view} ever requests fresh noise for
/// a given latent, which keeps randomness from being double-counted.
#[derive(Debug)]
pub enum PointwiseTransformedQ {
    Implicit(TransformedCore),
    Reparameterized(TransformedCore),
}

impl PointwiseTransformedQ {
    /// View form, used by lazy attachment on transform nodes.
    pub(crate) fn implicit(
        parent: Rc<dyn QDistribution>,
        transform: &dyn PointwiseTransform,
    ) -> Result<Self> {
        Ok(Self::Implicit(TransformedCore::derive(parent, transform)?))
    }

    /// New-family form, e.g. `exp` of a Gaussian parent for a
    /// log-normal posterior.
    pub fn new_family(
        parent: Rc<dyn QDistribution>,
        transform: &dyn PointwiseTransform,
    ) -> Result<Self> {
        Ok(Self::Reparameterized(TransformedCore::derive(
            parent, transform,
        )?))
    }

    fn core(&self) -> &TransformedCore {
        match self {
            Self::Implicit(core) | Self::Reparameterized(core) => core,
        }
    }

    /// The scalar log-Jacobian of the transform.
    pub fn log_jacobian(&self) -> &Expr {
        &self.core().log_jacobian
    }
}

impl QDistribution for PointwiseTransformedQ {
    fn output_shape(&self) -> &[usize] {
        &self.core().shape
    }

    fn sample(&self) -> &Expr {
        &self.core().sample
    }

    fn sample_stochastic_inputs(&self, noise: &mut dyn NoiseSource) -> Result<Bindings> {
        match self {
            Self::Implicit(_) => Ok(Bindings::new()),
            Self::Reparameterized(core) => core.parent.sample_stochastic_inputs(noise),
        }
    }

    fn entropy(&self) -> Result<Expr> {
        match self {
            Self::Implicit(_) => Ok(Expr::scalar(0.0)),
            Self::Reparameterized(core) => Ok(core.parent.entropy()?.add(&core.log_jacobian)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaussian::GaussianQ;
    use crate::transforms::ExpTransform;
    use approx::assert_abs_diff_eq;
    use expr_util::noise::RngNoise;

    fn gaussian_parent(shape: &[usize], seed: u64) -> Rc<dyn QDistribution> {
        let mut noise = RngNoise::seeded(seed);
        Rc::new(GaussianQ::new(shape, &mut noise).unwrap())
    }

    #[test]
    fn transpose_requires_a_matrix_parent() {
        let parent = gaussian_parent(&[5], 1);
        assert!(TransposeQ::derive(parent).is_err());
    }

    #[test]
    fn transpose_flips_shape_and_sample() {
        let parent = gaussian_parent(&[3, 4], 2);
        let tq = TransposeQ::derive(parent.clone()).unwrap();
        assert_eq!(tq.output_shape(), &[4, 3]);
        assert_eq!(
            tq.entropy().unwrap().eval(&Bindings::new()).unwrap().sum(),
            0.0
        );

        let mut noise = RngNoise::seeded(3);
        let bindings = tq.sample_stochastic_inputs(&mut noise).unwrap();
        let parent_sample = parent.sample().eval(&bindings).unwrap();
        let derived_sample = tq.sample().eval(&bindings).unwrap();
        assert_abs_diff_eq!(
            derived_sample,
            parent_sample.reversed_axes(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn implicit_view_defers_all_accounting_to_the_parent() {
        let parent = gaussian_parent(&[4], 4);
        let view = PointwiseTransformedQ::implicit(parent, &ExpTransform).unwrap();

        let mut noise = RngNoise::seeded(5);
        assert!(view
            .sample_stochastic_inputs(&mut noise)
            .unwrap()
            .is_empty());
        assert_eq!(
            view.entropy().unwrap().eval(&Bindings::new()).unwrap().sum(),
            0.0
        );
    }

    #[test]
    fn new_family_adds_the_log_jacobian() {
        let parent = gaussian_parent(&[4], 6);
        let lognormal = PointwiseTransformedQ::new_family(parent.clone(), &ExpTransform).unwrap();

        let mut noise = RngNoise::seeded(7);
        let bindings = lognormal.sample_stochastic_inputs(&mut noise).unwrap();
        assert_eq!(bindings.len(), 1);

        let h = lognormal.entropy().unwrap().eval(&bindings).unwrap().sum();
        let parent_h = parent.entropy().unwrap().eval(&bindings).unwrap().sum();
        let lj = lognormal.log_jacobian().eval(&bindings).unwrap().sum();
        assert_abs_diff_eq!(h, parent_h + lj, epsilon = 1e-10);

        // sample really is exp(parent sample)
        let parent_sample = parent.sample().eval(&bindings).unwrap();
        let derived = lognormal.sample().eval(&bindings).unwrap();
        assert_abs_diff_eq!(derived, parent_sample.mapv(f64::exp), epsilon = 1e-12);
        assert!(derived.iter().all(|&v| v > 0.0));
    }
}
