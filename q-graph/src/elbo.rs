//! ELBO assembly helpers.
//!
//! The optimizer needs two aggregates per evaluation step: the total
//! entropy bonus and one set of fresh noise bindings covering every
//! distribution in the model. Both resolve distributions through the
//! nodes, so lazily derived transforms materialize on first use here.

use std::rc::Rc;

use expr_util::eval::Bindings;
use expr_util::expr::Expr;
use expr_util::noise::NoiseSource;

use crate::error::{Error, Result};
use crate::graph::ModelNode;

/// Sum of every node's entropy as one scalar expression.
pub fn total_entropy(nodes: &[Rc<ModelNode>]) -> Result<Expr> {
    let mut total = Expr::scalar(0.0);
    for node in nodes {
        let q = node.q_distribution()?;
        total = total.add(&q.entropy()?)?;
    }
    Ok(total)
}

/// Fresh noise bindings for one evaluation step, across all nodes.
///
/// Placeholder names are unique per distribution, so the union is
/// disjoint; a collision means two distributions share a placeholder
/// and is reported rather than silently overwritten. Implicit transform
/// views contribute nothing here — their parents already did.
pub fn gather_stochastic_inputs(
    nodes: &[Rc<ModelNode>],
    noise: &mut dyn NoiseSource,
) -> Result<Bindings> {
    let mut all = Bindings::new();
    for node in nodes {
        let q = node.q_distribution()?;
        for (name, value) in q.sample_stochastic_inputs(noise)? {
            if all.contains_key(&name) {
                return Err(Error::DuplicateNoiseInput(name));
            }
            all.insert(name, value);
        }
    }
    Ok(all)
}
