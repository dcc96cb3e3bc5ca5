//! Reference evaluator for expressions.
//!
//! This is a stand-in for a full evaluation engine: it walks the
//! expression tree once per call, substituting placeholder bindings. It
//! computes values only, no gradients.

use std::collections::HashMap;

use ndarray::arr0;

use crate::error::{Error, Result};
use crate::expr::{Expr, Node, Value};
use crate::expr::{BinaryOp, UnaryOp};

/// Placeholder name to concrete value, one entry per free input.
pub type Bindings = HashMap<String, Value>;

/// Elementwise combine with rank-0 broadcast on either side.
fn broadcast_zip(lhs: Value, rhs: Value, f: impl Fn(f64, f64) -> f64) -> Value {
    if lhs.shape() == rhs.shape() {
        let mut out = lhs;
        out.zip_mut_with(&rhs, |a, &b| *a = f(*a, b));
        out
    } else if lhs.ndim() == 0 {
        let l = lhs.sum();
        rhs.mapv(|b| f(l, b))
    } else {
        let r = rhs.sum();
        lhs.mapv(|a| f(a, r))
    }
}

impl Expr {
    /// Evaluate the expression under the given placeholder bindings.
    pub fn eval(&self, bindings: &Bindings) -> Result<Value> {
        match &*self.node {
            Node::Constant(v) => Ok(v.clone()),
            Node::Placeholder(name) => {
                let bound = bindings
                    .get(name)
                    .ok_or_else(|| Error::UnboundPlaceholder(name.clone()))?;
                if bound.shape() != self.shape() {
                    return Err(Error::ShapeMismatch(format!(
                        "placeholder `{}` declares shape {:?} but was bound to shape {:?}",
                        name,
                        self.shape(),
                        bound.shape()
                    )));
                }
                Ok(bound.clone())
            }
            Node::Param(p) => Ok(p.value()),
            Node::Unary(op, a) => {
                let x = a.eval(bindings)?;
                Ok(match op {
                    UnaryOp::Neg => x.mapv(|v| -v),
                    UnaryOp::Exp => x.mapv(f64::exp),
                    UnaryOp::Ln => x.mapv(f64::ln),
                    UnaryOp::Square => x.mapv(|v| v * v),
                    UnaryOp::Sigmoid => x.mapv(|v| 1.0 / (1.0 + (-v).exp())),
                })
            }
            Node::Binary(op, a, b) => {
                let x = a.eval(bindings)?;
                let y = b.eval(bindings)?;
                Ok(match op {
                    BinaryOp::Add => broadcast_zip(x, y, |u, v| u + v),
                    BinaryOp::Sub => broadcast_zip(x, y, |u, v| u - v),
                    BinaryOp::Mul => broadcast_zip(x, y, |u, v| u * v),
                    BinaryOp::Div => broadcast_zip(x, y, |u, v| u / v),
                })
            }
            Node::Less(a, b) => {
                let x = a.eval(bindings)?;
                let y = b.eval(bindings)?;
                Ok(broadcast_zip(x, y, |u, v| if u < v { 1.0 } else { 0.0 }))
            }
            Node::Transpose(a) => Ok(a.eval(bindings)?.reversed_axes()),
            Node::SumAll(a) => Ok(arr0(a.eval(bindings)?.sum()).into_dyn()),
        }
    }
}
