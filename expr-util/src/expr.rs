use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use ndarray::{arr0, ArrayD};

use crate::error::{Error, Result};

/// Concrete array value carried by expressions.
pub type Value = ArrayD<f64>;

/// Element type tag carried alongside each expression.
///
/// `Bool` values are stored as 0/1 arrays; they are produced only by
/// comparisons and cannot participate in arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    F64,
    Bool,
}

/// An optimizer-mutable named array.
///
/// The shape is fixed at construction; `set` replaces the value but
/// never the shape. Cloning a `Parameter` aliases the same cell, so an
/// expression referencing it always sees the latest value.
#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    value: Rc<RefCell<Value>>,
}

impl Parameter {
    pub fn new(name: &str, init: Value) -> Self {
        Self {
            name: name.to_string(),
            value: Rc::new(RefCell::new(init)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> Vec<usize> {
        self.value.borrow().shape().to_vec()
    }

    /// Current value (cloned out of the cell).
    pub fn value(&self) -> Value {
        self.value.borrow().clone()
    }

    /// Replace the value, keeping the shape.
    pub fn set(&self, value: Value) -> Result<()> {
        if value.shape() != self.value.borrow().shape() {
            return Err(Error::ShapeMismatch(format!(
                "parameter `{}` has shape {:?}, new value has shape {:?}",
                self.name,
                self.shape(),
                value.shape()
            )));
        }
        *self.value.borrow_mut() = value;
        Ok(())
    }
}

static NAME_SEQ: AtomicU64 = AtomicU64::new(0);

/// Globally unique name with the given prefix, e.g. `eps_7`.
///
/// Used to key free-noise placeholders so that bindings drawn for one
/// distribution can never collide with another's.
pub fn fresh_name(prefix: &str) -> String {
    let n = NAME_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{}_{}", prefix, n)
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum UnaryOp {
    Neg,
    Exp,
    Ln,
    Square,
    Sigmoid,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug)]
pub(crate) enum Node {
    Constant(Value),
    Placeholder(String),
    Param(Parameter),
    Unary(UnaryOp, Expr),
    Binary(BinaryOp, Expr, Expr),
    Less(Expr, Expr),
    Transpose(Expr),
    SumAll(Expr),
}

/// A symbolic array expression.
///
/// Expressions are immutable trees with shape and dtype fixed at
/// construction time; shape and dtype violations surface as errors when
/// the expression is built, not when it is evaluated. Cloning is cheap
/// (reference counted). Expressions are single-threaded by design.
#[derive(Debug, Clone)]
pub struct Expr {
    pub(crate) node: Rc<Node>,
    shape: Vec<usize>,
    dtype: DType,
}

impl Expr {
    fn wrap(node: Node, shape: Vec<usize>, dtype: DType) -> Self {
        Self {
            node: Rc::new(node),
            shape,
            dtype,
        }
    }

    /// A fixed array value.
    pub fn constant(value: Value) -> Self {
        let shape = value.shape().to_vec();
        Self::wrap(Node::Constant(value), shape, DType::F64)
    }

    /// A rank-0 constant.
    pub fn scalar(value: f64) -> Self {
        Self::wrap(Node::Constant(arr0(value).into_dyn()), vec![], DType::F64)
    }

    /// A named free input, bound to a concrete array at evaluation time.
    pub fn placeholder(name: &str, shape: &[usize]) -> Self {
        Self::wrap(
            Node::Placeholder(name.to_string()),
            shape.to_vec(),
            DType::F64,
        )
    }

    /// A reference to a mutable parameter cell.
    pub fn param(param: &Parameter) -> Self {
        let shape = param.shape();
        Self::wrap(Node::Param(param.clone()), shape, DType::F64)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn is_scalar(&self) -> bool {
        self.shape.is_empty()
    }

    fn require_f64(&self, what: &str) -> Result<()> {
        if self.dtype != DType::F64 {
            return Err(Error::DTypeMismatch(format!(
                "{} requires f64 operands, found {:?}",
                what, self.dtype
            )));
        }
        Ok(())
    }

    /// Result shape of an elementwise pairing, allowing one rank-0 side.
    fn paired_shape(&self, rhs: &Expr, what: &str) -> Result<Vec<usize>> {
        if self.shape == rhs.shape {
            Ok(self.shape.clone())
        } else if self.is_scalar() {
            Ok(rhs.shape.clone())
        } else if rhs.is_scalar() {
            Ok(self.shape.clone())
        } else {
            Err(Error::ShapeMismatch(format!(
                "{} over incompatible shapes {:?} and {:?}",
                what, self.shape, rhs.shape
            )))
        }
    }

    fn binary(&self, op: BinaryOp, rhs: &Expr) -> Result<Expr> {
        self.require_f64("arithmetic")?;
        rhs.require_f64("arithmetic")?;
        let shape = self.paired_shape(rhs, "arithmetic")?;
        Ok(Self::wrap(
            Node::Binary(op, self.clone(), rhs.clone()),
            shape,
            DType::F64,
        ))
    }

    pub fn add(&self, rhs: &Expr) -> Result<Expr> {
        self.binary(BinaryOp::Add, rhs)
    }

    pub fn sub(&self, rhs: &Expr) -> Result<Expr> {
        self.binary(BinaryOp::Sub, rhs)
    }

    pub fn mul(&self, rhs: &Expr) -> Result<Expr> {
        self.binary(BinaryOp::Mul, rhs)
    }

    pub fn div(&self, rhs: &Expr) -> Result<Expr> {
        self.binary(BinaryOp::Div, rhs)
    }

    fn unary(&self, op: UnaryOp) -> Result<Expr> {
        self.require_f64("elementwise map")?;
        Ok(Self::wrap(
            Node::Unary(op, self.clone()),
            self.shape.clone(),
            DType::F64,
        ))
    }

    pub fn neg(&self) -> Result<Expr> {
        self.unary(UnaryOp::Neg)
    }

    pub fn exp(&self) -> Result<Expr> {
        self.unary(UnaryOp::Exp)
    }

    pub fn ln(&self) -> Result<Expr> {
        self.unary(UnaryOp::Ln)
    }

    pub fn square(&self) -> Result<Expr> {
        self.unary(UnaryOp::Square)
    }

    pub fn sigmoid(&self) -> Result<Expr> {
        self.unary(UnaryOp::Sigmoid)
    }

    /// Elementwise `self < rhs`, yielding a 0/1 indicator with `Bool` dtype.
    pub fn lt(&self, rhs: &Expr) -> Result<Expr> {
        self.require_f64("comparison")?;
        rhs.require_f64("comparison")?;
        let shape = self.paired_shape(rhs, "comparison")?;
        Ok(Self::wrap(
            Node::Less(self.clone(), rhs.clone()),
            shape,
            DType::Bool,
        ))
    }

    /// Matrix transpose; defined for rank-2 expressions only.
    pub fn t(&self) -> Result<Expr> {
        if self.shape.len() != 2 {
            return Err(Error::ShapeMismatch(format!(
                "transpose requires a rank-2 expression, found shape {:?}",
                self.shape
            )));
        }
        let shape = vec![self.shape[1], self.shape[0]];
        Ok(Self::wrap(Node::Transpose(self.clone()), shape, self.dtype))
    }

    /// Sum over every element, yielding a rank-0 expression.
    pub fn sum_all(&self) -> Result<Expr> {
        self.require_f64("sum")?;
        Ok(Self::wrap(Node::SumAll(self.clone()), vec![], DType::F64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    #[test]
    fn binary_shapes_must_agree_or_broadcast_scalar() {
        let a = Expr::constant(Value::zeros(IxDyn(&[2, 3])));
        let b = Expr::constant(Value::zeros(IxDyn(&[3, 2])));
        assert!(a.add(&b).is_err());

        let s = Expr::scalar(2.0);
        let c = a.mul(&s).unwrap();
        assert_eq!(c.shape(), &[2, 3]);
        let d = s.sub(&a).unwrap();
        assert_eq!(d.shape(), &[2, 3]);
    }

    #[test]
    fn transpose_requires_rank_two() {
        let v = Expr::constant(Value::zeros(IxDyn(&[4])));
        assert!(v.t().is_err());

        let m = Expr::constant(Value::zeros(IxDyn(&[3, 4])));
        assert_eq!(m.t().unwrap().shape(), &[4, 3]);
    }

    #[test]
    fn comparison_yields_bool_and_blocks_arithmetic() {
        let a = Expr::constant(Value::zeros(IxDyn(&[5])));
        let b = Expr::constant(Value::ones(IxDyn(&[5])));
        let ind = a.lt(&b).unwrap();
        assert_eq!(ind.dtype(), DType::Bool);
        assert!(ind.add(&b).is_err());
        assert!(ind.exp().is_err());
        assert!(ind.sum_all().is_err());
    }

    #[test]
    fn parameter_set_keeps_shape() {
        let p = Parameter::new("mean", Value::zeros(IxDyn(&[2, 2])));
        assert!(p.set(Value::ones(IxDyn(&[2, 2]))).is_ok());
        assert!(p.set(Value::ones(IxDyn(&[3]))).is_err());
        assert_eq!(p.value()[[0, 0]], 1.0);
    }

    #[test]
    fn fresh_names_are_unique() {
        let a = fresh_name("eps");
        let b = fresh_name("eps");
        assert_ne!(a, b);
    }
}
