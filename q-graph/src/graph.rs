//! Model-graph nodes and lazy distribution attachment.
//!
//! Latent nodes carry an explicitly attached Q distribution; transform
//! nodes never do. A transform node synthesizes its distribution from
//! whatever is attached to its parent *at first query time* and caches
//! it for the rest of its life, so callers must attach distributions to
//! root latents before querying any transform above them.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, warn};

use expr_util::expr::DType;

use crate::error::{Error, Result};
use crate::qdist::QDistribution;
use crate::transformed::{PointwiseTransformedQ, TransposeQ};
use crate::transforms::PointwiseTransform;

/// Name of the single parent input on a transform node.
pub const PARENT_INPUT: &str = "A";

/// What kind of node this is.
pub enum NodeKind {
    /// A latent (or observed) variable; explicit attachment target.
    Latent,
    /// Structural transpose of the parent matrix.
    Transpose,
    /// Elementwise function of the parent.
    Pointwise(Rc<dyn PointwiseTransform>),
}

/// A node of the conditional-distribution graph, specialized to what
/// the variational layer needs: declared shape and dtype, named parent
/// inputs, and a (lazily filled) variational distribution slot.
pub struct ModelNode {
    name: String,
    shape: Vec<usize>,
    dtype: DType,
    kind: NodeKind,
    inputs: HashMap<&'static str, Rc<ModelNode>>,
    q: RefCell<Option<Rc<dyn QDistribution>>>,
}

impl ModelNode {
    /// A root latent of the given shape and element type.
    pub fn latent(name: &str, shape: &[usize], dtype: DType) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_string(),
            shape: shape.to_vec(),
            dtype,
            kind: NodeKind::Latent,
            inputs: HashMap::new(),
            q: RefCell::new(None),
        })
    }

    /// Transpose of a rank-2 parent; shape reversed, dtype inherited.
    pub fn transpose(name: &str, parent: &Rc<ModelNode>) -> Result<Rc<Self>> {
        if parent.shape.len() != 2 {
            return Err(Error::ShapeMismatch(format!(
                "transpose node `{}` needs a rank-2 parent, `{}` has shape {:?}",
                name, parent.name, parent.shape
            )));
        }
        Ok(Rc::new(Self {
            name: name.to_string(),
            shape: vec![parent.shape[1], parent.shape[0]],
            dtype: parent.dtype,
            kind: NodeKind::Transpose,
            inputs: HashMap::from([(PARENT_INPUT, parent.clone())]),
            q: RefCell::new(None),
        }))
    }

    /// Elementwise transform of the parent; shape and dtype inherited.
    pub fn pointwise(
        name: &str,
        parent: &Rc<ModelNode>,
        transform: Rc<dyn PointwiseTransform>,
    ) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_string(),
            shape: parent.shape.clone(),
            dtype: parent.dtype,
            kind: NodeKind::Pointwise(transform),
            inputs: HashMap::from([(PARENT_INPUT, parent.clone())]),
            q: RefCell::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Named structural dependencies of this node.
    pub fn input_nodes(&self) -> &HashMap<&'static str, Rc<ModelNode>> {
        &self.inputs
    }

    /// Attach an explicit variational distribution.
    ///
    /// Latent nodes only; a deterministic transform is a view of its
    /// parent, not an independent latent, so attaching to one fails.
    /// Re-attaching to a latent replaces the distribution but does not
    /// invalidate transform caches derived from the old one.
    pub fn attach_q(&self, q: Rc<dyn QDistribution>) -> Result<()> {
        if !matches!(self.kind, NodeKind::Latent) {
            return Err(Error::InvalidAttachment {
                node: self.name.clone(),
            });
        }
        if q.output_shape() != self.shape.as_slice() {
            return Err(Error::ShapeMismatch(format!(
                "node `{}` has shape {:?}, distribution has output shape {:?}",
                self.name,
                self.shape,
                q.output_shape()
            )));
        }
        if q.sample().dtype() != self.dtype {
            return Err(Error::DTypeMismatch(format!(
                "node `{}` is {:?}, distribution sample is {:?}",
                self.name,
                self.dtype,
                q.sample().dtype()
            )));
        }
        if self.q.borrow().is_some() {
            warn!("replacing the variational distribution on `{}`", self.name);
        }
        debug!("attach q distribution to `{}`", self.name);
        *self.q.borrow_mut() = Some(q);
        Ok(())
    }

    /// The variational distribution of this node.
    ///
    /// For a latent this is whatever was attached (`UnresolvedAncestor`
    /// if nothing is). For a transform the distribution is derived from
    /// the parent's on first access and cached; later calls return the
    /// identical object even if the parent's attachment changes.
    pub fn q_distribution(&self) -> Result<Rc<dyn QDistribution>> {
        if let Some(q) = self.q.borrow().as_ref() {
            return Ok(q.clone());
        }

        let derived: Rc<dyn QDistribution> = match &self.kind {
            NodeKind::Latent => {
                return Err(Error::UnresolvedAncestor {
                    node: self.name.clone(),
                })
            }
            NodeKind::Transpose => {
                let parent_q = self.resolved_parent_q()?;
                Rc::new(TransposeQ::derive(parent_q)?)
            }
            NodeKind::Pointwise(transform) => {
                let parent_q = self.resolved_parent_q()?;
                Rc::new(PointwiseTransformedQ::implicit(
                    parent_q,
                    transform.as_ref(),
                )?)
            }
        };

        debug!("derived q distribution for transform `{}`", self.name);
        *self.q.borrow_mut() = Some(derived.clone());
        Ok(derived)
    }

    /// Parent's distribution, checked against the parent's declaration.
    fn resolved_parent_q(&self) -> Result<Rc<dyn QDistribution>> {
        let parent = self
            .inputs
            .get(PARENT_INPUT)
            .ok_or_else(|| Error::UnresolvedAncestor {
                node: self.name.clone(),
            })?;
        let parent_q = parent.q_distribution()?;
        if parent_q.output_shape() != parent.shape.as_slice() {
            return Err(Error::ShapeMismatch(format!(
                "node `{}` declares shape {:?} but its distribution has output shape {:?}",
                parent.name,
                parent.shape,
                parent_q.output_shape()
            )));
        }
        Ok(parent_q)
    }
}
