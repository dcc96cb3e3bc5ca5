//! Variational posterior attachment for stochastic computation graphs.
//!
//! Each latent node of a model graph carries a Q distribution — an
//! approximating posterior that can be sampled through the
//! reparameterization trick and queried for its entropy, the two pieces
//! a stochastic ELBO needs. Deterministic transform nodes never hold
//! their own distribution: they derive one lazily from their parent's
//! at first query and cache it.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use expr_util::expr::DType;
//! use expr_util::noise::RngNoise;
//! use q_graph::gaussian::GaussianQ;
//! use q_graph::graph::ModelNode;
//! use q_graph::elbo::{gather_stochastic_inputs, total_entropy};
//!
//! let mut noise = RngNoise::seeded(0);
//!
//! let theta = ModelNode::latent("theta", &[3, 4], DType::F64);
//! theta
//!     .attach_q(Rc::new(GaussianQ::new(&[3, 4], &mut noise).unwrap()))
//!     .unwrap();
//! let theta_t = ModelNode::transpose("theta_t", &theta).unwrap();
//!
//! let nodes = vec![theta, theta_t];
//! let entropy = total_entropy(&nodes).unwrap();
//! let bindings = gather_stochastic_inputs(&nodes, &mut noise).unwrap();
//! let bonus = entropy.eval(&bindings).unwrap();
//! assert!(bonus.sum().is_finite());
//! ```

pub mod bernoulli;
pub mod degenerate;
pub mod elbo;
pub mod error;
pub mod gaussian;
pub mod graph;
pub mod qdist;
pub mod transformed;
pub mod transforms;

pub use bernoulli::BernoulliQ;
pub use degenerate::{DeltaQ, ObservedQ};
pub use error::{Error, Result};
pub use gaussian::{EntropyEstimate, GaussianQ};
pub use graph::{ModelNode, NodeKind};
pub use qdist::QDistribution;
pub use transformed::{PointwiseTransformedQ, TransposeQ};
pub use transforms::{ExpTransform, LogitTransform, PointwiseTransform};
