//! Symbolic expression utilities for stochastic computation graphs.
//!
//! A small expression IR over `ndarray` values with named placeholders
//! for externally supplied randomness, optimizer-mutable parameters, a
//! reference evaluator, a randomness source contract, and closed-form
//! distribution primitives. The variational layer in `q-graph` is built
//! on top of these pieces.

pub mod dists;
pub mod error;
pub mod eval;
pub mod expr;
pub mod noise;

pub use error::{Error, Result};
