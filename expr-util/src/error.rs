use thiserror::Error;

/// Errors raised while building or evaluating expressions.
///
/// All of these are fatal at the point they occur; callers are expected
/// to propagate them rather than retry.
#[derive(Error, Debug)]
pub enum Error {
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("dtype mismatch: {0}")]
    DTypeMismatch(String),

    #[error("invalid shape {0:?}: every dimension must be positive")]
    InvalidShape(Vec<usize>),

    #[error("unbound placeholder `{0}`: bind it through the stochastic inputs")]
    UnboundPlaceholder(String),
}

pub type Result<T> = std::result::Result<T, Error>;
