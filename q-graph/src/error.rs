use thiserror::Error;

/// Errors raised by the variational layer.
///
/// Every failure here indicates a malformed model or a construction
/// ordering bug; none are retryable. They propagate to the caller so
/// that optimization never starts over an ill-formed posterior.
#[derive(Error, Debug)]
pub enum Error {
    /// A reserved capability with no implementation on this variant.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    /// Explicit attachment attempted on a deterministic transform.
    #[error(
        "cannot attach an explicit Q distribution to deterministic transform `{node}`; \
         attach to the parent node instead"
    )]
    InvalidAttachment { node: String },

    /// A derived distribution was queried before its ancestors were ready.
    #[error(
        "node `{node}` has no variational distribution attached; \
         attach distributions to root latents before querying transforms"
    )]
    UnresolvedAncestor { node: String },

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("dtype mismatch: {0}")]
    DTypeMismatch(String),

    /// Two distributions produced the same stochastic-input key.
    #[error("duplicate stochastic input `{0}`")]
    DuplicateNoiseInput(String),

    #[error(transparent)]
    Expr(#[from] expr_util::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
