//! Error types for viewport operations.
//!
//! None of these are fatal to the hosting document: the worst case is a
//! diagram that renders without interactivity.

use thiserror::Error;

/// Errors that can occur while configuring or wiring diagrams
#[derive(Error, Debug)]
pub enum ViewportError {
    /// Configuration JSON could not be parsed
    #[error("config parse error: {0}")]
    Config(#[from] serde_json::Error),

    /// `maxHeight` is not a CSS length
    #[error("invalid CSS length: {0:?}")]
    InvalidCssLength(String),

    /// The diagram container has no parent to host the wrapper
    #[error("diagram container is detached from the document")]
    Detached,

    /// The render pass was aborted before it finished
    #[error("render pass aborted")]
    Aborted(#[from] futures::future::Aborted),

    /// A newer render pass started while this one was in flight
    #[error("render pass {0} was superseded")]
    Superseded(u64),

    /// Generic error message
    #[error("{0}")]
    Other(String),
}

/// Result type alias for viewport operations
pub type ViewportResult<T> = Result<T, ViewportError>;

impl From<String> for ViewportError {
    fn from(s: String) -> Self {
        ViewportError::Other(s)
    }
}

impl From<&str> for ViewportError {
    fn from(s: &str) -> Self {
        ViewportError::Other(s.to_string())
    }
}
