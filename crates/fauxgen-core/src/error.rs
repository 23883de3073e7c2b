use thiserror::Error;

/// Core error type shared across fauxgen crates.
#[derive(Debug, Error)]
pub enum Error {
    /// The node kind is not one the evaluator understands.
    #[error("{at}: unsupported node kind `{kind}`")]
    UnsupportedKind { at: String, kind: String },
    /// The node has the right kind but the wrong shape.
    #[error("{at}: malformed `{kind}` node: {message}")]
    MalformedNode {
        at: String,
        kind: &'static str,
        message: String,
    },
    /// The serialized AST could not be decoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for results returned by fauxgen crates.
pub type Result<T> = std::result::Result<T, Error>;
