use thiserror::Error;

/// Errors reported by an output sink.
#[derive(Debug, Error)]
pub enum EmitterError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("emitter already finalized; cannot emit {entity_type}")]
    Finalized { entity_type: String },
    #[error("emitter rejected record: {0}")]
    Rejected(String),
}

/// Errors emitted by the generation engine.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid field arguments: {0}")]
    InvalidFieldArguments(String),
    #[error("invalid primary key kind {kind:?}; expected one of serial, unique-integer, uid")]
    InvalidPrimaryKeyKind { kind: String },
    #[error("invalid distribution: {0}")]
    DistributionConfiguration(String),
    #[error("cannot generate {requested} {entity} record(s): {reason}")]
    GenerationCapacityExceeded {
        entity: String,
        requested: u64,
        reason: String,
    },
    #[error("emitter failure: {0}")]
    Emitter(#[from] EmitterError),
    #[error("field '{field}' could not be resolved: {message}")]
    DeferredField { field: String, message: String },
    #[error("dictionary error: {0}")]
    Dictionary(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
