use fauxgen_core::Location;
use fauxgen_generate::{EmitterError, GenerationError};
use thiserror::Error;

/// Errors raised while evaluating a program.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("parse error: {0}")]
    ParseDelegation(String),
    #[error("undeclared symbol `{0}`")]
    UndeclaredSymbol(String),
    #[error("cannot extend `{0}`: no such entity in scope")]
    UnresolvedParentEntity(String),
    #[error("operator `{op}` does not support {left} and {right} operands")]
    IncompatibleOperands {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },
    #[error("arithmetic error: {0}")]
    Arithmetic(String),
    #[error("invalid field arguments: {0}")]
    InvalidFieldArguments(String),
    #[error("invalid call: {0}")]
    InvalidCall(String),
    #[error("Must generate at least 1 {entity} entity, got {count}")]
    InvalidGenerationCount { entity: String, count: i64 },
    #[error("unsupported `{kind}` node: {message}")]
    UnsupportedNode { kind: String, message: String },
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("{location}: {source}")]
    Located {
        location: Location,
        source: Box<EvalError>,
    },
}

impl EvalError {
    /// Tag the error with the innermost node location; outer locations are ignored.
    pub fn at(self, location: Option<&Location>) -> Self {
        match (self, location) {
            (located @ EvalError::Located { .. }, _) => located,
            (err, Some(location)) => EvalError::Located {
                location: location.clone(),
                source: Box::new(err),
            },
            (err, None) => err,
        }
    }

    /// The error without its location wrapper.
    pub fn root(&self) -> &EvalError {
        match self {
            EvalError::Located { source, .. } => source.root(),
            other => other,
        }
    }

    /// Owned form of [`EvalError::root`].
    pub fn into_root(self) -> EvalError {
        match self {
            EvalError::Located { source, .. } => source.into_root(),
            other => other,
        }
    }

    pub fn location(&self) -> Option<&Location> {
        match self {
            EvalError::Located { location, .. } => Some(location),
            _ => None,
        }
    }
}

impl From<EmitterError> for EvalError {
    fn from(err: EmitterError) -> Self {
        EvalError::Generation(GenerationError::Emitter(err))
    }
}

impl From<fauxgen_core::Error> for EvalError {
    fn from(err: fauxgen_core::Error) -> Self {
        match err {
            fauxgen_core::Error::UnsupportedKind { kind, .. } => EvalError::UnsupportedNode {
                kind,
                message: "unknown node kind".to_string(),
            },
            fauxgen_core::Error::MalformedNode { kind, message, .. } => {
                EvalError::UnsupportedNode {
                    kind: kind.to_string(),
                    message,
                }
            }
            fauxgen_core::Error::Json(err) => EvalError::ParseDelegation(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn innermost_location_wins() {
        let inner = Location::new("main.fg", 3, 7, 41);
        let outer = Location::new("main.fg", 1, 1, 0);
        let err = EvalError::UndeclaredSymbol("foo".to_string())
            .at(Some(&inner))
            .at(Some(&outer));
        assert_eq!(err.to_string(), "main.fg:3:7 (41): undeclared symbol `foo`");
        assert!(matches!(err.root(), EvalError::UndeclaredSymbol(_)));
        assert!(matches!(err.into_root(), EvalError::UndeclaredSymbol(symbol) if symbol == "foo"));
    }
}
