use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Source position of a node, as reported by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub offset: u32,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32, column: u32, offset: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            offset,
        }
    }

    /// Render an optional location, falling back to a placeholder.
    pub fn describe(location: Option<&Location>) -> String {
        location
            .map(ToString::to_string)
            .unwrap_or_else(|| "<unknown>".to_string())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{} ({})",
            self.file, self.line, self.column, self.offset
        )
    }
}
