use std::collections::HashMap;
use std::path::PathBuf;

use fauxgen_core::Location;
use serde::{Deserialize, Serialize};

/// Options the host hands to the interpreter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterOptions {
    /// Omit `$id`/`$parent` from generated records.
    pub disable_metadata: bool,
    /// Evaluate everything but turn generation statements into no-ops.
    pub dry_run: bool,
    /// Directory of custom word lists for `dict` fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dictionary_path: Option<PathBuf>,
}

/// Non-fatal finding recorded during evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    pub message: String,
}

impl Warning {
    pub fn new(location: Option<&Location>, message: impl Into<String>) -> Self {
        Self {
            location: location.cloned(),
            message: message.into(),
        }
    }
}

/// Per-base-name counters used to name anonymous entities.
#[derive(Debug, Default)]
pub struct NamespaceCounter {
    counters: HashMap<String, u64>,
}

impl NamespaceCounter {
    pub fn next(&mut self, base: &str) -> u64 {
        let counter = self.counters.entry(base.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_independent_per_base() {
        let mut counter = NamespaceCounter::default();
        assert_eq!(counter.next("Person"), 1);
        assert_eq!(counter.next("Person"), 2);
        assert_eq!(counter.next("Order"), 1);
    }

    #[test]
    fn options_default_from_empty_document() {
        let options: InterpreterOptions = serde_json::from_str("{}").expect("decode");
        assert_eq!(options, InterpreterOptions::default());
    }
}
