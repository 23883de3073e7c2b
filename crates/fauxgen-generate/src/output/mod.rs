//! Concrete record sinks.

pub mod jsonl;

pub use jsonl::JsonLinesEmitter;
