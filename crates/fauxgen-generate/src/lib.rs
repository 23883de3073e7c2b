//! Record generation for fauxgen entities.
//!
//! This crate holds the value-producing side of the language: field types,
//! distributions, primary keys, the entity generator and the sinks records are
//! streamed into.

pub mod dictionary;
pub mod distribution;
pub mod emitter;
pub mod errors;
pub mod field_types;
pub mod generator;
pub mod model;
pub mod output;
pub mod primary_key;

pub use dictionary::Dictionary;
pub use distribution::{Distribution, DistributionKind, Interval};
pub use emitter::{Emitter, MemoryEmitter, NullEmitter};
pub use errors::{EmitterError, GenerationError};
pub use field_types::{DynamicField, FieldContext, FieldKind, FieldType};
pub use generator::{FieldSpec, Generator};
pub use model::{CountRange, EntityResult, GeneratedValue};
pub use output::JsonLinesEmitter;
pub use primary_key::{KeySource, PrimaryKey, PrimaryKeyKind};
