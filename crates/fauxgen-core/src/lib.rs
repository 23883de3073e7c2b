//! Core contracts for fauxgen.
//!
//! This crate defines the abstract syntax tree handed over by an external
//! parser, the shape rules every node must satisfy, and the errors raised
//! when a tree does not satisfy them.

pub mod ast;
pub mod build;
pub mod error;
pub mod location;
pub mod validation;

pub use ast::{Node, NodeKind, NodeValue, Scalar, ast_json_schema, parse_ast_json};
pub use error::{Error, Result};
pub use location::Location;
pub use validation::{check_shape, validate_ast};

/// Current contract version for serialized AST documents.
pub const AST_VERSION: &str = "0.1";
