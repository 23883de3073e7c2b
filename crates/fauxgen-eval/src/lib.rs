//! Evaluator for fauxgen programs.
//!
//! Walks the AST produced by an external parser, resolving symbols through
//! lexical scopes, building entity generators and driving generation into an
//! [`fauxgen_generate::Emitter`].

mod entity;
pub mod errors;
pub mod interpreter;
pub mod loader;
pub mod model;
pub mod operators;
pub mod scope;
pub mod value;

pub use errors::EvalError;
pub use interpreter::{Interpreter, NOW_SYMBOL, PK_SYMBOL, UNIX_EPOCH_SYMBOL};
pub use loader::{MemoryLoader, NoImports, SourceLoader};
pub use model::{InterpreterOptions, NamespaceCounter, Warning};
pub use operators::{Operator, apply};
pub use scope::Scope;
pub use value::{Closure, Deferred, Value};
