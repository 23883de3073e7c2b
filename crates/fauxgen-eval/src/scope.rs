use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::errors::EvalError;
use crate::value::Value;

/// Lexical environment.
///
/// Handles are cheap to clone and share one symbol table, so closures that
/// captured the same scope observe each other's assignments.
#[derive(Clone, Default)]
pub struct Scope(Rc<ScopeInner>);

#[derive(Default)]
struct ScopeInner {
    symbols: RefCell<IndexMap<String, Value>>,
    parent: Option<Scope>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Child scope whose lookups fall through to `self`.
    pub fn extend(&self) -> Scope {
        Scope(Rc::new(ScopeInner {
            symbols: RefCell::new(IndexMap::new()),
            parent: Some(self.clone()),
        }))
    }

    pub fn parent(&self) -> Option<&Scope> {
        self.0.parent.as_ref()
    }

    /// Bind `name` here. Returns the value it replaced in this same scope.
    pub fn define(&self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.0.symbols.borrow_mut().insert(name.into(), value)
    }

    pub fn contains_local(&self, name: &str) -> bool {
        self.0.symbols.borrow().contains_key(name)
    }

    pub fn resolve(&self, name: &str) -> Option<Value> {
        let mut current = Some(self);
        while let Some(scope) = current {
            if let Some(value) = scope.0.symbols.borrow().get(name) {
                return Some(value.clone());
            }
            current = scope.parent();
        }
        None
    }

    /// Nearest scope in the chain that binds `name`.
    pub fn owner_of(&self, name: &str) -> Option<Scope> {
        let mut current = Some(self);
        while let Some(scope) = current {
            if scope.contains_local(name) {
                return Some(scope.clone());
            }
            current = scope.parent();
        }
        None
    }

    /// Replace an existing binding in the scope that owns it.
    pub fn assign(&self, name: &str, value: Value) -> Result<(), EvalError> {
        let owner = self
            .owner_of(name)
            .ok_or_else(|| EvalError::UndeclaredSymbol(name.to_string()))?;
        owner.define(name, value);
        Ok(())
    }

    pub fn symbols(&self) -> Vec<String> {
        self.0.symbols.borrow().keys().cloned().collect()
    }

    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("symbols", &self.symbols())
            .field("has_parent", &self.parent().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_fall_through_to_ancestors() {
        let root = Scope::new();
        root.define("a", Value::Int(1));
        let child = root.extend();
        let grandchild = child.extend();
        assert_eq!(grandchild.resolve("a"), Some(Value::Int(1)));
        assert_eq!(grandchild.resolve("missing"), None);
    }

    #[test]
    fn define_reports_local_shadowing_only() {
        let root = Scope::new();
        assert!(root.define("a", Value::Int(1)).is_none());
        let child = root.extend();
        assert!(child.define("a", Value::Int(2)).is_none());
        assert_eq!(child.define("a", Value::Int(3)), Some(Value::Int(2)));
        assert_eq!(root.resolve("a"), Some(Value::Int(1)));
    }

    #[test]
    fn assign_mutates_the_owning_scope() {
        let root = Scope::new();
        root.define("count", Value::Int(0));
        let child = root.extend();
        child.assign("count", Value::Int(5)).expect("declared");
        assert_eq!(root.resolve("count"), Some(Value::Int(5)));
        assert!(!child.contains_local("count"));

        let err = child.assign("nope", Value::Null).expect_err("undeclared");
        assert!(matches!(err, EvalError::UndeclaredSymbol(name) if name == "nope"));
    }
}
