use std::fmt;
use std::rc::Rc;

use chrono::NaiveDateTime;
use fauxgen_core::Node;
use fauxgen_generate::{CountRange, EntityResult, GeneratedValue, Generator, PrimaryKey};

use crate::errors::EvalError;
use crate::scope::Scope;

/// Runtime value produced by evaluation.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Date(NaiveDateTime),
    List(Vec<Value>),
    Range(CountRange),
    Entity(Rc<Generator>),
    PrimaryKey(PrimaryKey),
    Lambda(Rc<Closure>),
    Deferred(Deferred),
    Record(EntityResult),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "integer",
            Value::Float(_) => "decimal",
            Value::Str(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Date(_) => "date",
            Value::List(_) => "collection",
            Value::Range(_) => "range",
            Value::Entity(_) => "entity",
            Value::PrimaryKey(_) => "primary key",
            Value::Lambda(_) => "lambda",
            Value::Deferred(_) => "deferred expression",
            Value::Record(_) => "record",
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Value::Deferred(_))
    }

    /// Resolve deferred values against `scope`; other values are returned as is.
    pub fn force(self, scope: &Scope) -> Result<Value, EvalError> {
        match self {
            Value::Deferred(deferred) => deferred.force(scope),
            other => Ok(other),
        }
    }

    /// Convert into a value a field can hold.
    pub fn to_generated(&self) -> Result<GeneratedValue, EvalError> {
        let value = match self {
            Value::Null => GeneratedValue::Null,
            Value::Int(value) => GeneratedValue::Int(*value),
            Value::Float(value) => GeneratedValue::Float(*value),
            Value::Str(value) => GeneratedValue::Text(value.clone()),
            Value::Bool(value) => GeneratedValue::Bool(*value),
            Value::Date(value) => GeneratedValue::Date {
                value: *value,
                format: None,
            },
            Value::List(values) => GeneratedValue::List(
                values
                    .iter()
                    .map(Value::to_generated)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Record(record) => GeneratedValue::Entity(record.clone()),
            other => {
                return Err(EvalError::InvalidFieldArguments(format!(
                    "a {} cannot be used as a field value",
                    other.type_name()
                )));
            }
        };
        Ok(value)
    }

    pub fn from_generated(value: &GeneratedValue) -> Self {
        match value {
            GeneratedValue::Null => Value::Null,
            GeneratedValue::Bool(value) => Value::Bool(*value),
            GeneratedValue::Int(value) => Value::Int(*value),
            GeneratedValue::Float(value) => Value::Float(*value),
            GeneratedValue::Text(value) | GeneratedValue::Uuid(value) => Value::Str(value.clone()),
            GeneratedValue::Date { value, .. } => Value::Date(*value),
            GeneratedValue::List(values) => {
                Value::List(values.iter().map(Value::from_generated).collect())
            }
            GeneratedValue::Entity(record) => Value::Record(record.clone()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Range(a), Value::Range(b)) => a == b,
            (Value::Entity(a), Value::Entity(b)) => Rc::ptr_eq(a, b),
            (Value::PrimaryKey(a), Value::PrimaryKey(b)) => a == b,
            (Value::Lambda(a), Value::Lambda(b)) => Rc::ptr_eq(a, b),
            (Value::Record(a), Value::Record(b)) => a == b,
            _ => false,
        }
    }
}

type Resolver = dyn Fn(&Scope) -> Result<Value, EvalError>;

/// Expression captured for evaluation against a scope supplied later.
#[derive(Clone)]
pub struct Deferred(Rc<Resolver>);

impl Deferred {
    pub fn new(resolver: impl Fn(&Scope) -> Result<Value, EvalError> + 'static) -> Self {
        Self(Rc::new(resolver))
    }

    /// Run the resolver until a concrete value comes out.
    pub fn force(&self, scope: &Scope) -> Result<Value, EvalError> {
        let mut value = (self.0)(scope)?;
        while let Value::Deferred(next) = value {
            value = (next.0)(scope)?;
        }
        Ok(value)
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Deferred(..)")
    }
}

/// Lambda together with the scope it was declared in.
pub struct Closure {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Node,
    pub scope: Scope,
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
