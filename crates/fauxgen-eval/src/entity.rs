//! Entity declarations: from `entity` nodes to generators.

use std::rc::Rc;

use fauxgen_core::{Node, NodeKind};
use fauxgen_generate::field_types::{
    DEFAULT_DECIMAL_RANGE, DEFAULT_INTEGER_RANGE, DEFAULT_TEXT_LENGTH,
};
use fauxgen_generate::{
    CountRange, Distribution, DistributionKind, DynamicField, Emitter, EntityResult, FieldSpec,
    FieldType, GeneratedValue, GenerationError, Generator, Interval, PrimaryKey,
};

use crate::errors::EvalError;
use crate::interpreter::{Interpreter, PK_SYMBOL, reject_distribution_args, required};
use crate::scope::Scope;
use crate::value::{Deferred, Value};

impl<E: Emitter> Interpreter<E> {
    /// Build a generator and register it in `scope`.
    pub(crate) fn build_entity(
        &mut self,
        node: &Node,
        scope: &Scope,
    ) -> Result<Rc<Generator>, EvalError> {
        let body = required(node.value_node(), node, "entity body")?;
        let entity_scope = scope.extend();

        let explicit_key = match body.related.as_deref() {
            Some(key) => Some(self.visit_primary_key(key, &entity_scope)?),
            None => None,
        };

        let parent = match node.related.as_deref() {
            Some(reference) => {
                let symbol = required(reference.value_str(), reference, "parent entity")?;
                match scope.resolve(symbol) {
                    Some(Value::Entity(parent)) => Some(parent),
                    _ => {
                        return Err(EvalError::UnresolvedParentEntity(symbol.to_string())
                            .at(reference.location()));
                    }
                }
            }
            None => None,
        };

        let name = match (node.name.as_deref(), parent.as_deref()) {
            (Some(name), _) => name.to_string(),
            (None, Some(parent)) => {
                format!("${}::{}", self.counter.next(parent.name()), parent.name())
            }
            (None, None) => format!("${}", self.counter.next("$")),
        };

        let disable_metadata = self.options.disable_metadata;
        let generator = match parent.as_deref() {
            Some(parent) => Generator::extend(name.clone(), parent, explicit_key, disable_metadata),
            None => {
                let key = explicit_key
                    .or_else(|| ambient_key(scope))
                    .unwrap_or_default();
                Generator::new(name.clone(), key, disable_metadata)
            }
        };
        let generator = Rc::new(generator);

        // registered before the fields so they can refer to the entity itself
        self.bind(
            scope,
            &name,
            Value::Entity(Rc::clone(&generator)),
            node.location(),
        );

        if let Some(fields) = body.value_node() {
            for field in &fields.children {
                self.build_field(&generator, field, &entity_scope)
                    .map_err(|err| err.at(field.location()))?;
            }
        }

        Ok(generator)
    }

    fn build_field(
        &mut self,
        generator: &Rc<Generator>,
        field: &Node,
        scope: &Scope,
    ) -> Result<(), EvalError> {
        fauxgen_core::check_shape(field)?;
        let name = required(field.name.as_deref(), field, "field name")?;
        let value = required(field.value_node(), field, "field type")?;
        fauxgen_core::check_shape(value).map_err(|err| EvalError::from(err).at(value.location()))?;

        let count = match field.count_range.as_deref() {
            Some(range) => Some(self.count_range(range, scope)?),
            None => None,
        };

        let field_type = match value.kind {
            NodeKind::Distribution => {
                FieldType::Distribution(self.build_distribution(value, &field.args, scope)?)
            }
            NodeKind::Builtin => {
                let type_name = required(value.value_str(), value, "type name")?;
                self.builtin_type(type_name, &field.args, scope)?
            }
            NodeKind::Identifier => {
                no_args(name, field)?;
                let symbol = required(value.value_str(), value, "symbol")?;
                match generator.field_type(symbol) {
                    Some(sibling) => sibling,
                    None => match scope.resolve(symbol) {
                        Some(Value::Entity(nested)) => FieldType::Entity(nested),
                        Some(other) => FieldType::Literal(other.force(scope)?.to_generated()?),
                        None => {
                            return Err(EvalError::UndeclaredSymbol(symbol.to_string())
                                .at(value.location()));
                        }
                    },
                }
            }
            NodeKind::Entity => {
                no_args(name, field)?;
                FieldType::Entity(self.build_entity(value, scope)?)
            }
            NodeKind::Binary | NodeKind::Atomic => {
                no_args(name, field)?;
                match self.visit(value, scope, true)? {
                    Value::Deferred(resolver) => FieldType::Dynamic(Rc::new(DeferredField {
                        field: format!("{}.{}", generator.name(), name),
                        resolver,
                        scope: scope.clone(),
                    })),
                    other => FieldType::Literal(other.to_generated()?),
                }
            }
            _ => {
                no_args(name, field)?;
                match self.visit(value, scope, false)? {
                    Value::Entity(nested) => FieldType::Entity(nested),
                    other => FieldType::Literal(other.to_generated()?),
                }
            }
        };

        let spec = FieldSpec::new(field_type)
            .with_count(count)
            .with_unique(field.unique);
        if generator.with_field(name, spec).is_some() {
            self.warn(
                field.location(),
                format!(
                    "field `{name}` of `{}` overrides an earlier declaration",
                    generator.name()
                ),
            );
        }
        Ok(())
    }

    fn count_range(&mut self, node: &Node, scope: &Scope) -> Result<CountRange, EvalError> {
        let range = match self.visit(node, scope, false)? {
            Value::Range(range) => range,
            Value::Int(count) => CountRange::exactly(count)?,
            other => {
                return Err(EvalError::InvalidFieldArguments(format!(
                    "field count must be an integer or a range, found {}",
                    other.type_name()
                ))
                .at(node.location()));
            }
        };
        Ok(range)
    }

    fn build_distribution(
        &mut self,
        shape: &Node,
        intervals: &[Node],
        scope: &Scope,
    ) -> Result<Distribution, EvalError> {
        let kind_name = required(shape.value_str(), shape, "distribution kind")?;
        let kind = DistributionKind::parse(kind_name)?;

        let mut domain = Vec::with_capacity(intervals.len());
        for interval in intervals {
            domain.push(
                self.build_interval(interval, scope)
                    .map_err(|err| err.at(interval.location()))?,
            );
        }
        Ok(Distribution::new(kind, domain)?)
    }

    fn build_interval(&mut self, interval: &Node, scope: &Scope) -> Result<Interval, EvalError> {
        if !interval.is(NodeKind::Field) {
            return Err(GenerationError::DistributionConfiguration(format!(
                "distribution intervals must be field declarations, found `{}`",
                interval.kind.as_str()
            ))
            .into());
        }
        let value = required(interval.value_node(), interval, "interval type")?;
        if value.is(NodeKind::Distribution) {
            return Err(GenerationError::DistributionConfiguration(
                "a distribution cannot be used as an argument".to_string(),
            )
            .into());
        }

        let field_type = match value.kind {
            NodeKind::Builtin => {
                let type_name = required(value.value_str(), value, "type name")?;
                self.builtin_type(type_name, &interval.args, scope)?
            }
            _ => FieldType::Literal(self.visit(value, scope, false)?.to_generated()?),
        };
        Ok(Interval {
            field_type,
            weight: interval.weight,
        })
    }

    fn builtin_type(
        &mut self,
        type_name: &str,
        args: &[Node],
        scope: &Scope,
    ) -> Result<FieldType, EvalError> {
        reject_distribution_args(args)?;
        let values = args
            .iter()
            .map(|arg| self.visit(arg, scope, false))
            .collect::<Result<Vec<_>, _>>()?;

        let field_type = match (type_name, values.as_slice()) {
            ("string", []) => FieldType::text(DEFAULT_TEXT_LENGTH as i64)?,
            ("string", [Value::Int(length)]) => FieldType::text(*length)?,
            ("integer", []) => FieldType::integer(DEFAULT_INTEGER_RANGE.0, DEFAULT_INTEGER_RANGE.1)?,
            ("integer", [Value::Int(min), Value::Int(max)]) => FieldType::integer(*min, *max)?,
            ("decimal", []) => FieldType::decimal(DEFAULT_DECIMAL_RANGE.0, DEFAULT_DECIMAL_RANGE.1)?,
            ("decimal", [min, max]) => match (as_decimal(min), as_decimal(max)) {
                (Some(min), Some(max)) => FieldType::decimal(min, max)?,
                _ => return Err(arity_error(type_name, "2 numbers (min, max)", &values)),
            },
            ("date", []) => FieldType::date(unix_epoch(), self.now, None)?,
            ("date", [Value::Date(min), Value::Date(max)]) => FieldType::date(*min, *max, None)?,
            ("date", [Value::Date(min), Value::Date(max), Value::Str(format)]) => {
                let format = (!format.is_empty()).then(|| format.clone());
                FieldType::date(*min, *max, format)?
            }
            ("dict", [Value::Str(category)]) => {
                FieldType::dict(category.clone(), Rc::clone(&self.dictionary))?
            }
            ("enum", [Value::List(items)]) => FieldType::enumeration(
                items
                    .iter()
                    .map(Value::to_generated)
                    .collect::<Result<Vec<_>, _>>()?,
            )?,
            ("bool" | "boolean", []) => FieldType::Bool,
            ("serial", []) => FieldType::serial(),
            ("uid", []) => FieldType::Uid,
            ("string", _) => return Err(arity_error(type_name, "1 integer (length)", &values)),
            ("integer", _) => return Err(arity_error(type_name, "2 integers (min, max)", &values)),
            ("decimal", _) => return Err(arity_error(type_name, "2 numbers (min, max)", &values)),
            ("date", _) => {
                return Err(arity_error(
                    type_name,
                    "2 dates (min, max) and an optional format",
                    &values,
                ));
            }
            ("dict", _) => return Err(arity_error(type_name, "1 string (category)", &values)),
            ("enum", _) => return Err(arity_error(type_name, "1 collection of values", &values)),
            ("bool" | "boolean" | "serial" | "uid", _) => {
                return Err(arity_error(type_name, "no arguments", &values));
            }
            (other, _) => {
                return Err(EvalError::InvalidFieldArguments(format!(
                    "unknown field type `{other}`"
                )));
            }
        };
        Ok(field_type)
    }
}

/// Binary-expression field forced once per record.
#[derive(Debug)]
struct DeferredField {
    field: String,
    resolver: Deferred,
    scope: Scope,
}

impl DynamicField for DeferredField {
    fn resolve(&self, record: &EntityResult) -> Result<GeneratedValue, GenerationError> {
        // fields generated so far are visible by name
        let frame = self.scope.extend();
        for (key, value) in record.iter() {
            frame.define(key.clone(), Value::from_generated(value));
        }

        let value = self
            .resolver
            .force(&frame)
            .and_then(|value| value.to_generated());
        value.map_err(|err| {
            let message = err.to_string();
            match err.into_root() {
                EvalError::Generation(inner) => inner,
                _ => GenerationError::DeferredField {
                    field: self.field.clone(),
                    message,
                },
            }
        })
    }
}

fn ambient_key(scope: &Scope) -> Option<PrimaryKey> {
    match scope.resolve(PK_SYMBOL) {
        Some(Value::PrimaryKey(key)) => Some(key),
        _ => None,
    }
}

fn no_args(name: &str, field: &Node) -> Result<(), EvalError> {
    if field.args.is_empty() {
        return Ok(());
    }
    Err(EvalError::InvalidFieldArguments(format!(
        "field `{name}` takes no arguments, found {}",
        field.args.len()
    )))
}

fn as_decimal(value: &Value) -> Option<f64> {
    match value {
        Value::Int(value) => Some(*value as f64),
        Value::Float(value) => Some(*value),
        _ => None,
    }
}

fn unix_epoch() -> chrono::NaiveDateTime {
    chrono::NaiveDateTime::default()
}

fn arity_error(type_name: &str, expected: &str, found: &[Value]) -> EvalError {
    let found = if found.is_empty() {
        "none".to_string()
    } else {
        found
            .iter()
            .map(Value::type_name)
            .collect::<Vec<_>>()
            .join(", ")
    };
    EvalError::InvalidFieldArguments(format!(
        "`{type_name}` expects {expected}, found {found}"
    ))
}
