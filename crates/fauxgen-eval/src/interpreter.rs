use std::collections::HashSet;
use std::path::PathBuf;
use std::rc::Rc;

use chrono::{NaiveDate, NaiveDateTime, Timelike, Utc};
use fauxgen_core::{Location, Node, NodeKind, check_shape, parse_ast_json};
use fauxgen_generate::{Dictionary, Emitter, PrimaryKey, PrimaryKeyKind};
use rand::RngCore;
use tracing::{debug, info, warn};

use crate::errors::EvalError;
use crate::loader::{NoImports, SourceLoader};
use crate::model::{InterpreterOptions, NamespaceCounter, Warning};
use crate::operators::{Operator, apply};
use crate::scope::Scope;
use crate::value::{Closure, Value};

/// Symbol holding the ambient primary-key policy.
pub const PK_SYMBOL: &str = "$PK_FIELD";
pub const NOW_SYMBOL: &str = "NOW";
pub const UNIX_EPOCH_SYMBOL: &str = "UNIX_EPOCH";

/// Walks an AST, building entities and driving generation into an emitter.
pub struct Interpreter<E: Emitter> {
    pub(crate) options: InterpreterOptions,
    pub(crate) emitter: E,
    pub(crate) counter: NamespaceCounter,
    pub(crate) dictionary: Rc<Dictionary>,
    pub(crate) rng: Box<dyn RngCore>,
    pub(crate) now: NaiveDateTime,
    warnings: Vec<Warning>,
    loader: Box<dyn SourceLoader>,
    imported: HashSet<PathBuf>,
    current_file: Option<PathBuf>,
    root: Scope,
}

impl<E: Emitter> Interpreter<E> {
    pub fn new(emitter: E, options: InterpreterOptions) -> Self {
        let dictionary = match &options.dictionary_path {
            Some(path) => Dictionary::with_root(path),
            None => Dictionary::builtin(),
        };
        let now = Utc::now().naive_utc();
        let now = now.with_nanosecond(0).unwrap_or(now);

        let interpreter = Self {
            options,
            emitter,
            counter: NamespaceCounter::default(),
            dictionary: Rc::new(dictionary),
            rng: Box::new(rand::rng()),
            now,
            warnings: Vec::new(),
            loader: Box::new(NoImports),
            imported: HashSet::new(),
            current_file: None,
            root: Scope::new(),
        };
        interpreter.install_prelude();
        interpreter
    }

    pub fn with_loader(mut self, loader: impl SourceLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    /// Replace the random source, e.g. with a seeded one.
    pub fn with_rng(mut self, rng: impl RngCore + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    /// Path of the entry program, used to resolve its relative imports.
    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.imported.insert(path.clone());
        self.current_file = Some(path);
        self
    }

    pub fn options(&self) -> &InterpreterOptions {
        &self.options
    }

    pub fn root_scope(&self) -> &Scope {
        &self.root
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn emitter(&self) -> &E {
        &self.emitter
    }

    pub fn emitter_mut(&mut self) -> &mut E {
        &mut self.emitter
    }

    pub fn into_emitter(self) -> E {
        self.emitter
    }

    /// Evaluate a whole program: initialize the emitter, visit, finalize.
    pub fn run(&mut self, program: &Node) -> Result<Value, EvalError> {
        self.emitter.init()?;
        let root = self.root.clone();
        let value = self.visit(program, &root, false)?;
        self.emitter.finalize()?;
        info!(warnings = self.warnings.len(), "program evaluated");
        Ok(value)
    }

    /// Decode a JSON AST document and run it.
    pub fn run_json(&mut self, source: &str) -> Result<Value, EvalError> {
        let program = parse_ast_json(source)?;
        self.run(&program)
    }

    /// Evaluate one node in the root scope without touching the emitter lifecycle.
    pub fn evaluate(&mut self, node: &Node) -> Result<Value, EvalError> {
        let root = self.root.clone();
        self.visit(node, &root, false)
    }

    /// Evaluate `node` in `scope`.
    ///
    /// With `deferred` set, identifiers become deferred resolvers instead of
    /// being looked up, so the expression can be forced later.
    pub fn visit(&mut self, node: &Node, scope: &Scope, deferred: bool) -> Result<Value, EvalError> {
        self.dispatch(node, scope, deferred)
            .map_err(|err| err.at(node.location()))
    }

    fn dispatch(&mut self, node: &Node, scope: &Scope, deferred: bool) -> Result<Value, EvalError> {
        check_shape(node)?;

        match node.kind {
            NodeKind::Root | NodeKind::Sequential => {
                let mut last = Value::Null;
                for child in &node.children {
                    last = self.visit(child, scope, deferred)?;
                }
                Ok(last)
            }
            NodeKind::Atomic => {
                let inner = required(node.value_node(), node, "expression")?;
                self.visit(inner, scope, deferred)
            }
            NodeKind::Identifier => self.visit_identifier(node, scope, deferred),
            NodeKind::Binary => self.visit_binary(node, scope, deferred),
            NodeKind::Assignment => self.visit_assignment(node, scope),
            NodeKind::Variable => self.visit_variable(node, scope),
            NodeKind::Entity => self.build_entity(node, scope).map(Value::Entity),
            NodeKind::Generation => self.visit_generation(node, scope),
            NodeKind::Range => self.visit_range(node).map(Value::Range),
            NodeKind::PrimaryKey => {
                let key = self.visit_primary_key(node, scope)?;
                scope.define(PK_SYMBOL, Value::PrimaryKey(key.clone()));
                Ok(Value::PrimaryKey(key))
            }
            NodeKind::Import => self.visit_import(node, scope),
            NodeKind::Lambda => self.visit_lambda(node, scope),
            NodeKind::Call => self.visit_call(node, scope),
            NodeKind::LiteralCollection => {
                let items = node
                    .children
                    .iter()
                    .map(|child| self.visit(child, scope, false))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::List(items))
            }
            NodeKind::LiteralInt
            | NodeKind::LiteralFloat
            | NodeKind::LiteralString
            | NodeKind::LiteralBool
            | NodeKind::LiteralDate
            | NodeKind::LiteralNull => literal(node),
            NodeKind::EntityBody
            | NodeKind::FieldSet
            | NodeKind::Field
            | NodeKind::Distribution
            | NodeKind::Builtin => Err(EvalError::UnsupportedNode {
                kind: node.kind.as_str().to_string(),
                message: "only valid inside an entity declaration".to_string(),
            }),
            NodeKind::Unknown => Err(EvalError::UnsupportedNode {
                kind: node.kind.as_str().to_string(),
                message: "unknown node kind".to_string(),
            }),
        }
    }

    fn visit_identifier(
        &mut self,
        node: &Node,
        scope: &Scope,
        deferred: bool,
    ) -> Result<Value, EvalError> {
        let symbol = required(node.value_str(), node, "symbol")?.to_string();
        if deferred {
            return Ok(Value::Deferred(crate::value::Deferred::new(
                move |scope: &Scope| {
                    scope
                        .resolve(&symbol)
                        .ok_or_else(|| EvalError::UndeclaredSymbol(symbol.clone()))
                },
            )));
        }

        let value = scope
            .resolve(&symbol)
            .ok_or_else(|| EvalError::UndeclaredSymbol(symbol.clone()))?;
        value.force(scope)
    }

    fn visit_binary(&mut self, node: &Node, scope: &Scope, deferred: bool) -> Result<Value, EvalError> {
        let symbol = node.name.as_deref().unwrap_or_default();
        let op = Operator::parse(symbol).ok_or_else(|| EvalError::UnsupportedNode {
            kind: node.kind.as_str().to_string(),
            message: format!("unknown operator {symbol:?}"),
        })?;
        let left = required(node.value_node(), node, "left operand")?;
        let right = required(node.related.as_deref(), node, "right operand")?;

        let left = self.visit(left, scope, deferred)?;
        let right = self.visit(right, scope, deferred)?;
        apply(op, left, right, scope, deferred)
    }

    fn visit_assignment(&mut self, node: &Node, scope: &Scope) -> Result<Value, EvalError> {
        let target = &node.children[0];
        let symbol = required(target.value_str(), target, "symbol")?;
        let owner = scope
            .owner_of(symbol)
            .ok_or_else(|| EvalError::UndeclaredSymbol(symbol.to_string()).at(target.location()))?;

        let value = self.visit(&node.children[1], &owner, false)?;
        owner.define(symbol, value.clone());
        Ok(value)
    }

    fn visit_variable(&mut self, node: &Node, scope: &Scope) -> Result<Value, EvalError> {
        let name = required(node.name.as_deref(), node, "name")?;
        let shadowed = scope.contains_local(name);
        let value = match node.value_node() {
            Some(initializer) => self.visit(initializer, scope, false)?,
            None => Value::Null,
        };
        scope.define(name, value.clone());
        if shadowed {
            self.warn(
                node.location(),
                format!("`{name}` shadows an earlier declaration in the same scope"),
            );
        }
        Ok(value)
    }

    fn visit_range(&mut self, node: &Node) -> Result<fauxgen_generate::CountRange, EvalError> {
        let bound = |child: &Node| match (child.kind, child.value_int()) {
            (NodeKind::LiteralInt, Some(value)) => Ok(value),
            _ => Err(EvalError::InvalidFieldArguments(format!(
                "range bounds must be integer literals, found `{}`",
                child.kind.as_str()
            ))
            .at(child.location())),
        };
        let min = bound(&node.children[0])?;
        let max = bound(&node.children[1])?;
        Ok(fauxgen_generate::CountRange::new(min, max)?)
    }

    pub(crate) fn visit_primary_key(
        &mut self,
        node: &Node,
        scope: &Scope,
    ) -> Result<PrimaryKey, EvalError> {
        let name_node = required(node.value_node(), node, "key name")?;
        let name = match self.visit(name_node, scope, false)? {
            Value::Str(name) => name,
            other => {
                return Err(EvalError::InvalidFieldArguments(format!(
                    "primary key name must be a string, found {}",
                    other.type_name()
                ))
                .at(name_node.location()));
            }
        };

        let kind_node = required(node.related.as_deref(), node, "key kind")?;
        let kind = required(kind_node.value_str(), kind_node, "key kind")?;

        let bounds = match node.args.as_slice() {
            [] => None,
            [min, max] => {
                let min = self.expect_int(min, scope, "primary key min")?;
                let max = self.expect_int(max, scope, "primary key max")?;
                Some((min, max))
            }
            other => {
                return Err(EvalError::InvalidFieldArguments(format!(
                    "primary key takes 0 or 2 arguments, found {}",
                    other.len()
                )));
            }
        };

        let kind = PrimaryKeyKind::parse(kind, bounds)?;
        Ok(PrimaryKey::new(name, kind))
    }

    fn visit_generation(&mut self, node: &Node, scope: &Scope) -> Result<Value, EvalError> {
        let count = self.expect_int(&node.args[0], scope, "generation count")?;
        let entity_node = &node.args[1];
        let generator = match self.visit(entity_node, scope, false)? {
            Value::Entity(generator) => generator,
            other => {
                return Err(EvalError::InvalidFieldArguments(format!(
                    "cannot generate a {}; expected an entity",
                    other.type_name()
                ))
                .at(entity_node.location()));
            }
        };

        if count < 1 {
            return Err(EvalError::InvalidGenerationCount {
                entity: generator.name().to_string(),
                count,
            });
        }
        if self.options.dry_run {
            info!(entity = generator.name(), count, "dry run; generation skipped");
            return Ok(Value::List(Vec::new()));
        }

        let count = count as u64;
        generator.ensure_generatable(count)?;
        let sink = self.emitter.next_emitter(None, generator.name(), true);
        let records = generator.generate_with_rng(count, sink, &mut *self.rng)?;
        Ok(Value::List(records.into_iter().map(Value::Record).collect()))
    }

    fn visit_import(&mut self, node: &Node, scope: &Scope) -> Result<Value, EvalError> {
        let path = required(node.value_str(), node, "path")?;
        let resolved = self.loader.resolve(path, self.current_file.as_deref())?;

        // mark before visiting so import cycles terminate
        if !self.imported.insert(resolved.clone()) {
            debug!(path = %resolved.display(), "import already evaluated; skipping");
            return Ok(Value::Null);
        }

        let program = self.loader.load(&resolved)?;
        debug!(path = %resolved.display(), "evaluating import");
        let previous = self.current_file.replace(resolved);
        let result = self.visit(&program, scope, false);
        self.current_file = previous;
        result
    }

    fn visit_lambda(&mut self, node: &Node, scope: &Scope) -> Result<Value, EvalError> {
        let params = node
            .args
            .iter()
            .map(|param| required(param.value_str(), param, "parameter").map(str::to_string))
            .collect::<Result<Vec<_>, _>>()?;
        let body = required(node.value_node(), node, "body")?.clone();

        let closure = Closure {
            name: node.name.clone(),
            params,
            body,
            scope: scope.clone(),
        };
        let value = Value::Lambda(Rc::new(closure));
        if let Some(name) = node.name.as_deref() {
            self.bind(scope, name, value.clone(), node.location());
        }
        Ok(value)
    }

    fn visit_call(&mut self, node: &Node, scope: &Scope) -> Result<Value, EvalError> {
        reject_distribution_args(&node.args)?;
        let callee = required(node.value_node(), node, "callee")?;
        let closure = match self.visit(callee, scope, false)? {
            Value::Lambda(closure) => closure,
            other => {
                return Err(EvalError::InvalidCall(format!(
                    "a {} is not callable",
                    other.type_name()
                )));
            }
        };
        if closure.params.len() != node.args.len() {
            return Err(EvalError::InvalidCall(format!(
                "{} expects {} argument(s), got {}",
                closure.name.as_deref().unwrap_or("lambda"),
                closure.params.len(),
                node.args.len()
            )));
        }

        // arguments are evaluated where the call is written, the body where
        // the lambda was declared; both eagerly, even inside a computed field
        let frame = closure.scope.extend();
        for (param, arg) in closure.params.iter().zip(&node.args) {
            let value = self.visit(arg, scope, false)?;
            frame.define(param.clone(), value);
        }
        self.visit(&closure.body, &frame, false)
    }

    pub(crate) fn expect_int(
        &mut self,
        node: &Node,
        scope: &Scope,
        what: &str,
    ) -> Result<i64, EvalError> {
        match self.visit(node, scope, false)? {
            Value::Int(value) => Ok(value),
            other => Err(EvalError::InvalidFieldArguments(format!(
                "{what} must be an integer, found {}",
                other.type_name()
            ))
            .at(node.location())),
        }
    }

    /// Define `name`, recording a warning when it shadows a local binding.
    pub(crate) fn bind(
        &mut self,
        scope: &Scope,
        name: &str,
        value: Value,
        location: Option<&Location>,
    ) {
        if scope.define(name, value).is_some() {
            self.warn(
                location,
                format!("`{name}` shadows an earlier declaration in the same scope"),
            );
        }
    }

    pub(crate) fn warn(&mut self, location: Option<&Location>, message: String) {
        warn!(location = %Location::describe(location), "{message}");
        self.warnings.push(Warning::new(location, message));
    }

    fn install_prelude(&self) {
        if !self.root.contains_local(NOW_SYMBOL) {
            self.root.define(NOW_SYMBOL, Value::Date(self.now));
        }
        if !self.root.contains_local(UNIX_EPOCH_SYMBOL) {
            self.root
                .define(UNIX_EPOCH_SYMBOL, Value::Date(NaiveDateTime::default()));
        }
    }
}

pub(crate) fn required<'a, T: ?Sized>(
    value: Option<&'a T>,
    node: &Node,
    what: &str,
) -> Result<&'a T, EvalError> {
    value.ok_or_else(|| EvalError::UnsupportedNode {
        kind: node.kind.as_str().to_string(),
        message: format!("missing {what}"),
    })
}

/// Distributions cannot be passed as arguments; checked before evaluation.
pub(crate) fn reject_distribution_args(args: &[Node]) -> Result<(), EvalError> {
    let nested = args.iter().find(|arg| {
        arg.is(NodeKind::Distribution)
            || (arg.is(NodeKind::Field)
                && arg
                    .value_node()
                    .is_some_and(|value| value.is(NodeKind::Distribution)))
    });
    match nested {
        Some(arg) => Err(EvalError::Generation(
            fauxgen_generate::GenerationError::DistributionConfiguration(
                "a distribution cannot be used as an argument".to_string(),
            ),
        )
        .at(arg.location())),
        None => Ok(()),
    }
}

fn literal(node: &Node) -> Result<Value, EvalError> {
    let value = match node.kind {
        NodeKind::LiteralInt => node.value_int().map(Value::Int),
        NodeKind::LiteralFloat => node.value_float().map(Value::Float),
        NodeKind::LiteralString => node.value_str().map(|value| Value::Str(value.to_string())),
        NodeKind::LiteralBool => node.value_bool().map(Value::Bool),
        NodeKind::LiteralNull => Some(Value::Null),
        NodeKind::LiteralDate => {
            let text = required(node.value_str(), node, "date")?;
            let date = parse_date(text).ok_or_else(|| EvalError::UnsupportedNode {
                kind: node.kind.as_str().to_string(),
                message: format!("invalid date {text:?}; expected YYYY-MM-DD[THH:MM:SS]"),
            })?;
            Some(Value::Date(date))
        }
        _ => None,
    };
    required(value.as_ref(), node, "literal value").cloned()
}

fn parse_date(text: &str) -> Option<NaiveDateTime> {
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(value) = NaiveDateTime::parse_from_str(text, format) {
            return Some(value);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}
