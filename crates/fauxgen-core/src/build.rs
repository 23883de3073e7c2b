//! Constructors for well-formed nodes.
//!
//! Parsers and tests use these to build trees that satisfy the shape rules in
//! [`crate::validation`].

use crate::ast::{Node, NodeKind, Scalar};

pub fn root(children: Vec<Node>) -> Node {
    Node::new(NodeKind::Root).with_children(children)
}

pub fn sequential(children: Vec<Node>) -> Node {
    Node::new(NodeKind::Sequential).with_children(children)
}

pub fn atomic(inner: Node) -> Node {
    Node::new(NodeKind::Atomic).with_node(inner)
}

pub fn int_literal(value: i64) -> Node {
    Node::new(NodeKind::LiteralInt).with_scalar(Scalar::Int(value))
}

pub fn float_literal(value: f64) -> Node {
    Node::new(NodeKind::LiteralFloat).with_scalar(Scalar::Float(value))
}

pub fn string_literal(value: impl Into<String>) -> Node {
    Node::new(NodeKind::LiteralString).with_scalar(Scalar::Str(value.into()))
}

pub fn bool_literal(value: bool) -> Node {
    Node::new(NodeKind::LiteralBool).with_scalar(Scalar::Bool(value))
}

/// Date literal in `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM:SS` form.
pub fn date_literal(value: impl Into<String>) -> Node {
    Node::new(NodeKind::LiteralDate).with_scalar(Scalar::Str(value.into()))
}

pub fn null_literal() -> Node {
    Node::new(NodeKind::LiteralNull)
}

pub fn collection(items: Vec<Node>) -> Node {
    Node::new(NodeKind::LiteralCollection).with_children(items)
}

pub fn identifier(symbol: impl Into<String>) -> Node {
    Node::new(NodeKind::Identifier).with_scalar(Scalar::Str(symbol.into()))
}

pub fn binary(op: &str, left: Node, right: Node) -> Node {
    Node::new(NodeKind::Binary)
        .with_name(op)
        .with_node(left)
        .with_related(right)
}

pub fn variable(name: impl Into<String>, initializer: Option<Node>) -> Node {
    let node = Node::new(NodeKind::Variable).with_name(name);
    match initializer {
        Some(value) => node.with_node(value),
        None => node,
    }
}

pub fn assignment(symbol: impl Into<String>, value: Node) -> Node {
    Node::new(NodeKind::Assignment).with_children(vec![identifier(symbol), value])
}

pub fn range(min: i64, max: i64) -> Node {
    Node::new(NodeKind::Range).with_children(vec![int_literal(min), int_literal(max)])
}

pub fn builtin(type_name: impl Into<String>) -> Node {
    Node::new(NodeKind::Builtin).with_scalar(Scalar::Str(type_name.into()))
}

/// Field declaration; `value` is the type or value expression.
pub fn field(name: impl Into<String>, value: Node, args: Vec<Node>) -> Node {
    Node::new(NodeKind::Field)
        .with_name(name)
        .with_node(value)
        .with_args(args)
}

/// Distribution field over weighted `intervals` (see [`interval`]).
pub fn distribution_field(name: impl Into<String>, kind: &str, intervals: Vec<Node>) -> Node {
    let shape = Node::new(NodeKind::Distribution).with_scalar(Scalar::Str(kind.to_string()));
    field(name, shape, intervals)
}

/// One interval of a distribution domain.
pub fn interval(value: Node, args: Vec<Node>, weight: Option<f64>) -> Node {
    let node = Node::new(NodeKind::Field).with_node(value).with_args(args);
    match weight {
        Some(weight) => node.with_weight(weight),
        None => node,
    }
}

pub fn primary_key(name: Node, kind: &str) -> Node {
    Node::new(NodeKind::PrimaryKey)
        .with_node(name)
        .with_related(string_literal(kind))
}

pub fn entity(
    name: Option<&str>,
    parent: Option<&str>,
    primary_key: Option<Node>,
    fields: Vec<Node>,
) -> Node {
    let mut body = Node::new(NodeKind::EntityBody)
        .with_node(Node::new(NodeKind::FieldSet).with_children(fields));
    if let Some(pk) = primary_key {
        body = body.with_related(pk);
    }

    let mut node = Node::new(NodeKind::Entity).with_node(body);
    if let Some(name) = name {
        node = node.with_name(name);
    }
    if let Some(parent) = parent {
        node = node.with_related(identifier(parent));
    }
    node
}

pub fn generation(count: Node, entity: Node) -> Node {
    Node::new(NodeKind::Generation).with_args(vec![count, entity])
}

pub fn import(path: impl Into<String>) -> Node {
    Node::new(NodeKind::Import).with_scalar(Scalar::Str(path.into()))
}

pub fn lambda(name: Option<&str>, params: &[&str], body: Node) -> Node {
    let node = Node::new(NodeKind::Lambda)
        .with_args(params.iter().map(|param| identifier(*param)).collect())
        .with_node(body);
    match name {
        Some(name) => node.with_name(name),
        None => node,
    }
}

pub fn call(callee: Node, args: Vec<Node>) -> Node {
    Node::new(NodeKind::Call).with_node(callee).with_args(args)
}
