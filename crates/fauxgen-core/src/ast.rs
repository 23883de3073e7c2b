use schemars::JsonSchema;
use schemars::schema::RootSchema;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::location::Location;

/// Discriminant of an AST node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Root,
    Sequential,
    Atomic,
    Identifier,
    Binary,
    Assignment,
    Variable,
    Entity,
    EntityBody,
    FieldSet,
    Field,
    Distribution,
    Builtin,
    Generation,
    Range,
    PrimaryKey,
    Import,
    Lambda,
    Call,
    LiteralInt,
    LiteralFloat,
    LiteralString,
    LiteralBool,
    LiteralDate,
    LiteralNull,
    LiteralCollection,
    /// Any kind this version does not know about.
    #[serde(other)]
    Unknown,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Sequential => "sequential",
            NodeKind::Atomic => "atomic",
            NodeKind::Identifier => "identifier",
            NodeKind::Binary => "binary",
            NodeKind::Assignment => "assignment",
            NodeKind::Variable => "variable",
            NodeKind::Entity => "entity",
            NodeKind::EntityBody => "entity-body",
            NodeKind::FieldSet => "field-set",
            NodeKind::Field => "field",
            NodeKind::Distribution => "distribution",
            NodeKind::Builtin => "builtin",
            NodeKind::Generation => "generation",
            NodeKind::Range => "range",
            NodeKind::PrimaryKey => "primary-key",
            NodeKind::Import => "import",
            NodeKind::Lambda => "lambda",
            NodeKind::Call => "call",
            NodeKind::LiteralInt => "literal-int",
            NodeKind::LiteralFloat => "literal-float",
            NodeKind::LiteralString => "literal-string",
            NodeKind::LiteralBool => "literal-bool",
            NodeKind::LiteralDate => "literal-date",
            NodeKind::LiteralNull => "literal-null",
            NodeKind::LiteralCollection => "literal-collection",
            NodeKind::Unknown => "unknown",
        }
    }

    pub fn is_literal(self) -> bool {
        matches!(
            self,
            NodeKind::LiteralInt
                | NodeKind::LiteralFloat
                | NodeKind::LiteralString
                | NodeKind::LiteralBool
                | NodeKind::LiteralDate
                | NodeKind::LiteralNull
                | NodeKind::LiteralCollection
        )
    }
}

/// Scalar payload embedded in a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

/// Primary value of a node: either a nested node or a scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum NodeValue {
    Node(Box<Node>),
    Scalar(Scalar),
}

/// Immutable AST node produced by an external parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Node {
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<NodeValue>,
    /// Second operand, parent entity reference or primary-key kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related: Option<Box<Node>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count_range: Option<Box<Node>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unique: bool,
    /// Relative weight or target percentage of a distribution interval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            name: None,
            value: None,
            related: None,
            children: Vec::new(),
            args: Vec::new(),
            count_range: None,
            unique: false,
            weight: None,
            location: None,
        }
    }

    pub fn is(&self, kind: NodeKind) -> bool {
        self.kind == kind
    }

    pub fn value_node(&self) -> Option<&Node> {
        match &self.value {
            Some(NodeValue::Node(node)) => Some(node),
            _ => None,
        }
    }

    pub fn scalar(&self) -> Option<&Scalar> {
        match &self.value {
            Some(NodeValue::Scalar(scalar)) => Some(scalar),
            _ => None,
        }
    }

    pub fn value_str(&self) -> Option<&str> {
        match self.scalar() {
            Some(Scalar::Str(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn value_int(&self) -> Option<i64> {
        match self.scalar() {
            Some(Scalar::Int(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn value_float(&self) -> Option<f64> {
        match self.scalar() {
            Some(Scalar::Float(value)) => Some(*value),
            Some(Scalar::Int(value)) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn value_bool(&self) -> Option<bool> {
        match self.scalar() {
            Some(Scalar::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_node(mut self, value: Node) -> Self {
        self.value = Some(NodeValue::Node(Box::new(value)));
        self
    }

    pub fn with_scalar(mut self, value: Scalar) -> Self {
        self.value = Some(NodeValue::Scalar(value));
        self
    }

    pub fn with_related(mut self, related: Node) -> Self {
        self.related = Some(Box::new(related));
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn with_args(mut self, args: Vec<Node>) -> Self {
        self.args = args;
        self
    }

    pub fn with_count_range(mut self, range: Node) -> Self {
        self.count_range = Some(Box::new(range));
        self
    }

    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

/// Decode a JSON-serialized AST document.
pub fn parse_ast_json(input: &str) -> Result<Node> {
    Ok(serde_json::from_str(input)?)
}

/// JSON Schema describing the serialized AST contract.
pub fn ast_json_schema() -> RootSchema {
    schemars::schema_for!(Node)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_kinds_survive_decoding() {
        let node = parse_ast_json(r#"{"kind": "while-loop"}"#).expect("decode");
        assert_eq!(node.kind, NodeKind::Unknown);
    }

    #[test]
    fn scalar_and_node_values_are_distinguished() {
        let node = parse_ast_json(
            r#"{"kind": "atomic", "value": {"kind": "literal-int", "value": 7}}"#,
        )
        .expect("decode");
        let inner = node.value_node().expect("nested node");
        assert_eq!(inner.kind, NodeKind::LiteralInt);
        assert_eq!(inner.value_int(), Some(7));

        let float = parse_ast_json(r#"{"kind": "literal-float", "value": 2.5}"#).expect("decode");
        assert_eq!(float.value_float(), Some(2.5));
    }
}
