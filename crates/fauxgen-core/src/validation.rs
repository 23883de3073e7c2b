use crate::ast::{Node, NodeKind, NodeValue};
use crate::error::{Error, Result};
use crate::location::Location;

const OPERATORS: &[&str] = &["+", "-", "*", "/"];

/// Check the shape of a single node without descending into it.
///
/// This checks:
/// - the kind is known
/// - required payloads (name, value, related) are present
/// - child and argument arity for fixed-arity kinds
pub fn check_shape(node: &Node) -> Result<()> {
    let malformed = |message: &str| Error::MalformedNode {
        at: Location::describe(node.location()),
        kind: node.kind.as_str(),
        message: message.to_string(),
    };

    match node.kind {
        NodeKind::Unknown => {
            return Err(Error::UnsupportedKind {
                at: Location::describe(node.location()),
                kind: node.kind.as_str().to_string(),
            });
        }
        NodeKind::Root | NodeKind::Sequential | NodeKind::LiteralCollection => {}
        NodeKind::LiteralNull => {}
        NodeKind::Atomic => {
            node.value_node()
                .ok_or_else(|| malformed("expected a wrapped expression"))?;
        }
        NodeKind::Identifier => {
            node.value_str()
                .ok_or_else(|| malformed("expected a symbol name"))?;
        }
        NodeKind::Binary => {
            let op = node.name.as_deref().unwrap_or_default();
            if !OPERATORS.contains(&op) {
                return Err(malformed(&format!("unknown operator {op:?}")));
            }
            node.value_node()
                .ok_or_else(|| malformed("missing left operand"))?;
            node.related
                .as_ref()
                .ok_or_else(|| malformed("missing right operand"))?;
        }
        NodeKind::Assignment => {
            if node.children.len() != 2 {
                return Err(malformed(&format!(
                    "expected 2 children, found {}",
                    node.children.len()
                )));
            }
            if !node.children[0].is(NodeKind::Identifier) {
                return Err(malformed("assignment target must be an identifier"));
            }
        }
        NodeKind::Variable => {
            node.name
                .as_ref()
                .ok_or_else(|| malformed("missing variable name"))?;
        }
        NodeKind::Entity => {
            let body = node
                .value_node()
                .ok_or_else(|| malformed("missing entity body"))?;
            if !body.is(NodeKind::EntityBody) {
                return Err(malformed(&format!(
                    "expected an entity-body, found `{}`",
                    body.kind.as_str()
                )));
            }
            if let Some(parent) = node.related.as_deref()
                && !parent.is(NodeKind::Identifier)
            {
                return Err(malformed("parent entity must be an identifier"));
            }
        }
        NodeKind::EntityBody => {
            if let Some(fields) = node.value_node()
                && !fields.is(NodeKind::FieldSet)
            {
                return Err(malformed(&format!(
                    "expected a field-set, found `{}`",
                    fields.kind.as_str()
                )));
            }
            if let Some(pk) = node.related.as_deref()
                && !pk.is(NodeKind::PrimaryKey)
            {
                return Err(malformed(&format!(
                    "expected a primary-key statement, found `{}`",
                    pk.kind.as_str()
                )));
            }
        }
        NodeKind::FieldSet => {
            if let Some(child) = node.children.iter().find(|child| !child.is(NodeKind::Field)) {
                return Err(malformed(&format!(
                    "expected a field declaration, found `{}`",
                    child.kind.as_str()
                )));
            }
        }
        NodeKind::Field => {
            node.value_node()
                .ok_or_else(|| malformed("missing field type or value"))?;
        }
        NodeKind::Distribution | NodeKind::Builtin => {
            node.value_str()
                .ok_or_else(|| malformed("missing type name"))?;
        }
        NodeKind::Generation => {
            if node.args.len() != 2 {
                return Err(malformed(&format!(
                    "expected a count and an entity, found {} args",
                    node.args.len()
                )));
            }
        }
        NodeKind::Range => {
            if node.children.len() != 2 {
                return Err(malformed(&format!(
                    "expected 2 bounds, found {}",
                    node.children.len()
                )));
            }
        }
        NodeKind::PrimaryKey => {
            node.value_node()
                .ok_or_else(|| malformed("missing key name"))?;
            node.related
                .as_ref()
                .ok_or_else(|| malformed("missing key kind"))?;
        }
        NodeKind::Import => {
            node.value_str()
                .ok_or_else(|| malformed("missing import path"))?;
        }
        NodeKind::Lambda => {
            if node.args.iter().any(|param| !param.is(NodeKind::Identifier)) {
                return Err(malformed("lambda parameters must be identifiers"));
            }
            node.value_node()
                .ok_or_else(|| malformed("missing lambda body"))?;
        }
        NodeKind::Call => {
            node.value_node()
                .ok_or_else(|| malformed("missing callee"))?;
        }
        NodeKind::LiteralInt => {
            node.value_int()
                .ok_or_else(|| malformed("expected an integer value"))?;
        }
        NodeKind::LiteralFloat => {
            node.value_float()
                .ok_or_else(|| malformed("expected a decimal value"))?;
        }
        NodeKind::LiteralBool => {
            node.value_bool()
                .ok_or_else(|| malformed("expected a boolean value"))?;
        }
        NodeKind::LiteralString | NodeKind::LiteralDate => {
            node.value_str()
                .ok_or_else(|| malformed("expected a string value"))?;
        }
    }

    Ok(())
}

/// Validate the shape of a whole tree, depth first.
pub fn validate_ast(node: &Node) -> Result<()> {
    check_shape(node)?;

    if let Some(NodeValue::Node(value)) = &node.value {
        validate_ast(value)?;
    }
    if let Some(related) = node.related.as_deref() {
        validate_ast(related)?;
    }
    if let Some(range) = node.count_range.as_deref() {
        validate_ast(range)?;
    }
    for child in node.children.iter().chain(node.args.iter()) {
        validate_ast(child)?;
    }

    Ok(())
}
