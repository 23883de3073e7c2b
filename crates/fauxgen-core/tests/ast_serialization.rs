use fauxgen_core::{Location, Node, NodeKind, ast_json_schema, build, parse_ast_json};

#[test]
fn serializes_ast_deterministically() {
    let node = build::variable("answer", Some(build::int_literal(42)))
        .at(Location::new("main.fg", 1, 1, 0));

    let json = serde_json::to_string_pretty(&node).expect("serialize node");
    let expected = r#"{
  "kind": "variable",
  "name": "answer",
  "value": {
    "kind": "literal-int",
    "value": 42
  },
  "location": {
    "file": "main.fg",
    "line": 1,
    "column": 1,
    "offset": 0
  }
}"#;
    assert_eq!(json, expected);
}

#[test]
fn decodes_entity_with_distribution_field() {
    let json = r#"{
      "kind": "entity",
      "name": "Order",
      "value": {
        "kind": "entity-body",
        "value": {
          "kind": "field-set",
          "children": [
            {
              "kind": "field",
              "name": "status",
              "value": {"kind": "distribution", "value": "percent"},
              "args": [
                {"kind": "field", "value": {"kind": "literal-string", "value": "open"}, "weight": 60.0},
                {"kind": "field", "value": {"kind": "literal-string", "value": "closed"}, "weight": 40.0}
              ]
            }
          ]
        }
      }
    }"#;

    let node = parse_ast_json(json).expect("decode entity");
    assert_eq!(node.kind, NodeKind::Entity);
    let fields = node
        .value_node()
        .and_then(Node::value_node)
        .expect("field set");
    let status = &fields.children[0];
    assert_eq!(status.args.len(), 2);
    assert_eq!(status.args[0].weight, Some(60.0));
    assert_eq!(
        status.value_node().and_then(Node::value_str),
        Some("percent")
    );
}

#[test]
fn json_schema_names_every_node_kind() {
    let schema = serde_json::to_string(&ast_json_schema()).expect("serialize schema");
    for kind in ["literal-int", "primary-key", "entity-body", "field-set", "lambda"] {
        assert!(schema.contains(kind), "schema should mention {kind}");
    }
}
