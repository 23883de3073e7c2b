use fauxgen_core::ast_json_schema;

fn main() {
    let schema = ast_json_schema();
    let json = serde_json::to_string_pretty(&schema).expect("serialize json schema");
    println!("{json}");
}
