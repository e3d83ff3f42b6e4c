use testgen_schema::when_json_schema;

fn main() {
    let schema = when_json_schema();
    let json = serde_json::to_string_pretty(&schema).expect("serialize when json schema");
    println!("{json}");
}
