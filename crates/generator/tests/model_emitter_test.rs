//! Integration test for the reference model emitter

use specmill_common::{EndpointModel, HttpMethod, Schema, Server, ServiceModel};
use specmill_generator::{emit_model, EmitOptions};
use std::collections::BTreeMap;
use std::fs;
use tempfile::TempDir;

fn endpoint(method: HttpMethod, path: &str, summary: &str, tags: &[&str]) -> EndpointModel {
    EndpointModel {
        id: EndpointModel::make_id(method, path),
        method,
        path: path.to_string(),
        operation_id: None,
        summary: summary.to_string(),
        description: String::new(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        deprecated: false,
        parameters: vec![],
        request_body: None,
        responses: vec![],
    }
}

fn petstore() -> ServiceModel {
    ServiceModel {
        title: "Pet Store API".to_string(),
        version: "1.0.0".to_string(),
        description: "Manage pets".to_string(),
        servers: vec![Server {
            url: "https://petstore.example.com/v1".to_string(),
            description: String::new(),
        }],
        tags: vec!["pets".to_string()],
        endpoints: vec![
            endpoint(HttpMethod::Get, "/pets", "List | filter pets", &["pets"]),
            endpoint(HttpMethod::Post, "/pets", "Create a pet", &["pets"]),
        ],
        schemas: BTreeMap::from([(
            "Pet".to_string(),
            Schema {
                name: "Pet".to_string(),
                schema_type: "object".to_string(),
                ..Default::default()
            },
        )]),
    }
}

#[test]
fn test_emit_writes_model_and_readme() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("pets");

    let result = emit_model(&petstore(), &EmitOptions::new(&out)).unwrap();
    assert_eq!(result.tool_name, "pet-store-api");
    assert_eq!(result.package_name, "pet-store-api");

    let planned: Vec<_> = result.planned.iter().map(|f| f.rel_path.as_str()).collect();
    assert_eq!(planned, vec!["README.md", "model.json"]);

    let json = fs::read_to_string(out.join("model.json")).unwrap();
    assert_eq!(result.planned[1].size, json.len());
    let back: ServiceModel = serde_json::from_str(&json).unwrap();
    assert_eq!(back, petstore());

    let readme = fs::read_to_string(out.join("README.md")).unwrap();
    assert!(readme.starts_with("# Pet Store API"));
    assert!(readme.contains("| GET | `/pets` | List \\| filter pets | pets |"));
    assert!(readme.contains("| POST | `/pets` |"));
    assert!(readme.contains("`https://petstore.example.com/v1`"));
    assert!(readme.contains("`Pet` (object)"));
}

#[test]
fn test_dry_run_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("planned");

    let options = EmitOptions::new(&out).with_dry_run(true);
    let result = emit_model(&petstore(), &options).unwrap();
    assert_eq!(result.planned.len(), 2);
    assert!(!out.exists());
}

#[test]
fn test_non_empty_directory_requires_force() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("existing.txt"), "keep").unwrap();

    assert!(emit_model(&petstore(), &EmitOptions::new(dir.path())).is_err());
    assert!(emit_model(&petstore(), &EmitOptions::new(dir.path()).with_dry_run(true)).is_err());
    assert!(!dir.path().join("model.json").exists());

    let options = EmitOptions::new(dir.path()).with_force(true);
    emit_model(&petstore(), &options).unwrap();
    assert!(dir.path().join("model.json").exists());
    assert!(dir.path().join("existing.txt").exists());
}

#[test]
fn test_name_overrides() {
    let dir = TempDir::new().unwrap();
    let options = EmitOptions::new(dir.path().join("out"))
        .with_tool_name("Pets CLI")
        .with_package_name("pets_cli");

    let result = emit_model(&petstore(), &options).unwrap();
    assert_eq!(result.tool_name, "pets-cli");
    assert_eq!(result.package_name, "pets_cli");

    let readme = fs::read_to_string(dir.path().join("out/README.md")).unwrap();
    assert!(readme.contains("`pets-cli`"));
}

#[test]
fn test_emission_is_deterministic() {
    let dir = TempDir::new().unwrap();
    emit_model(&petstore(), &EmitOptions::new(dir.path().join("a"))).unwrap();
    emit_model(&petstore(), &EmitOptions::new(dir.path().join("b"))).unwrap();

    for file in ["model.json", "README.md"] {
        assert_eq!(
            fs::read(dir.path().join("a").join(file)).unwrap(),
            fs::read(dir.path().join("b").join(file)).unwrap()
        );
    }
}
