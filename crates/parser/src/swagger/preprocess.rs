//! Compatibility rewrites for non-compliant Swagger 2.0 operations
//!
//! Two shapes seen in the wild violate the v2 model and block conversion:
//! several `in: body` parameters on one operation, and `in: body` mixed with
//! `in: formData`. Both are repaired on the untyped tree. Anything not
//! recognized passes through untouched.

use crate::detect::parse_tree;
use serde_json::{json, Map, Value};
use std::borrow::Cow;
use tracing::debug;

const METHODS: [&str; 7] = ["get", "post", "put", "delete", "patch", "options", "head"];

const MULTIPART: &str = "multipart/form-data";

/// Name given to body parameters that lack one
const DEFAULT_FIELD_NAME: &str = "field";

/// Rewrite raw v2 bytes; returns the input borrowed when nothing changed
///
/// Never fails: unparseable input comes back unchanged with `false`.
pub fn preprocess_v2(bytes: &[u8]) -> (Cow<'_, [u8]>, bool) {
    let Ok(mut tree) = parse_tree(bytes) else {
        return (Cow::Borrowed(bytes), false);
    };

    if !preprocess_tree(&mut tree) {
        return (Cow::Borrowed(bytes), false);
    }

    match serde_yaml::to_string(&tree) {
        Ok(out) => (Cow::Owned(out.into_bytes()), true),
        Err(e) => {
            debug!(error = %e, "failed to serialize preprocessed document");
            (Cow::Borrowed(bytes), false)
        }
    }
}

/// Rewrite a parsed v2 tree in place; returns whether anything changed
pub fn preprocess_tree(root: &mut Value) -> bool {
    let Some(paths) = root.get_mut("paths").and_then(Value::as_object_mut) else {
        return false;
    };

    let mut modified = false;
    for (path, item) in paths.iter_mut() {
        let Some(item) = item.as_object_mut() else {
            continue;
        };
        for (method, op) in item.iter_mut() {
            if !METHODS.contains(&method.to_ascii_lowercase().as_str()) {
                continue;
            }
            let Some(op) = op.as_object_mut() else {
                continue;
            };
            if rewrite_operation(op) {
                debug!(path = %path, method = %method, "rewrote incompatible body parameters");
                modified = true;
            }
        }
    }

    modified
}

fn rewrite_operation(op: &mut Map<String, Value>) -> bool {
    let Some(params) = op.get("parameters").and_then(Value::as_array) else {
        return false;
    };

    let body_count = params.iter().filter(|p| is_in(p, "body")).count();
    if body_count == 0 {
        return false;
    }
    let has_form_data = params.iter().any(|p| is_in(p, "formData"));

    if has_form_data {
        let rewritten: Vec<Value> = params
            .iter()
            .map(|p| match p.as_object() {
                Some(param) if is_in(p, "body") => Value::Object(form_data_from_body(param)),
                _ => p.clone(),
            })
            .collect();
        op.insert("parameters".to_string(), Value::Array(rewritten));
        ensure_consumes_multipart(op);
        return true;
    }

    if body_count > 1 {
        let merged = merge_bodies(params);
        op.insert("parameters".to_string(), Value::Array(merged));
        return true;
    }

    false
}

fn merge_bodies(params: &[Value]) -> Vec<Value> {
    let mut properties = Map::new();
    let mut required: Vec<Value> = Vec::new();
    let mut rest = Vec::with_capacity(params.len());

    for param in params {
        let Some(p) = param.as_object().filter(|_| is_in(param, "body")) else {
            rest.push(param.clone());
            continue;
        };

        let name = param_name(p);
        let schema = schema_from_param(p).unwrap_or_else(|| json!({"type": "string"}));
        properties.insert(name.clone(), schema);

        let is_required = p.get("required").and_then(Value::as_bool).unwrap_or(false);
        let name = Value::String(name);
        if is_required && !required.contains(&name) {
            required.push(name);
        }
    }

    let mut schema = Map::new();
    schema.insert("type".to_string(), json!("object"));
    schema.insert("properties".to_string(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert("required".to_string(), Value::Array(required));
    }

    let mut merged = Vec::with_capacity(rest.len() + 1);
    merged.push(json!({
        "in": "body",
        "name": "body",
        "schema": Value::Object(schema),
    }));
    merged.extend(rest);
    merged
}

/// The parameter's own schema, or one synthesized from `type`/`items`/`format`
fn schema_from_param(param: &Map<String, Value>) -> Option<Value> {
    if let Some(schema) = param.get("schema").filter(|s| s.is_object()) {
        return Some(schema.clone());
    }

    let ty = param.get("type").and_then(Value::as_str).filter(|t| !t.is_empty())?;
    let mut schema = Map::new();
    schema.insert("type".to_string(), json!(ty));
    if let Some(items) = param.get("items").filter(|i| i.is_object()) {
        schema.insert("items".to_string(), items.clone());
    }
    if let Some(format) = non_empty_str(param.get("format")) {
        schema.insert("format".to_string(), json!(format));
    }
    Some(Value::Object(schema))
}

fn form_data_from_body(param: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    out.insert("in".to_string(), json!("formData"));
    out.insert("name".to_string(), json!(param_name(param)));
    if let Some(description) = non_empty_str(param.get("description")) {
        out.insert("description".to_string(), json!(description));
    }
    if let Some(required) = param.get("required").and_then(Value::as_bool) {
        out.insert("required".to_string(), json!(required));
    }

    let mut ty = None;
    let mut format = None;
    let mut items = None;
    if let Some(schema) = param.get("schema").and_then(Value::as_object) {
        ty = non_empty_str(schema.get("type"));
        format = non_empty_str(schema.get("format"));
        items = schema.get("items").filter(|i| i.is_object());
        if ty.is_none() && schema.contains_key("$ref") {
            // a referenced object has no formData representation
            ty = Some("string");
        }
    }
    if ty.is_none() {
        ty = non_empty_str(param.get("type"));
        format = non_empty_str(param.get("format"));
        items = param.get("items").filter(|i| i.is_object());
    }

    let ty = match ty {
        Some("object") | None => "string",
        Some(other) => other,
    };
    out.insert("type".to_string(), json!(ty));
    if let Some(items) = items.filter(|_| ty == "array") {
        out.insert("items".to_string(), items.clone());
    }
    if let Some(format) = format {
        out.insert("format".to_string(), json!(format));
    }
    out
}

fn ensure_consumes_multipart(op: &mut Map<String, Value>) {
    let mut consumes = op
        .get("consumes")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    if !consumes.iter().any(|c| c.as_str() == Some(MULTIPART)) {
        consumes.push(json!(MULTIPART));
    }
    op.insert("consumes".to_string(), Value::Array(consumes));
}

fn is_in(param: &Value, location: &str) -> bool {
    param
        .get("in")
        .and_then(Value::as_str)
        .is_some_and(|l| l.eq_ignore_ascii_case(location))
}

fn param_name(param: &Map<String, Value>) -> String {
    non_empty_str(param.get("name"))
        .unwrap_or(DEFAULT_FIELD_NAME)
        .to_string()
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params<'a>(tree: &'a Value, path: &str, method: &str) -> &'a Vec<Value> {
        tree["paths"][path][method]["parameters"].as_array().unwrap()
    }

    #[test]
    fn test_multiple_bodies_are_merged() {
        let input = br#"swagger: "2.0"
info: { title: t, version: "1.0.0" }
paths:
  /x:
    post:
      parameters:
      - in: body
        name: a
        required: true
        schema: { type: string }
      - in: query
        name: q
        type: string
      - in: body
        name: b
        type: integer
        format: int64
      responses: { '200': { description: ok } }
"#;
        let (out, changed) = preprocess_v2(input);
        assert!(changed);

        let tree = parse_tree(&out).unwrap();
        let params = params(&tree, "/x", "post");
        let bodies: Vec<_> = params.iter().filter(|p| p["in"] == "body").collect();
        assert_eq!(bodies.len(), 1);
        assert_eq!(params[0]["name"], "body");

        let schema = &params[0]["schema"];
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["a"]["type"], "string");
        assert_eq!(schema["properties"]["b"]["type"], "integer");
        assert_eq!(schema["properties"]["b"]["format"], "int64");
        assert_eq!(schema["required"], json!(["a"]));
        assert_eq!(params[1]["name"], "q");
    }

    #[test]
    fn test_body_and_form_data_become_form_data() {
        let input = br#"swagger: "2.0"
info: { title: t, version: "1.0.0" }
paths:
  /upload:
    post:
      parameters:
      - in: body
        name: desc
        description: caption
        schema: { $ref: '#/definitions/Caption' }
      - in: formData
        name: file
        type: file
        required: true
      responses: { '200': { description: ok } }
"#;
        let (out, changed) = preprocess_v2(input);
        assert!(changed);

        let tree = parse_tree(&out).unwrap();
        let params = params(&tree, "/upload", "post");
        assert!(params.iter().all(|p| p["in"] != "body"));
        assert_eq!(params[0]["in"], "formData");
        assert_eq!(params[0]["name"], "desc");
        assert_eq!(params[0]["type"], "string");
        assert_eq!(params[0]["description"], "caption");

        let consumes = tree["paths"]["/upload"]["post"]["consumes"].as_array().unwrap();
        assert!(consumes.contains(&json!("multipart/form-data")));
    }

    #[test]
    fn test_unnamed_body_defaults_to_field() {
        let mut tree = json!({
            "swagger": "2.0",
            "paths": {"/x": {"put": {"parameters": [
                {"in": "body", "schema": {"type": "string"}},
                {"in": "body", "name": "other", "schema": {"type": "boolean"}}
            ]}}}
        });
        assert!(preprocess_tree(&mut tree));
        let schema = &tree["paths"]["/x"]["put"]["parameters"][0]["schema"];
        assert!(schema["properties"]["field"].is_object());
        assert!(schema.get("required").is_none());
    }

    #[test]
    fn test_untouched_input_is_returned_borrowed() {
        let input = br#"{"swagger": "2.0", "paths": {"/x": {"post": {"parameters": [{"in": "body", "name": "a", "schema": {"type": "string"}}]}}}}"#;
        let (out, changed) = preprocess_v2(input);
        assert!(!changed);
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(out.as_ref(), input.as_slice());
    }

    #[test]
    fn test_garbage_passes_through() {
        let input = b"{{{ not a document";
        let (out, changed) = preprocess_v2(input);
        assert!(!changed);
        assert_eq!(out.as_ref(), input.as_slice());

        let mut tree = json!({"paths": {"/x": "not an object", "/y": {"post": ["weird"]}}});
        assert!(!preprocess_tree(&mut tree));
    }
}
