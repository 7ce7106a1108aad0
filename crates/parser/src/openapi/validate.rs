//! Structural and semantic checks on an OpenAPI 3.x tree
//!
//! Validation runs on the generic tree, before typed deserialization, so
//! every issue carries a JSON Pointer to the offending node. Issues come in
//! two kinds: unresolved references, which the loader tolerates, and
//! everything else, which aborts the load.

use super::{ref_slot, RefSlot};
use crate::pointer;
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

const METHODS: [&str; 8] = ["get", "put", "post", "delete", "options", "head", "patch", "trace"];
const LOCATIONS: [&str; 4] = ["query", "header", "path", "cookie"];
const TYPES: [&str; 7] = ["string", "number", "integer", "boolean", "array", "object", "null"];

/// Schemas nested deeper than this are not inspected
const MAX_SCHEMA_DEPTH: usize = 64;

/// JSON shape a field must have to fit the typed document
#[derive(Debug, Clone, Copy)]
enum Shape {
    /// String or null
    Text,
    Flag,
    Strings,
    List,
    Object,
}

impl Shape {
    fn accepts(self, value: &Value) -> bool {
        match self {
            Shape::Text => value.is_string() || value.is_null(),
            Shape::Flag => value.is_boolean(),
            Shape::Strings => value
                .as_array()
                .is_some_and(|list| list.iter().all(Value::is_string)),
            Shape::List => value.is_array(),
            Shape::Object => value.is_object(),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Shape::Text => "a string",
            Shape::Flag => "a boolean",
            Shape::Strings => "a list of strings",
            Shape::List => "a list",
            Shape::Object => "an object",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueKind {
    /// A `$ref` that does not resolve within the document
    UnresolvedRef,
    /// Any other violation
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub pointer: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn is_recoverable(&self) -> bool {
        self.kind == IssueKind::UnresolvedRef
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.pointer)
    }
}

/// Validate an OpenAPI 3.x document tree
pub fn validate(root: &Value) -> Vec<ValidationIssue> {
    let mut validator = Validator {
        root,
        issues: Vec::new(),
        operation_ids: HashMap::new(),
    };
    validator.check_document();
    validator.issues
}

struct Validator<'a> {
    root: &'a Value,
    issues: Vec<ValidationIssue>,
    operation_ids: HashMap<String, String>,
}

impl<'a> Validator<'a> {
    fn invalid(&mut self, pointer: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            kind: IssueKind::Invalid,
            pointer: pointer.into(),
            message: message.into(),
        });
    }

    fn unresolved(&mut self, pointer: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            kind: IssueKind::UnresolvedRef,
            pointer: pointer.into(),
            message: message.into(),
        });
    }

    /// Report fields of `map` that do not have the expected shape
    fn check_fields(&mut self, map: &Map<String, Value>, ptr: &str, fields: &[(&str, Shape)]) {
        for (key, shape) in fields {
            let Some(value) = map.get(*key) else {
                continue;
            };
            if !shape.accepts(value) {
                self.invalid(
                    pointer::child(ptr, key),
                    format!("{} must be {}", key, shape.describe()),
                );
            }
        }
    }

    fn check_document(&mut self) {
        let root = self.root;
        match root.get("openapi").and_then(Value::as_str) {
            Some(v) if v.trim().starts_with("3.") => {}
            _ => self.invalid("#/openapi", "openapi must be a 3.x version string"),
        }

        self.check_info(root.get("info"));

        if let Some(servers) = root.get("servers") {
            self.check_servers(servers, "#/servers");
        }

        match root.get("paths") {
            None => {}
            Some(Value::Object(paths)) => {
                for (path, item) in paths {
                    self.check_path_item(path, item);
                }
            }
            Some(_) => self.invalid("#/paths", "paths must be an object"),
        }

        if let Some(components) = root.get("components") {
            self.check_components(components);
        }

        if let Some(tags) = root.get("tags") {
            self.check_tags(tags);
        }

        self.check_refs(root, "#", false);
    }

    fn check_info(&mut self, info: Option<&Value>) {
        let Some(info) = info.and_then(Value::as_object) else {
            self.invalid("#/info", "info object is required");
            return;
        };
        self.check_fields(info, "#/info", &[("description", Shape::Text)]);
        for field in ["title", "version"] {
            match info.get(field) {
                Some(Value::String(s)) if !s.trim().is_empty() => {}
                Some(Value::String(_)) | None => self.invalid(
                    pointer::child("#/info", field),
                    format!("info.{} must not be empty", field),
                ),
                Some(_) => self.invalid(
                    pointer::child("#/info", field),
                    format!("info.{} must be a string", field),
                ),
            }
        }
    }

    fn check_servers(&mut self, servers: &Value, ptr: &str) {
        let Some(list) = servers.as_array() else {
            self.invalid(ptr, "servers must be a list");
            return;
        };
        for (idx, server) in list.iter().enumerate() {
            let server_ptr = pointer::child(ptr, &idx.to_string());
            if server.get("url").and_then(Value::as_str).is_none() {
                self.invalid(&server_ptr, "server url must be a string");
            }
            if let Some(server) = server.as_object() {
                self.check_fields(server, &server_ptr, &[("description", Shape::Text)]);
            }
        }
    }

    fn check_tags(&mut self, tags: &Value) {
        let Some(list) = tags.as_array() else {
            self.invalid("#/tags", "tags must be a list");
            return;
        };
        for (idx, tag) in list.iter().enumerate() {
            let tag_ptr = pointer::child("#/tags", &idx.to_string());
            let Some(tag) = tag.as_object() else {
                self.invalid(tag_ptr, "tag must be an object");
                continue;
            };
            if tag.get("name").and_then(Value::as_str).is_none() {
                self.invalid(&tag_ptr, "tag name must be a string");
            }
            self.check_fields(tag, &tag_ptr, &[("description", Shape::Text)]);
        }
    }

    fn check_path_item(&mut self, path: &str, item: &Value) {
        let item_ptr = pointer::fragment(["paths", path]);
        if !path.starts_with('/') {
            self.invalid(&item_ptr, format!("path '{}' must start with '/'", path));
        }
        let Some(item) = item.as_object() else {
            self.invalid(&item_ptr, "path item must be an object");
            return;
        };
        if item.contains_key("$ref") {
            return;
        }
        self.check_fields(
            item,
            &item_ptr,
            &[("summary", Shape::Text), ("description", Shape::Text)],
        );

        let shared = item.get("parameters");
        if let Some(params) = shared {
            self.check_parameter_list(params, &pointer::child(&item_ptr, "parameters"));
        }
        if let Some(servers) = item.get("servers") {
            self.check_servers(servers, &pointer::child(&item_ptr, "servers"));
        }

        for method in METHODS {
            let Some(op) = item.get(method) else {
                continue;
            };
            let op_ptr = pointer::child(&item_ptr, method);
            match op.as_object() {
                Some(op) => self.check_operation(path, op, shared, &op_ptr),
                None => self.invalid(&op_ptr, "operation must be an object"),
            }
        }
    }

    fn check_operation(
        &mut self,
        path: &str,
        op: &Map<String, Value>,
        shared: Option<&Value>,
        op_ptr: &str,
    ) {
        if let Some(id) = op.get("operationId") {
            match id.as_str() {
                Some(id) => {
                    if let Some(first) = self.operation_ids.get(id) {
                        let message = format!("operationId '{}' is already used at {}", id, first);
                        self.invalid(pointer::child(op_ptr, "operationId"), message);
                    } else {
                        self.operation_ids.insert(id.to_string(), op_ptr.to_string());
                    }
                }
                None => self.invalid(
                    pointer::child(op_ptr, "operationId"),
                    "operationId must be a string",
                ),
            }
        }

        self.check_fields(
            op,
            op_ptr,
            &[
                ("summary", Shape::Text),
                ("description", Shape::Text),
                ("tags", Shape::Strings),
                ("deprecated", Shape::Flag),
            ],
        );

        let own = op.get("parameters");
        if let Some(params) = own {
            self.check_parameter_list(params, &pointer::child(op_ptr, "parameters"));
        }
        self.check_path_template(path, shared, own, op_ptr);

        if let Some(body) = op.get("requestBody") {
            self.check_request_body(body, &pointer::child(op_ptr, "requestBody"));
        }

        let responses_ptr = pointer::child(op_ptr, "responses");
        match op.get("responses") {
            None => self.invalid(&responses_ptr, "operation must declare responses"),
            Some(Value::Object(responses)) if responses.is_empty() => {
                self.invalid(&responses_ptr, "responses must contain at least one entry")
            }
            Some(Value::Object(responses)) => {
                for (status, response) in responses {
                    let response_ptr = pointer::child(&responses_ptr, status);
                    if !is_status_key(status) {
                        self.invalid(
                            &response_ptr,
                            format!("'{}' is not a valid response status", status),
                        );
                    }
                    self.check_response(response, &response_ptr);
                }
            }
            Some(_) => self.invalid(&responses_ptr, "responses must be an object"),
        }
    }

    /// `{name}` segments and declared `in: path` parameters must agree
    fn check_path_template(
        &mut self,
        path: &str,
        shared: Option<&Value>,
        own: Option<&Value>,
        op_ptr: &str,
    ) {
        let mut declared = BTreeSet::new();
        for list in [shared, own].into_iter().flatten() {
            for param in list.as_array().into_iter().flatten() {
                let param = match param.get("$ref").and_then(Value::as_str) {
                    Some(reference) => match pointer::resolve_local(self.root, reference) {
                        Some(target) => target,
                        // unknown shape; the ref walk reports it
                        None => return,
                    },
                    None => param,
                };
                if param.get("in").and_then(Value::as_str) == Some("path") {
                    if let Some(name) = param.get("name").and_then(Value::as_str) {
                        declared.insert(name.to_string());
                    }
                }
            }
        }

        let template = template_names(path);
        for name in template.difference(&declared) {
            self.invalid(
                op_ptr,
                format!("path parameter '{}' is not declared", name),
            );
        }
        for name in declared.difference(&template) {
            self.invalid(
                op_ptr,
                format!("path parameter '{}' does not appear in '{}'", name, path),
            );
        }
    }

    fn check_parameter_list(&mut self, params: &Value, ptr: &str) {
        let Some(list) = params.as_array() else {
            self.invalid(ptr, "parameters must be a list");
            return;
        };

        let mut seen = BTreeSet::new();
        for (idx, param) in list.iter().enumerate() {
            let param_ptr = pointer::child(ptr, &idx.to_string());
            if let Some((location, name)) = self.check_parameter(param, &param_ptr) {
                if !seen.insert((location.clone(), name.clone())) {
                    self.invalid(
                        param_ptr,
                        format!("duplicate parameter '{}' in {}", name, location),
                    );
                }
            }
        }
    }

    /// Returns `(in, name)` for inline parameters that pass the basic checks
    fn check_parameter(&mut self, param: &Value, ptr: &str) -> Option<(String, String)> {
        let Some(p) = param.as_object() else {
            self.invalid(ptr, "parameter must be an object");
            return None;
        };
        if p.contains_key("$ref") {
            return None;
        }

        let name = p.get("name").and_then(Value::as_str).filter(|n| !n.is_empty());
        let location = p.get("in").and_then(Value::as_str);
        self.check_fields(
            p,
            ptr,
            &[
                ("description", Shape::Text),
                ("required", Shape::Flag),
                ("deprecated", Shape::Flag),
            ],
        );
        if let Some(schema) = p.get("schema") {
            self.check_schema(schema, &pointer::child(ptr, "schema"), 0);
        }
        match p.get("content") {
            None => {}
            Some(Value::Object(content)) => {
                self.check_content(content, &pointer::child(ptr, "content"))
            }
            Some(_) => self.invalid(pointer::child(ptr, "content"), "content must be an object"),
        }

        let Some(name) = name else {
            self.invalid(ptr, "parameter name is required");
            return None;
        };
        let Some(location) = location.filter(|l| LOCATIONS.contains(l)) else {
            self.invalid(
                pointer::child(ptr, "in"),
                format!("parameter '{}' has an invalid 'in' value", name),
            );
            return None;
        };
        if location == "path" && p.get("required").and_then(Value::as_bool) != Some(true) {
            self.invalid(
                pointer::child(ptr, "required"),
                format!("path parameter '{}' must be required", name),
            );
        }

        Some((location.to_string(), name.to_string()))
    }

    fn check_request_body(&mut self, body: &Value, ptr: &str) {
        let Some(b) = body.as_object() else {
            self.invalid(ptr, "requestBody must be an object");
            return;
        };
        if b.contains_key("$ref") {
            return;
        }
        self.check_fields(
            b,
            ptr,
            &[("description", Shape::Text), ("required", Shape::Flag)],
        );
        match b.get("content") {
            Some(Value::Object(content)) => self.check_content(content, &pointer::child(ptr, "content")),
            _ => self.invalid(ptr, "requestBody must declare content"),
        }
    }

    fn check_response(&mut self, response: &Value, ptr: &str) {
        let Some(r) = response.as_object() else {
            self.invalid(ptr, "response must be an object");
            return;
        };
        if r.contains_key("$ref") {
            return;
        }
        if r.get("description").and_then(Value::as_str).is_none() {
            self.invalid(ptr, "response description is required");
        }
        match r.get("content") {
            None => {}
            Some(Value::Object(content)) => {
                self.check_content(content, &pointer::child(ptr, "content"))
            }
            Some(_) => self.invalid(pointer::child(ptr, "content"), "content must be an object"),
        }
    }

    fn check_content(&mut self, content: &Map<String, Value>, ptr: &str) {
        for (mime, media) in content {
            let media_ptr = pointer::child(ptr, mime);
            match media.as_object() {
                Some(media) => {
                    if let Some(schema) = media.get("schema") {
                        self.check_schema(schema, &pointer::child(&media_ptr, "schema"), 0);
                    }
                    match media.get("examples") {
                        None => {}
                        Some(Value::Object(examples)) => {
                            let examples_ptr = pointer::child(&media_ptr, "examples");
                            for (name, example) in examples {
                                self.check_example(example, &pointer::child(&examples_ptr, name));
                            }
                        }
                        Some(_) => self.invalid(
                            pointer::child(&media_ptr, "examples"),
                            "examples must be an object",
                        ),
                    }
                }
                None => self.invalid(media_ptr, "media type must be an object"),
            }
        }
    }

    fn check_example(&mut self, example: &Value, ptr: &str) {
        let Some(e) = example.as_object() else {
            self.invalid(ptr, "example must be an object");
            return;
        };
        if e.contains_key("$ref") {
            return;
        }
        self.check_fields(
            e,
            ptr,
            &[
                ("summary", Shape::Text),
                ("description", Shape::Text),
                ("externalValue", Shape::Text),
            ],
        );
    }

    fn check_components(&mut self, components: &Value) {
        let Some(c) = components.as_object() else {
            self.invalid("#/components", "components must be an object");
            return;
        };

        self.check_fields(
            c,
            "#/components",
            &[
                ("schemas", Shape::Object),
                ("parameters", Shape::Object),
                ("requestBodies", Shape::Object),
                ("responses", Shape::Object),
                ("examples", Shape::Object),
            ],
        );

        let section = |name: &str| c.get(name).and_then(Value::as_object);
        if let Some(schemas) = section("schemas") {
            for (name, schema) in schemas {
                self.check_schema(schema, &pointer::fragment(["components", "schemas", name]), 0);
            }
        }
        if let Some(params) = section("parameters") {
            for (name, param) in params {
                self.check_parameter(param, &pointer::fragment(["components", "parameters", name]));
            }
        }
        if let Some(bodies) = section("requestBodies") {
            for (name, body) in bodies {
                self.check_request_body(body, &pointer::fragment(["components", "requestBodies", name]));
            }
        }
        if let Some(responses) = section("responses") {
            for (name, response) in responses {
                self.check_response(response, &pointer::fragment(["components", "responses", name]));
            }
        }
        if let Some(examples) = section("examples") {
            for (name, example) in examples {
                self.check_example(example, &pointer::fragment(["components", "examples", name]));
            }
        }
    }

    fn check_schema(&mut self, schema: &Value, ptr: &str, depth: usize) {
        if depth > MAX_SCHEMA_DEPTH {
            return;
        }
        let s = match schema {
            Value::Object(s) => s,
            Value::Bool(_) => {
                self.invalid(ptr, "boolean schemas are not supported; use {} or {not: {}}");
                return;
            }
            _ => {
                self.invalid(ptr, "schema must be an object");
                return;
            }
        };
        if s.contains_key("$ref") {
            return;
        }
        self.check_fields(
            s,
            ptr,
            &[
                ("format", Shape::Text),
                ("title", Shape::Text),
                ("description", Shape::Text),
                ("nullable", Shape::Flag),
                ("enum", Shape::List),
            ],
        );

        let mut is_array = false;
        match s.get("type") {
            None => {}
            Some(Value::String(t)) if TYPES.contains(&t.as_str()) => is_array = t == "array",
            Some(Value::Array(list))
                if list
                    .iter()
                    .all(|t| t.as_str().is_some_and(|t| TYPES.contains(&t))) =>
            {
                is_array = list.iter().any(|t| t == "array");
            }
            Some(other) => self.invalid(
                pointer::child(ptr, "type"),
                format!("unknown schema type {}", other),
            ),
        }
        if is_array && !s.contains_key("items") {
            self.invalid(ptr, "array schema must declare items");
        }

        if let Some(required) = s.get("required") {
            let ok = required
                .as_array()
                .is_some_and(|list| list.iter().all(Value::is_string));
            if !ok {
                self.invalid(pointer::child(ptr, "required"), "required must be a list of strings");
            }
        }

        if let Some(props) = s.get("properties") {
            match props.as_object() {
                Some(props) => {
                    let props_ptr = pointer::child(ptr, "properties");
                    for (name, prop) in props {
                        self.check_schema(prop, &pointer::child(&props_ptr, name), depth + 1);
                    }
                }
                None => self.invalid(pointer::child(ptr, "properties"), "properties must be an object"),
            }
        }

        if let Some(items) = s.get("items") {
            self.check_schema(items, &pointer::child(ptr, "items"), depth + 1);
        }
        if let Some(not @ Value::Object(_)) = s.get("not") {
            self.check_schema(not, &pointer::child(ptr, "not"), depth + 1);
        }
        if let Some(extra @ Value::Object(_)) = s.get("additionalProperties") {
            self.check_schema(extra, &pointer::child(ptr, "additionalProperties"), depth + 1);
        }
        for key in ["allOf", "anyOf", "oneOf"] {
            let Some(list) = s.get(key) else {
                continue;
            };
            let list_ptr = pointer::child(ptr, key);
            match list.as_array() {
                Some(list) => {
                    for (idx, child) in list.iter().enumerate() {
                        self.check_schema(child, &pointer::child(&list_ptr, &idx.to_string()), depth + 1);
                    }
                }
                None => self.invalid(list_ptr, format!("{} must be a list", key)),
            }
        }
    }

    /// Every `$ref` must resolve locally; external refs should have been inlined
    fn check_refs(&mut self, value: &Value, ptr: &str, named: bool) {
        match value {
            Value::Object(map) => {
                if !named {
                    if let Some(reference) = map.get("$ref") {
                        let Some(reference) = reference.as_str() else {
                            self.invalid(pointer::child(ptr, "$ref"), "$ref must be a string");
                            return;
                        };
                        if !reference.starts_with('#') {
                            self.unresolved(
                                ptr,
                                format!("external reference '{}' was not resolved", reference),
                            );
                        } else if pointer::resolve_local(self.root, reference).is_none() {
                            self.unresolved(ptr, format!("unresolved reference '{}'", reference));
                        }
                        return;
                    }
                }

                for (key, child) in map {
                    let child_ptr = pointer::child(ptr, key);
                    if named {
                        self.check_refs(child, &child_ptr, false);
                        continue;
                    }
                    match ref_slot(key, child) {
                        RefSlot::Literal => {}
                        RefSlot::Examples => {
                            for (name, example) in child.as_object().into_iter().flatten() {
                                if example.get("$ref").is_some() {
                                    self.check_refs(example, &pointer::child(&child_ptr, name), false);
                                }
                            }
                        }
                        RefSlot::Named => self.check_refs(child, &child_ptr, true),
                        RefSlot::Node => self.check_refs(child, &child_ptr, false),
                    }
                }
            }
            Value::Array(items) => {
                for (idx, child) in items.iter().enumerate() {
                    self.check_refs(child, &pointer::child(ptr, &idx.to_string()), false);
                }
            }
            _ => {}
        }
    }
}

/// `default`, `2XX`-style ranges, or three-digit codes
fn is_status_key(status: &str) -> bool {
    if status == "default" {
        return true;
    }
    let bytes = status.as_bytes();
    if bytes.len() != 3 || !(b'1'..=b'5').contains(&bytes[0]) {
        return false;
    }
    let rest = &bytes[1..];
    rest.iter().all(u8::is_ascii_digit) || rest.iter().all(|b| b.eq_ignore_ascii_case(&b'X'))
}

/// Names of `{param}` segments in a path template
fn template_names(path: &str) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    let mut rest = path;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            break;
        };
        let name = &after[..end];
        if !name.is_empty() {
            names.insert(name.to_string());
        }
        rest = &after[end + 1..];
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Value {
        json!({
            "openapi": "3.0.3",
            "info": {"title": "Pets", "version": "1.0.0"},
            "paths": {
                "/pets/{id}": {
                    "parameters": [{"in": "path", "name": "id", "required": true,
                                    "schema": {"type": "string"}}],
                    "get": {
                        "operationId": "getPet",
                        "responses": {"200": {"description": "ok", "content": {
                            "application/json": {"schema": {"$ref": "#/components/schemas/Pet"}}
                        }}}
                    }
                }
            },
            "components": {"schemas": {"Pet": {"type": "object", "properties": {
                "tags": {"type": "array", "items": {"type": "string"}},
                "$ref": {"type": "string"}
            }}}}
        })
    }

    fn invalid(issues: &[ValidationIssue]) -> Vec<&ValidationIssue> {
        issues.iter().filter(|i| !i.is_recoverable()).collect()
    }

    #[test]
    fn test_valid_document_has_no_issues() {
        let issues = validate(&base());
        assert!(issues.is_empty(), "{:?}", issues);
    }

    #[test]
    fn test_empty_responses_are_invalid() {
        let doc = json!({
            "openapi": "3.0.0",
            "info": {"title": "Bad", "version": "1.0.0"},
            "paths": {"/pet": {"get": {"responses": {}}}}
        });
        let issues = validate(&doc);
        let invalid = invalid(&issues);
        assert_eq!(invalid.len(), 1);
        assert_eq!(invalid[0].pointer, "#/paths/~1pet/get/responses");
    }

    #[test]
    fn test_unresolved_ref_is_recoverable() {
        let mut doc = base();
        doc["paths"]["/pets/{id}"]["get"]["responses"]["404"] = json!({
            "description": "missing",
            "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Error"}}}
        });
        let issues = validate(&doc);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::UnresolvedRef);
        assert_eq!(
            issues[0].pointer,
            "#/paths/~1pets~1{id}/get/responses/404/content/application~1json/schema"
        );
    }

    #[test]
    fn test_missing_info_and_bad_version() {
        let doc = json!({"openapi": "2.0", "paths": {}});
        let issues = validate(&doc);
        let pointers: Vec<_> = issues.iter().map(|i| i.pointer.as_str()).collect();
        assert!(pointers.contains(&"#/openapi"));
        assert!(pointers.contains(&"#/info"));
    }

    #[test]
    fn test_path_template_must_match_parameters() {
        let mut doc = base();
        doc["paths"]["/pets/{id}"]["parameters"] = json!([]);
        let issues = validate(&doc);
        assert!(invalid(&issues)
            .iter()
            .any(|i| i.message.contains("'id' is not declared")));
    }

    #[test]
    fn test_parameter_rules() {
        let mut doc = base();
        doc["paths"]["/pets/{id}"]["get"]["parameters"] = json!([
            {"in": "query", "name": "q"},
            {"in": "query", "name": "q"},
            {"in": "body", "name": "b"},
            {"in": "path", "name": "id"}
        ]);
        let issues = validate(&doc);
        let messages: Vec<_> = invalid(&issues).iter().map(|i| i.message.clone()).collect();
        assert!(messages.iter().any(|m| m.contains("duplicate parameter 'q'")));
        assert!(messages.iter().any(|m| m.contains("invalid 'in'")));
        assert!(messages.iter().any(|m| m.contains("must be required")));
    }

    #[test]
    fn test_schema_rules() {
        let mut doc = base();
        doc["components"]["schemas"]["Broken"] = json!({
            "type": "object",
            "required": "name",
            "properties": {"list": {"type": "array"}, "odd": {"type": "strnig"}}
        });
        let issues = validate(&doc);
        assert_eq!(invalid(&issues).len(), 3);
    }

    #[test]
    fn test_duplicate_operation_ids() {
        let mut doc = base();
        doc["paths"]["/pets/{id}"]["delete"] = json!({
            "operationId": "getPet",
            "responses": {"204": {"description": "gone"}}
        });
        let issues = validate(&doc);
        assert!(invalid(&issues)
            .iter()
            .any(|i| i.pointer == "#/paths/~1pets~1{id}/delete/operationId"));
    }

    #[test]
    fn test_field_shapes_match_the_typed_document() {
        let mut doc = base();
        let get = &mut doc["paths"]["/pets/{id}"]["get"];
        get["tags"] = json!(["pets", 1]);
        get["deprecated"] = json!("no");
        get["parameters"] = json!([
            {"in": "query", "name": "limit", "required": "yes", "schema": {"type": "integer"}}
        ]);
        doc["tags"] = json!([{"description": "unnamed"}]);
        doc["components"]["schemas"]["Pet"]["description"] = json!(42);

        let issues = validate(&doc);
        let mut pointers: Vec<_> = invalid(&issues).iter().map(|i| i.pointer.clone()).collect();
        pointers.sort();
        assert_eq!(
            pointers,
            vec![
                "#/components/schemas/Pet/description",
                "#/paths/~1pets~1{id}/get/deprecated",
                "#/paths/~1pets~1{id}/get/parameters/0/required",
                "#/paths/~1pets~1{id}/get/tags",
                "#/tags/0",
            ]
        );
    }

    #[test]
    fn test_null_descriptions_are_accepted() {
        let mut doc = base();
        doc["paths"]["/pets/{id}"]["get"]["description"] = Value::Null;
        doc["info"]["description"] = Value::Null;
        assert!(validate(&doc).is_empty());
    }

    #[test]
    fn test_boolean_schemas_are_rejected() {
        let mut doc = base();
        doc["components"]["schemas"]["Pet"]["properties"]["tags"]["items"] = json!(true);
        doc["components"]["schemas"]["Open"] = json!({"type": "object", "additionalProperties": true});

        let issues = validate(&doc);
        let invalid = invalid(&issues);
        assert_eq!(invalid.len(), 1);
        assert_eq!(
            invalid[0].pointer,
            "#/components/schemas/Pet/properties/tags/items"
        );
    }

    #[test]
    fn test_non_string_ref_is_invalid() {
        let mut doc = base();
        doc["paths"]["/pets/{id}"]["get"]["parameters"] = json!([{"$ref": 7}]);
        let issues = validate(&doc);
        let invalid = invalid(&issues);
        assert_eq!(invalid.len(), 1);
        assert_eq!(invalid[0].pointer, "#/paths/~1pets~1{id}/get/parameters/0/$ref");
    }

    #[test]
    fn test_status_keys() {
        assert!(is_status_key("200"));
        assert!(is_status_key("4XX"));
        assert!(is_status_key("default"));
        assert!(!is_status_key("600"));
        assert!(!is_status_key("20"));
        assert!(!is_status_key("2X0"));
    }

    #[test]
    fn test_template_names() {
        let names = template_names("/a/{x}/b/{y}.json");
        assert_eq!(names.into_iter().collect::<Vec<_>>(), vec!["x", "y"]);
    }
}
