//! Swagger 2.0 to OpenAPI 3.0 conversion over generic trees
//!
//! The converter reads a (preprocessed) v2 tree and produces a `3.0.3` tree
//! that the validator and typed model understand. Structural problems that
//! cannot be expressed in v3 fail with a [`ConversionFailure`] carrying the
//! JSON Pointer of the offending node.

use crate::pointer;
use serde_json::{json, Map, Value};
use thiserror::Error;

/// OpenAPI version written into converted documents
pub const CONVERTED_OPENAPI_VERSION: &str = "3.0.3";

const METHODS: [&str; 7] = ["get", "put", "post", "delete", "options", "head", "patch"];

const DEFAULT_MEDIA_TYPE: &str = "application/json";
const MULTIPART: &str = "multipart/form-data";
const URL_ENCODED: &str = "application/x-www-form-urlencoded";

/// Keywords shared by v2 non-body parameters and v3 schemas
const PRIMITIVE_KEYWORDS: [&str; 16] = [
    "type",
    "format",
    "items",
    "enum",
    "default",
    "maximum",
    "minimum",
    "exclusiveMaximum",
    "exclusiveMinimum",
    "maxLength",
    "minLength",
    "pattern",
    "maxItems",
    "minItems",
    "uniqueItems",
    "multipleOf",
];

/// A v2 construct with no v3 equivalent
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConversionFailure {
    #[error("{what} must be an object at {pointer}")]
    NotAnObject { pointer: String, what: &'static str },

    #[error("parameters must be a list at {pointer}")]
    ParametersNotArray { pointer: String },

    #[error("parameter without 'in' at {pointer}")]
    MissingLocation { pointer: String },

    #[error("operation declares more than one body parameter at {pointer}")]
    MultipleBodies { pointer: String },

    #[error("operation mixes body and formData parameters at {pointer}")]
    MixedBodyAndForm { pointer: String },
}

impl ConversionFailure {
    pub fn pointer(&self) -> &str {
        match self {
            ConversionFailure::NotAnObject { pointer, .. }
            | ConversionFailure::ParametersNotArray { pointer }
            | ConversionFailure::MissingLocation { pointer }
            | ConversionFailure::MultipleBodies { pointer }
            | ConversionFailure::MixedBodyAndForm { pointer } => pointer,
        }
    }
}

/// Convert a Swagger 2.0 tree into an OpenAPI 3.0 tree
pub fn convert_v2_to_v3(v2: &Value) -> Result<Value, ConversionFailure> {
    let root = v2.as_object().ok_or_else(|| ConversionFailure::NotAnObject {
        pointer: "#".to_string(),
        what: "document",
    })?;
    Converter::new(root).convert()
}

/// Rewrite a v2 `$ref` into its v3 component location
pub fn rewrite_ref(reference: &str) -> String {
    let (document, fragment) = match reference.find('#') {
        Some(idx) => reference.split_at(idx),
        None => return reference.to_string(),
    };

    let fragment = if let Some(rest) = fragment.strip_prefix("#/definitions/") {
        format!("#/components/schemas/{}", rest)
    } else if let Some(rest) = fragment.strip_prefix("#/parameters/") {
        format!("#/components/parameters/{}", rest)
    } else if let Some(rest) = fragment.strip_prefix("#/responses/") {
        format!("#/components/responses/{}", rest)
    } else {
        fragment.to_string()
    };
    format!("{}{}", document, fragment)
}

/// Rewrite a v2 schema into a v3 schema, recursively
pub fn rewrite_schema(schema: &Value) -> Value {
    let Some(map) = schema.as_object() else {
        return schema.clone();
    };

    let mut out = Map::new();
    for (key, value) in map {
        match key.as_str() {
            "$ref" => {
                let rewritten = value
                    .as_str()
                    .map(|r| json!(rewrite_ref(r)))
                    .unwrap_or_else(|| value.clone());
                out.insert(key.clone(), rewritten);
            }
            "x-nullable" => {
                if let Some(nullable) = value.as_bool() {
                    out.insert("nullable".to_string(), json!(nullable));
                }
            }
            "type" if value.as_str() == Some("file") => {
                out.insert("type".to_string(), json!("string"));
                out.insert("format".to_string(), json!("binary"));
            }
            "format" if map.get("type").and_then(Value::as_str) == Some("file") => {}
            "discriminator" => {
                let rewritten = match value.as_str() {
                    Some(name) => json!({ "propertyName": name }),
                    None => value.clone(),
                };
                out.insert(key.clone(), rewritten);
            }
            "properties" | "patternProperties" => {
                let rewritten = match value.as_object() {
                    Some(props) => Value::Object(
                        props
                            .iter()
                            .map(|(name, s)| (name.clone(), rewrite_schema(s)))
                            .collect(),
                    ),
                    None => value.clone(),
                };
                out.insert(key.clone(), rewritten);
            }
            "items" | "additionalProperties" | "not" => {
                out.insert(key.clone(), rewrite_schema(value));
            }
            "allOf" | "anyOf" | "oneOf" => {
                let rewritten = match value.as_array() {
                    Some(list) => Value::Array(list.iter().map(rewrite_schema).collect()),
                    None => value.clone(),
                };
                out.insert(key.clone(), rewritten);
            }
            _ => {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(out)
}

/// A body parameter after `$ref` classification
#[derive(Clone)]
enum BodyParam {
    Inline(Map<String, Value>),
    Component(String),
}

/// One operation's parameters split by v3 destination
#[derive(Default)]
struct SplitParams {
    other: Vec<Value>,
    body: Vec<BodyParam>,
    form: Vec<Map<String, Value>>,
}

struct Converter<'a> {
    root: &'a Map<String, Value>,
    consumes: Vec<String>,
    produces: Vec<String>,
}

impl<'a> Converter<'a> {
    fn new(root: &'a Map<String, Value>) -> Self {
        Self {
            root,
            consumes: string_list(root.get("consumes")),
            produces: string_list(root.get("produces")),
        }
    }

    fn convert(&self) -> Result<Value, ConversionFailure> {
        let mut out = Map::new();
        out.insert("openapi".to_string(), json!(CONVERTED_OPENAPI_VERSION));
        for key in ["info", "tags", "externalDocs", "security"] {
            if let Some(value) = self.root.get(key) {
                out.insert(key.to_string(), value.clone());
            }
        }
        copy_extensions(self.root, &mut out);

        let servers = self.servers();
        if !servers.is_empty() {
            out.insert("servers".to_string(), Value::Array(servers));
        }

        out.insert("paths".to_string(), Value::Object(self.paths()?));

        let components = self.components();
        if !components.is_empty() {
            out.insert("components".to_string(), Value::Object(components));
        }

        Ok(Value::Object(out))
    }

    fn servers(&self) -> Vec<Value> {
        let base_path = self
            .root
            .get("basePath")
            .and_then(Value::as_str)
            .unwrap_or("");

        match self.root.get("host").and_then(Value::as_str) {
            Some(host) if !host.is_empty() => {
                let mut schemes = string_list(self.root.get("schemes"));
                if schemes.is_empty() {
                    schemes.push("https".to_string());
                }
                schemes
                    .iter()
                    .map(|scheme| json!({ "url": format!("{}://{}{}", scheme, host, base_path) }))
                    .collect()
            }
            _ if !base_path.is_empty() => vec![json!({ "url": base_path })],
            _ => Vec::new(),
        }
    }

    fn components(&self) -> Map<String, Value> {
        let mut components = Map::new();

        if let Some(definitions) = self.root.get("definitions").and_then(Value::as_object) {
            let schemas: Map<String, Value> = definitions
                .iter()
                .map(|(name, schema)| (name.clone(), rewrite_schema(schema)))
                .collect();
            components.insert("schemas".to_string(), Value::Object(schemas));
        }

        if let Some(params) = self.root.get("parameters").and_then(Value::as_object) {
            let mut parameters = Map::new();
            let mut request_bodies = Map::new();
            for (name, param) in params {
                let Some(p) = param.as_object() else {
                    continue;
                };
                match location(p) {
                    Some("body") => {
                        request_bodies.insert(name.clone(), self.body_request(p, &self.consumes));
                    }
                    // inlined wherever referenced
                    Some("formData") => {}
                    _ => {
                        parameters.insert(name.clone(), convert_parameter(p));
                    }
                }
            }
            if !parameters.is_empty() {
                components.insert("parameters".to_string(), Value::Object(parameters));
            }
            if !request_bodies.is_empty() {
                components.insert("requestBodies".to_string(), Value::Object(request_bodies));
            }
        }

        if let Some(responses) = self.root.get("responses").and_then(Value::as_object) {
            let converted: Map<String, Value> = responses
                .iter()
                .map(|(name, r)| (name.clone(), self.response(r, &self.produces)))
                .collect();
            components.insert("responses".to_string(), Value::Object(converted));
        }

        if let Some(defs) = self
            .root
            .get("securityDefinitions")
            .and_then(Value::as_object)
        {
            let schemes: Map<String, Value> = defs
                .iter()
                .map(|(name, def)| (name.clone(), security_scheme(def)))
                .collect();
            components.insert("securitySchemes".to_string(), Value::Object(schemes));
        }

        components
    }

    fn paths(&self) -> Result<Map<String, Value>, ConversionFailure> {
        let mut out = Map::new();
        let Some(paths) = self.root.get("paths").and_then(Value::as_object) else {
            return Ok(out);
        };

        for (path, item) in paths {
            let item_ptr = pointer::fragment(["paths", path.as_str()]);
            let item = item.as_object().ok_or_else(|| ConversionFailure::NotAnObject {
                pointer: item_ptr.clone(),
                what: "path item",
            })?;

            let mut converted = Map::new();
            let shared =
                self.split_params(item.get("parameters"), &pointer::child(&item_ptr, "parameters"))?;
            if !shared.other.is_empty() {
                converted.insert("parameters".to_string(), Value::Array(shared.other.clone()));
            }

            for (key, value) in item {
                if key == "$ref" || key.starts_with("x-") {
                    converted.insert(key.clone(), value.clone());
                }
            }

            for method in METHODS {
                let Some(op) = item.get(method) else {
                    continue;
                };
                let op_ptr = pointer::child(&item_ptr, method);
                let op = op.as_object().ok_or_else(|| ConversionFailure::NotAnObject {
                    pointer: op_ptr.clone(),
                    what: "operation",
                })?;
                converted.insert(method.to_string(), self.operation(op, &shared, &op_ptr)?);
            }

            out.insert(path.clone(), Value::Object(converted));
        }

        Ok(out)
    }

    fn operation(
        &self,
        op: &Map<String, Value>,
        shared: &SplitParams,
        op_ptr: &str,
    ) -> Result<Value, ConversionFailure> {
        let mut out = Map::new();
        for key in [
            "tags",
            "summary",
            "description",
            "externalDocs",
            "operationId",
            "deprecated",
            "security",
        ] {
            if let Some(value) = op.get(key) {
                out.insert(key.to_string(), value.clone());
            }
        }
        copy_extensions(op, &mut out);

        let consumes = op
            .get("consumes")
            .map(|c| string_list(Some(c)))
            .unwrap_or_else(|| self.consumes.clone());
        let produces = op
            .get("produces")
            .map(|p| string_list(Some(p)))
            .unwrap_or_else(|| self.produces.clone());

        let params_ptr = pointer::child(op_ptr, "parameters");
        let mut own = self.split_params(op.get("parameters"), &params_ptr)?;

        // path-level body and form parameters apply unless redeclared
        if own.body.is_empty() {
            own.body.extend(shared.body.iter().cloned());
        }
        for form in &shared.form {
            let name = form.get("name").and_then(Value::as_str);
            if !own
                .form
                .iter()
                .any(|f| f.get("name").and_then(Value::as_str) == name)
            {
                own.form.push(form.clone());
            }
        }

        if own.body.len() > 1 {
            return Err(ConversionFailure::MultipleBodies {
                pointer: params_ptr,
            });
        }
        if !own.body.is_empty() && !own.form.is_empty() {
            return Err(ConversionFailure::MixedBodyAndForm {
                pointer: params_ptr,
            });
        }

        if !own.other.is_empty() {
            out.insert("parameters".to_string(), Value::Array(own.other));
        }

        if let Some(body) = own.body.into_iter().next() {
            let request_body = match body {
                BodyParam::Inline(p) => self.body_request(&p, &consumes),
                BodyParam::Component(name) => json!({
                    "$ref": format!("#/components/requestBodies/{}", name)
                }),
            };
            out.insert("requestBody".to_string(), request_body);
        } else if !own.form.is_empty() {
            out.insert("requestBody".to_string(), form_request(&own.form, &consumes));
        }

        if let Some(responses) = op.get("responses") {
            let converted = match responses.as_object() {
                Some(map) => Value::Object(
                    map.iter()
                        .map(|(status, r)| (status.clone(), self.response(r, &produces)))
                        .collect(),
                ),
                None => responses.clone(),
            };
            out.insert("responses".to_string(), converted);
        }

        Ok(Value::Object(out))
    }

    fn split_params(
        &self,
        params: Option<&Value>,
        list_ptr: &str,
    ) -> Result<SplitParams, ConversionFailure> {
        let mut split = SplitParams::default();
        let Some(params) = params else {
            return Ok(split);
        };
        let list = params
            .as_array()
            .ok_or_else(|| ConversionFailure::ParametersNotArray {
                pointer: list_ptr.to_string(),
            })?;

        for (idx, param) in list.iter().enumerate() {
            let param_ptr = pointer::child(list_ptr, &idx.to_string());
            let p = param.as_object().ok_or_else(|| ConversionFailure::NotAnObject {
                pointer: param_ptr.clone(),
                what: "parameter",
            })?;

            if let Some(reference) = p.get("$ref").and_then(Value::as_str) {
                match self.shared_parameter(reference) {
                    Some((name, target)) if location(target) == Some("body") => {
                        split.body.push(BodyParam::Component(name));
                    }
                    Some((_, target)) if location(target) == Some("formData") => {
                        split.form.push(target.clone());
                    }
                    _ => split.other.push(json!({ "$ref": rewrite_ref(reference) })),
                }
                continue;
            }

            match location(p) {
                None => {
                    return Err(ConversionFailure::MissingLocation { pointer: param_ptr });
                }
                Some("body") => split.body.push(BodyParam::Inline(p.clone())),
                Some("formData") => split.form.push(p.clone()),
                Some(_) => split.other.push(convert_parameter(p)),
            }
        }

        Ok(split)
    }

    /// Look up `#/parameters/<name>` in the document root
    fn shared_parameter(&self, reference: &str) -> Option<(String, &'a Map<String, Value>)> {
        let raw = reference.strip_prefix("#/parameters/")?;
        let name = pointer::decode_segment(raw);
        let target = self
            .root
            .get("parameters")
            .and_then(Value::as_object)?
            .get(&name)?
            .as_object()?;
        Some((raw.to_string(), target))
    }

    fn body_request(&self, param: &Map<String, Value>, consumes: &[String]) -> Value {
        let schema = param.get("schema").map(rewrite_schema).unwrap_or_else(|| json!({}));
        let mut content = Map::new();
        for mime in media_types(consumes) {
            content.insert(mime, json!({ "schema": schema.clone() }));
        }

        let mut out = Map::new();
        if let Some(description) = param.get("description") {
            out.insert("description".to_string(), description.clone());
        }
        if let Some(required) = param.get("required").and_then(Value::as_bool) {
            out.insert("required".to_string(), json!(required));
        }
        out.insert("content".to_string(), Value::Object(content));
        copy_extensions(param, &mut out);
        Value::Object(out)
    }

    fn response(&self, response: &Value, produces: &[String]) -> Value {
        let Some(r) = response.as_object() else {
            return response.clone();
        };
        if let Some(reference) = r.get("$ref").and_then(Value::as_str) {
            return json!({ "$ref": rewrite_ref(reference) });
        }

        let mut out = Map::new();
        if let Some(description) = r.get("description") {
            out.insert("description".to_string(), description.clone());
        }

        let mut content = Map::new();
        if let Some(schema) = r.get("schema") {
            let schema = rewrite_schema(schema);
            for mime in media_types(produces) {
                content.insert(mime, json!({ "schema": schema.clone() }));
            }
        }
        if let Some(examples) = r.get("examples").and_then(Value::as_object) {
            for (mime, example) in examples {
                let entry = content.entry(mime.clone()).or_insert_with(|| json!({}));
                if let Some(entry) = entry.as_object_mut() {
                    entry.insert("example".to_string(), example.clone());
                }
            }
        }
        if !content.is_empty() {
            out.insert("content".to_string(), Value::Object(content));
        }

        if let Some(headers) = r.get("headers").and_then(Value::as_object) {
            let converted: Map<String, Value> = headers
                .iter()
                .map(|(name, header)| (name.clone(), convert_header(header)))
                .collect();
            out.insert("headers".to_string(), Value::Object(converted));
        }

        copy_extensions(r, &mut out);
        Value::Object(out)
    }
}

/// Convert a non-body v2 parameter into a v3 parameter object
fn convert_parameter(param: &Map<String, Value>) -> Value {
    let mut out = Map::new();
    for key in ["name", "in", "description", "required", "allowEmptyValue"] {
        if let Some(value) = param.get(key) {
            out.insert(key.to_string(), value.clone());
        }
    }
    copy_extensions(param, &mut out);

    let is_array = param.get("type").and_then(Value::as_str) == Some("array");
    if is_array {
        let style = match param.get("collectionFormat").and_then(Value::as_str) {
            Some("multi") => Some(("form", true)),
            Some("ssv") => Some(("spaceDelimited", false)),
            Some("pipes") => Some(("pipeDelimited", false)),
            Some("csv") | None => match location(param) {
                Some("query") | Some("cookie") => Some(("form", false)),
                _ => Some(("simple", false)),
            },
            Some(_) => None,
        };
        if let Some((style, explode)) = style {
            out.insert("style".to_string(), json!(style));
            out.insert("explode".to_string(), json!(explode));
        }
    }

    out.insert("schema".to_string(), primitive_schema(param));
    Value::Object(out)
}

fn convert_header(header: &Value) -> Value {
    let Some(h) = header.as_object() else {
        return header.clone();
    };
    let mut out = Map::new();
    if let Some(description) = h.get("description") {
        out.insert("description".to_string(), description.clone());
    }
    out.insert("schema".to_string(), primitive_schema(h));
    Value::Object(out)
}

/// Schema built from the primitive keywords of a parameter or header
fn primitive_schema(source: &Map<String, Value>) -> Value {
    let mut schema = Map::new();
    for key in PRIMITIVE_KEYWORDS {
        if let Some(value) = source.get(key) {
            let value = if key == "items" {
                match value.as_object() {
                    Some(items) => primitive_schema(items),
                    None => value.clone(),
                }
            } else {
                value.clone()
            };
            schema.insert(key.to_string(), value);
        }
    }
    if let Some(reference) = source.get("$ref").and_then(Value::as_str) {
        schema.insert("$ref".to_string(), json!(rewrite_ref(reference)));
    }
    if source.get("x-nullable").and_then(Value::as_bool) == Some(true) {
        schema.insert("nullable".to_string(), json!(true));
    }
    rewrite_schema(&Value::Object(schema))
}

/// Object schema assembled from formData parameters
fn form_request(form: &[Map<String, Value>], consumes: &[String]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    let mut has_file = false;

    for param in form {
        let name = param
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("field")
            .to_string();
        has_file |= param.get("type").and_then(Value::as_str) == Some("file");

        let mut schema = primitive_schema(param);
        if let (Some(description), Some(map)) = (param.get("description"), schema.as_object_mut())
        {
            map.insert("description".to_string(), description.clone());
        }
        if param.get("required").and_then(Value::as_bool) == Some(true) {
            required.push(json!(name.clone()));
        }
        properties.insert(name, schema);
    }

    let mut schema = Map::new();
    schema.insert("type".to_string(), json!("object"));
    schema.insert("properties".to_string(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert("required".to_string(), Value::Array(required));
    }

    let mime = if has_file || consumes.iter().any(|c| c == MULTIPART) {
        MULTIPART
    } else {
        URL_ENCODED
    };

    let mut content = Map::new();
    content.insert(mime.to_string(), json!({ "schema": Value::Object(schema) }));
    json!({ "content": Value::Object(content) })
}

fn security_scheme(def: &Value) -> Value {
    let Some(d) = def.as_object() else {
        return def.clone();
    };

    let mut out = match d.get("type").and_then(Value::as_str) {
        Some("basic") => json!({ "type": "http", "scheme": "basic" }),
        Some("apiKey") => json!({
            "type": "apiKey",
            "name": d.get("name").cloned().unwrap_or(Value::Null),
            "in": d.get("in").cloned().unwrap_or(Value::Null),
        }),
        Some("oauth2") => {
            let scopes = d.get("scopes").cloned().unwrap_or_else(|| json!({}));
            let mut flow = Map::new();
            for key in ["authorizationUrl", "tokenUrl"] {
                if let Some(url) = d.get(key) {
                    flow.insert(key.to_string(), url.clone());
                }
            }
            flow.insert("scopes".to_string(), scopes);
            let flow_name = match d.get("flow").and_then(Value::as_str) {
                Some("password") => "password",
                Some("application") => "clientCredentials",
                Some("accessCode") => "authorizationCode",
                _ => "implicit",
            };
            let mut flows = Map::new();
            flows.insert(flow_name.to_string(), Value::Object(flow));
            json!({ "type": "oauth2", "flows": Value::Object(flows) })
        }
        _ => return def.clone(),
    };

    if let (Some(description), Some(map)) = (d.get("description"), out.as_object_mut()) {
        map.insert("description".to_string(), description.clone());
    }
    out
}

fn location(param: &Map<String, Value>) -> Option<&str> {
    param.get("in").and_then(Value::as_str)
}

fn media_types(list: &[String]) -> Vec<String> {
    if list.is_empty() {
        vec![DEFAULT_MEDIA_TYPE.to_string()]
    } else {
        list.to_vec()
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn copy_extensions(from: &Map<String, Value>, to: &mut Map<String, Value>) {
    for (key, value) in from {
        if key.starts_with("x-") && key != "x-nullable" {
            to.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_ref() {
        assert_eq!(rewrite_ref("#/definitions/Pet"), "#/components/schemas/Pet");
        assert_eq!(rewrite_ref("#/parameters/limit"), "#/components/parameters/limit");
        assert_eq!(rewrite_ref("#/responses/NotFound"), "#/components/responses/NotFound");
        assert_eq!(
            rewrite_ref("common.yaml#/definitions/Error"),
            "common.yaml#/components/schemas/Error"
        );
        assert_eq!(rewrite_ref("common.yaml"), "common.yaml");
    }

    #[test]
    fn test_rewrite_schema_file_and_nullable() {
        let schema = json!({
            "type": "object",
            "discriminator": "kind",
            "properties": {
                "upload": {"type": "file"},
                "owner": {"$ref": "#/definitions/User", "x-nullable": true},
                "tags": {"type": "array", "items": {"$ref": "#/definitions/Tag"}}
            }
        });
        let out = rewrite_schema(&schema);
        assert_eq!(out["discriminator"]["propertyName"], "kind");
        assert_eq!(out["properties"]["upload"], json!({"type": "string", "format": "binary"}));
        assert_eq!(out["properties"]["owner"]["$ref"], "#/components/schemas/User");
        assert_eq!(out["properties"]["owner"]["nullable"], true);
        assert_eq!(
            out["properties"]["tags"]["items"]["$ref"],
            "#/components/schemas/Tag"
        );
    }

    #[test]
    fn test_converts_document_skeleton() {
        let v2 = json!({
            "swagger": "2.0",
            "info": {"title": "Petstore", "version": "1.0.0"},
            "host": "petstore.example.com",
            "basePath": "/v1",
            "schemes": ["http", "https"],
            "produces": ["application/json"],
            "definitions": {"Pet": {"type": "object", "properties": {"id": {"type": "integer"}}}},
            "securityDefinitions": {
                "key": {"type": "apiKey", "name": "X-Key", "in": "header"},
                "auth": {"type": "oauth2", "flow": "accessCode",
                         "authorizationUrl": "https://a", "tokenUrl": "https://t", "scopes": {}}
            },
            "paths": {
                "/pets/{id}": {
                    "parameters": [{"in": "path", "name": "id", "required": true, "type": "integer"}],
                    "get": {
                        "operationId": "getPet",
                        "parameters": [{"in": "query", "name": "fields", "type": "array",
                                        "items": {"type": "string"}}],
                        "responses": {
                            "200": {"description": "ok", "schema": {"$ref": "#/definitions/Pet"},
                                    "headers": {"X-Rate": {"type": "integer"}}},
                            "404": {"description": "missing"}
                        }
                    }
                }
            }
        });

        let v3 = convert_v2_to_v3(&v2).unwrap();
        assert_eq!(v3["openapi"], CONVERTED_OPENAPI_VERSION);
        assert_eq!(v3["servers"][0]["url"], "http://petstore.example.com/v1");
        assert_eq!(v3["servers"][1]["url"], "https://petstore.example.com/v1");
        assert_eq!(v3["components"]["schemas"]["Pet"]["type"], "object");
        assert_eq!(v3["components"]["securitySchemes"]["key"]["in"], "header");
        assert!(v3["components"]["securitySchemes"]["auth"]["flows"]["authorizationCode"].is_object());

        let item = &v3["paths"]["/pets/{id}"];
        assert_eq!(item["parameters"][0]["schema"]["type"], "integer");

        let get = &item["get"];
        assert_eq!(get["operationId"], "getPet");
        assert_eq!(get["parameters"][0]["style"], "form");
        assert_eq!(get["parameters"][0]["explode"], false);
        assert_eq!(get["parameters"][0]["schema"]["items"]["type"], "string");
        assert_eq!(
            get["responses"]["200"]["content"]["application/json"]["schema"]["$ref"],
            "#/components/schemas/Pet"
        );
        assert_eq!(
            get["responses"]["200"]["headers"]["X-Rate"]["schema"]["type"],
            "integer"
        );
        assert!(get["responses"]["404"].get("content").is_none());
    }

    #[test]
    fn test_body_and_form_parameters() {
        let v2 = json!({
            "swagger": "2.0",
            "info": {"title": "t", "version": "1"},
            "consumes": ["application/json", "application/xml"],
            "parameters": {
                "PetBody": {"in": "body", "name": "pet", "required": true,
                            "schema": {"$ref": "#/definitions/Pet"}}
            },
            "paths": {
                "/pets": {
                    "post": {
                        "parameters": [{"in": "body", "name": "pet", "required": true,
                                        "schema": {"$ref": "#/definitions/Pet"}}],
                        "responses": {"201": {"description": "created"}}
                    },
                    "put": {
                        "parameters": [{"$ref": "#/parameters/PetBody"}],
                        "responses": {"200": {"description": "ok"}}
                    }
                },
                "/upload": {
                    "post": {
                        "parameters": [
                            {"in": "formData", "name": "file", "type": "file", "required": true},
                            {"in": "formData", "name": "note", "type": "string"}
                        ],
                        "responses": {"200": {"description": "ok"}}
                    }
                },
                "/login": {
                    "post": {
                        "parameters": [{"in": "formData", "name": "user", "type": "string"}],
                        "responses": {"200": {"description": "ok"}}
                    }
                }
            }
        });

        let v3 = convert_v2_to_v3(&v2).unwrap();
        let post = &v3["paths"]["/pets"]["post"]["requestBody"];
        assert_eq!(post["required"], true);
        assert_eq!(
            post["content"]["application/xml"]["schema"]["$ref"],
            "#/components/schemas/Pet"
        );
        assert_eq!(
            v3["paths"]["/pets"]["put"]["requestBody"]["$ref"],
            "#/components/requestBodies/PetBody"
        );
        assert!(v3["components"]["requestBodies"]["PetBody"]["content"].is_object());

        let upload = &v3["paths"]["/upload"]["post"]["requestBody"]["content"];
        let schema = &upload["multipart/form-data"]["schema"];
        assert_eq!(schema["properties"]["file"]["format"], "binary");
        assert_eq!(schema["required"], json!(["file"]));

        let login = &v3["paths"]["/login"]["post"]["requestBody"]["content"];
        assert!(login.get(URL_ENCODED).is_some());
    }

    #[test]
    fn test_conversion_failures_carry_pointers() {
        let two_bodies = json!({
            "swagger": "2.0",
            "paths": {"/x": {"post": {"parameters": [
                {"in": "body", "name": "a", "schema": {}},
                {"in": "body", "name": "b", "schema": {}}
            ]}}}
        });
        let err = convert_v2_to_v3(&two_bodies).unwrap_err();
        assert!(matches!(err, ConversionFailure::MultipleBodies { .. }));
        assert_eq!(err.pointer(), "#/paths/~1x/post/parameters");

        let mixed = json!({
            "swagger": "2.0",
            "paths": {"/x": {"post": {"parameters": [
                {"in": "body", "name": "a", "schema": {}},
                {"in": "formData", "name": "b", "type": "string"}
            ]}}}
        });
        assert!(matches!(
            convert_v2_to_v3(&mixed).unwrap_err(),
            ConversionFailure::MixedBodyAndForm { .. }
        ));

        let no_in = json!({"swagger": "2.0", "paths": {"/x": {"get": {"parameters": [{"name": "q"}]}}}});
        let err = convert_v2_to_v3(&no_in).unwrap_err();
        assert_eq!(err.pointer(), "#/paths/~1x/get/parameters/0");

        let bad_item = json!({"swagger": "2.0", "paths": {"/x": 42}});
        assert!(matches!(
            convert_v2_to_v3(&bad_item).unwrap_err(),
            ConversionFailure::NotAnObject { .. }
        ));
    }
}
