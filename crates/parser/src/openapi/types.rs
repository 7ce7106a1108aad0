//! OpenAPI 3.x type definitions
//!
//! Typed view of the subset the service model builder reads. Maps are
//! ordered so every walk over the document is deterministic.

use crate::pointer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use specmill_common::HttpMethod;
use std::collections::BTreeMap;

/// Longest `$ref` chain followed between components
const MAX_REF_HOPS: usize = 16;

/// OpenAPI document root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiSpec {
    /// OpenAPI version (e.g., "3.0.3")
    pub openapi: String,

    /// API metadata
    pub info: Info,

    /// Servers
    #[serde(default)]
    pub servers: Vec<Server>,

    /// API paths (endpoints)
    #[serde(default)]
    pub paths: BTreeMap<String, PathItem>,

    /// Reusable components
    #[serde(default)]
    pub components: Option<Components>,

    /// Tag declarations
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// API information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// API title
    pub title: String,

    /// API version
    pub version: String,

    /// API description
    #[serde(default)]
    pub description: Option<String>,
}

/// Server information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    /// Server URL
    pub url: String,

    /// Server description
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,
}

/// Either a `$ref` or an inline value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RefOr<T> {
    Ref {
        #[serde(rename = "$ref")]
        reference: String,
    },
    Item(T),
}

/// Path item (operations for a path)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(default)]
    pub summary: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub get: Option<Operation>,

    #[serde(default)]
    pub post: Option<Operation>,

    #[serde(default)]
    pub put: Option<Operation>,

    #[serde(default)]
    pub delete: Option<Operation>,

    #[serde(default)]
    pub patch: Option<Operation>,

    #[serde(default)]
    pub head: Option<Operation>,

    #[serde(default)]
    pub options: Option<Operation>,

    #[serde(default)]
    pub trace: Option<Operation>,

    /// Parameters shared by every operation on this path
    #[serde(default)]
    pub parameters: Vec<RefOr<Parameter>>,
}

impl PathItem {
    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
            HttpMethod::Trace => self.trace.as_ref(),
        }
    }

    /// Operations in fixed method order
    pub fn operations(&self) -> impl Iterator<Item = (HttpMethod, &Operation)> {
        HttpMethod::ALL
            .into_iter()
            .filter_map(move |m| self.operation(m).map(|op| (m, op)))
    }
}

/// HTTP operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Operation ID (unique identifier)
    #[serde(rename = "operationId")]
    #[serde(default)]
    pub operation_id: Option<String>,

    #[serde(default)]
    pub summary: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Tags (for grouping)
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub parameters: Vec<RefOr<Parameter>>,

    #[serde(rename = "requestBody")]
    #[serde(default)]
    pub request_body: Option<RefOr<RequestBody>>,

    /// Responses keyed by status code
    #[serde(default)]
    pub responses: BTreeMap<String, RefOr<Response>>,

    #[serde(default)]
    pub deprecated: bool,
}

/// Parameter definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,

    /// Location: query, header, path, cookie
    #[serde(rename = "in")]
    pub location: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub deprecated: bool,

    #[serde(default)]
    pub schema: Option<RefOr<Schema>>,

    /// Alternative to `schema` for complex serializations
    #[serde(default)]
    pub content: BTreeMap<String, MediaType>,
}

/// Request body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(default)]
    pub description: Option<String>,

    /// Content types
    #[serde(default)]
    pub content: BTreeMap<String, MediaType>,

    #[serde(default)]
    pub required: bool,
}

/// Response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub description: String,

    /// Content types
    #[serde(default)]
    pub content: BTreeMap<String, MediaType>,
}

/// Media type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    #[serde(default)]
    pub schema: Option<RefOr<Schema>>,

    #[serde(default)]
    pub example: Option<Value>,

    /// Named examples
    #[serde(default)]
    pub examples: BTreeMap<String, RefOr<Example>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Example {
    #[serde(default)]
    pub summary: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub value: Option<Value>,

    #[serde(rename = "externalValue")]
    #[serde(default)]
    pub external_value: Option<String>,
}

/// `type` is a single name in 3.0 and may be a list in 3.1
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    Single(String),
    Multiple(Vec<String>),
}

impl SchemaType {
    /// First non-null type name
    pub fn primary(&self) -> Option<&str> {
        match self {
            SchemaType::Single(t) => Some(t.as_str()),
            SchemaType::Multiple(list) => list
                .iter()
                .map(String::as_str)
                .find(|t| *t != "null"),
        }
    }

    pub fn allows_null(&self) -> bool {
        match self {
            SchemaType::Single(t) => t == "null",
            SchemaType::Multiple(list) => list.iter().any(|t| t == "null"),
        }
    }
}

/// Schema definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Type: string, number, integer, boolean, array, object
    #[serde(rename = "type")]
    #[serde(default)]
    pub schema_type: Option<SchemaType>,

    /// Format (e.g., int32, int64, date-time)
    #[serde(default)]
    pub format: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Properties (for object type)
    #[serde(default)]
    pub properties: BTreeMap<String, RefOr<Schema>>,

    /// Required properties
    #[serde(default)]
    pub required: Vec<String>,

    /// Items schema (for array type)
    #[serde(default)]
    pub items: Option<Box<RefOr<Schema>>>,

    /// Additional properties (bool or schema)
    #[serde(rename = "additionalProperties")]
    #[serde(default)]
    pub additional_properties: Option<Value>,

    #[serde(rename = "allOf")]
    #[serde(default)]
    pub all_of: Vec<RefOr<Schema>>,

    #[serde(rename = "anyOf")]
    #[serde(default)]
    pub any_of: Vec<RefOr<Schema>>,

    #[serde(rename = "oneOf")]
    #[serde(default)]
    pub one_of: Vec<RefOr<Schema>>,

    /// Enum values
    #[serde(rename = "enum")]
    #[serde(default)]
    pub enum_values: Vec<Value>,

    #[serde(default)]
    pub example: Option<Value>,

    #[serde(default)]
    pub nullable: bool,

    /// Keywords not modeled above (x-*, constraints, ...)
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

/// Reusable components
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    #[serde(default)]
    pub schemas: BTreeMap<String, RefOr<Schema>>,

    #[serde(default)]
    pub parameters: BTreeMap<String, RefOr<Parameter>>,

    #[serde(rename = "requestBodies")]
    #[serde(default)]
    pub request_bodies: BTreeMap<String, RefOr<RequestBody>>,

    #[serde(default)]
    pub responses: BTreeMap<String, RefOr<Response>>,

    #[serde(default)]
    pub examples: BTreeMap<String, RefOr<Example>>,
}

impl OpenApiSpec {
    /// Get a schema by reference path
    /// e.g., "#/components/schemas/Pod" -> returns Pod schema
    pub fn resolve_schema_ref(&self, ref_path: &str) -> Option<&Schema> {
        let components = self.components.as_ref()?;
        follow(ref_path, "schemas", |name| components.schemas.get(name))
    }

    pub fn parameter<'a>(&'a self, item: &'a RefOr<Parameter>) -> Option<&'a Parameter> {
        self.deref(item, "parameters", |c, name| c.parameters.get(name))
    }

    pub fn request_body<'a>(&'a self, item: &'a RefOr<RequestBody>) -> Option<&'a RequestBody> {
        self.deref(item, "requestBodies", |c, name| c.request_bodies.get(name))
    }

    pub fn response<'a>(&'a self, item: &'a RefOr<Response>) -> Option<&'a Response> {
        self.deref(item, "responses", |c, name| c.responses.get(name))
    }

    pub fn example<'a>(&'a self, item: &'a RefOr<Example>) -> Option<&'a Example> {
        self.deref(item, "examples", |c, name| c.examples.get(name))
    }

    fn deref<'a, T>(
        &'a self,
        item: &'a RefOr<T>,
        section: &str,
        table: impl Fn(&'a Components, &str) -> Option<&'a RefOr<T>>,
    ) -> Option<&'a T>
    where
        T: 'a,
    {
        match item {
            RefOr::Item(value) => Some(value),
            RefOr::Ref { reference } => {
                let components = self.components.as_ref()?;
                follow(reference, section, |name| table(components, name))
            }
        }
    }
}

/// Follow a chain of component refs to a concrete value
fn follow<'a, T>(
    reference: &str,
    section: &str,
    table: impl Fn(&str) -> Option<&'a RefOr<T>>,
) -> Option<&'a T>
where
    T: 'a,
{
    let mut reference = reference.to_string();
    for _ in 0..MAX_REF_HOPS {
        let name = component_name(&reference, section)?;
        match table(&name)? {
            RefOr::Item(value) => return Some(value),
            RefOr::Ref { reference: next } => reference = next.clone(),
        }
    }
    None
}

/// Name of `#/components/<section>/<name>`, decoded
pub fn component_name(reference: &str, section: &str) -> Option<String> {
    let rest = reference
        .strip_prefix("#/components/")?
        .strip_prefix(section)?
        .strip_prefix('/')?;
    if rest.is_empty() || rest.contains('/') {
        return None;
    }
    Some(pointer::decode_segment(rest))
}
