//! Service model handed to emitters
//!
//! A flattened, generator-agnostic view of an API surface: endpoints with
//! merged parameters, resolved media, and a name-keyed schema table.
//! Every collection is ordered so that serializing the same model twice
//! yields identical bytes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// HTTP method of an endpoint
///
/// Variant order is the fixed processing order used for every path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Trace,
}

impl HttpMethod {
    /// All methods in processing order
    pub const ALL: [HttpMethod; 8] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
        HttpMethod::Head,
        HttpMethod::Options,
        HttpMethod::Trace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
            HttpMethod::Patch => "patch",
            HttpMethod::Head => "head",
            HttpMethod::Options => "options",
            HttpMethod::Trace => "trace",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == lower)
            .ok_or_else(|| format!("unknown HTTP method '{}'", s.trim()))
    }
}

/// The terminal artifact of the pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceModel {
    pub title: String,
    pub version: String,
    pub description: String,

    /// Servers in document order
    pub servers: Vec<Server>,

    /// Sorted tags present on retained endpoints
    pub tags: Vec<String>,

    /// Endpoints sorted by path, then by fixed method order
    pub endpoints: Vec<EndpointModel>,

    /// Schemas keyed by component name
    pub schemas: BTreeMap<String, Schema>,
}

impl ServiceModel {
    /// Look up an endpoint by its stable ID (`"get /pets"`)
    pub fn endpoint(&self, id: &str) -> Option<&EndpointModel> {
        self.endpoints.iter().find(|ep| ep.id == id)
    }

    /// Resolve a schema reference by name
    pub fn resolve(&self, reference: &SchemaRef) -> Option<&Schema> {
        self.schemas.get(reference.name())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    pub description: String,
}

/// One operation on one path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointModel {
    /// `<method> <path>`, used as a stable lookup key
    pub id: String,
    pub method: HttpMethod,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    pub summary: String,
    pub description: String,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,

    /// Path-level and operation-level parameters, sorted by `(in, name)`
    pub parameters: Vec<ParameterModel>,
    pub request_body: Option<RequestBodyModel>,

    /// Sorted by status code string
    pub responses: Vec<ResponseModel>,
}

impl EndpointModel {
    /// Build the stable endpoint ID for a method and path
    pub fn make_id(method: HttpMethod, path: &str) -> String {
        format!("{} {}", method, path)
    }

    pub fn parameter(&self, location: &str, name: &str) -> Option<&ParameterModel> {
        self.parameters
            .iter()
            .find(|p| p.location == location && p.name == name)
    }

    pub fn response(&self, status: &str) -> Option<&ResponseModel> {
        self.responses.iter().find(|r| r.status == status)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterModel {
    pub name: String,

    /// path, query, header, or cookie
    #[serde(rename = "in")]
    pub location: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub schema: Option<SchemaOrRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBodyModel {
    /// Sorted by MIME type
    pub content: Vec<Media>,
    pub required: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseModel {
    /// `200`, `4XX`, `default`, ...
    pub status: String,
    pub description: String,

    /// Sorted by MIME type
    pub content: Vec<Media>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub mime: String,
    pub schema: Option<SchemaOrRef>,

    /// A single example value, when the document provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

/// Concrete schema node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Component name for top-level entries, empty for nested nodes
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub schema_type: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub format: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, SchemaOrRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaOrRef>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<SchemaOrRef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<SchemaOrRef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<SchemaOrRef>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
}

impl Schema {
    /// A bare `object` with no properties or composition
    pub fn is_bare_object(&self) -> bool {
        self.schema_type == "object"
            && self.properties.is_empty()
            && self.all_of.is_empty()
            && self.any_of.is_empty()
            && self.one_of.is_empty()
    }
}

/// Pointer to a named schema; resolved by name, never copied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRef {
    #[serde(rename = "$ref")]
    pub reference: String,
}

impl SchemaRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
        }
    }

    /// Trailing component name (`#/components/schemas/Pet` -> `Pet`)
    pub fn name(&self) -> &str {
        self.reference
            .rsplit('/')
            .next()
            .unwrap_or(self.reference.as_str())
    }
}

/// Either a reference to a named schema or an inline schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaOrRef {
    Ref(SchemaRef),
    Schema(Box<Schema>),
}

impl SchemaOrRef {
    pub fn reference(reference: impl Into<String>) -> Self {
        SchemaOrRef::Ref(SchemaRef::new(reference))
    }

    pub fn as_reference(&self) -> Option<&SchemaRef> {
        match self {
            SchemaOrRef::Ref(r) => Some(r),
            SchemaOrRef::Schema(_) => None,
        }
    }

    pub fn as_schema(&self) -> Option<&Schema> {
        match self {
            SchemaOrRef::Schema(s) => Some(s),
            SchemaOrRef::Ref(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_method_order_and_parse() {
        let mut methods = vec![HttpMethod::Trace, HttpMethod::Delete, HttpMethod::Get];
        methods.sort();
        assert_eq!(
            methods,
            vec![HttpMethod::Get, HttpMethod::Delete, HttpMethod::Trace]
        );
        assert_eq!("POST".parse::<HttpMethod>(), Ok(HttpMethod::Post));
        assert!("fetch".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn test_schema_ref_name() {
        let r = SchemaRef::new("#/components/schemas/Pet");
        assert_eq!(r.name(), "Pet");
        assert_eq!(SchemaRef::new("Pet").name(), "Pet");
    }

    #[test]
    fn test_endpoint_id_and_lookup() {
        let model = ServiceModel {
            endpoints: vec![EndpointModel {
                id: EndpointModel::make_id(HttpMethod::Get, "/pets"),
                method: HttpMethod::Get,
                path: "/pets".to_string(),
                operation_id: None,
                summary: String::new(),
                description: String::new(),
                tags: vec![],
                deprecated: false,
                parameters: vec![],
                request_body: None,
                responses: vec![],
            }],
            ..Default::default()
        };

        assert!(model.endpoint("get /pets").is_some());
        assert!(model.endpoint("post /pets").is_none());
    }

    #[test]
    fn test_schema_serialization_skips_empty_fields() {
        let schema = Schema {
            schema_type: "string".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_string(&schema).unwrap();
        assert_eq!(json, r#"{"type":"string"}"#);

        let r = SchemaOrRef::reference("#/components/schemas/Pet");
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r##"{"$ref":"#/components/schemas/Pet"}"##);

        let back: SchemaOrRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back.as_reference().map(|r| r.name()), Some("Pet"));
        let inline: SchemaOrRef = serde_json::from_str(r#"{"type":"integer"}"#).unwrap();
        assert_eq!(inline.as_schema().map(|s| s.schema_type.as_str()), Some("integer"));
    }
}
