//! Service model builder
//!
//! Single deterministic pass over a validated v3 document: paths in sorted
//! order, methods in [`HttpMethod::ALL`] order, schema names and status
//! codes sorted. Swagger-sourced documents pass their [`V2Enrichment`] so
//! that schemas flattened by conversion can be recovered.

use crate::openapi::types::{self, MediaType, OpenApiSpec, Operation, RefOr};
use crate::swagger::enrichment::normalize_definition_ref;
use crate::swagger::V2Enrichment;
use regex::Regex;
use serde_json::Value;
use specmill_common::{
    EndpointModel, HttpMethod, Media, ParameterModel, RequestBodyModel, ResponseModel, Schema,
    SchemaOrRef, Server, ServiceModel, SpecError,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Endpoint filters applied while building
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Keep endpoints carrying at least one of these tags
    pub include_tags: BTreeSet<String>,

    /// Drop endpoints carrying any of these tags
    pub exclude_tags: BTreeSet<String>,

    /// Keep only these methods
    pub methods: BTreeSet<HttpMethod>,

    /// Keep paths matching any of these regular expressions
    pub path_patterns: Vec<String>,
}

impl BuildOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_include_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.include_tags.extend(cleaned(tags));
        self
    }

    pub fn with_exclude_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.exclude_tags.extend(cleaned(tags));
        self
    }

    pub fn with_methods<I>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = HttpMethod>,
    {
        self.methods.extend(methods);
        self
    }

    pub fn with_path_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.path_patterns.extend(cleaned(patterns));
        self
    }

    fn allows_tags(&self, tags: &[String]) -> bool {
        if !self.include_tags.is_empty() && !tags.iter().any(|t| self.include_tags.contains(t)) {
            return false;
        }
        !tags.iter().any(|t| self.exclude_tags.contains(t))
    }
}

fn cleaned<I, S>(values: I) -> impl Iterator<Item = String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|v| v.as_ref().trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Compiled path filter; patterns that fail to compile never match
struct PathFilter {
    patterns: Vec<Option<Regex>>,
}

impl PathFilter {
    fn new(patterns: &[String]) -> Self {
        let patterns = patterns
            .iter()
            .map(|p| match Regex::new(p) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(pattern = %p, error = %e, "invalid path pattern matches nothing");
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    fn matches(&self, path: &str) -> bool {
        self.patterns.is_empty()
            || self
                .patterns
                .iter()
                .flatten()
                .any(|re| re.is_match(path))
    }
}

/// Where a named component schema can be read from
pub trait SchemaSource {
    fn lookup(&self, name: &str) -> Option<SchemaOrRef>;
}

/// Original Swagger 2.0 definitions
pub struct V2DefinitionSource<'a> {
    enrichment: &'a V2Enrichment,
}

impl<'a> V2DefinitionSource<'a> {
    pub fn new(enrichment: &'a V2Enrichment) -> Self {
        Self { enrichment }
    }
}

impl SchemaSource for V2DefinitionSource<'_> {
    fn lookup(&self, name: &str) -> Option<SchemaOrRef> {
        schema_from_v2(self.enrichment.definition(name)?)
    }
}

/// `components.schemas` of the (possibly converted) v3 document
pub struct ConvertedSchemaSource<'a> {
    document: &'a OpenApiSpec,
}

impl<'a> ConvertedSchemaSource<'a> {
    pub fn new(document: &'a OpenApiSpec) -> Self {
        Self { document }
    }
}

impl SchemaSource for ConvertedSchemaSource<'_> {
    fn lookup(&self, name: &str) -> Option<SchemaOrRef> {
        let components = self.document.components.as_ref()?;
        Some(schema_from_v3(components.schemas.get(name)?))
    }
}

/// Reduce a validated v3 document to a [`ServiceModel`]
pub fn build_service_model(
    document: &OpenApiSpec,
    enrichment: Option<&V2Enrichment>,
    options: &BuildOptions,
) -> Result<ServiceModel, SpecError> {
    if !document.openapi.trim().starts_with("3.") {
        return Err(SpecError::conversion(format!(
            "Cannot build a service model from OpenAPI version '{}'",
            document.openapi
        ))
        .with_pointer("#/openapi"));
    }

    let mut model = ServiceModel {
        title: document.info.title.trim().to_string(),
        version: document.info.version.trim().to_string(),
        description: trimmed(&document.info.description),
        servers: document
            .servers
            .iter()
            .map(|s| Server {
                url: s.url.trim().to_string(),
                description: trimmed(&s.description),
            })
            .collect(),
        schemas: build_schemas(document, enrichment),
        ..Default::default()
    };

    let builder = EndpointBuilder {
        document,
        enrichment,
    };
    let paths = PathFilter::new(&options.path_patterns);

    for (path, item) in &document.paths {
        let shared = builder.parameters(&item.parameters);

        for (method, op) in item.operations() {
            if !options.methods.is_empty() && !options.methods.contains(&method) {
                continue;
            }
            if !paths.matches(path) {
                continue;
            }

            let tags: Vec<String> = op
                .tags
                .iter()
                .map(|t| t.trim())
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
            if !options.allows_tags(&tags) {
                continue;
            }

            model
                .endpoints
                .push(builder.endpoint(path, method, op, &shared, tags));
        }
    }

    model.tags = model
        .endpoints
        .iter()
        .flat_map(|ep| ep.tags.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    debug!(
        endpoints = model.endpoints.len(),
        schemas = model.schemas.len(),
        tags = model.tags.len(),
        "built service model"
    );
    Ok(model)
}

fn build_schemas(
    document: &OpenApiSpec,
    enrichment: Option<&V2Enrichment>,
) -> BTreeMap<String, Schema> {
    let Some(components) = document.components.as_ref() else {
        return BTreeMap::new();
    };

    let mut sources: Vec<Box<dyn SchemaSource + '_>> = Vec::new();
    if let Some(enrichment) = enrichment {
        sources.push(Box::new(V2DefinitionSource::new(enrichment)));
    }
    sources.push(Box::new(ConvertedSchemaSource::new(document)));

    let mut schemas = BTreeMap::new();
    for name in components.schemas.keys() {
        let Some(found) = sources.iter().find_map(|source| source.lookup(name)) else {
            continue;
        };
        let schema = match found {
            // top-level aliases keep only their name; readers resolve by name
            SchemaOrRef::Ref(_) => Schema {
                name: name.clone(),
                ..Default::default()
            },
            SchemaOrRef::Schema(schema) => {
                let mut schema = *schema;
                schema.name = name.clone();
                schema
            }
        };
        schemas.insert(name.clone(), schema);
    }
    schemas
}

struct EndpointBuilder<'a> {
    document: &'a OpenApiSpec,
    enrichment: Option<&'a V2Enrichment>,
}

impl EndpointBuilder<'_> {
    fn endpoint(
        &self,
        path: &str,
        method: HttpMethod,
        op: &Operation,
        shared: &BTreeMap<(String, String), ParameterModel>,
        tags: Vec<String>,
    ) -> EndpointModel {
        let mut parameters = shared.clone();
        parameters.extend(self.parameters(&op.parameters));

        let request_body = op
            .request_body
            .as_ref()
            .and_then(|rb| self.document.request_body(rb))
            .map(|rb| {
                let mut content = self.media_list(&rb.content);
                if let Some(enrichment) = self.enrichment {
                    enhance(&mut content, enrichment.body_schema_ref(path, method));
                }
                RequestBodyModel {
                    content,
                    required: rb.required,
                    description: trimmed(&rb.description),
                }
            });

        let responses = op
            .responses
            .iter()
            .filter_map(|(status, r)| {
                let Some(response) = self.document.response(r) else {
                    debug!(path, %method, status = %status, "skipping unresolved response");
                    return None;
                };
                let mut content = self.media_list(&response.content);
                if let Some(enrichment) = self.enrichment {
                    // the status's own v2 schema first, then the body parameter's
                    let replacement = enrichment
                        .response_schema_ref(path, method, status)
                        .or_else(|| enrichment.body_schema_ref(path, method));
                    enhance(&mut content, replacement);
                }
                Some(ResponseModel {
                    status: status.clone(),
                    description: response.description.trim().to_string(),
                    content,
                })
            })
            .collect();

        EndpointModel {
            id: EndpointModel::make_id(method, path),
            method,
            path: path.to_string(),
            operation_id: op
                .operation_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
            summary: trimmed(&op.summary),
            description: trimmed(&op.description),
            tags,
            deprecated: op.deprecated,
            parameters: parameters.into_values().collect(),
            request_body,
            responses,
        }
    }

    /// Parameters keyed by `(in, name)`; later entries win
    fn parameters(
        &self,
        list: &[RefOr<types::Parameter>],
    ) -> BTreeMap<(String, String), ParameterModel> {
        let mut out = BTreeMap::new();
        for item in list {
            let Some(p) = self.document.parameter(item) else {
                if let RefOr::Ref { reference } = item {
                    debug!(reference = %reference, "skipping unresolved parameter");
                }
                continue;
            };

            let schema = p.schema.as_ref().map(schema_from_v3).or_else(|| {
                p.content
                    .values()
                    .find_map(|media| media.schema.as_ref().map(schema_from_v3))
            });
            let model = ParameterModel {
                name: p.name.trim().to_string(),
                location: p.location.trim().to_string(),
                required: p.required,
                description: trimmed(&p.description),
                schema,
            };
            out.insert((model.location.clone(), model.name.clone()), model);
        }
        out
    }

    fn media_list(&self, content: &BTreeMap<String, MediaType>) -> Vec<Media> {
        content
            .iter()
            .map(|(mime, media)| Media {
                mime: mime.clone(),
                schema: media.schema.as_ref().map(schema_from_v3),
                example: media.example.clone().or_else(|| {
                    let first = media.examples.values().next()?;
                    self.document.example(first)?.value.clone()
                }),
            })
            .collect()
    }
}

/// Swap bare `object` placeholders for the original definition ref
fn enhance(content: &mut [Media], replacement: Option<String>) {
    let Some(reference) = replacement else {
        return;
    };
    for media in content.iter_mut() {
        let bare = matches!(&media.schema, Some(SchemaOrRef::Schema(s)) if s.is_bare_object());
        if bare {
            debug!(mime = %media.mime, reference = %reference, "restored schema from Swagger 2.0 definition");
            media.schema = Some(SchemaOrRef::reference(reference.clone()));
        }
    }
}

fn trimmed(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

fn schema_from_v3(item: &RefOr<types::Schema>) -> SchemaOrRef {
    let s = match item {
        RefOr::Ref { reference } => return SchemaOrRef::reference(reference.clone()),
        RefOr::Item(s) => s,
    };

    let list = |items: &[RefOr<types::Schema>]| items.iter().map(schema_from_v3).collect();
    SchemaOrRef::Schema(Box::new(Schema {
        name: String::new(),
        schema_type: s
            .schema_type
            .as_ref()
            .and_then(|t| t.primary())
            .unwrap_or_default()
            .trim()
            .to_string(),
        format: trimmed(&s.format),
        description: trimmed(&s.description),
        enum_values: s.enum_values.clone(),
        example: s.example.clone(),
        required: s.required.clone(),
        properties: s
            .properties
            .iter()
            .map(|(name, prop)| (name.clone(), schema_from_v3(prop)))
            .collect(),
        items: s.items.as_deref().map(|i| Box::new(schema_from_v3(i))),
        all_of: list(&s.all_of),
        any_of: list(&s.any_of),
        one_of: list(&s.one_of),
        nullable: s.nullable || s.schema_type.as_ref().is_some_and(|t| t.allows_null()),
    }))
}

/// Read a raw v2 schema node; `None` for non-object nodes
fn schema_from_v2(node: &Value) -> Option<SchemaOrRef> {
    let map = node.as_object()?;

    if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
        let reference =
            normalize_definition_ref(reference).unwrap_or_else(|| reference.to_string());
        return Some(SchemaOrRef::reference(reference));
    }

    let text = |key: &str| {
        map.get(key)
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    };
    let list = |key: &str| -> Vec<SchemaOrRef> {
        map.get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(schema_from_v2).collect())
            .unwrap_or_default()
    };

    Some(SchemaOrRef::Schema(Box::new(Schema {
        name: String::new(),
        schema_type: text("type"),
        format: text("format"),
        description: text("description"),
        enum_values: map
            .get("enum")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        example: map.get("example").filter(|v| !v.is_null()).cloned(),
        required: map
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default(),
        properties: map
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .filter_map(|(name, prop)| Some((name.clone(), schema_from_v2(prop)?)))
                    .collect()
            })
            .unwrap_or_default(),
        items: map.get("items").and_then(schema_from_v2).map(Box::new),
        all_of: list("allOf"),
        any_of: list("anyOf"),
        one_of: list("oneOf"),
        nullable: map.get("x-nullable").and_then(Value::as_bool).unwrap_or(false),
    })))
}
