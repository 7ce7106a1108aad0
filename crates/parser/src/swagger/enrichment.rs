//! Original Swagger 2.0 data kept alongside the converted document
//!
//! Conversion can flatten schemas into placeholders. The builder consults
//! this side value per schema and per operation to recover the detail.

use crate::pointer;
use serde_json::Value;
use specmill_common::HttpMethod;
use std::collections::BTreeMap;

const DEFINITIONS_PREFIX: &str = "#/definitions/";
const SCHEMAS_PREFIX: &str = "#/components/schemas/";
const PARAMETERS_PREFIX: &str = "#/parameters/";

/// v2 `definitions` and per-operation objects, keyed for lookup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct V2Enrichment {
    definitions: BTreeMap<String, Value>,

    /// path -> lowercase method -> operation object
    operations: BTreeMap<String, BTreeMap<String, Value>>,

    /// path -> path-level parameter list
    shared: BTreeMap<String, Vec<Value>>,

    /// Top-level `parameters` section
    parameters: BTreeMap<String, Value>,
}

impl V2Enrichment {
    /// Extract from a v2 tree; `None` when the document has no definitions
    pub fn from_v2_tree(root: &Value) -> Option<Self> {
        let definitions: BTreeMap<String, Value> = root
            .get("definitions")?
            .as_object()?
            .iter()
            .map(|(name, def)| (name.clone(), def.clone()))
            .collect();

        let parameters = root
            .get("parameters")
            .and_then(Value::as_object)
            .map(|params| {
                params
                    .iter()
                    .map(|(name, param)| (name.clone(), param.clone()))
                    .collect()
            })
            .unwrap_or_default();

        let mut operations = BTreeMap::new();
        let mut shared = BTreeMap::new();
        if let Some(paths) = root.get("paths").and_then(Value::as_object) {
            for (path, item) in paths {
                let Some(item) = item.as_object() else {
                    continue;
                };
                if let Some(params) = item.get("parameters").and_then(Value::as_array) {
                    shared.insert(path.clone(), params.clone());
                }
                let ops: BTreeMap<String, Value> = item
                    .iter()
                    .filter(|(method, op)| {
                        op.is_object() && method.parse::<HttpMethod>().is_ok()
                    })
                    .map(|(method, op)| (method.to_ascii_lowercase(), op.clone()))
                    .collect();
                if !ops.is_empty() {
                    operations.insert(path.clone(), ops);
                }
            }
        }

        Some(Self {
            definitions,
            operations,
            shared,
            parameters,
        })
    }

    pub fn definition(&self, name: &str) -> Option<&Value> {
        self.definitions.get(name)
    }

    pub fn definition_names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn operation(&self, path: &str, method: HttpMethod) -> Option<&Value> {
        self.operations.get(path)?.get(method.as_str())
    }

    /// Schema ref of the operation's `in: body` parameter, in v3 form
    ///
    /// Operation-level parameters are searched before path-level ones, and
    /// `#/parameters/<name>` refs are followed. GET operations carry no body
    /// and always yield `None`.
    pub fn body_schema_ref(&self, path: &str, method: HttpMethod) -> Option<String> {
        if method == HttpMethod::Get {
            return None;
        }
        let own = self
            .operation(path, method)?
            .get("parameters")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let shared = self.shared.get(path).map(Vec::as_slice).unwrap_or_default();

        let body = own
            .iter()
            .chain(shared)
            .filter_map(|p| self.parameter(p))
            .find(|p| {
                p.get("in")
                    .and_then(Value::as_str)
                    .is_some_and(|l| l.eq_ignore_ascii_case("body"))
            })?;
        schema_ref(body.get("schema")?)
    }

    /// Inline parameter, or the top-level parameter it refers to
    fn parameter<'a>(&'a self, param: &'a Value) -> Option<&'a Value> {
        match param.get("$ref") {
            None => Some(param),
            Some(reference) => {
                let name = reference.as_str()?.strip_prefix(PARAMETERS_PREFIX)?;
                self.parameters.get(&pointer::decode_segment(name))
            }
        }
    }

    /// Schema ref of the v2 response for `status`, in v3 form
    pub fn response_schema_ref(
        &self,
        path: &str,
        method: HttpMethod,
        status: &str,
    ) -> Option<String> {
        let response = self
            .operation(path, method)?
            .get("responses")?
            .get(status)?;
        schema_ref(response.get("schema")?)
    }
}

/// Normalize a local definition ref to `#/components/schemas/<Name>`
pub fn normalize_definition_ref(reference: &str) -> Option<String> {
    if let Some(name) = reference.strip_prefix(DEFINITIONS_PREFIX) {
        return Some(format!("{}{}", SCHEMAS_PREFIX, name));
    }
    reference
        .starts_with(SCHEMAS_PREFIX)
        .then(|| reference.to_string())
}

fn schema_ref(schema: &Value) -> Option<String> {
    normalize_definition_ref(schema.get("$ref")?.as_str()?)
}
