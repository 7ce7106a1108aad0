//! External `$ref` inlining
//!
//! Local `#/...` refs stay in place for name-based lookup. External refs
//! (`common.yaml#/components/schemas/Error`, absolute URLs) are replaced by
//! the node they point to, subject to the source policy:
//!
//! - file-rooted documents may follow file-relative refs
//! - http(s) refs, and any relative ref under a URL root, need
//!   `allow_external_refs`
//! - `file://` refs under a URL root are always refused
//!
//! Refs that cannot be followed are left untouched and later surface as
//! unresolved-reference validation issues. Payload keywords (`example`,
//! `default`, `enum`, `const`, `x-*`) are never searched.

use super::{ref_slot, RefSlot};
use crate::detect::parse_tree;
use crate::fetch::{Fetcher, Location};
use crate::pointer;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};
use url::Url;

/// Inlines external refs for one document
pub struct RefResolver<'a> {
    fetcher: &'a Fetcher,
    allow_external: bool,
    documents: HashMap<String, Option<Value>>,
    warnings: Vec<String>,
}

impl<'a> RefResolver<'a> {
    pub fn new(fetcher: &'a Fetcher) -> Self {
        Self {
            fetcher,
            allow_external: fetcher.settings().allow_external_refs,
            documents: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    /// Inline every followable external ref in `root`; returns the warnings
    pub fn resolve(mut self, root: &mut Value, base: &Location) -> Vec<String> {
        let mut stack = Vec::new();
        self.walk(root, base, true, false, &mut stack);
        self.warnings
    }

    fn walk(
        &mut self,
        value: &mut Value,
        base: &Location,
        is_root: bool,
        named: bool,
        stack: &mut Vec<String>,
    ) {
        match value {
            Value::Object(map) => {
                if !named {
                    if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
                        let reference = reference.to_string();
                        self.replace_ref(value, &reference, base, is_root, stack);
                        return;
                    }
                }
                for (key, child) in map.iter_mut() {
                    if named {
                        self.walk(child, base, is_root, false, stack);
                        continue;
                    }
                    match ref_slot(key, child) {
                        RefSlot::Literal => {}
                        RefSlot::Examples => {
                            if let Some(examples) = child.as_object_mut() {
                                for example in examples.values_mut() {
                                    if example.get("$ref").is_some() {
                                        self.walk(example, base, is_root, false, stack);
                                    }
                                }
                            }
                        }
                        RefSlot::Named => self.walk(child, base, is_root, true, stack),
                        RefSlot::Node => self.walk(child, base, is_root, false, stack),
                    }
                }
            }
            Value::Array(items) => {
                for child in items {
                    self.walk(child, base, is_root, false, stack);
                }
            }
            _ => {}
        }
    }

    fn replace_ref(
        &mut self,
        value: &mut Value,
        reference: &str,
        base: &Location,
        is_root: bool,
        stack: &mut Vec<String>,
    ) {
        if reference.starts_with('#') && is_root {
            return;
        }
        if let Some(replacement) = self.follow(reference, base, is_root, stack) {
            *value = replacement;
        } else if reference.starts_with('#') {
            // a local ref inside an external document must not
            // be read against the root document later
            if let Some(map) = value.as_object_mut() {
                map.insert(
                    "$ref".to_string(),
                    Value::String(format!("{}{}", base, reference)),
                );
            }
        }
    }

    fn follow(
        &mut self,
        reference: &str,
        base: &Location,
        is_root: bool,
        stack: &mut Vec<String>,
    ) -> Option<Value> {
        let (document, fragment) = match reference.find('#') {
            Some(idx) => (&reference[..idx], &reference[idx..]),
            None => (reference, "#"),
        };

        let target = if document.is_empty() {
            base.clone()
        } else {
            match self.locate(base, document) {
                Ok(target) => target,
                Err(reason) => {
                    self.warn(format!("not following '{}': {}", reference, reason));
                    return None;
                }
            }
        };

        let key = format!("{}{}", target, fragment);
        if stack.contains(&key) {
            self.warn(format!("reference cycle through '{}'", key));
            return None;
        }

        let found = match self.document(&target) {
            Some(tree) => pointer::resolve_local(tree, fragment).cloned(),
            None => return None,
        };
        let Some(mut node) = found else {
            self.warn(format!("'{}' does not exist in {}", fragment, target));
            return None;
        };

        debug!(reference = %reference, target = %key, root = is_root, "inlining external ref");
        stack.push(key);
        self.walk(&mut node, &target, false, false, stack);
        stack.pop();
        Some(node)
    }

    /// Apply the source policy to a ref's document part
    fn locate(&self, base: &Location, document: &str) -> Result<Location, String> {
        if let Ok(url) = Url::parse(document) {
            if url.scheme().len() > 1 {
                return self.locate_url(base, url);
            }
        }

        match base {
            Location::File(path) => {
                let dir = path.parent().unwrap_or(path.as_path());
                Ok(Location::File(dir.join(document)))
            }
            Location::Url(url) => {
                let joined = url
                    .join(document)
                    .map_err(|e| format!("cannot join with {}: {}", url, e))?;
                self.locate_url(base, joined)
            }
        }
    }

    fn locate_url(&self, base: &Location, url: Url) -> Result<Location, String> {
        match url.scheme() {
            "http" | "https" if self.allow_external => Ok(Location::Url(url)),
            "http" | "https" => Err("external refs are disabled".to_string()),
            "file" if base.is_file() => url
                .to_file_path()
                .map(Location::File)
                .map_err(|_| format!("invalid file URL {}", url)),
            "file" => Err("file refs are blocked for URL inputs".to_string()),
            other => Err(format!("unsupported ref scheme '{}'", other)),
        }
    }

    fn document(&mut self, location: &Location) -> Option<&Value> {
        let key = location.to_string();
        if !self.documents.contains_key(&key) {
            let loaded = self
                .fetcher
                .fetch_bytes(location)
                .and_then(|bytes| parse_tree(&bytes));
            let entry = match loaded {
                Ok(tree) => Some(tree),
                Err(e) => {
                    self.warn(format!("failed to load {}: {}", location, e));
                    None
                }
            };
            self.documents.insert(key.clone(), entry);
        }
        self.documents.get(&key)?.as_ref()
    }

    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LoadSettings;
    use serde_json::json;
    use std::fs;

    #[test]
    fn test_inlines_file_relative_refs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("common.yaml"),
            "components:\n  schemas:\n    Error:\n      type: object\n      properties:\n        code: { $ref: '#/components/schemas/Code' }\n    Code:\n      type: integer\n",
        )
        .unwrap();

        let base = Location::File(dir.path().join("api.yaml"));
        let mut root = json!({
            "components": {"schemas": {
                "Error": {"$ref": "common.yaml#/components/schemas/Error"},
                "Local": {"$ref": "#/components/schemas/Error"}
            }}
        });

        let fetcher = Fetcher::new(LoadSettings::default());
        let warnings = RefResolver::new(&fetcher).resolve(&mut root, &base);
        assert!(warnings.is_empty(), "{:?}", warnings);

        let error = &root["components"]["schemas"]["Error"];
        assert_eq!(error["type"], "object");
        assert_eq!(error["properties"]["code"]["type"], "integer");
        assert_eq!(root["components"]["schemas"]["Local"]["$ref"], "#/components/schemas/Error");
    }

    #[test]
    fn test_blocks_http_refs_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let base = Location::File(dir.path().join("api.yaml"));
        let mut root = json!({"schema": {"$ref": "https://example.com/common.yaml#/Error"}});

        let fetcher = Fetcher::new(LoadSettings::default());
        let warnings = RefResolver::new(&fetcher).resolve(&mut root, &base);
        assert_eq!(warnings.len(), 1);
        assert_eq!(root["schema"]["$ref"], "https://example.com/common.yaml#/Error");
    }

    #[test]
    fn test_blocks_file_refs_under_url_roots() {
        let base = Location::Url(Url::parse("https://example.com/api/openapi.yaml").unwrap());
        let mut root = json!({"schema": {"$ref": "file:///etc/passwd#/x"}});

        let fetcher = Fetcher::new(LoadSettings::default().with_allow_external_refs(true));
        let warnings = RefResolver::new(&fetcher).resolve(&mut root, &base);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("blocked"));
    }

    #[test]
    fn test_cycles_leave_ref_in_place() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.yaml"),
            "Node:\n  type: object\n  properties:\n    next: { $ref: 'a.yaml#/Node' }\n",
        )
        .unwrap();

        let base = Location::File(dir.path().join("api.yaml"));
        let mut root = json!({"schema": {"$ref": "a.yaml#/Node"}});

        let fetcher = Fetcher::new(LoadSettings::default());
        let warnings = RefResolver::new(&fetcher).resolve(&mut root, &base);
        assert_eq!(root["schema"]["type"], "object");
        assert!(root["schema"]["properties"]["next"]["$ref"].is_string());
        assert!(warnings.iter().any(|w| w.contains("cycle")));
    }

    #[test]
    fn test_payload_refs_are_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let base = Location::File(dir.path().join("api.yaml"));
        let mut root = json!({
            "paths": {"/pets": {"get": {"responses": {"200": {
                "description": "ok",
                "content": {"application/json": {
                    "example": {"$ref": "./missing.yaml"},
                    "examples": {"one": {"value": {"$ref": "./also-missing.yaml"}}}
                }}
            }}}}},
            "components": {"schemas": {"Pet": {
                "type": "object",
                "default": {"$ref": "./default.yaml"},
                "x-origin": {"$ref": "./vendor.yaml"},
                "properties": {"example": {"$ref": "common.yaml#/Name"}}
            }}}
        });
        let expected = root.clone();

        let fetcher = Fetcher::new(LoadSettings::default());
        let warnings = RefResolver::new(&fetcher).resolve(&mut root, &base);

        // only the property named `example` is a real reference
        assert_eq!(warnings.len(), 1, "{:?}", warnings);
        assert!(warnings[0].contains("common.yaml"));
        assert_eq!(root, expected);
    }

    #[test]
    fn test_missing_document_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let base = Location::File(dir.path().join("api.yaml"));
        let mut root = json!({"schema": {"$ref": "missing.yaml#/X"}});

        let fetcher = Fetcher::new(LoadSettings::default());
        let warnings = RefResolver::new(&fetcher).resolve(&mut root, &base);
        assert_eq!(warnings.len(), 1);
        assert_eq!(root["schema"]["$ref"], "missing.yaml#/X");
    }
}
