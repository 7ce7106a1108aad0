//! Version detection over a permissive JSON/YAML parse
//!
//! Documents are first read into a generic [`serde_json::Value`] tree so the
//! version markers can be inspected before committing to a typed model.
//! JSON is tried first; anything else goes through `serde_yaml` and is then
//! converted into the same tree shape.

use serde_json::Value;
use specmill_common::SpecError;
use std::fmt;

/// Major version family of an input document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecVersion {
    /// Swagger 2.0
    V2,
    /// OpenAPI 3.x
    V3,
}

impl SpecVersion {
    pub fn major(&self) -> u8 {
        match self {
            SpecVersion::V2 => 2,
            SpecVersion::V3 => 3,
        }
    }
}

impl fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecVersion::V2 => f.write_str("swagger 2"),
            SpecVersion::V3 => f.write_str("openapi 3"),
        }
    }
}

/// Parse raw bytes into a generic tree, JSON first, YAML as fallback
///
/// The root must be a mapping.
pub fn parse_tree(bytes: &[u8]) -> Result<Value, SpecError> {
    let value = match serde_json::from_slice::<Value>(bytes) {
        Ok(value) => value,
        Err(_) => {
            let yaml: serde_yaml::Value = serde_yaml::from_slice(bytes).map_err(|e| {
                SpecError::parse(format!("Failed to parse document: {}", e)).with_source(e)
            })?;
            serde_json::to_value(yaml).map_err(|e| {
                SpecError::parse(format!("Failed to convert YAML document: {}", e))
                    .with_source(e)
            })?
        }
    };

    if !value.is_object() {
        return Err(SpecError::parse(
            "Document root must be a mapping of top-level keys",
        ));
    }

    Ok(value)
}

/// Classify a parsed tree by its `openapi` / `swagger` markers
pub fn detect_version(root: &Value) -> Result<SpecVersion, SpecError> {
    if marker(root, "openapi").is_some_and(|v| v.starts_with("3.")) {
        return Ok(SpecVersion::V3);
    }
    if marker(root, "swagger").is_some_and(|v| v.starts_with("2.")) {
        return Ok(SpecVersion::V2);
    }

    Err(SpecError::parse(
        "Missing or unknown version (expected 'openapi: 3.x' or 'swagger: 2.0')",
    ))
}

/// Rewrite unquoted numeric markers (`openapi: 3.0`) to their text form
pub fn normalize_markers(root: &mut Value) {
    for key in ["openapi", "swagger"] {
        if let Some(marker @ Value::Number(_)) = root.get_mut(key) {
            *marker = Value::String(marker.to_string());
        }
    }
}

/// Parse and classify in one step
pub fn detect_version_bytes(bytes: &[u8]) -> Result<SpecVersion, SpecError> {
    detect_version(&parse_tree(bytes)?)
}

/// Textual form of a version marker; unquoted YAML numbers count too
fn marker(root: &Value, key: &str) -> Option<String> {
    match root.get(key)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use specmill_common::ErrorKind;

    #[test]
    fn test_detects_v3_yaml() {
        let doc = b"openapi: 3.0.3\ninfo:\n  title: t\n  version: '1'\npaths: {}\n";
        assert_eq!(detect_version_bytes(doc).unwrap(), SpecVersion::V3);
    }

    #[test]
    fn test_detects_v2_json() {
        let doc = br#"{"swagger": "2.0", "info": {"title": "t", "version": "1"}, "paths": {}}"#;
        assert_eq!(detect_version_bytes(doc).unwrap(), SpecVersion::V2);
    }

    #[test]
    fn test_accepts_unquoted_numeric_marker() {
        let doc = b"swagger: 2.0\npaths: {}\n";
        assert_eq!(detect_version_bytes(doc).unwrap(), SpecVersion::V2);
    }

    #[test]
    fn test_normalizes_numeric_markers() {
        let mut tree = parse_tree(b"openapi: 3.0\ninfo: {title: t, version: 1}\n").unwrap();
        normalize_markers(&mut tree);
        assert_eq!(tree["openapi"], "3.0");
        assert_eq!(tree["info"]["version"], 1);

        let mut tree = parse_tree(b"swagger: '2.0'\n").unwrap();
        normalize_markers(&mut tree);
        assert_eq!(tree["swagger"], "2.0");
    }

    #[test]
    fn test_rejects_unknown_version() {
        let err = detect_version_bytes(b"openapi: 2.5\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseError);

        let err = detect_version_bytes(b"title: nothing here\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseError);
    }

    #[test]
    fn test_rejects_broken_syntax_and_scalar_roots() {
        let err = detect_version_bytes(b"openapi: [3.0\n  - broken").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseError);

        let err = parse_tree(b"just a string").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseError);
    }

    #[test]
    fn test_yaml_integer_keys_become_strings() {
        let tree = parse_tree(b"responses:\n  200:\n    description: ok\n").unwrap();
        assert!(tree["responses"]["200"].is_object());
    }
}
