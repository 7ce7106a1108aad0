//! JSON Pointer helpers for `#/...` fragments

use serde_json::Value;

/// Escape one pointer segment (`/` becomes `~1`, `~` becomes `~0`)
pub fn encode_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Decode one pointer segment
pub fn decode_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Fragment pointer built from raw segments: `["paths", "/pets"]` -> `#/paths/~1pets`
pub fn fragment<I, S>(segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::from("#");
    for segment in segments {
        out.push('/');
        out.push_str(&encode_segment(segment.as_ref()));
    }
    out
}

/// Append a raw segment to an existing fragment pointer
pub fn child(base: &str, segment: &str) -> String {
    format!("{}/{}", base, encode_segment(segment))
}

/// Resolve a local `#/...` reference against a document tree
pub fn resolve_local<'a>(root: &'a Value, reference: &str) -> Option<&'a Value> {
    let path = reference.strip_prefix('#')?;
    if path.is_empty() {
        return Some(root);
    }
    root.pointer(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fragment_escapes_segments() {
        assert_eq!(
            fragment(["paths", "/pets/{id}", "get"]),
            "#/paths/~1pets~1{id}/get"
        );
        assert_eq!(child("#/definitions", "a~b"), "#/definitions/a~0b");
        assert_eq!(decode_segment("~1pets~0x"), "/pets~x");
    }

    #[test]
    fn test_resolve_local() {
        let doc = json!({"components": {"schemas": {"Pet": {"type": "object"}}}});
        assert!(resolve_local(&doc, "#/components/schemas/Pet").is_some());
        assert!(resolve_local(&doc, "#/components/schemas/Dog").is_none());
        assert!(resolve_local(&doc, "other.yaml#/x").is_none());
        assert_eq!(resolve_local(&doc, "#"), Some(&doc));
    }
}
