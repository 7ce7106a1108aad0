//! OpenAPI 3.x document handling
//!
//! - [`types`]: typed view of the document used by the builder
//! - [`resolve`]: inlines external `$ref`s under the source policy
//! - [`validate`]: structural checks with JSON Pointer locations
//!
//! ## Usage
//! ```rust,ignore
//! use specmill_parser::openapi::validate::validate;
//!
//! let issues = validate(&tree);
//! ```

pub mod resolve;
pub mod types;
pub mod validate;

pub use resolve::RefResolver;
pub use types::*;
pub use validate::{validate, IssueKind, ValidationIssue};

use serde_json::Value;

/// Maps whose keys are user-chosen names rather than keywords
const NAMED_MAPS: [&str; 13] = [
    "paths",
    "properties",
    "patternProperties",
    "schemas",
    "parameters",
    "responses",
    "requestBodies",
    "headers",
    "content",
    "securitySchemes",
    "links",
    "callbacks",
    "encoding",
];

/// How a walk looking for `$ref`s treats the value under a keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RefSlot {
    /// Payload data; any `$ref` inside is literal
    Literal,
    /// Named Example objects; only entries that are refs count
    Examples,
    /// Map keyed by user-chosen names
    Named,
    Node,
}

/// Classify keyword `key` of a non-named object
pub(crate) fn ref_slot(key: &str, child: &Value) -> RefSlot {
    match key {
        "example" | "default" | "enum" | "const" => RefSlot::Literal,
        "examples" => RefSlot::Examples,
        k if k.starts_with("x-") => RefSlot::Literal,
        k if NAMED_MAPS.contains(&k) && child.is_object() => RefSlot::Named,
        _ => RefSlot::Node,
    }
}
