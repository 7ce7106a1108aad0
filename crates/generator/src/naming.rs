//! Tool and package name resolution

use crate::EmitOptions;

/// Used when neither an override nor the service title yields a name
pub const FALLBACK_TOOL_NAME: &str = "mcp-tool";

/// Lowercase, spaces and slashes to dashes, keep `[a-z0-9_-]`, trim dashes
pub fn sanitize_tool_name(name: &str) -> String {
    let lowered = name.trim().replace([' ', '/'], "-").to_lowercase();
    lowered
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || *c == '_')
        .collect::<String>()
        .trim_matches('-')
        .to_string()
}

/// Kebab-case name from a service title (`"Pet Store API"` -> `"pet-store-api"`)
pub fn derive_tool_name(title: &str) -> String {
    title
        .trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || matches!(c, '/' | '_' | '.' | ',' | ':'))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Final `(tool_name, package_name)` for a model and options
///
/// The tool name comes from the override, then the title, then
/// [`FALLBACK_TOOL_NAME`]. The package name defaults to the tool name.
pub fn resolve_names(title: &str, options: &EmitOptions) -> (String, String) {
    let mut tool_name = options
        .tool_name
        .as_deref()
        .map(sanitize_tool_name)
        .unwrap_or_default();
    if tool_name.is_empty() {
        tool_name = sanitize_tool_name(&derive_tool_name(title));
    }
    if tool_name.is_empty() {
        tool_name = FALLBACK_TOOL_NAME.to_string();
    }

    let package_name = options
        .package_name
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| tool_name.clone());

    (tool_name, package_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_tool_name() {
        let cases = [
            ("Test Tool", "test-tool"),
            ("test/tool", "test-tool"),
            ("TEST_TOOL", "test_tool"),
            ("  Test-Tool  ", "test-tool"),
            ("", ""),
            ("test123", "test123"),
            ("test@#$%tool", "testtool"),
        ];
        for (input, expected) in cases {
            assert_eq!(sanitize_tool_name(input), expected, "input {:?}", input);
        }
    }

    #[test]
    fn test_derive_tool_name() {
        let cases = [
            ("Pet Store API", "pet-store-api"),
            ("User Management", "user-management"),
            ("", ""),
            ("API/v1", "api-v1"),
            ("Test_API.v2", "test-api-v2"),
        ];
        for (input, expected) in cases {
            assert_eq!(derive_tool_name(input), expected, "input {:?}", input);
        }
    }

    #[test]
    fn test_resolve_names() {
        let options = EmitOptions::new("out");
        assert_eq!(
            resolve_names("Pet Store API", &options),
            ("pet-store-api".to_string(), "pet-store-api".to_string())
        );
        assert_eq!(resolve_names("  ", &options).0, FALLBACK_TOOL_NAME);
        assert_eq!(resolve_names("@@@", &options).0, FALLBACK_TOOL_NAME);

        let options = EmitOptions::new("out")
            .with_tool_name("My Tool")
            .with_package_name(" my_pkg ");
        assert_eq!(
            resolve_names("ignored", &options),
            ("my-tool".to_string(), "my_pkg".to_string())
        );
    }
}
