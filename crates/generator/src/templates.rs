//! Template loading and management

use specmill_common::{GeneratorError, Result};
use std::collections::HashMap;
use tera::{Tera, Value};

/// Load all templates
pub fn load_templates() -> Result<Tera> {
    let mut tera = Tera::default();

    tera.register_filter("md_cell", md_cell_filter);

    tera.add_raw_template("README.md", include_str!("../templates/README.md.tera"))
        .map_err(|e| GeneratorError::Template(format!("Failed to load README.md template: {}", e)))?;

    Ok(tera)
}

/// Filter to make a string safe inside a markdown table cell
fn md_cell_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("md_cell filter expects a string"))?;

    let cell = s
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('|', "\\|");

    Ok(Value::String(cell))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_load() {
        let tera = load_templates().unwrap();
        assert!(tera.get_template_names().any(|name| name == "README.md"));
    }

    #[test]
    fn test_md_cell_filter() {
        let out = md_cell_filter(&Value::String("a | b\n  c".to_string()), &HashMap::new()).unwrap();
        assert_eq!(out, Value::String("a \\| b c".to_string()));

        assert!(md_cell_filter(&Value::Bool(true), &HashMap::new()).is_err());
    }
}
