//! Artifact emission from a finished service model
//!
//! Emitters receive a read-only [`ServiceModel`] plus [`EmitOptions`] and
//! report the files they plan to write. Language-specific emitters live
//! outside this crate; [`ModelEmitter`] is the reference implementation and
//! writes the model itself:
//! - model.json (pretty-printed service model)
//! - README.md (endpoint and schema overview)

mod naming;
mod templates;
mod writer;

pub use naming::{derive_tool_name, resolve_names, sanitize_tool_name, FALLBACK_TOOL_NAME};
pub use writer::{validate_output_dir, write_files};

use serde::Serialize;
use specmill_common::{GeneratorError, Result, ServiceModel};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tera::Tera;
use tracing::debug;

/// Options shared by every emitter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmitOptions {
    /// Target directory; required
    pub out_dir: PathBuf,

    /// Overrides the name derived from the service title
    pub tool_name: Option<String>,

    /// Defaults to the tool name
    pub package_name: Option<String>,

    /// Write into a non-empty directory
    pub force: bool,

    /// Plan only; nothing is written
    pub dry_run: bool,
}

impl EmitOptions {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_tool_name(mut self, name: impl Into<String>) -> Self {
        self.tool_name = Some(name.into());
        self
    }

    pub fn with_package_name(mut self, name: impl Into<String>) -> Self {
        self.package_name = Some(name.into());
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// A file an emitter intends to write
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedFile {
    /// Slash-separated path relative to the output directory
    pub rel_path: String,
    pub size: usize,
}

/// Outcome of an emit call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmitResult {
    pub tool_name: String,
    pub package_name: String,

    /// Sorted by `rel_path`
    pub planned: Vec<PlannedFile>,
}

/// Renders a service model into files
#[cfg_attr(test, mockall::automock)]
pub trait Emitter {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    fn emit(&self, model: &ServiceModel, options: &EmitOptions) -> Result<EmitResult>;
}

/// Validate options, resolve names, and run `emitter`
pub fn emit_with(
    emitter: &dyn Emitter,
    model: &ServiceModel,
    options: &EmitOptions,
) -> Result<EmitResult> {
    if options.out_dir.as_os_str().is_empty() {
        return Err(GeneratorError::Generation(
            "Output directory is required".to_string(),
        ));
    }

    let (tool_name, package_name) = resolve_names(&model.title, options);
    debug!(
        emitter = emitter.name(),
        tool_name = %tool_name,
        package_name = %package_name,
        dry_run = options.dry_run,
        "emitting"
    );

    let resolved = EmitOptions {
        tool_name: Some(tool_name),
        package_name: Some(package_name),
        ..options.clone()
    };
    emitter.emit(model, &resolved)
}

/// Writes `model.json` and a rendered `README.md`
pub struct ModelEmitter {
    tera: Tera,
}

#[derive(Serialize)]
struct EndpointRow<'a> {
    method: &'a str,
    path: &'a str,
    summary: &'a str,
    tags: &'a [String],
    deprecated: bool,
}

#[derive(Serialize)]
struct SchemaRow<'a> {
    name: &'a str,
    kind: &'a str,
    properties: usize,
}

impl ModelEmitter {
    pub fn new() -> Result<Self> {
        let tera = templates::load_templates()?;
        Ok(Self { tera })
    }

    /// Relative path -> contents, in the order they will be planned
    fn render(
        &self,
        model: &ServiceModel,
        tool_name: &str,
        package_name: &str,
    ) -> Result<BTreeMap<String, Vec<u8>>> {
        let mut files = BTreeMap::new();

        let mut json = serde_json::to_vec_pretty(model)?;
        json.push(b'\n');
        files.insert("model.json".to_string(), json);

        let readme = self
            .tera
            .render("README.md", &self.create_context(model, tool_name, package_name))
            .map_err(|e| GeneratorError::Template(format!("Failed to render README.md: {:?}", e)))?;
        files.insert("README.md".to_string(), readme.into_bytes());

        Ok(files)
    }

    /// Create template context from the service model
    fn create_context(
        &self,
        model: &ServiceModel,
        tool_name: &str,
        package_name: &str,
    ) -> tera::Context {
        let endpoints: Vec<EndpointRow> = model
            .endpoints
            .iter()
            .map(|ep| EndpointRow {
                method: ep.method.as_str(),
                path: &ep.path,
                summary: &ep.summary,
                tags: &ep.tags,
                deprecated: ep.deprecated,
            })
            .collect();
        let schemas: Vec<SchemaRow> = model
            .schemas
            .iter()
            .map(|(name, schema)| SchemaRow {
                name,
                kind: &schema.schema_type,
                properties: schema.properties.len(),
            })
            .collect();

        let mut context = tera::Context::new();
        context.insert("title", &model.title);
        context.insert("version", &model.version);
        context.insert("description", &model.description);
        context.insert("servers", &model.servers);
        context.insert("tags", &model.tags);
        context.insert("endpoints", &endpoints);
        context.insert("schemas", &schemas);
        context.insert("tool_name", tool_name);
        context.insert("package_name", package_name);
        context
    }
}

impl Emitter for ModelEmitter {
    fn name(&self) -> &'static str {
        "model"
    }

    fn emit(&self, model: &ServiceModel, options: &EmitOptions) -> Result<EmitResult> {
        let (tool_name, package_name) = resolve_names(&model.title, options);
        let files = self.render(model, &tool_name, &package_name)?;

        if options.dry_run {
            validate_output_dir(&options.out_dir, options.force)?;
        } else {
            write_files(&options.out_dir, &files, options.force)?;
        }

        let planned = files
            .iter()
            .map(|(rel_path, contents)| PlannedFile {
                rel_path: rel_path.clone(),
                size: contents.len(),
            })
            .collect();

        Ok(EmitResult {
            tool_name,
            package_name,
            planned,
        })
    }
}

/// Emit the service model with [`ModelEmitter`] (convenience function)
pub fn emit_model(model: &ServiceModel, options: &EmitOptions) -> Result<EmitResult> {
    let emitter = ModelEmitter::new()?;
    emit_with(&emitter, model, options)
}
