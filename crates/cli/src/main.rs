//! Specmill CLI
//!
//! Command-line interface for inspecting OpenAPI and Swagger documents and
//! emitting their service model.

use anyhow::{Context, Result};
use clap::error::ErrorKind as ClapErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand};
use colored::*;
use specmill_common::{GeneratorError, HttpMethod, ServiceModel, SpecError};
use specmill_generator::{emit_with, EmitOptions, ModelEmitter};
use specmill_parser::{BuildOptions, LoadSettings, LoadedSpec, SpecLoader};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "specmill")]
#[command(version, about = "Reduce OpenAPI and Swagger documents to a service model", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a document and display the extracted service model
    #[command(after_help = "EXAMPLES:\n  \
        # Summarize a local OpenAPI 3 document\n  \
        specmill inspect --input petstore.yaml\n\n  \
        # Print the model of a remote Swagger 2.0 document as JSON\n  \
        specmill inspect --input https://petstore.swagger.io/v2/swagger.json --json\n\n  \
        # Only GET endpoints tagged 'pets'\n  \
        specmill inspect --input petstore.yaml --include-tags pets --methods get")]
    Inspect {
        #[command(flatten)]
        source: SourceArgs,

        /// Print the service model as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the service model and a README to an output directory
    #[command(after_help = "EXAMPLES:\n  \
        # Generate into ./output\n  \
        specmill generate --input petstore.yaml\n\n  \
        # Preview the files without writing anything\n  \
        specmill generate \\\n    \
        --input https://petstore.swagger.io/v2/swagger.json \\\n    \
        --out ./petstore \\\n    \
        --dry-run\n\n  \
        # Overwrite an existing directory with explicit names\n  \
        specmill generate \\\n    \
        --input petstore.yaml \\\n    \
        --out ./petstore \\\n    \
        --tool-name petstore \\\n    \
        --package-name petstore_client \\\n    \
        --force")]
    Generate {
        #[command(flatten)]
        source: SourceArgs,

        /// Output directory
        #[arg(short, long, default_value = "./output")]
        out: PathBuf,

        /// Tool name (derived from the API title if not specified)
        #[arg(long)]
        tool_name: Option<String>,

        /// Package name (defaults to the tool name)
        #[arg(long)]
        package_name: Option<String>,

        /// Write into a non-empty output directory
        #[arg(long)]
        force: bool,

        /// List the planned files without writing them
        #[arg(long)]
        dry_run: bool,
    },
}

/// Input, loading, and filter flags shared by every command
#[derive(Args, Debug)]
struct SourceArgs {
    /// Path or http(s) URL of the OpenAPI 3 or Swagger 2.0 document
    #[arg(short, long)]
    input: String,

    /// Keep only endpoints carrying one of these tags
    #[arg(long, value_delimiter = ',')]
    include_tags: Vec<String>,

    /// Drop endpoints carrying any of these tags
    #[arg(long, value_delimiter = ',')]
    exclude_tags: Vec<String>,

    /// Keep only these HTTP methods
    #[arg(long, value_delimiter = ',')]
    methods: Vec<HttpMethod>,

    /// Keep only paths matching one of these regular expressions
    #[arg(long = "paths", value_delimiter = ',')]
    path_patterns: Vec<String>,

    /// HTTP timeout per attempt, in seconds
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: u64,

    /// Retries after the first failed HTTP attempt
    #[arg(long, default_value_t = 3)]
    max_retries: u32,

    /// Resolve references into other files or URLs
    #[arg(long)]
    allow_external_refs: bool,
}

impl SourceArgs {
    fn load_settings(&self) -> LoadSettings {
        LoadSettings::default()
            .with_http_timeout(Duration::from_secs(self.timeout_secs))
            .with_max_retries(self.max_retries)
            .with_allow_external_refs(self.allow_external_refs)
    }

    /// Filter options; a tag both included and excluded is rejected
    fn build_options(&self) -> std::result::Result<BuildOptions, String> {
        let include: BTreeSet<&str> = self.include_tags.iter().map(|t| t.trim()).collect();
        let overlap: Vec<&str> = self
            .exclude_tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty() && include.contains(t))
            .collect();
        if !overlap.is_empty() {
            return Err(format!(
                "tags cannot be both included and excluded: {}",
                overlap.join(", ")
            ));
        }

        Ok(BuildOptions::new()
            .with_include_tags(&self.include_tags)
            .with_exclude_tags(&self.exclude_tags)
            .with_methods(self.methods.iter().copied())
            .with_path_patterns(&self.path_patterns))
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match &cli.command {
        Commands::Inspect { source, json } => {
            let options = usage_checked(source);
            inspect_command(source, &options, *json, cli.verbose)
        }
        Commands::Generate {
            source,
            out,
            tool_name,
            package_name,
            force,
            dry_run,
        } => {
            let options = usage_checked(source);
            let mut emit = EmitOptions::new(out)
                .with_force(*force)
                .with_dry_run(*dry_run);
            if let Some(name) = tool_name {
                emit = emit.with_tool_name(name);
            }
            if let Some(name) = package_name {
                emit = emit.with_package_name(name);
            }
            generate_command(source, &options, &emit, cli.verbose)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "specmill_parser=debug,specmill_generator=debug,warn"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Build options, or exit with a usage error
fn usage_checked(source: &SourceArgs) -> BuildOptions {
    match source.build_options() {
        Ok(options) => options,
        Err(message) => Cli::command()
            .error(ClapErrorKind::ArgumentConflict, message)
            .exit(),
    }
}

/// Load and validate the source document. `quiet` drops the progress lines
/// so stdout carries nothing but the command's own output; warnings always
/// go to stderr.
fn load(source: &SourceArgs, quiet: bool) -> Result<LoadedSpec> {
    if !quiet {
        println!("{} Loading document: {}", "→".cyan(), source.input);
    }

    let loaded = SpecLoader::new(source.load_settings())
        .load(&source.input)
        .context("Failed to load document")?;

    if !quiet {
        println!(
            "{} Loaded {} ({})",
            "✓".green(),
            loaded.location,
            loaded.source_version.to_string().yellow()
        );
    }
    for warning in &loaded.warnings {
        eprintln!("{} {}", "⚠".yellow(), warning);
    }

    Ok(loaded)
}

fn inspect_command(
    source: &SourceArgs,
    options: &BuildOptions,
    json: bool,
    verbose: bool,
) -> Result<()> {
    let loaded = load(source, json)?;
    let model = loaded.build(options).context("Failed to build service model")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&model)?);
        return Ok(());
    }

    println!("\n{}", "✓ Inspection successful!".green().bold());
    print_summary(&model, verbose);

    Ok(())
}

fn print_summary(model: &ServiceModel, verbose: bool) {
    println!("\n{}", "Service Model:".bold());
    println!("  Title: {}", model.title.yellow());
    println!("  Version: {}", model.version.yellow());
    if let Some(server) = model.servers.first() {
        println!("  Server: {}", server.url);
    }
    if !model.tags.is_empty() {
        println!("  Tags: {}", model.tags.join(", "));
    }
    println!("  Endpoints: {}", model.endpoints.len());
    println!("  Schemas: {}", model.schemas.len());

    if verbose {
        println!("\n{}", "Endpoints:".bold());
        for ep in &model.endpoints {
            let mut line = format!(
                "  • {} {}",
                ep.method.as_str().to_uppercase().cyan(),
                ep.path
            );
            if ep.deprecated {
                line.push_str(&format!(" {}", "(deprecated)".dimmed()));
            }
            println!("{}", line);
            println!(
                "    Parameters: {}, Responses: {}",
                ep.parameters.len(),
                ep.responses.len()
            );
        }
    }
}

fn generate_command(
    source: &SourceArgs,
    options: &BuildOptions,
    emit: &EmitOptions,
    verbose: bool,
) -> Result<()> {
    let loaded = load(source, false)?;

    println!("{} Building service model...", "→".cyan());
    let model = loaded.build(options).context("Failed to build service model")?;
    println!(
        "{} Built {} endpoints and {} schemas",
        "✓".green(),
        model.endpoints.len(),
        model.schemas.len()
    );

    if verbose {
        println!("  Output: {}", emit.out_dir.display());
        println!("  Force: {}", emit.force);
        println!("  Dry run: {}", emit.dry_run);
    }

    println!("{} Generating files...", "→".cyan());
    let emitter = ModelEmitter::new().context("Failed to create emitter")?;
    let result = emit_with(&emitter, &model, emit).context("Failed to generate files")?;

    if emit.dry_run {
        println!("\n{}", "✓ Dry run complete, nothing written".green().bold());
        println!("\n{}", "Planned files:".bold());
    } else {
        println!("\n{}", "✓ Generation complete!".green().bold());
        println!("\n{}", "Generated files:".bold());
    }
    for file in &result.planned {
        println!(
            "  📄 {}/{} ({} bytes)",
            emit.out_dir.display(),
            file.rel_path,
            file.size
        );
    }
    println!("\n  Tool: {}", result.tool_name.yellow());
    println!("  Package: {}", result.package_name.yellow());

    Ok(())
}

/// Find the structured pipeline error behind an anyhow chain
fn find_spec_error(err: &anyhow::Error) -> Option<&SpecError> {
    err.chain().find_map(|cause| {
        cause.downcast_ref::<SpecError>().or_else(|| {
            match cause.downcast_ref::<GeneratorError>() {
                Some(GeneratorError::Spec(spec)) => Some(spec),
                _ => None,
            }
        })
    })
}

fn report_error(err: &anyhow::Error) {
    eprintln!("{} {}", "✗".red().bold(), err);

    match find_spec_error(err) {
        Some(spec) => {
            eprintln!("  Kind: {}", spec.kind.as_str().red());
            eprintln!("  Message: {}", spec.message);
            if let Some(location) = &spec.location {
                eprintln!("  Location: {}", location);
            }
            if let Some(pointer) = &spec.pointer {
                eprintln!("  Pointer: {}", pointer);
            }
            if let Some(cause) = &spec.source {
                eprintln!("  Caused by: {}", cause);
            }
        }
        None => {
            for cause in err.chain().skip(1) {
                eprintln!("  Caused by: {}", cause);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use specmill_common::ErrorKind;
    use specmill_parser::SpecVersion;

    fn source(args: &[&str]) -> SourceArgs {
        let mut argv = vec!["specmill", "inspect"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Inspect { source, .. } => source,
            Commands::Generate { .. } => unreachable!(),
        }
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_inspect_defaults() {
        let source = source(&["--input", "petstore.yaml"]);
        assert_eq!(source.input, "petstore.yaml");
        assert_eq!(source.timeout_secs, 10);
        assert_eq!(source.max_retries, 3);
        assert!(!source.allow_external_refs);
        assert_eq!(source.load_settings(), LoadSettings::default());
    }

    #[test]
    fn test_parse_comma_separated_filters() {
        let source = source(&[
            "-i",
            "petstore.yaml",
            "--include-tags",
            "pets,store",
            "--methods",
            "get,POST",
            "--paths",
            "^/pets",
        ]);
        assert_eq!(source.include_tags, vec!["pets", "store"]);
        assert_eq!(source.methods, vec![HttpMethod::Get, HttpMethod::Post]);
        assert_eq!(source.path_patterns, vec!["^/pets"]);
        assert!(source.build_options().is_ok());
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        let result = Cli::try_parse_from(["specmill", "inspect", "-i", "a.yaml", "--methods", "fetch"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let result =
            Cli::try_parse_from(["specmill", "inspect", "-i", "a.yaml", "--timeout-secs", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_overlapping_tags_are_a_usage_error() {
        let source = source(&[
            "-i",
            "a.yaml",
            "--include-tags",
            "pets,store",
            "--exclude-tags",
            " store ",
        ]);
        let err = source.build_options().unwrap_err();
        assert!(err.contains("store"));
    }

    #[test]
    fn test_parse_generate() {
        let cli = Cli::try_parse_from([
            "specmill",
            "generate",
            "--input",
            "a.yaml",
            "--out",
            "pets",
            "--tool-name",
            "pets",
            "--dry-run",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Generate {
                out,
                tool_name,
                package_name,
                force,
                dry_run,
                ..
            } => {
                assert_eq!(out, PathBuf::from("pets"));
                assert_eq!(tool_name.as_deref(), Some("pets"));
                assert!(package_name.is_none());
                assert!(!force);
                assert!(dry_run);
            }
            Commands::Inspect { .. } => unreachable!(),
        }
    }

    #[test]
    fn test_find_spec_error_through_context() {
        let err = anyhow::Error::new(
            SpecError::validation("Invalid document: missing info").with_pointer("#/info"),
        )
        .context("Failed to load document");
        let spec = find_spec_error(&err).unwrap();
        assert_eq!(spec.kind, ErrorKind::ValidationError);
        assert_eq!(spec.pointer.as_deref(), Some("#/info"));

        let err = anyhow::Error::new(GeneratorError::Spec(SpecError::input("empty")))
            .context("Failed to generate files");
        assert_eq!(find_spec_error(&err).unwrap().kind, ErrorKind::InputError);

        assert!(find_spec_error(&anyhow::anyhow!("plain")).is_none());
    }

    #[test]
    fn test_quiet_load_reads_the_same_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pets.yaml");
        std::fs::write(
            &path,
            "swagger: '2.0'\ninfo: {title: Pets, version: '1'}\npaths:\n  /pets:\n    get:\n      responses:\n        '200': {description: ok}\n",
        )
        .unwrap();
        let input = path.to_string_lossy().into_owned();
        let args = source(&["--input", &input]);

        let quiet = load(&args, true).unwrap();
        let loud = load(&args, false).unwrap();
        assert_eq!(quiet.source_version, SpecVersion::V2);
        assert_eq!(quiet.document, loud.document);

        let missing = source(&["--input", "does-not-exist.yaml"]);
        let err = load(&missing, true).unwrap_err();
        assert_eq!(find_spec_error(&err).unwrap().kind, ErrorKind::InputError);
    }
}
