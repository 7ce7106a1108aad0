//! Load pipeline: fetch, detect, convert, resolve, validate
//!
//! ```text
//! input -> classify -> fetch -> parse/detect -+-> v3 ----------------------------+
//!                                             +-> v2 -> preprocess -> convert ---+-> resolve refs -> validate -> typed
//! ```
//!
//! Every error leaving this module is a [`SpecError`] carrying the input
//! location. Unresolved references are the only validation issues that do
//! not abort the load; they are logged and kept as warnings.

use crate::builder::{build_service_model, BuildOptions};
use crate::detect::{detect_version, normalize_markers, parse_tree, SpecVersion};
use crate::fetch::{classify_input, Fetcher, HttpTransport, Location};
use crate::openapi::resolve::RefResolver;
use crate::openapi::types::OpenApiSpec;
use crate::openapi::validate::{validate, ValidationIssue};
use crate::swagger::{convert_v2_to_v3, preprocess_tree, V2Enrichment};
use serde_json::Value;
use specmill_common::{ServiceModel, SpecError};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Knobs for fetching and reference resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSettings {
    /// Per-request timeout for URL inputs
    pub http_timeout: Duration,

    /// Retries after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry; doubles each time
    pub backoff_base: Duration,

    /// Follow http(s) refs and relative refs of URL-sourced documents
    pub allow_external_refs: bool,
}

impl Default for LoadSettings {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(10),
            max_retries: 3,
            backoff_base: Duration::from_millis(200),
            allow_external_refs: false,
        }
    }
}

impl LoadSettings {
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    pub fn with_allow_external_refs(mut self, allow: bool) -> Self {
        self.allow_external_refs = allow;
        self
    }
}

/// A validated v3 document plus what the builder needs alongside it
#[derive(Debug, Clone)]
pub struct LoadedSpec {
    pub document: OpenApiSpec,
    pub location: Location,

    /// Version of the input before any conversion
    pub source_version: SpecVersion,

    /// Original v2 definitions and operations, for v2 inputs with definitions
    pub enrichment: Option<V2Enrichment>,

    /// Unresolved references and skipped external refs
    pub warnings: Vec<String>,
}

impl LoadedSpec {
    /// Reduce the document to a service model
    pub fn build(&self, options: &BuildOptions) -> Result<ServiceModel, SpecError> {
        build_service_model(&self.document, self.enrichment.as_ref(), options)
            .map_err(|e| e.with_location(&self.location))
    }
}

pub struct SpecLoader {
    settings: LoadSettings,
    transport: Option<Arc<dyn HttpTransport>>,
    cancel: CancellationToken,
}

impl SpecLoader {
    pub fn new(settings: LoadSettings) -> Self {
        Self {
            settings,
            transport: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Abort pending HTTP attempts once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn settings(&self) -> &LoadSettings {
        &self.settings
    }

    /// Run the whole pipeline on a path or http(s) URL
    pub fn load(&self, input: &str) -> Result<LoadedSpec, SpecError> {
        let location = classify_input(input)?;
        let fetcher = self.fetcher();

        let mut raw = fetcher.fetch(&location)?;
        let mut tree = parse_tree(&raw.bytes).map_err(|e| e.with_location(&location))?;
        let version = detect_version(&tree).map_err(|e| e.with_location(&location))?;
        normalize_markers(&mut tree);
        raw.version = Some(version);
        debug!(location = %location, version = %version, bytes = raw.bytes.len(), "detected document version");

        let (mut tree, enrichment) = match version {
            SpecVersion::V3 => (tree, None),
            SpecVersion::V2 => convert_v2(tree, &location)?,
        };

        let mut warnings = RefResolver::new(&fetcher).resolve(&mut tree, &location);

        let (recoverable, fatal): (Vec<ValidationIssue>, Vec<ValidationIssue>) =
            validate(&tree).into_iter().partition(ValidationIssue::is_recoverable);
        if let Some(issue) = fatal.into_iter().next() {
            return Err(SpecError::validation(format!("Invalid document: {}", issue.message))
                .with_location(&location)
                .with_pointer(issue.pointer));
        }
        for issue in recoverable {
            warn!(location = %location, pointer = %issue.pointer, "{}; continuing", issue.message);
            warnings.push(issue.to_string());
        }

        let document: OpenApiSpec = serde_json::from_value(tree).map_err(|e| {
            SpecError::parse(format!("Failed to read OpenAPI document: {}", e))
                .with_location(&location)
                .with_source(e)
        })?;

        debug!(
            paths = document.paths.len(),
            warnings = warnings.len(),
            "document loaded"
        );

        Ok(LoadedSpec {
            document,
            location,
            source_version: version,
            enrichment,
            warnings,
        })
    }

    fn fetcher(&self) -> Fetcher {
        let fetcher = Fetcher::new(self.settings.clone()).with_cancellation(self.cancel.clone());
        match &self.transport {
            Some(transport) => fetcher.with_transport(Arc::clone(transport)),
            None => fetcher,
        }
    }
}

impl Default for SpecLoader {
    fn default() -> Self {
        Self::new(LoadSettings::default())
    }
}

/// Load with default settings
pub fn load(input: &str) -> Result<LoadedSpec, SpecError> {
    SpecLoader::default().load(input)
}

/// Repair, convert, and keep the original definitions of a v2 tree
fn convert_v2(
    mut tree: Value,
    location: &Location,
) -> Result<(Value, Option<V2Enrichment>), SpecError> {
    if preprocess_tree(&mut tree) {
        debug!(location = %location, "applied Swagger 2.0 compatibility rewrites");
    }

    let converted = convert_v2_to_v3(&tree).map_err(|e| {
        let pointer = e.pointer().to_string();
        SpecError::conversion(format!("Failed to convert Swagger 2.0 document: {}", e))
            .with_location(location)
            .with_pointer(pointer)
            .with_source(e)
    })?;

    let enrichment = V2Enrichment::from_v2_tree(&tree);
    debug!(
        definitions = enrichment.as_ref().map_or(0, |e| e.definition_names().count()),
        "converted Swagger 2.0 document"
    );
    Ok((converted, enrichment))
}
