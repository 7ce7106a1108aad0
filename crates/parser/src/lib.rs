//! OpenAPI v3 and Swagger v2 loading
//!
//! This crate turns a path or http(s) URL into a validated OpenAPI 3.x
//! document and reduces it to a [`ServiceModel`].
//!
//! ## Pipeline
//!
//! - [`fetch`]: classify the input and read bytes, retrying transient HTTP failures
//! - [`detect`]: permissive JSON/YAML parse and version classification
//! - [`swagger`]: v2 compatibility rewrites, v2 to v3 conversion, retained definitions
//! - [`openapi`]: external ref inlining, validation, typed document
//! - [`loader`]: runs the steps above and maps every failure into a [`SpecError`]
//! - [`builder`]: flattens the document into endpoints and schemas
//!
//! ## Usage
//! ```rust,ignore
//! use specmill_parser::{BuildOptions, SpecLoader, LoadSettings};
//!
//! let loaded = SpecLoader::new(LoadSettings::default()).load("petstore.yaml")?;
//! let model = loaded.build(&BuildOptions::new().with_include_tags(["pets"]))?;
//! ```

pub mod builder;
pub mod detect;
pub mod fetch;
pub mod loader;
pub mod openapi;
pub mod pointer;
pub mod swagger;

pub use builder::{build_service_model, BuildOptions, SchemaSource};
pub use detect::{detect_version, detect_version_bytes, parse_tree, SpecVersion};
pub use fetch::{classify_input, HttpTransport, Location, RawDocument};
pub use loader::{load, LoadSettings, LoadedSpec, SpecLoader};
pub use openapi::OpenApiSpec;
pub use swagger::{preprocess_v2, V2Enrichment};

pub use specmill_common::{ErrorKind, ServiceModel, SpecError};
