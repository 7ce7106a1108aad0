//! Common types and utilities for specmill
//!
//! This crate contains the service model handed to emitters and the error
//! types shared by the parser, generator, and CLI components.

mod model;

pub use model::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Boxed underlying cause carried by [`SpecError`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Category of a pipeline failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Bad scheme, unreadable file, or empty input
    InputError,
    /// All fetch attempts exhausted or a non-retryable HTTP status
    NetworkError,
    /// Neither a v3 nor a v2 document, or broken syntax
    ParseError,
    /// Semantically invalid per OpenAPI rules
    ValidationError,
    /// The v2 to v3 transformation failed
    ConversionError,
}

impl ErrorKind {
    /// Stable name used in user-facing output
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InputError => "InputError",
            ErrorKind::NetworkError => "NetworkError",
            ErrorKind::ParseError => "ParseError",
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::ConversionError => "ConversionError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error raised while loading a document or building its model
///
/// Carries the failure category, the input location (path or URL), and a
/// JSON Pointer (`#/paths/~1pets/get`) when the offending node is known.
#[derive(Error, Debug)]
#[error("{kind}: {message}")]
pub struct SpecError {
    /// Failure category
    pub kind: ErrorKind,

    /// Human-readable message
    pub message: String,

    /// File path or URL of the input
    pub location: Option<String>,

    /// JSON Pointer to the offending node
    pub pointer: Option<String>,

    /// Underlying cause
    #[source]
    pub source: Option<BoxError>,
}

impl SpecError {
    /// Create an error of the given kind
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: None,
            pointer: None,
            source: None,
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InputError, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NetworkError, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseError, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationError, message)
    }

    pub fn conversion(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConversionError, message)
    }

    /// Attach the input location
    pub fn with_location(mut self, location: impl fmt::Display) -> Self {
        self.location = Some(location.to_string());
        self
    }

    /// Attach a JSON Pointer; empty pointers are ignored
    pub fn with_pointer(mut self, pointer: impl Into<String>) -> Self {
        let pointer = pointer.into();
        if !pointer.is_empty() {
            self.pointer = Some(pointer);
        }
        self
    }

    /// Attach the underlying cause
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// Errors that can occur while emitting artifacts from a service model
#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for emitter operations
pub type Result<T> = std::result::Result<T, GeneratorError>;
