//! Swagger 2.0 support
//!
//! Swagger documents go through three steps before they reach the builder:
//!
//! 1. [`preprocess`] repairs operations that break the v2 model
//! 2. [`convert`] rewrites the tree into OpenAPI 3.0 shape
//! 3. [`enrichment`] keeps the original definitions for schema recovery

pub mod convert;
pub mod enrichment;
pub mod preprocess;

pub use convert::{convert_v2_to_v3, ConversionFailure};
pub use enrichment::V2Enrichment;
pub use preprocess::{preprocess_tree, preprocess_v2};
