//! Module validation framework
//!
//! Provides manifest structure checks and dependency syntax validation.

pub mod manifest_validator;

pub use manifest_validator::{ManifestValidator, ValidationResult, MAX_MANIFEST_SIZE};
