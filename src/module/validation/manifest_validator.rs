//! Manifest validation framework
//!
//! Validates module manifests for structure and dependency syntax before
//! they become module definitions.

use std::collections::BTreeMap;
use tracing::debug;

use crate::module::registry::definition::{ModuleVersion, VersionConstraint};
use crate::module::registry::manifest::ModuleManifest;

/// Maximum manifest size (bytes)
pub const MAX_MANIFEST_SIZE: u64 = 64 * 1024;

/// Maximum module name length
const MAX_NAME_LEN: usize = 64;

/// Validation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Manifest is valid
    Valid,
    /// Manifest is invalid with specific errors
    Invalid(Vec<String>),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }
}

/// Manifest validator
#[derive(Debug, Clone, Default)]
pub struct ManifestValidator;

impl ManifestValidator {
    /// Create a new manifest validator
    pub fn new() -> Self {
        Self
    }

    /// Validate a module manifest
    pub fn validate(&self, manifest: &ModuleManifest) -> ValidationResult {
        let mut errors = Vec::new();

        if manifest.name.is_empty() {
            errors.push("Module name cannot be empty".to_string());
        } else if !self.is_valid_name(&manifest.name) {
            errors.push(format!(
                "Invalid module name: {} (must be alphanumeric with dashes/underscores)",
                manifest.name
            ));
        }

        if manifest.version.trim().is_empty() {
            errors.push("Module version cannot be empty".to_string());
        } else if ModuleVersion::parse(&manifest.version).is_err() {
            errors.push(format!(
                "Invalid version format: {} (expected semantic versioning)",
                manifest.version
            ));
        }

        if manifest.entry_point.trim().is_empty() {
            errors.push("Entry point cannot be empty".to_string());
        }

        if let Err(dep_errors) = self.validate_dependencies(&manifest.name, &manifest.dependencies)
        {
            errors.extend(dep_errors);
        }

        if errors.is_empty() {
            debug!(module = %manifest.name, "Manifest validation passed");
            ValidationResult::Valid
        } else {
            ValidationResult::Invalid(errors)
        }
    }

    /// Validate module name format
    #[inline]
    fn is_valid_name(&self, name: &str) -> bool {
        if name.is_empty() || name.len() > MAX_NAME_LEN {
            return false;
        }

        // Must start with alphanumeric
        if !name.chars().next().is_some_and(|c| c.is_alphanumeric()) {
            return false;
        }

        name.chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    }

    /// Validate dependencies
    fn validate_dependencies(
        &self,
        module_name: &str,
        dependencies: &BTreeMap<String, String>,
    ) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (dep_name, constraint) in dependencies {
            if !self.is_valid_name(dep_name) {
                errors.push(format!("Invalid dependency name: {}", dep_name));
            }
            if dep_name == module_name {
                errors.push(format!("Module {} cannot depend on itself", module_name));
            }

            if constraint.trim().is_empty() {
                errors.push(format!(
                    "Empty version constraint for dependency: {}",
                    dep_name
                ));
            } else if VersionConstraint::parse(constraint).is_err() {
                errors.push(format!(
                    "Invalid dependency version format: {} (for dependency: {})",
                    constraint, dep_name
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
