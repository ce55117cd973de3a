//! Module manifest parsing
//!
//! Handles parsing `module.toml` descriptors and converting them into
//! validated module definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::module::registry::definition::{
    Dependency, EntryRef, ModuleDefinition, ModuleId, ModuleVersion,
};
use crate::module::traits::ModuleError;
use crate::module::validation::{ManifestValidator, ValidationResult, MAX_MANIFEST_SIZE};

/// Module manifest (module.toml structure)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleManifest {
    /// Module name
    pub name: String,
    /// Module version (semantic versioning, `major.minor[.patch]`)
    pub version: String,
    /// Human-readable description
    pub description: Option<String>,
    /// Module author
    pub author: Option<String>,
    /// Required dependencies (module name -> version constraint)
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    /// Entry reference used to look up the module's startup behavior
    pub entry_point: String,
}

impl ModuleManifest {
    /// Load manifest from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ModuleError> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|e| {
            ModuleError::InvalidManifest(format!("Failed to read manifest file: {}", e))
        })?;
        if metadata.len() > MAX_MANIFEST_SIZE {
            return Err(ModuleError::InvalidManifest(format!(
                "Manifest is {} bytes, limit is {} bytes",
                metadata.len(),
                MAX_MANIFEST_SIZE
            )));
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            ModuleError::InvalidManifest(format!("Failed to read manifest file: {}", e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse manifest from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, ModuleError> {
        toml::from_str(contents).map_err(|e| {
            ModuleError::InvalidManifest(format!("Failed to parse manifest TOML: {}", e))
        })
    }

    /// Validate and convert into a module definition rooted at `source_dir`
    pub fn into_definition(
        self,
        source_dir: impl Into<PathBuf>,
    ) -> Result<ModuleDefinition, ModuleError> {
        if let ValidationResult::Invalid(errors) = ManifestValidator::new().validate(&self) {
            return Err(ModuleError::InvalidManifest(errors.join("; ")));
        }

        let version = ModuleVersion::parse(&self.version).map_err(|e| {
            ModuleError::InvalidManifest(format!("Invalid version {}: {}", self.version, e))
        })?;

        let mut dependencies = Vec::with_capacity(self.dependencies.len());
        for (name, constraint) in &self.dependencies {
            let dependency = Dependency::parse(name, constraint).map_err(|e| {
                ModuleError::InvalidManifest(format!(
                    "Invalid version constraint {} for dependency {}: {}",
                    constraint, name, e
                ))
            })?;
            dependencies.push(dependency);
        }

        Ok(ModuleDefinition::new(
            ModuleId::new(self.name, version),
            EntryRef::new(self.entry_point),
            source_dir,
            dependencies,
        )
        .with_metadata(self.description, self.author))
    }
}
