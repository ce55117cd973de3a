//! Module discovery
//!
//! Scans a module root directory and parses every module descriptor found
//! in its immediate subdirectories.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::module::registry::definition::{ModuleDefinition, ModuleId};
use crate::module::registry::manifest::ModuleManifest;
use crate::module::traits::ModuleError;

/// Standard module descriptor file name
pub const MANIFEST_FILE_NAME: &str = "module.toml";

/// A module candidate that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseFailure {
    /// Module directory (or descriptor) the failure refers to
    pub location: PathBuf,
    /// Why the candidate was rejected
    pub reason: String,
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location.display(), self.reason)
    }
}

/// Result of scanning one or more module roots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Valid definitions, in traversal order
    pub definitions: Vec<ModuleDefinition>,
    /// Candidates that were skipped
    pub failures: Vec<ParseFailure>,
}

impl DiscoveryReport {
    /// Merge reports in order, rejecting identities already seen
    ///
    /// The first occurrence of an identity wins; later ones become parse
    /// failures.
    pub fn merge<I: IntoIterator<Item = DiscoveryReport>>(reports: I) -> DiscoveryReport {
        let mut merged = DiscoveryReport::default();
        let mut seen = HashMap::new();
        for report in reports {
            merged.failures.extend(report.failures);
            for definition in report.definitions {
                merged.insert_unique(definition, &mut seen);
            }
        }
        merged
    }

    fn insert_unique(
        &mut self,
        definition: ModuleDefinition,
        seen: &mut HashMap<ModuleId, PathBuf>,
    ) {
        if let Some(first) = seen.get(definition.id()) {
            warn!(
                module = %definition.id(),
                path = %definition.source_dir().display(),
                first = %first.display(),
                "Duplicate module identity"
            );
            self.failures.push(ParseFailure {
                location: definition.source_dir().to_path_buf(),
                reason: format!(
                    "duplicate module identity {} (already defined in {})",
                    definition.id(),
                    first.display()
                ),
            });
            return;
        }
        seen.insert(
            definition.id().clone(),
            definition.source_dir().to_path_buf(),
        );
        self.definitions.push(definition);
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty() && self.failures.is_empty()
    }
}

/// Module discovery scanner
#[derive(Debug, Clone)]
pub struct ModuleDiscovery {
    /// Base directory to scan for modules
    modules_dir: PathBuf,
    /// Descriptor file looked for in each module directory
    manifest_file_name: String,
}

impl ModuleDiscovery {
    /// Create a new module discovery scanner
    pub fn new<P: AsRef<Path>>(modules_dir: P) -> Self {
        Self {
            modules_dir: modules_dir.as_ref().to_path_buf(),
            manifest_file_name: MANIFEST_FILE_NAME.to_string(),
        }
    }

    /// Use a different descriptor file name
    pub fn with_manifest_file_name(mut self, name: impl Into<String>) -> Self {
        self.manifest_file_name = name.into();
        self
    }

    pub fn modules_dir(&self) -> &Path {
        &self.modules_dir
    }

    /// Discover all modules in the modules directory
    ///
    /// Fails only when the root itself cannot be read. Malformed candidates
    /// are recorded in the report and their siblings are still parsed.
    /// Candidates are visited in lexicographic path order.
    pub fn discover_modules(&self) -> Result<DiscoveryReport, ModuleError> {
        info!(path = %self.modules_dir.display(), "Discovering modules");

        if !self.modules_dir.is_dir() {
            return Err(ModuleError::Discovery {
                path: self.modules_dir.clone(),
                message: "not a readable directory".to_string(),
            });
        }

        let entries = fs::read_dir(&self.modules_dir).map_err(|e| ModuleError::Discovery {
            path: self.modules_dir.clone(),
            message: e.to_string(),
        })?;

        let mut candidates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ModuleError::Discovery {
                path: self.modules_dir.clone(),
                message: e.to_string(),
            })?;
            let path = entry.path();
            if path.is_dir() {
                candidates.push(path);
            }
        }
        candidates.sort();

        let mut report = DiscoveryReport::default();
        let mut seen = HashMap::new();
        for module_dir in candidates {
            let manifest_path = module_dir.join(&self.manifest_file_name);
            if descriptor_absent(&manifest_path) {
                debug!(path = %module_dir.display(), "No module descriptor found, skipping");
                continue;
            }

            match self.load_candidate(&module_dir, &manifest_path) {
                Ok(definition) => {
                    debug!(
                        module = %definition.id(),
                        path = %manifest_path.display(),
                        "Loaded module descriptor"
                    );
                    report.insert_unique(definition, &mut seen);
                }
                Err(e) => {
                    warn!(
                        path = %manifest_path.display(),
                        error = %e,
                        "Failed to parse module descriptor"
                    );
                    report.failures.push(ParseFailure {
                        location: module_dir,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            path = %self.modules_dir.display(),
            modules = report.definitions.len(),
            failures = report.failures.len(),
            "Module discovery complete"
        );
        Ok(report)
    }

    /// Discover a specific module by directory name
    pub fn discover_module(&self, module_dir_name: &str) -> Result<ModuleDefinition, ModuleError> {
        let module_dir = self.modules_dir.join(module_dir_name);
        let manifest_path = module_dir.join(&self.manifest_file_name);

        if descriptor_absent(&manifest_path) {
            return Err(ModuleError::InvalidManifest(format!(
                "Module {} not found (no {} in {})",
                module_dir_name,
                self.manifest_file_name,
                module_dir.display()
            )));
        }

        self.load_candidate(&module_dir, &manifest_path)
    }

    fn load_candidate(
        &self,
        module_dir: &Path,
        manifest_path: &Path,
    ) -> Result<ModuleDefinition, ModuleError> {
        ModuleManifest::from_file(manifest_path)?.into_definition(module_dir)
    }
}

/// Only a descriptor that does not exist at all is skipped; one that exists
/// but cannot be read (dangling link, directory) is a parse failure.
fn descriptor_absent(manifest_path: &Path) -> bool {
    matches!(
        fs::symlink_metadata(manifest_path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound
    )
}
