//! Module registry and discovery
//!
//! Handles module discovery, manifest parsing, and dependency resolution.

pub mod definition;
pub mod dependencies;
pub mod discovery;
pub mod manifest;

pub use definition::{
    Dependency, EntryRef, ModuleDefinition, ModuleId, ModuleVersion, VersionConstraint,
};
pub use dependencies::{LoadPlan, ModuleDependencies, ResolutionError};
pub use discovery::{DiscoveryReport, ModuleDiscovery, ParseFailure, MANIFEST_FILE_NAME};
pub use manifest::ModuleManifest;
