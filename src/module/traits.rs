//! Module system traits and interfaces
//!
//! Defines the startup contract modules implement and the context the host
//! lends them while they register their capabilities.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::module::registry::definition::{ModuleDefinition, ModuleId};

/// Module startup behavior
///
/// Each module supplies one implementation, looked up by the entry
/// reference in its descriptor. `on_startup` is invoked exactly once per
/// boot, after every module it depends on has finished starting.
#[async_trait]
pub trait ModuleStartup<C: Send>: Send + Sync {
    /// Register the module's capabilities into the host registration context
    async fn on_startup(&self, ctx: &mut ModuleContext<'_, C>) -> Result<(), ModuleError>;
}

/// Context lent to a module for the duration of its startup call
///
/// Wraps the host registration context together with the module's own
/// definition and configuration. The registration context is passed
/// through unchanged.
pub struct ModuleContext<'a, C> {
    definition: &'a ModuleDefinition,
    config: &'a HashMap<String, String>,
    registration: &'a mut C,
}

impl<'a, C> ModuleContext<'a, C> {
    /// Create a new module context
    pub fn new(
        definition: &'a ModuleDefinition,
        config: &'a HashMap<String, String>,
        registration: &'a mut C,
    ) -> Self {
        Self {
            definition,
            config,
            registration,
        }
    }

    /// Definition of the module being started
    pub fn definition(&self) -> &ModuleDefinition {
        self.definition
    }

    pub fn module_id(&self) -> &ModuleId {
        self.definition.id()
    }

    /// Host registration context
    pub fn registration(&mut self) -> &mut C {
        self.registration
    }

    /// Module configuration (flattened key/value pairs)
    pub fn config(&self) -> &HashMap<String, String> {
        self.config
    }

    /// Get a configuration value
    pub fn get_config(&self, key: &str) -> Option<&String> {
        self.config.get(key)
    }

    /// Get a configuration value with default
    pub fn get_config_or(&self, key: &str, default: &str) -> String {
        self.config
            .get(key)
            .map(|s| s.as_str())
            .unwrap_or(default)
            .to_string()
    }
}

/// Module system errors
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Failed to read module directory {path}: {message}")]
    Discovery { path: PathBuf, message: String },

    #[error("Invalid module manifest: {0}")]
    InvalidManifest(String),

    #[error("Module startup failed: {0}")]
    StartupFailed(String),

    #[error("Module startup panicked: {0}")]
    Panicked(String),

    #[error("Timeout after {0:?} waiting for module startup")]
    Timeout(Duration),

    #[error("No startup behavior registered for entry point: {0}")]
    EntryNotFound(String),

    #[error("Startup behavior already registered for entry point: {0}")]
    AlreadyRegistered(String),

    #[error("Module configuration error: {0}")]
    ConfigError(String),
}

impl From<anyhow::Error> for ModuleError {
    fn from(e: anyhow::Error) -> Self {
        ModuleError::StartupFailed(format!("{:#}", e))
    }
}

impl From<toml::de::Error> for ModuleError {
    fn from(e: toml::de::Error) -> Self {
        ModuleError::ConfigError(e.to_string())
    }
}
