//! Module loader implementation
//!
//! Resolves per-module configuration and runs a single module's startup
//! behavior with panic isolation and a time bound.

use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::module::loader::startup::StartupRegistry;
use crate::module::registry::definition::ModuleDefinition;
use crate::module::traits::{ModuleContext, ModuleError};
use crate::utils::timeout::with_custom_timeout;

/// Optional per-module configuration file, next to the descriptor
pub const MODULE_CONFIG_FILE_NAME: &str = "config.toml";

/// Module loader for configuring and starting modules
pub struct ModuleLoader;

impl ModuleLoader {
    /// Load module configuration from file
    ///
    /// Nested tables become dot-notation keys and arrays are comma-joined.
    /// A missing file yields an empty map.
    pub fn load_module_config<P: AsRef<Path>>(
        module_name: &str,
        config_path: P,
    ) -> Result<HashMap<String, String>, ModuleError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            debug!(module = module_name, "No config file, using defaults");
            return Ok(HashMap::new());
        }

        let contents = std::fs::read_to_string(config_path).map_err(|e| {
            ModuleError::ConfigError(format!(
                "failed to read {}: {}",
                config_path.display(),
                e
            ))
        })?;
        let value: toml::Value = toml::from_str(&contents).map_err(|e| {
            ModuleError::ConfigError(format!("invalid {}: {}", config_path.display(), e))
        })?;

        let mut result = HashMap::new();
        Self::flatten_toml_value(String::new(), &value, &mut result);
        Ok(result)
    }

    /// Configuration for a module: its `config.toml`, then host overrides
    pub fn resolve_module_config(
        definition: &ModuleDefinition,
        overrides: &HashMap<String, HashMap<String, String>>,
    ) -> Result<HashMap<String, String>, ModuleError> {
        let mut config = Self::load_module_config(
            definition.name(),
            definition.source_dir().join(MODULE_CONFIG_FILE_NAME),
        )?;
        if let Some(module_overrides) = overrides.get(definition.name()) {
            config.extend(
                module_overrides
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone())),
            );
        }
        Ok(config)
    }

    /// Run one module's startup behavior
    ///
    /// Unknown entry references, error returns, panics and timeouts all come
    /// back as `Err`; none of them escape to the caller's task.
    ///
    /// The timeout is checked only when the behavior's future yields. A
    /// behavior that blocks its thread (a synchronous sleep, a busy loop) is
    /// not interrupted and delays the boot until it returns; such work
    /// belongs in `tokio::task::spawn_blocking`.
    pub async fn start_module<C: Send + 'static>(
        registry: &StartupRegistry<C>,
        definition: &ModuleDefinition,
        config: &HashMap<String, String>,
        registration: &mut C,
        timeout: Option<Duration>,
    ) -> Result<(), ModuleError> {
        let behavior = registry
            .get(definition.entry())
            .ok_or_else(|| ModuleError::EntryNotFound(definition.entry().to_string()))?;

        info!(module = %definition.id(), entry = %definition.entry(), "Starting module");

        let mut ctx = ModuleContext::new(definition, config, registration);
        let call = AssertUnwindSafe(behavior.on_startup(&mut ctx)).catch_unwind();

        let caught = match timeout {
            Some(limit) => with_custom_timeout(call, limit)
                .await
                .map_err(|_| ModuleError::Timeout(limit))?,
            None => call.await,
        };

        caught.map_err(|payload| ModuleError::Panicked(panic_message(&*payload)))?
    }

    /// Flatten TOML value to string hashmap
    fn flatten_toml_value(
        prefix: String,
        value: &toml::Value,
        result: &mut HashMap<String, String>,
    ) {
        use toml::Value;

        match value {
            Value::String(s) => {
                if !prefix.is_empty() {
                    result.insert(prefix, s.clone());
                }
            }
            Value::Integer(i) => {
                result.insert(prefix, i.to_string());
            }
            Value::Float(f) => {
                result.insert(prefix, f.to_string());
            }
            Value::Boolean(b) => {
                result.insert(prefix, b.to_string());
            }
            Value::Array(arr) => {
                let values: Vec<String> = arr
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        _ => v.to_string(),
                    })
                    .collect();
                result.insert(prefix, values.join(","));
            }
            Value::Table(table) => {
                for (key, val) in table {
                    let new_prefix = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", prefix, key)
                    };
                    Self::flatten_toml_value(new_prefix, val, result);
                }
            }
            Value::Datetime(dt) => {
                result.insert(prefix, dt.to_string());
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
