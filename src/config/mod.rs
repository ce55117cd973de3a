//! Configuration management for modhost
//!
//! Handles host configuration loading (TOML or JSON) and validation.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::module::registry::discovery::MANIFEST_FILE_NAME;
use crate::utils::timeout::DEFAULT_STARTUP_TIMEOUT;

/// What to do with modules whose dependencies failed to start
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependentPolicy {
    /// Do not start them; record them as failed due to a dependency (default)
    #[default]
    Skip,
    /// Start them anyway
    Continue,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter (e.g. "info", "modhost=debug"). RUST_LOG takes precedence.
    pub filter: Option<String>,

    /// Emit JSON lines (requires the `json-logging` feature)
    #[serde(default)]
    pub json_format: bool,
}

/// Background task configuration
///
/// Consumed by the external task scheduler; the host itself schedules
/// nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundTaskConfig {
    /// Polling/execution interval in seconds
    #[serde(default = "default_task_interval")]
    pub interval_seconds: u64,
}

fn default_task_interval() -> u64 {
    30
}

impl Default for BackgroundTaskConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_task_interval(),
        }
    }
}

impl BackgroundTaskConfig {
    /// Scheduler interval
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

/// Host configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Module root directories, scanned in order
    #[serde(default = "default_module_dirs")]
    pub module_dirs: Vec<PathBuf>,

    /// Descriptor file name inside each module directory
    #[serde(default = "default_descriptor_file")]
    pub descriptor_file: String,

    /// Per-module startup timeout in seconds (0 = no timeout)
    ///
    /// Only startup code that yields to the async runtime can be interrupted;
    /// a behavior that blocks its thread holds up the boot until it returns.
    #[serde(default = "default_startup_timeout")]
    pub startup_timeout_seconds: u64,

    /// Handling of modules whose dependencies failed
    #[serde(default)]
    pub dependent_policy: DependentPolicy,

    /// Abort boot when any module descriptor fails to parse
    #[serde(default)]
    pub fail_on_parse_error: bool,

    /// Module-specific configuration overrides (module name -> key/value)
    #[serde(default)]
    pub module_configs: HashMap<String, HashMap<String, String>>,

    /// Logging configuration
    #[serde(default)]
    pub logging: Option<LoggingConfig>,

    /// Background task scheduler configuration
    #[serde(default)]
    pub background_tasks: BackgroundTaskConfig,
}

fn default_module_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("modules")]
}

fn default_descriptor_file() -> String {
    MANIFEST_FILE_NAME.to_string()
}

fn default_startup_timeout() -> u64 {
    DEFAULT_STARTUP_TIMEOUT.as_secs()
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            module_dirs: default_module_dirs(),
            descriptor_file: default_descriptor_file(),
            startup_timeout_seconds: default_startup_timeout(),
            dependent_policy: DependentPolicy::default(),
            fail_on_parse_error: false,
            module_configs: HashMap::new(),
            logging: None,
            background_tasks: BackgroundTaskConfig::default(),
        }
    }
}

impl HostConfig {
    /// Load configuration from file, TOML or JSON by extension
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            Self::from_json_file(path)?
        } else {
            Self::from_toml_file(path)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from JSON file
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: HostConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Per-module startup timeout, `None` when disabled
    pub fn startup_timeout(&self) -> Option<Duration> {
        match self.startup_timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.descriptor_file.trim().is_empty() {
            anyhow::bail!("descriptor_file cannot be empty");
        }
        if self.descriptor_file.contains(['/', '\\']) {
            anyhow::bail!(
                "descriptor_file must be a file name, not a path: {}",
                self.descriptor_file
            );
        }

        let mut seen = HashSet::new();
        for dir in &self.module_dirs {
            if !seen.insert(dir) {
                anyhow::bail!("module directory listed twice: {}", dir.display());
            }
        }

        Ok(())
    }
}
