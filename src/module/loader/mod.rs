//! Module loading system
//!
//! Handles startup behavior lookup, module configuration, and startup calls.

pub mod loader;
pub mod startup;

pub use loader::{ModuleLoader, MODULE_CONFIG_FILE_NAME};
pub use startup::StartupRegistry;
