//! Modhost - modular application host
//!
//! Discovers self-contained module packages on disk, resolves the order in
//! which they must start from their declared dependencies, and starts each
//! one exactly once, letting it register its capabilities into a
//! registration context supplied by the host application.
//!
//! ## Design Principles
//!
//! 1. **Partial failure is normal**: a malformed descriptor or a failing
//!    module is reported and its siblings carry on
//! 2. **Deterministic**: the same module tree always yields the same plan
//! 3. **No globals**: the registration context is owned by one boot and
//!    handed back in its report
//!
//! ## Example
//!
//! ```no_run
//! use modhost::module::{ModuleManager, StartupRegistry};
//! use std::path::PathBuf;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let registry: StartupRegistry<Vec<String>> = StartupRegistry::new();
//! let manager = ModuleManager::new(registry);
//! let report = manager.boot(&[PathBuf::from("modules")], Vec::new()).await?;
//! for outcome in report.failed() {
//!     eprintln!("{}: {:?}", outcome.module, outcome.status);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod module;
pub mod utils;

pub use config::{DependentPolicy, HostConfig};
pub use module::{
    BootError, BootReport, ModuleContext, ModuleError, ModuleManager, ModuleStartup,
    StartupRegistry,
};
