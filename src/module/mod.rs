//! Module system for modhost
//!
//! Modules are self-contained packages, each described by a `module.toml`
//! in its own folder under a module root. The host discovers them, orders
//! them by their declared dependencies, and gives each one a single startup
//! call in which it registers its capabilities into a host-supplied
//! registration context.
//!
//! ## Architecture
//!
//! - **Discovery**: `registry::discovery` parses descriptors; malformed ones
//!   are skipped and reported, never fatal
//! - **Resolution**: `registry::dependencies` builds the load plan
//! - **Startup**: `loader` maps entry references to `ModuleStartup`
//!   behaviors and runs them with panic isolation and a timeout
//! - **Orchestration**: `manager::ModuleManager` drives a boot and reports
//!   one outcome per module

pub mod events;
pub mod loader;
pub mod manager;
pub mod outcome;
pub mod registry;
pub mod traits;
pub mod validation;

pub use events::{EventRecorder, HostEvent, MemoryRecorder, TracingRecorder};
pub use loader::{ModuleLoader, StartupRegistry};
pub use manager::{BootError, BootPlan, BootState, ModuleManager};
pub use outcome::{BootReport, StartupOutcome, StartupStatus};
pub use registry::{
    Dependency, DiscoveryReport, EntryRef, LoadPlan, ModuleDefinition, ModuleDependencies,
    ModuleDiscovery, ModuleId, ModuleVersion, ParseFailure, ResolutionError, VersionConstraint,
};
pub use traits::{ModuleContext, ModuleError, ModuleStartup};
