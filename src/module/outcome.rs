//! Startup outcomes and boot reports

use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

use crate::module::registry::definition::ModuleId;
use crate::module::registry::discovery::ParseFailure;

/// Result of one module's startup attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StartupStatus {
    /// Startup behavior completed successfully
    Succeeded,
    /// Startup behavior failed, panicked, timed out or could not be found
    Failed { reason: String },
    /// Not started because a dependency failed
    SkippedDependencyFailed { dependency: ModuleId },
}

impl StartupStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, StartupStatus::Succeeded)
    }

    /// Failed or skipped
    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }
}

/// Per-module startup outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartupOutcome {
    pub module: ModuleId,
    pub status: StartupStatus,
    /// Time spent in the startup call (zero when skipped)
    pub elapsed: Duration,
}

impl StartupOutcome {
    pub fn succeeded(module: ModuleId, elapsed: Duration) -> Self {
        Self {
            module,
            status: StartupStatus::Succeeded,
            elapsed,
        }
    }

    pub fn failed(module: ModuleId, reason: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            module,
            status: StartupStatus::Failed {
                reason: reason.into(),
            },
            elapsed,
        }
    }

    pub fn skipped(module: ModuleId, dependency: ModuleId) -> Self {
        Self {
            module,
            status: StartupStatus::SkippedDependencyFailed { dependency },
            elapsed: Duration::ZERO,
        }
    }
}

/// Report of a completed boot
///
/// A boot that reaches this report has completed: discovery and resolution
/// succeeded and every planned module was given its startup turn. Module
/// failures are listed here rather than failing the boot.
#[derive(Debug)]
pub struct BootReport<C> {
    /// Identifier shared by every event of this boot
    pub boot_id: Uuid,
    /// Resolved load order
    pub load_order: Vec<ModuleId>,
    /// One outcome per planned module, in load order
    pub outcomes: Vec<StartupOutcome>,
    /// Descriptors skipped during discovery
    pub parse_failures: Vec<ParseFailure>,
    /// Registration context, handed back after every module has run
    pub registration: C,
}

impl<C> BootReport<C> {
    /// Outcome for a module
    pub fn outcome(&self, module: &ModuleId) -> Option<&StartupOutcome> {
        self.outcomes.iter().find(|o| &o.module == module)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &StartupOutcome> {
        self.outcomes.iter().filter(|o| o.status.is_success())
    }

    /// Failed or skipped modules
    pub fn failed(&self) -> impl Iterator<Item = &StartupOutcome> {
        self.outcomes.iter().filter(|o| o.status.is_failure())
    }

    /// True when every module started and no descriptor was skipped
    pub fn is_clean(&self) -> bool {
        self.parse_failures.is_empty() && self.outcomes.iter().all(|o| o.status.is_success())
    }

    pub fn into_registration(self) -> C {
        self.registration
    }
}
