//! Host event recording
//!
//! The host reports discovery, resolution and startup results through an
//! `EventRecorder`. Shipping or persisting the events is the recorder's
//! concern; the host only calls `record`.

use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::module::outcome::{StartupOutcome, StartupStatus};
use crate::module::registry::definition::ModuleId;
use crate::module::registry::discovery::ParseFailure;

/// Structured host event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    BootStarted {
        boot_id: Uuid,
        roots: Vec<PathBuf>,
    },
    ParseFailed {
        boot_id: Uuid,
        failure: ParseFailure,
    },
    PlanResolved {
        boot_id: Uuid,
        order: Vec<ModuleId>,
    },
    ModuleOutcome {
        boot_id: Uuid,
        outcome: StartupOutcome,
    },
    BootAborted {
        boot_id: Uuid,
        reason: String,
    },
    BootCompleted {
        boot_id: Uuid,
        succeeded: usize,
        failed: usize,
    },
}

/// Sink for host events
pub trait EventRecorder: Send + Sync {
    fn record(&self, event: HostEvent);
}

/// Records events as structured `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRecorder;

impl EventRecorder for TracingRecorder {
    fn record(&self, event: HostEvent) {
        match event {
            HostEvent::BootStarted { boot_id, roots } => {
                info!(%boot_id, roots = ?roots, "Boot started");
            }
            HostEvent::ParseFailed { boot_id, failure } => {
                warn!(
                    %boot_id,
                    location = %failure.location.display(),
                    reason = %failure.reason,
                    "Module descriptor skipped"
                );
            }
            HostEvent::PlanResolved { boot_id, order } => {
                info!(
                    %boot_id,
                    modules = order.len(),
                    order = ?order.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    "Load plan resolved"
                );
            }
            HostEvent::ModuleOutcome { boot_id, outcome } => match &outcome.status {
                StartupStatus::Succeeded => {
                    info!(
                        %boot_id,
                        module = %outcome.module,
                        elapsed = ?outcome.elapsed,
                        "Module started"
                    );
                }
                StartupStatus::Failed { reason } => {
                    error!(
                        %boot_id,
                        module = %outcome.module,
                        reason = %reason,
                        "Module startup failed"
                    );
                }
                StartupStatus::SkippedDependencyFailed { dependency } => {
                    warn!(
                        %boot_id,
                        module = %outcome.module,
                        dependency = %dependency,
                        "Module skipped, dependency failed"
                    );
                }
            },
            HostEvent::BootAborted { boot_id, reason } => {
                error!(%boot_id, reason = %reason, "Boot aborted");
            }
            HostEvent::BootCompleted {
                boot_id,
                succeeded,
                failed,
            } => {
                info!(%boot_id, succeeded, failed, "Boot completed");
            }
        }
    }
}

/// Keeps events in memory, in arrival order
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    events: Mutex<Vec<HostEvent>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events
    pub fn events(&self) -> Vec<HostEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventRecorder for MemoryRecorder {
    fn record(&self, event: HostEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
