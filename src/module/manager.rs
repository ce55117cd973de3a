//! Module manager for orchestrating module boot
//!
//! Drives one boot through discovery, dependency resolution and sequential
//! startup, and reports a per-module outcome for every planned module.

use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{DependentPolicy, HostConfig};
use crate::module::events::{EventRecorder, HostEvent, TracingRecorder};
use crate::module::loader::{ModuleLoader, StartupRegistry};
use crate::module::outcome::{BootReport, StartupOutcome};
use crate::module::registry::{
    DiscoveryReport, LoadPlan, ModuleDependencies, ModuleDiscovery, ModuleId, ParseFailure,
    ResolutionError,
};
use crate::module::traits::ModuleError;

/// Boot lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BootState {
    Idle,
    Discovering,
    Resolving,
    Starting,
    Completed,
    Aborted,
}

impl BootState {
    /// Whether `next` may follow this state
    pub fn can_transition_to(self, next: BootState) -> bool {
        use BootState::*;
        matches!(
            (self, next),
            (Idle, Discovering)
                | (Discovering, Resolving)
                | (Resolving, Starting)
                | (Starting, Completed)
                | (Discovering, Aborted)
                | (Resolving, Aborted)
        )
    }

    /// Move to `next`, or `None` if the transition is not allowed
    pub fn transition(self, next: BootState) -> Option<BootState> {
        self.can_transition_to(next).then_some(next)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BootState::Completed | BootState::Aborted)
    }
}

/// Fatal boot errors
///
/// Module startup failures are not boot errors; they are reported in the
/// `BootReport`.
#[derive(Debug, Error)]
pub enum BootError {
    /// A module root could not be read
    #[error(transparent)]
    Discovery(ModuleError),

    /// Descriptors failed to parse and `fail_on_parse_error` is set
    #[error("{} module descriptor(s) failed to parse: {}", .0.len(), join_failures(.0))]
    ParseFailures(Vec<ParseFailure>),

    /// Dependencies could not be resolved
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}

impl BootError {
    /// State the boot was in when it aborted
    pub fn aborted_in(&self) -> BootState {
        match self {
            BootError::Discovery(_) | BootError::ParseFailures(_) => BootState::Discovering,
            BootError::Resolution(_) => BootState::Resolving,
        }
    }
}

fn join_failures(failures: &[ParseFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Discovery and resolution result, before any module is started
#[derive(Debug, Clone)]
pub struct BootPlan {
    /// Resolved load plan
    pub plan: LoadPlan,
    /// Descriptors skipped during discovery
    pub parse_failures: Vec<ParseFailure>,
}

/// Module manager coordinates module boot
pub struct ModuleManager<C: Send + 'static> {
    /// Startup behaviors by entry reference
    registry: StartupRegistry<C>,
    /// Host configuration
    config: HostConfig,
    /// Event sink
    recorder: Arc<dyn EventRecorder>,
}

impl<C: Send + 'static> ModuleManager<C> {
    /// Create a new module manager with default configuration
    pub fn new(registry: StartupRegistry<C>) -> Self {
        Self {
            registry,
            config: HostConfig::default(),
            recorder: Arc::new(TracingRecorder),
        }
    }

    pub fn with_config(mut self, config: HostConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_recorder(mut self, recorder: Arc<dyn EventRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn registry(&self) -> &StartupRegistry<C> {
        &self.registry
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Parse every root concurrently and merge the results in root order
    ///
    /// Waits for every root before returning. The first unreadable root (in
    /// root order) is returned as the error.
    pub async fn discover(&self, roots: &[PathBuf]) -> Result<DiscoveryReport, ModuleError> {
        let tasks = roots.iter().map(|root| {
            let discovery = ModuleDiscovery::new(root)
                .with_manifest_file_name(self.config.descriptor_file.clone());
            tokio::task::spawn_blocking(move || discovery.discover_modules())
        });
        let results = join_all(tasks).await;

        let mut reports = Vec::with_capacity(results.len());
        for (root, joined) in roots.iter().zip(results) {
            let report = joined.map_err(|e| ModuleError::Discovery {
                path: root.clone(),
                message: format!("discovery task failed: {}", e),
            })?;
            reports.push(report?);
        }
        Ok(DiscoveryReport::merge(reports))
    }

    /// Discover and resolve without starting anything
    pub async fn plan(&self, roots: &[PathBuf]) -> Result<BootPlan, BootError> {
        let boot_id = Uuid::new_v4();
        let mut state = BootState::Idle;
        self.prepare(boot_id, roots, &mut state)
            .instrument(info_span!("plan", %boot_id))
            .await
    }

    /// Boot the modules found under `roots`
    ///
    /// Returns `Err` only when discovery or resolution fails, in which case
    /// no module has been started. Otherwise every planned module gets
    /// exactly one outcome and the registration context is handed back in
    /// the report.
    pub async fn boot(
        &self,
        roots: &[PathBuf],
        registration: C,
    ) -> Result<BootReport<C>, BootError> {
        let boot_id = Uuid::new_v4();
        self.run_boot(boot_id, roots, registration)
            .instrument(info_span!("boot", %boot_id))
            .await
    }

    /// Boot the modules found under the configured module directories
    pub async fn boot_configured(&self, registration: C) -> Result<BootReport<C>, BootError> {
        let roots = self.config.module_dirs.clone();
        self.boot(&roots, registration).await
    }

    async fn run_boot(
        &self,
        boot_id: Uuid,
        roots: &[PathBuf],
        registration: C,
    ) -> Result<BootReport<C>, BootError> {
        let mut state = BootState::Idle;
        let BootPlan {
            plan,
            parse_failures,
        } = self.prepare(boot_id, roots, &mut state).await?;

        advance(&mut state, BootState::Starting);
        let (outcomes, registration) = self.start_all(boot_id, &plan, registration).await;

        let succeeded = outcomes.iter().filter(|o| o.status.is_success()).count();
        self.recorder.record(HostEvent::BootCompleted {
            boot_id,
            succeeded,
            failed: outcomes.len() - succeeded,
        });
        advance(&mut state, BootState::Completed);

        Ok(BootReport {
            boot_id,
            load_order: plan.ids(),
            outcomes,
            parse_failures,
            registration,
        })
    }

    /// Discovering and Resolving phases
    async fn prepare(
        &self,
        boot_id: Uuid,
        roots: &[PathBuf],
        state: &mut BootState,
    ) -> Result<BootPlan, BootError> {
        self.recorder.record(HostEvent::BootStarted {
            boot_id,
            roots: roots.to_vec(),
        });

        advance(state, BootState::Discovering);
        let report = match self.discover(roots).await {
            Ok(report) => report,
            Err(e) => return Err(self.abort(boot_id, state, BootError::Discovery(e))),
        };

        for failure in &report.failures {
            self.recorder.record(HostEvent::ParseFailed {
                boot_id,
                failure: failure.clone(),
            });
        }
        if self.config.fail_on_parse_error && !report.failures.is_empty() {
            return Err(self.abort(boot_id, state, BootError::ParseFailures(report.failures)));
        }
        info!(
            modules = report.definitions.len(),
            skipped = report.failures.len(),
            "Discovery complete"
        );

        advance(state, BootState::Resolving);
        let plan = match ModuleDependencies::resolve(&report.definitions) {
            Ok(plan) => plan,
            Err(e) => return Err(self.abort(boot_id, state, e.into())),
        };
        self.recorder.record(HostEvent::PlanResolved {
            boot_id,
            order: plan.ids(),
        });

        Ok(BootPlan {
            plan,
            parse_failures: report.failures,
        })
    }

    /// Starting phase: one module at a time, in plan order
    async fn start_all(
        &self,
        boot_id: Uuid,
        plan: &LoadPlan,
        mut registration: C,
    ) -> (Vec<StartupOutcome>, C) {
        let timeout = self.config.startup_timeout();
        let mut outcomes = Vec::with_capacity(plan.len());
        let mut failed: HashSet<ModuleId> = HashSet::new();

        for definition in plan.order() {
            let id = definition.id().clone();

            if self.config.dependent_policy == DependentPolicy::Skip {
                let failed_dependency = plan
                    .dependencies_of(&id)
                    .iter()
                    .find(|dep| failed.contains(*dep))
                    .cloned();
                if let Some(dependency) = failed_dependency {
                    failed.insert(id.clone());
                    let outcome = StartupOutcome::skipped(id, dependency);
                    self.record_outcome(boot_id, &outcome);
                    outcomes.push(outcome);
                    continue;
                }
            }

            let started = Instant::now();
            let result =
                match ModuleLoader::resolve_module_config(definition, &self.config.module_configs) {
                    Ok(config) => {
                        ModuleLoader::start_module(
                            &self.registry,
                            definition,
                            &config,
                            &mut registration,
                            timeout,
                        )
                        .await
                    }
                    Err(e) => Err(e),
                };

            let outcome = match result {
                Ok(()) => StartupOutcome::succeeded(id, started.elapsed()),
                Err(e) => {
                    failed.insert(id.clone());
                    StartupOutcome::failed(id, e.to_string(), started.elapsed())
                }
            };
            self.record_outcome(boot_id, &outcome);
            outcomes.push(outcome);
        }

        (outcomes, registration)
    }

    fn record_outcome(&self, boot_id: Uuid, outcome: &StartupOutcome) {
        self.recorder.record(HostEvent::ModuleOutcome {
            boot_id,
            outcome: outcome.clone(),
        });
    }

    fn abort(&self, boot_id: Uuid, state: &mut BootState, error: BootError) -> BootError {
        self.recorder.record(HostEvent::BootAborted {
            boot_id,
            reason: error.to_string(),
        });
        advance(state, BootState::Aborted);
        error
    }
}

fn advance(state: &mut BootState, next: BootState) {
    let current = *state;
    match current.transition(next) {
        Some(next) => {
            debug!(from = ?current, to = ?next, "Boot state");
            *state = next;
        }
        None => warn!(from = ?current, to = ?next, "Ignoring illegal boot state transition"),
    }
}
