//! Module lifecycle tests
//!
//! Full boots over temporary module trees: ordering, failure isolation,
//! dependent handling, aborts, configuration and recorded events.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::test_utils::*;
use modhost::config::{DependentPolicy, HostConfig};
use modhost::module::registry::ResolutionError;
use modhost::module::{
    BootError, BootState, HostEvent, MemoryRecorder, ModuleManager, StartupRegistry,
    StartupStatus,
};

fn manager(registry: StartupRegistry<TestRegistrar>) -> ModuleManager<TestRegistrar> {
    ModuleManager::new(registry)
}

#[tokio::test]
async fn test_boot_in_dependency_order() {
    let fixture = ModuleTestFixture::new().unwrap();
    fixture.create_module("b", "b", "1.0", &[("a", ">=1.0")]);
    fixture.create_module("a", "a", "1.0", &[]);
    let (registry, calls) = recording_registry(&["a", "b"]);

    let report = manager(registry)
        .boot(&fixture.roots(), TestRegistrar::default())
        .await
        .unwrap();

    assert_eq!(report.load_order, vec![id("a@1.0"), id("b@1.0")]);
    assert!(report.outcomes.iter().all(|o| o.status == StartupStatus::Succeeded));
    assert!(report.is_clean());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(report.into_registration().started, vec!["a", "b"]);
}

#[tokio::test]
async fn test_missing_dependency_starts_nothing() {
    let fixture = ModuleTestFixture::new().unwrap();
    fixture.create_module("a", "a", "1.0", &[("b", "1.0")]);
    let (registry, calls) = recording_registry(&["a", "b"]);

    let err = manager(registry)
        .boot(&fixture.roots(), TestRegistrar::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BootError::Resolution(ResolutionError::MissingDependency { .. })
    ));
    assert_eq!(err.to_string(), "missing dependency: b@1.0 required by a@1.0");
    assert_eq!(err.aborted_in(), BootState::Resolving);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failed_module_does_not_stop_siblings() {
    let fixture = ModuleTestFixture::new().unwrap();
    fixture.create_module("m1", "m1", "1.0", &[]);
    fixture.create_module("m2", "m2", "1.0", &[]);
    fixture.create_module("m3", "m3", "1.0", &[]);

    let (mut registry, calls) = recording_registry(&["m1", "m3"]);
    let failures = Arc::new(AtomicUsize::new(0));
    registry
        .register(
            "m2",
            FailingStartup {
                calls: Arc::clone(&failures),
            },
        )
        .unwrap();

    let report = manager(registry)
        .boot(&fixture.roots(), TestRegistrar::default())
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(failures.load(Ordering::SeqCst), 1);
    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(
        report.outcome(&id("m2@1.0")).map(|o| &o.status),
        Some(&StartupStatus::Failed {
            reason: "Module startup failed: database unavailable".to_string()
        })
    );
    assert_eq!(report.failed().count(), 1);
    assert_eq!(report.into_registration().started, vec!["m1", "m3"]);
}

#[tokio::test]
async fn test_dependents_of_failed_module_are_skipped() {
    let fixture = ModuleTestFixture::new().unwrap();
    fixture.create_module("base", "base", "1.0", &[]);
    fixture.create_module("mid", "mid", "1.0", &[("base", "1.0")]);
    fixture.create_module("top", "top", "1.0", &[("mid", "1.0")]);
    fixture.create_module("other", "other", "1.0", &[]);

    let (mut registry, calls) = recording_registry(&["mid", "top", "other"]);
    registry
        .register(
            "base",
            FailingStartup {
                calls: Arc::new(AtomicUsize::new(0)),
            },
        )
        .unwrap();

    let report = manager(registry)
        .boot(&fixture.roots(), TestRegistrar::default())
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        report.outcome(&id("mid@1.0")).map(|o| &o.status),
        Some(&StartupStatus::SkippedDependencyFailed {
            dependency: id("base@1.0")
        })
    );
    assert_eq!(
        report.outcome(&id("top@1.0")).map(|o| &o.status),
        Some(&StartupStatus::SkippedDependencyFailed {
            dependency: id("mid@1.0")
        })
    );
    assert_eq!(
        report.outcome(&id("other@1.0")).map(|o| &o.status),
        Some(&StartupStatus::Succeeded)
    );
}

#[tokio::test]
async fn test_continue_policy_starts_dependents() {
    let fixture = ModuleTestFixture::new().unwrap();
    fixture.create_module("base", "base", "1.0", &[]);
    fixture.create_module("mid", "mid", "1.0", &[("base", "1.0")]);

    let (mut registry, calls) = recording_registry(&["mid"]);
    registry
        .register(
            "base",
            FailingStartup {
                calls: Arc::new(AtomicUsize::new(0)),
            },
        )
        .unwrap();
    let config = HostConfig {
        dependent_policy: DependentPolicy::Continue,
        ..HostConfig::default()
    };

    let report = manager(registry)
        .with_config(config)
        .boot(&fixture.roots(), TestRegistrar::default())
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        report.outcome(&id("mid@1.0")).map(|o| &o.status),
        Some(&StartupStatus::Succeeded)
    );
}

#[tokio::test]
async fn test_panic_and_unknown_entry_are_failures() {
    let fixture = ModuleTestFixture::new().unwrap();
    fixture.create_module("crashy", "crashy", "1.0", &[]);
    fixture.create_module_with_entry("ghost", "ghost", "1.0", "ghost-entry", &[]);
    fixture.create_module("zen", "zen", "1.0", &[]);

    let (mut registry, calls) = recording_registry(&["zen"]);
    registry.register("crashy", PanickingStartup).unwrap();

    let report = manager(registry)
        .boot(&fixture.roots(), TestRegistrar::default())
        .await
        .unwrap();

    match &report.outcome(&id("crashy@1.0")).unwrap().status {
        StartupStatus::Failed { reason } => assert!(reason.contains("module bug")),
        other => panic!("unexpected status {other:?}"),
    }
    match &report.outcome(&id("ghost@1.0")).unwrap().status {
        StartupStatus::Failed { reason } => assert!(reason.contains("ghost-entry")),
        other => panic!("unexpected status {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_startup_timeout_is_failure() {
    let fixture = ModuleTestFixture::new().unwrap();
    fixture.create_module("slow", "slow", "1.0", &[]);
    fixture.create_module("swift", "swift", "1.0", &[]);

    let (mut registry, calls) = recording_registry(&["swift"]);
    registry
        .register("slow", SlowStartup(Duration::from_secs(600)))
        .unwrap();
    let config = HostConfig {
        startup_timeout_seconds: 1,
        ..HostConfig::default()
    };

    let report = manager(registry)
        .with_config(config)
        .boot(&fixture.roots(), TestRegistrar::default())
        .await
        .unwrap();

    match &report.outcome(&id("slow@1.0")).unwrap().status {
        StartupStatus::Failed { reason } => assert!(reason.contains("Timeout")),
        other => panic!("unexpected status {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unreadable_root_aborts_boot() {
    let fixture = ModuleTestFixture::new().unwrap();
    fixture.create_module("a", "a", "1.0", &[]);
    let (registry, calls) = recording_registry(&["a"]);
    let recorder = Arc::new(MemoryRecorder::new());

    let roots = vec![
        fixture.modules_dir.clone(),
        fixture.temp_dir.path().join("missing"),
    ];
    let err = manager(registry)
        .with_recorder(recorder.clone())
        .boot(&roots, TestRegistrar::default())
        .await
        .unwrap_err();

    assert!(matches!(err, BootError::Discovery(_)));
    assert_eq!(err.aborted_in(), BootState::Discovering);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(matches!(
        recorder.events().last(),
        Some(HostEvent::BootAborted { .. })
    ));
}

#[tokio::test]
async fn test_parse_failures_reported_or_fatal() {
    let fixture = ModuleTestFixture::new().unwrap();
    fixture.create_module("good", "good", "1.0", &[]);
    fixture.write_raw_manifest("broken", "name = ");
    let (registry, _) = recording_registry(&["good"]);
    let manager = manager(registry);

    let report = manager
        .boot(&fixture.roots(), TestRegistrar::default())
        .await
        .unwrap();
    assert_eq!(report.parse_failures.len(), 1);
    assert_eq!(report.succeeded().count(), 1);
    assert!(!report.is_clean());

    let (registry, calls) = recording_registry(&["good"]);
    let strict = ModuleManager::new(registry).with_config(HostConfig {
        fail_on_parse_error: true,
        ..HostConfig::default()
    });
    let err = strict
        .boot(&fixture.roots(), TestRegistrar::default())
        .await
        .unwrap_err();
    assert!(matches!(err, BootError::ParseFailures(ref f) if f.len() == 1));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cycle_aborts_before_startup() {
    let fixture = ModuleTestFixture::new().unwrap();
    fixture.create_module("a", "a", "1.0", &[("b", "1.0")]);
    fixture.create_module("b", "b", "1.0", &[("a", "1.0")]);
    let (registry, calls) = recording_registry(&["a", "b"]);

    let err = manager(registry)
        .boot(&fixture.roots(), TestRegistrar::default())
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("a@1.0") && message.contains("b@1.0"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_module_config_file_and_overrides() {
    let fixture = ModuleTestFixture::new().unwrap();
    fixture.create_module("users", "users", "1.0", &[]);
    fixture.write_module_config(
        "users",
        "page_size = 20\nlabel = \"Users\"\n\n[db]\nurl = \"sqlite://users\"\n",
    );
    fixture.create_module("broken", "broken", "1.0", &[]);
    fixture.write_module_config("broken", "page_size = ");

    let mut registry = StartupRegistry::new();
    registry.register("users", ConfigCapture).unwrap();
    registry.register("broken", ConfigCapture).unwrap();
    let mut module_configs = HashMap::new();
    module_configs.insert(
        "users".to_string(),
        HashMap::from([("page_size".to_string(), "50".to_string())]),
    );
    let config = HostConfig {
        module_configs,
        ..HostConfig::default()
    };

    let report = manager(registry)
        .with_config(config)
        .boot(&fixture.roots(), TestRegistrar::default())
        .await
        .unwrap();

    assert!(matches!(
        report.outcome(&id("broken@1.0")).map(|o| &o.status),
        Some(StartupStatus::Failed { .. })
    ));
    let registrar = report.into_registration();
    assert_eq!(registrar.started, vec!["users"]);
    assert_eq!(registrar.capabilities["users.page_size"], "50");
    assert_eq!(registrar.capabilities["users.label"], "Users");
    assert_eq!(registrar.capabilities["users.db.url"], "sqlite://users");
}

#[tokio::test]
async fn test_events_recorded_for_boot() {
    let fixture = ModuleTestFixture::new().unwrap();
    fixture.create_module("a", "a", "1.0", &[]);
    fixture.create_module("b", "b", "1.0", &[("a", "1.0")]);
    fixture.write_raw_manifest("broken", "name = ");
    let (registry, _) = recording_registry(&["a", "b"]);
    let recorder = Arc::new(MemoryRecorder::new());

    let report = manager(registry)
        .with_recorder(recorder.clone())
        .boot(&fixture.roots(), TestRegistrar::default())
        .await
        .unwrap();

    let events = recorder.events();
    assert_eq!(events.len(), 6);
    assert!(matches!(events[0], HostEvent::BootStarted { .. }));
    assert!(matches!(events[1], HostEvent::ParseFailed { .. }));
    assert!(matches!(events[2], HostEvent::PlanResolved { ref order, .. } if order.len() == 2));
    assert!(matches!(
        events[3],
        HostEvent::ModuleOutcome { ref outcome, .. } if outcome.module == id("a@1.0")
    ));
    assert!(matches!(
        events[4],
        HostEvent::ModuleOutcome { ref outcome, .. } if outcome.module == id("b@1.0")
    ));
    assert!(matches!(
        events[5],
        HostEvent::BootCompleted {
            succeeded: 2,
            failed: 0,
            ..
        }
    ));

    let boot_ids: Vec<_> = events
        .iter()
        .map(|event| match event {
            HostEvent::BootStarted { boot_id, .. }
            | HostEvent::ParseFailed { boot_id, .. }
            | HostEvent::PlanResolved { boot_id, .. }
            | HostEvent::ModuleOutcome { boot_id, .. }
            | HostEvent::BootAborted { boot_id, .. }
            | HostEvent::BootCompleted { boot_id, .. } => *boot_id,
        })
        .collect();
    assert!(boot_ids.iter().all(|b| *b == report.boot_id));
}

#[tokio::test]
async fn test_boot_configured_uses_module_dirs() {
    let fixture = ModuleTestFixture::new().unwrap();
    fixture.create_module("a", "a", "1.0", &[]);
    let (registry, calls) = recording_registry(&["a"]);
    let config = HostConfig {
        module_dirs: fixture.roots(),
        ..HostConfig::default()
    };

    let report = manager(registry)
        .with_config(config)
        .boot_configured(TestRegistrar::default())
        .await
        .unwrap();

    assert_eq!(report.load_order, vec![id("a@1.0")]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_plan_does_not_start_modules() {
    let fixture = ModuleTestFixture::new().unwrap();
    fixture.create_module("a", "a", "1.0", &[]);
    fixture.create_module("b", "b", "2.0", &[("a", "^1")]);
    let (registry, calls) = recording_registry(&["a", "b"]);

    let planned = manager(registry).plan(&fixture.roots()).await.unwrap();
    assert_eq!(planned.plan.ids(), vec![id("a@1.0"), id("b@2.0")]);
    assert!(planned.parse_failures.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
