//! Job and workflow job reconciler tests
//!
//! Exercises create (launch + wait), read with drift detection, update
//! with conflicts and relaunches, and delete, against `MemoryFacade`.

use std::sync::Arc;
use std::time::Duration;

use aap_api::fakes::{MemoryFacade, PollStep};
use aap_api::{JobKind, LaunchConfig};
use aap_reconcile_core::{
    CancellationToken, JobAttributes, JobReconciler, ManagedValue, ReadOutcome, ReconcileError,
    Reconciler, WaitConfig,
};

fn setup(kind: JobKind, prompts: LaunchConfig) -> (Arc<MemoryFacade>, JobReconciler, i64) {
    let facade = Arc::new(MemoryFacade::new());
    let template = facade.add_template(kind, "deploy", prompts);
    let reconciler = JobReconciler::new(kind, facade.clone());
    (facade, reconciler, template)
}

fn promptable() -> LaunchConfig {
    LaunchConfig {
        ask_variables_on_launch: true,
        ask_limit_on_launch: true,
        ..Default::default()
    }
}

fn declared(template: i64) -> JobAttributes {
    let mut attrs = JobAttributes::new(template);
    attrs.extra_vars = Some(ManagedValue::new(r#"{"release": "1.4", "canary": true}"#));
    attrs.limit = Some(ManagedValue::new("web"));
    attrs
}

#[tokio::test]
async fn test_create_without_wait_returns_launched_job() {
    let (facade, reconciler, template) = setup(JobKind::Job, promptable());

    let state = reconciler
        .create(&declared(template), &CancellationToken::new())
        .await
        .unwrap();

    assert!(state.id > 0);
    assert_eq!(state.status.as_deref(), Some("pending"));
    assert_eq!(state.attributes, declared(template));
    assert_eq!(facade.launches().len(), 1);
    assert_eq!(facade.poll_count(JobKind::Job, state.id), 0);
}

#[tokio::test(start_paused = true)]
async fn test_create_with_wait_records_final_status() {
    let (facade, reconciler, template) = setup(JobKind::Job, promptable());
    facade.script_next_launch(
        JobKind::Job,
        template,
        vec![PollStep::status("running"), PollStep::status("successful")],
    );

    let mut attrs = declared(template);
    attrs.wait = WaitConfig::waiting().with_poll_interval(Duration::from_secs(1));
    let state = reconciler
        .create(&attrs, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(state.status.as_deref(), Some("successful"));
    assert_eq!(facade.poll_count(JobKind::Job, state.id), 2);
}

#[tokio::test(start_paused = true)]
async fn test_create_timeout_keeps_remote_id() {
    let (facade, reconciler, template) = setup(JobKind::Job, promptable());
    facade.script_next_launch(JobKind::Job, template, vec![PollStep::status("running")]);

    let mut attrs = declared(template);
    attrs.wait = WaitConfig::waiting().with_timeout(Duration::from_secs(10));
    let err = reconciler
        .create(&attrs, &CancellationToken::new())
        .await
        .unwrap_err();

    let launched = facade.launches();
    assert_eq!(launched.len(), 1);
    match &err {
        ReconcileError::Incomplete { state, source } => {
            assert_eq!(state.kind, "job");
            assert_eq!(state.status.as_deref(), Some("running"));
            assert!(matches!(**source, ReconcileError::Timeout { .. }));
        }
        other => panic!("expected incomplete, got {other:?}"),
    }
    let id = err.remote_id().unwrap();
    assert!(facade.poll_count(JobKind::Job, id) > 0);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_create_validates_before_launching() {
    let (facade, reconciler, _) = setup(JobKind::Job, promptable());

    let err = reconciler
        .create(&JobAttributes::new(0), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::Validation { .. }));

    let mut attrs = declared(1);
    attrs.wait = WaitConfig::waiting().with_timeout(Duration::ZERO);
    let err = reconciler
        .create(&attrs, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::Validation { .. }));
    assert!(facade.launches().is_empty());
}

#[tokio::test]
async fn test_create_missing_prompt_is_validation_error() {
    let (facade, reconciler, template) = setup(JobKind::Job, promptable());

    let err = reconciler
        .create(&JobAttributes::new(template), &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        ReconcileError::Validation { attribute, .. } => assert_eq!(attribute, "extra_vars, limit"),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(facade.launches().is_empty());
}

#[tokio::test]
async fn test_read_absent_job_is_not_an_error() {
    let (facade, reconciler, template) = setup(JobKind::Job, promptable());
    let state = reconciler
        .create(&declared(template), &CancellationToken::new())
        .await
        .unwrap();

    facade.remove_job(JobKind::Job, state.id);
    let outcome = reconciler.read(&state).await.unwrap();
    assert!(outcome.is_absent());
}

#[tokio::test]
async fn test_read_ignores_reformatted_text() {
    let (facade, reconciler, template) = setup(JobKind::Job, promptable());
    let state = reconciler
        .create(&declared(template), &CancellationToken::new())
        .await
        .unwrap();

    facade.edit_job(JobKind::Job, state.id, |job| {
        job.extra_vars = Some("canary: true\nrelease: '1.4'\n".into());
        job.limit = Some("web\n".into());
        job.status = "successful".into();
    });

    match reconciler.read(&state).await.unwrap() {
        ReadOutcome::Found {
            state: observed,
            drift,
        } => {
            assert!(drift.is_empty(), "unexpected drift {drift:?}");
            // the applied text is kept so the host sees no diff
            assert_eq!(observed.attributes.extra_vars, state.attributes.extra_vars);
            assert_eq!(observed.status.as_deref(), Some("successful"));
            assert_eq!(observed.id, state.id);
        }
        ReadOutcome::Absent => panic!("job should exist"),
    }
}

#[tokio::test]
async fn test_read_reports_changed_values() {
    let (facade, reconciler, template) = setup(JobKind::Job, promptable());
    let mut attrs = declared(template);
    attrs.inventory_id = Some(4);
    let with_inventory = facade.add_template(
        JobKind::Job,
        "with-inventory",
        LaunchConfig {
            ask_inventory_on_launch: true,
            ..promptable()
        },
    );
    attrs.template_id = with_inventory;
    let state = reconciler
        .create(&attrs, &CancellationToken::new())
        .await
        .unwrap();

    facade.edit_job(JobKind::Job, state.id, |job| {
        job.extra_vars = Some(r#"{"release": "1.5", "canary": true}"#.into());
        job.inventory = Some(5);
    });

    match reconciler.read(&state).await.unwrap() {
        ReadOutcome::Found {
            state: observed,
            drift,
        } => {
            assert_eq!(drift.attributes, vec!["inventory_id", "extra_vars"]);
            assert_eq!(observed.attributes.inventory_id, Some(5));
            assert_eq!(
                observed.attributes.extra_vars.as_ref().map(|v| v.raw_text()),
                Some(r#"{"release": "1.5", "canary": true}"#)
            );
        }
        ReadOutcome::Absent => panic!("job should exist"),
    }
}

#[tokio::test]
async fn test_update_immutable_field_is_conflict() {
    let (facade, reconciler, template) = setup(JobKind::Job, promptable());
    let state = reconciler
        .create(&declared(template), &CancellationToken::new())
        .await
        .unwrap();
    let before = state.clone();

    let mut changed = declared(template);
    changed.template_id = template + 100;
    let err = reconciler
        .update(&state, &changed, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(
        matches!(err, ReconcileError::Conflict { ref attribute, .. } if attribute == "template_id")
    );

    let mut changed = declared(template);
    changed.inventory_id = Some(9);
    let err = reconciler
        .update(&state, &changed, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(
        matches!(err, ReconcileError::Conflict { ref attribute, .. } if attribute == "inventory_id")
    );

    assert_eq!(state, before);
    assert_eq!(facade.launches().len(), 1);
}

#[tokio::test]
async fn test_update_launch_parameter_relaunches() {
    let (facade, reconciler, template) = setup(JobKind::Job, promptable());
    let state = reconciler
        .create(&declared(template), &CancellationToken::new())
        .await
        .unwrap();

    let mut changed = declared(template);
    changed.limit = Some(ManagedValue::new("db"));
    let next = reconciler
        .update(&state, &changed, &CancellationToken::new())
        .await
        .unwrap();

    assert_ne!(next.id, state.id);
    assert_eq!(next.attributes.limit, Some(ManagedValue::new("db")));
    assert_eq!(facade.launches().len(), 2);
}

#[tokio::test]
async fn test_update_triggers_relaunch_but_reformatting_does_not() {
    let (facade, reconciler, template) = setup(JobKind::Job, promptable());
    let state = reconciler
        .create(&declared(template), &CancellationToken::new())
        .await
        .unwrap();

    let mut reformatted = declared(template);
    reformatted.extra_vars = Some(ManagedValue::new("release: '1.4'\ncanary: true\n"));
    reformatted.wait = WaitConfig::default().with_timeout(Duration::from_secs(300));
    let same = reconciler
        .update(&state, &reformatted, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(same.id, state.id);
    assert_eq!(same.attributes.wait.timeout, Duration::from_secs(300));
    assert_eq!(facade.launches().len(), 1);

    let mut triggered = declared(template);
    triggered.triggers.insert("commit".into(), "abc123".into());
    let next = reconciler
        .update(&state, &triggered, &CancellationToken::new())
        .await
        .unwrap();
    assert_ne!(next.id, state.id);
    assert_eq!(facade.launches().len(), 2);
}

#[tokio::test]
async fn test_delete_leaves_job_on_platform() {
    let (facade, reconciler, template) = setup(JobKind::Job, promptable());
    let state = reconciler
        .create(&declared(template), &CancellationToken::new())
        .await
        .unwrap();

    reconciler.delete(&state).await.unwrap();
    assert!(!reconciler.read(&state).await.unwrap().is_absent());

    facade.remove_job(JobKind::Job, state.id);
    reconciler.delete(&state).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_workflow_job_lifecycle() {
    let (facade, reconciler, template) = setup(JobKind::WorkflowJob, LaunchConfig::default());
    facade.script_next_launch(
        JobKind::WorkflowJob,
        template,
        vec![PollStep::status("waiting"), PollStep::status("canceled")],
    );
    assert_eq!(reconciler.kind(), "workflow_job");

    let mut attrs = JobAttributes::new(template);
    attrs.wait = WaitConfig::waiting();
    let state = reconciler
        .create(&attrs, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(state.status.as_deref(), Some("canceled"));
    assert!(state.url.contains("workflow_jobs"));

    match reconciler.read(&state).await.unwrap() {
        ReadOutcome::Found { drift, .. } => assert!(drift.is_empty()),
        ReadOutcome::Absent => panic!("workflow job should exist"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_create_job_removed_while_waiting() {
    let (facade, reconciler, template) = setup(JobKind::Job, promptable());
    facade.script_next_launch(JobKind::Job, template, vec![PollStep::Gone]);

    let mut attrs = declared(template);
    attrs.wait = WaitConfig::waiting();
    let err = reconciler
        .create(&attrs, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        ReconcileError::Incomplete { source, .. } => {
            assert!(matches!(*source, ReconcileError::NotFound { .. }))
        }
        other => panic!("expected incomplete, got {other:?}"),
    }
}
