//! FSM unit tests

use chbackupd::backup::fsm::{BackupEvent, BackupPhase, BackupRun, FailureReason};
use chbackupd::errors::BackupError;

fn acknowledged(name: &str) -> BackupEvent {
    BackupEvent::Acknowledged {
        backup_name: name.to_string(),
    }
}

#[test]
fn test_fsm_initial_state() {
    let run = BackupRun::new();
    assert_eq!(run.phase(), BackupPhase::Created);
    assert!(run.failure().is_none());
    assert_eq!(run.upload_attempts(), 0);
    assert!(run.backup_name().is_empty());
}

#[test]
fn test_fsm_runs_get_distinct_ids() {
    assert_ne!(BackupRun::new().id(), BackupRun::new().id());
}

#[test]
fn test_fsm_fail_from_every_active_phase() {
    let steps = [
        acknowledged("b1"),
        BackupEvent::CreateCompleted,
        BackupEvent::UploadTriggered,
    ];

    for depth in 0..=steps.len() {
        let mut run = BackupRun::new();
        for event in steps.iter().take(depth) {
            run.process(event.clone()).unwrap();
        }
        assert!(!run.phase().is_terminal());

        run.process(BackupEvent::Fail(FailureReason::UploadExhausted { attempts: 5 }))
            .unwrap();
        assert_eq!(run.phase(), BackupPhase::Failed);
        assert_eq!(
            run.failure().map(ToString::to_string).as_deref(),
            Some("upload failed after 5 attempts")
        );
    }
}

#[test]
fn test_fsm_invalid_transition() {
    let mut run = BackupRun::new();

    // Cannot upload before the create finished
    let result = run.process(BackupEvent::UploadTriggered);
    assert!(matches!(result, Err(BackupError::InvalidTransition(_))));
    assert_eq!(run.phase(), BackupPhase::Created);
}

#[test]
fn test_fsm_succeeded_is_terminal() {
    let mut run = BackupRun::new();
    run.process(acknowledged("b1")).unwrap();
    run.process(BackupEvent::CreateCompleted).unwrap();
    run.process(BackupEvent::UploadTriggered).unwrap();
    run.process(BackupEvent::UploadCompleted).unwrap();
    assert_eq!(run.phase(), BackupPhase::Succeeded);

    let result = run.process(BackupEvent::Fail(FailureReason::CreateTimeout));
    assert!(result.is_err());
    assert_eq!(run.phase(), BackupPhase::Succeeded);
    assert!(run.failure().is_none());
}

#[test]
fn test_failure_reason_from_error() {
    let reason = FailureReason::from(BackupError::ProtocolError("bad body".to_string()));
    assert_eq!(reason.to_string(), "Protocol error: bad body");
}
