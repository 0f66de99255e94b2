//! End-to-end backup run tests

use std::sync::Arc;
use std::time::Duration;

use chbackupd::backup::fsm::FailureReason;
use chbackupd::backup::orchestrator::RunOutcome;

use crate::common::{orchestrator, status_line, Call, MockApi};

const WAIT: Duration = Duration::from_secs(30);

#[tokio::test(start_paused = true)]
async fn test_run_succeeds_end_to_end() {
    let name = "2024-01-01T00-00-00";
    let api = Arc::new(
        MockApi::new()
            .with_create("acknowledged", name)
            .with_status(&status_line("create", "in progress"))
            .with_status(&status_line("create", "success"))
            .with_uploads(&["acknowledged"])
            .with_status(&status_line("create", "success"))
            .with_status(&status_line(&format!("upload {}", name), "success")),
    );
    let (orchestrator, metrics) = orchestrator(api.clone(), WAIT);

    let outcome = orchestrator.run_once().await;

    assert_eq!(
        outcome,
        RunOutcome::Succeeded {
            backup_name: name.to_string()
        }
    );
    assert_eq!(metrics.success.get(), 1);
    assert_eq!(metrics.error.get(), 0);
    assert_eq!(metrics.upload_attempts.get(), 1);
    assert_eq!(
        api.calls(),
        vec![
            Call::Create,
            Call::Status,
            Call::Status,
            Call::Upload(name.to_string()),
            Call::Status,
            Call::Status,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_run_uses_backup_name_unmodified() {
    let name = "shard 1/2024-01-01T00:00:00";
    let api = Arc::new(
        MockApi::new()
            .with_create("acknowledged", name)
            .with_status(&status_line("create", "success"))
            .with_uploads(&["acknowledged"])
            .with_status(&status_line(&format!("upload {}", name), "success")),
    );
    let (orchestrator, _metrics) = orchestrator(api.clone(), WAIT);

    assert!(orchestrator.run_once().await.is_success());
    assert_eq!(api.upload_calls(), vec![name.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_run_fails_when_create_never_completes() {
    let api = Arc::new(
        MockApi::new()
            .with_create("acknowledged", "b1")
            .with_status_fallback(&status_line("create", "in progress")),
    );
    let (orchestrator, metrics) = orchestrator(api.clone(), WAIT);

    let outcome = orchestrator.run_once().await;

    assert_eq!(
        outcome,
        RunOutcome::Failed {
            reason: FailureReason::CreateTimeout
        }
    );
    assert_eq!(metrics.error.get(), 1);
    assert_eq!(metrics.success.get(), 0);
    assert!(api.upload_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_run_succeeds_after_upload_retries() {
    let api = Arc::new(
        MockApi::new()
            .with_create("acknowledged", "b1")
            .with_status(&status_line("create", "success"))
            .with_uploads(&["error", "error", "error", "error", "acknowledged"])
            .with_status(&status_line("upload b1", "success")),
    );
    let (orchestrator, metrics) = orchestrator(api.clone(), WAIT);

    let outcome = orchestrator.run_once().await;

    assert!(outcome.is_success());
    assert_eq!(metrics.success.get(), 1);
    assert_eq!(metrics.error.get(), 0);
    assert_eq!(metrics.upload_attempts.get(), 5);
    assert_eq!(api.upload_calls().len(), 5);

    let times = api.upload_times();
    for pair in times.windows(2) {
        assert!(pair[1] - pair[0] <= Duration::from_secs(5));
    }
}

#[tokio::test(start_paused = true)]
async fn test_run_fails_when_uploads_exhausted() {
    let api = Arc::new(
        MockApi::new()
            .with_create("acknowledged", "b1")
            .with_status(&status_line("create", "success"))
            .with_uploads(&["error"; 5]),
    );
    let (orchestrator, metrics) = orchestrator(api.clone(), WAIT);

    let outcome = orchestrator.run_once().await;

    assert_eq!(
        outcome,
        RunOutcome::Failed {
            reason: FailureReason::UploadExhausted { attempts: 5 }
        }
    );
    assert_eq!(metrics.error.get(), 1);
    assert_eq!(metrics.success.get(), 0);
    // No wait for an upload that was never triggered
    assert_eq!(api.status_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_fails_when_create_not_acknowledged() {
    let api = Arc::new(MockApi::new().with_create("rejected", ""));
    let (orchestrator, metrics) = orchestrator(api.clone(), WAIT);

    let outcome = orchestrator.run_once().await;

    assert_eq!(
        outcome,
        RunOutcome::Failed {
            reason: FailureReason::NotAcknowledged {
                status: "rejected".to_string()
            }
        }
    );
    assert_eq!(metrics.error.get(), 1);
    assert_eq!(metrics.success.get(), 0);
    assert_eq!(api.calls(), vec![Call::Create]);
}

#[tokio::test(start_paused = true)]
async fn test_run_fails_when_upload_never_completes() {
    let api = Arc::new(
        MockApi::new()
            .with_create("acknowledged", "b1")
            .with_status(&status_line("create", "success"))
            .with_uploads(&["acknowledged"])
            .with_status_fallback(&status_line("upload b1", "in progress")),
    );
    let (orchestrator, metrics) = orchestrator(api.clone(), WAIT);

    let outcome = orchestrator.run_once().await;

    assert_eq!(
        outcome,
        RunOutcome::Failed {
            reason: FailureReason::UploadTimeout {
                backup_name: "b1".to_string()
            }
        }
    );
    assert_eq!(metrics.error.get(), 1);
    assert_eq!(metrics.success.get(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_run_counts_transport_error_once() {
    let api = Arc::new(
        MockApi::new()
            .with_create("acknowledged", "b1")
            .with_status(&status_line("create", "in progress"))
            .with_status_failure("connection reset by peer"),
    );
    let (orchestrator, metrics) = orchestrator(api.clone(), WAIT);

    let outcome = orchestrator.run_once().await;

    match outcome {
        RunOutcome::Failed {
            reason: FailureReason::Error { message },
        } => assert!(message.contains("connection reset by peer")),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(metrics.error.get(), 1);
    assert_eq!(metrics.success.get(), 0);
    assert!(api.upload_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_create_transport_error_fails_run() {
    // Nothing scripted: the create call itself fails
    let api = Arc::new(MockApi::new());
    let (orchestrator, metrics) = orchestrator(api.clone(), WAIT);

    let outcome = orchestrator.run_once().await;

    assert!(matches!(
        outcome,
        RunOutcome::Failed {
            reason: FailureReason::Error { .. }
        }
    ));
    assert_eq!(metrics.error.get(), 1);
    assert_eq!(api.calls(), vec![Call::Create]);
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_run_is_skipped() {
    let api = Arc::new(
        MockApi::new()
            .with_create("acknowledged", "b1")
            .with_status_fallback(&status_line("create", "in progress")),
    );
    let (orchestrator, metrics) = orchestrator(api.clone(), WAIT);

    let (first, second) = tokio::join!(orchestrator.run_once(), orchestrator.run_once());

    assert_eq!(
        first,
        RunOutcome::Failed {
            reason: FailureReason::CreateTimeout
        }
    );
    assert_eq!(second, RunOutcome::Skipped);
    assert_eq!(metrics.skipped.get(), 1);
    assert_eq!(metrics.error.get(), 1);
    assert_eq!(metrics.success.get(), 0);
    assert_eq!(api.count(|c| matches!(c, Call::Create)), 1);
}

#[tokio::test(start_paused = true)]
async fn test_sequential_runs_each_count_once() {
    let api = Arc::new(
        MockApi::new()
            .with_create("rejected", "")
            .with_create("acknowledged", "b2")
            .with_status(&status_line("create", "success"))
            .with_uploads(&["acknowledged"])
            .with_status(&status_line("upload b2", "success")),
    );
    let (orchestrator, metrics) = orchestrator(api.clone(), WAIT);

    assert!(!orchestrator.run_once().await.is_success());
    assert!(orchestrator.run_once().await.is_success());

    assert_eq!(metrics.error.get(), 1);
    assert_eq!(metrics.success.get(), 1);
    assert_eq!(metrics.skipped.get(), 0);
}
