//! Scheduler worker tests

use std::sync::Arc;
use std::time::Duration;

use chbackupd::workers::scheduler::{self, Options};

use crate::common::{orchestrator, Call, MockApi};

#[tokio::test(start_paused = true)]
async fn test_scheduler_fires_runs_until_shutdown() {
    let api = Arc::new(
        MockApi::new()
            .with_create("rejected", "")
            .with_create("rejected", "")
            .with_create("rejected", "")
            .with_create("rejected", "")
            .with_create("rejected", "")
            .with_create("rejected", "")
            .with_create("rejected", "")
            .with_create("rejected", ""),
    );
    let (orchestrator, metrics) = orchestrator(api.clone(), Duration::from_secs(30));

    // Every second; the paused clock advances to each tick
    let options = Options {
        schedule: "* * * * * *".to_string(),
    };
    scheduler::run(
        &options,
        Arc::new(orchestrator),
        tokio::time::sleep,
        Box::pin(tokio::time::sleep(Duration::from_secs(10))),
    )
    .await;

    let creates = api.count(|c| matches!(c, Call::Create));
    assert!(creates >= 3, "expected several runs, got {}", creates);
    assert_eq!(metrics.error.get() as usize, creates);
    assert_eq!(metrics.success.get(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_with_invalid_schedule_returns() {
    let api = Arc::new(MockApi::new());
    let (orchestrator, metrics) = orchestrator(api.clone(), Duration::from_secs(30));

    let options = Options {
        schedule: "not a schedule".to_string(),
    };
    scheduler::run(
        &options,
        Arc::new(orchestrator),
        tokio::time::sleep,
        Box::pin(std::future::pending::<()>()),
    )
    .await;

    assert!(api.calls().is_empty());
    assert_eq!(metrics.error.get(), 0);
}
