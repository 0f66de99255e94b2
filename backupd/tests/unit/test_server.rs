//! Metrics server tests

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use chbackupd::metrics::BackupMetrics;
use chbackupd::server::serve::router;
use chbackupd::server::state::ServerState;
use tower::ServiceExt;

fn app(metrics: Arc<BackupMetrics>) -> axum::Router {
    router(Arc::new(ServerState::new(metrics)))
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Option<String>, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_counters() {
    let metrics = Arc::new(BackupMetrics::new().unwrap());
    metrics.success.inc();
    metrics.success.inc();
    metrics.error.inc();

    let (status, content_type, body) = get(app(metrics), "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some(prometheus::TEXT_FORMAT));
    assert!(body.contains("# HELP chb_backup_success_total number of successful backups"));
    assert!(body.contains("chb_backup_success_total 2"));
    assert!(body.contains("# HELP chb_backup_error_total number of errored backups"));
    assert!(body.contains("chb_backup_error_total 1"));
}

#[tokio::test]
async fn test_health_endpoint() {
    let metrics = Arc::new(BackupMetrics::new().unwrap());

    let (status, _, body) = get(app(metrics), "/health").await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "chbackupd");
}

#[tokio::test]
async fn test_unknown_route() {
    let metrics = Arc::new(BackupMetrics::new().unwrap());
    let (status, _, _) = get(app(metrics), "/backup/create").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
