//! Main application run loop

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::app::options::{AppOptions, LifecycleOptions};
use crate::app::state::AppState;
use crate::backup::orchestrator::RunOutcome;
use crate::errors::BackupError;
use crate::server::serve::serve;
use crate::server::state::ServerState;
use crate::workers::scheduler;

/// Run the orchestrator service until `shutdown_signal` resolves
pub async fn run(
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), BackupError> {
    info!("Initializing backup orchestrator...");

    // Create shutdown channel
    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut shutdown_manager = ShutdownManager::new(shutdown_tx.clone(), options.lifecycle.clone());

    if let Err(e) = init(&options, shutdown_tx.clone(), &mut shutdown_manager).await {
        error!("Failed to start orchestrator: {}", e);
        shutdown_manager.shutdown().await?;
        return Err(e);
    }

    shutdown_signal.await;
    info!("Shutdown signal received, shutting down...");

    // Shutdown
    drop(shutdown_tx);
    shutdown_manager.shutdown().await
}

/// Run a single backup immediately, without scheduler or server
pub async fn run_once(options: AppOptions) -> Result<RunOutcome, BackupError> {
    let app_state = AppState::init(&options)?;
    Ok(app_state.orchestrator.run_once().await)
}

// =============================== INITIALIZATION ================================== //

async fn init(
    options: &AppOptions,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_manager: &mut ShutdownManager,
) -> Result<(), BackupError> {
    // Reject a bad schedule before anything starts
    scheduler::parse_schedule(&options.scheduler.schedule)?;

    let app_state = Arc::new(AppState::init(options)?);

    if options.enable_metrics_server {
        init_metrics_server(
            options,
            app_state.clone(),
            shutdown_manager,
            shutdown_tx.subscribe(),
        )
        .await?;
    }

    init_scheduler_worker(
        options.scheduler.clone(),
        app_state,
        shutdown_manager,
        shutdown_tx.subscribe(),
    )
    .await?;

    Ok(())
}

async fn init_scheduler_worker(
    options: scheduler::Options,
    app_state: Arc<AppState>,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), BackupError> {
    info!("Initializing scheduler worker...");

    let orchestrator = app_state.orchestrator.clone();

    let scheduler_handle = tokio::spawn(async move {
        scheduler::run(
            &options,
            orchestrator,
            tokio::time::sleep,
            Box::pin(async move {
                let _ = shutdown_rx.recv().await;
            }),
        )
        .await;
    });

    shutdown_manager.with_scheduler_worker_handle(scheduler_handle)?;
    Ok(())
}

async fn init_metrics_server(
    options: &AppOptions,
    app_state: Arc<AppState>,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), BackupError> {
    info!("Initializing metrics server...");

    let server_state = ServerState::new(app_state.metrics.clone());

    let server_handle = serve(options.server.addr, Arc::new(server_state), async move {
        let _ = shutdown_rx.recv().await;
    })
    .await?;

    shutdown_manager.with_metrics_server_handle(server_handle)?;
    Ok(())
}

// ================================= SHUTDOWN ===================================== //

struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    lifecycle_options: LifecycleOptions,
    metrics_server_handle: Option<JoinHandle<Result<(), BackupError>>>,
    scheduler_worker_handle: Option<JoinHandle<()>>,
}

impl ShutdownManager {
    pub fn new(shutdown_tx: broadcast::Sender<()>, lifecycle_options: LifecycleOptions) -> Self {
        Self {
            shutdown_tx,
            lifecycle_options,
            metrics_server_handle: None,
            scheduler_worker_handle: None,
        }
    }

    pub fn with_scheduler_worker_handle(
        &mut self,
        handle: JoinHandle<()>,
    ) -> Result<(), BackupError> {
        if self.scheduler_worker_handle.is_some() {
            return Err(BackupError::ShutdownError(
                "scheduler_handle already set".to_string(),
            ));
        }
        self.scheduler_worker_handle = Some(handle);
        Ok(())
    }

    pub fn with_metrics_server_handle(
        &mut self,
        handle: JoinHandle<Result<(), BackupError>>,
    ) -> Result<(), BackupError> {
        if self.metrics_server_handle.is_some() {
            return Err(BackupError::ShutdownError("server_handle already set".to_string()));
        }
        self.metrics_server_handle = Some(handle);
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), BackupError> {
        let _ = self.shutdown_tx.send(());

        match tokio::time::timeout(
            self.lifecycle_options.max_shutdown_delay,
            self.shutdown_impl(),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "Shutdown timed out after {:?}, abandoning in-flight work...",
                    self.lifecycle_options.max_shutdown_delay
                );
                Err(BackupError::ShutdownError("shutdown timed out".to_string()))
            }
        }
    }

    async fn shutdown_impl(&mut self) -> Result<(), BackupError> {
        info!("Shutting down backup orchestrator...");

        // 1. Scheduler worker, waits for in-flight runs
        if let Some(handle) = self.scheduler_worker_handle.take() {
            handle
                .await
                .map_err(|e| BackupError::ShutdownError(e.to_string()))?;
        }

        // 2. Metrics server
        if let Some(handle) = self.metrics_server_handle.take() {
            handle
                .await
                .map_err(|e| BackupError::ShutdownError(e.to_string()))??;
        }

        info!("Shutdown complete");
        Ok(())
    }
}
