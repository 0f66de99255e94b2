//! chbackupd - Entry Point
//!
//! Runs clickhouse-backup create and upload on a cron schedule and exposes
//! the outcomes as Prometheus counters.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use chbackupd::app::options::AppOptions;
use chbackupd::app::run::{run, run_once};
use chbackupd::logs::{init_logging, LogOptions};
use chbackupd::settings::Settings;
use chbackupd::utils::version_info;

use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to render version: {e}"),
        }
        return;
    }

    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };

    // Print the resolved settings and exit
    if cli_args.contains_key("check-config") {
        match serde_json::to_string_pretty(&settings) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to render settings: {e}"),
        }
        return;
    }

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        log_dir: settings.log_dir.as_ref().map(PathBuf::from),
        format: settings.log_format,
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            println!("Failed to initialize logging: {e}");
            None
        }
    };

    let options = AppOptions::from(&settings);

    // Run a single backup and exit
    if cli_args.contains_key("once") {
        info!("Running a single backup against {}", options.backup_base_url);
        match run_once(options).await {
            Ok(outcome) if outcome.is_success() => return,
            Ok(outcome) => error!("Backup did not succeed: {:?}", outcome),
            Err(e) => error!("Failed to run backup: {e}"),
        }
        std::process::exit(1);
    }

    info!(
        "Running chbackupd {} ({}) at schedule: {}",
        version.version, version.git_hash, options.scheduler.schedule
    );
    info!("Options: {:?}", options);
    if let Err(e) = run(options, await_shutdown_signal()).await {
        error!("Failed to run the orchestrator: {e}");
        std::process::exit(1);
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                (Err(e), _) | (_, Err(e)) => {
                    error!("Failed to install signal handlers: {e}");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
        }
        info!("Ctrl+C received, shutting down...");
    }
}
