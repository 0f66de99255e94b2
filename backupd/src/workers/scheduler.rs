//! Cron scheduler worker

use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::backup::orchestrator::{Orchestrator, RunOutcome};
use crate::errors::BackupError;
use crate::settings::DEFAULT_SCHEDULE;

/// Scheduler worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Cron expression, see [`parse_schedule`]
    pub schedule: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            schedule: DEFAULT_SCHEDULE.to_string(),
        }
    }
}

/// Parse a cron expression. Five-field expressions (minute first) follow
/// standard cron and fire at second zero; six- and seven-field expressions
/// start with seconds and are passed to the `cron` crate as-is.
pub fn parse_schedule(expr: &str) -> Result<Schedule, BackupError> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    let normalized = match fields.len() {
        5 => {
            let day_of_week = normalize_day_of_week(fields[4])?;
            format!("0 {} {}", fields[..4].join(" "), day_of_week)
        }
        6 | 7 => fields.join(" "),
        n => {
            return Err(BackupError::ScheduleError(format!(
                "expected 5, 6 or 7 fields in '{}', got {}",
                expr, n
            )))
        }
    };

    Schedule::from_str(&normalized)
        .map_err(|e| BackupError::ScheduleError(format!("invalid schedule '{}': {}", expr, e)))
}

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Rewrite a standard cron day-of-week field (0-7, Sunday is 0 or 7) into
/// day names. The `cron` crate numbers days 1-7 from Sunday, names are
/// unambiguous in both.
fn normalize_day_of_week(field: &str) -> Result<String, BackupError> {
    if field == "*" || field == "?" {
        return Ok(field.to_string());
    }

    let invalid = || BackupError::ScheduleError(format!("invalid day of week '{}'", field));
    let parse_day = |s: &str| -> Result<usize, BackupError> {
        match s.parse::<usize>() {
            Ok(day) if day <= 7 => Ok(day),
            _ => Err(invalid()),
        }
    };

    let mut items: Vec<String> = Vec::new();
    for item in field.split(',') {
        // Names are already unambiguous
        if item.chars().any(|c| c.is_ascii_alphabetic()) {
            items.push(item.to_string());
            continue;
        }

        let (range, step) = match item.split_once('/') {
            Some((range, step)) => (range, step.parse::<usize>().map_err(|_| invalid())?),
            None => (item, 1),
        };
        if step == 0 {
            return Err(invalid());
        }

        let (start, end) = match range.split_once('-') {
            Some((start, end)) => (parse_day(start)?, parse_day(end)?),
            None if range == "*" => (0, 6),
            None if item.contains('/') => (parse_day(range)?, 7),
            None => {
                let day = parse_day(range)?;
                (day, day)
            }
        };
        if start > end {
            return Err(invalid());
        }

        for day in (start..=end).step_by(step) {
            let name = DAY_NAMES[day % 7].to_string();
            if !items.contains(&name) {
                items.push(name);
            }
        }
    }

    Ok(items.join(","))
}

/// Next fire time strictly after both the previous tick and `now`
fn next_tick(
    schedule: &Schedule,
    last_tick: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    schedule.after(&last_tick.max(now)).next()
}

/// Run the scheduler worker. Each tick runs the orchestrator on its own task;
/// on shutdown no new runs start and in-flight runs are awaited.
pub async fn run<S, F>(
    options: &Options,
    orchestrator: Arc<Orchestrator>,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Scheduler worker starting with schedule: {}", options.schedule);

    let schedule = match parse_schedule(&options.schedule) {
        Ok(schedule) => schedule,
        Err(e) => {
            error!("Scheduler worker cannot start: {}", e);
            return;
        }
    };

    let mut runs: JoinSet<RunOutcome> = JoinSet::new();
    let mut last_tick = Utc::now();

    loop {
        let Some(tick) = next_tick(&schedule, last_tick, Utc::now()) else {
            info!("Schedule has no upcoming ticks, stopping...");
            break;
        };
        let delay = (tick - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        debug!("Next backup at {} (in {:?})", tick, delay);

        // Check for shutdown
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Scheduler worker shutting down...");
                break;
            }
            _ = sleep_fn(delay) => {
                // Continue with run
            }
        }

        last_tick = tick;

        // Reap finished runs
        while let Some(result) = runs.try_join_next() {
            log_join_result(result);
        }

        let orchestrator = orchestrator.clone();
        runs.spawn(async move { orchestrator.run_once().await });
    }

    if !runs.is_empty() {
        info!("Waiting for {} in-flight backup run(s)...", runs.len());
    }
    while let Some(result) = runs.join_next().await {
        log_join_result(result);
    }
}

fn log_join_result(result: Result<RunOutcome, tokio::task::JoinError>) {
    match result {
        Ok(outcome) => debug!("Backup run finished: {:?}", outcome),
        Err(e) => error!("Backup run task failed: {}", e),
    }
}
