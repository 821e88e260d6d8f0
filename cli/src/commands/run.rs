use std::future::Future;

use epicflow_core::api::{AppConfig, CliError, EpicScheduler, SchedulerError};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

use super::cli::RunArgs;
use crate::app::{build_scheduler, spawn_event_logger};

/// How a `run` session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    InputClosed,
    Interrupted,
}

pub async fn handle_run(args: RunArgs, mut cfg: AppConfig) -> Result<i32, CliError> {
    args.scheduler.apply(&mut cfg);
    let scheduler = build_scheduler(&cfg)?;
    let logger = spawn_event_logger(scheduler.subscribe());
    let printer = args.json.then(|| spawn_json_printer(scheduler.subscribe()));

    let report = scheduler.launch(&args.epic_id, None).await?;
    println!(
        "epic {} \"{}\": {} children, {} spawned",
        report.epic_id,
        report.title,
        report.total,
        report.initial_wave.iter().filter(|r| r.success).count()
    );
    for failed in report.initial_wave.iter().filter(|r| !r.success) {
        println!(
            "  not spawned {}: {}",
            if failed.task_id.is_empty() { "-" } else { failed.task_id.as_str() },
            failed.error.as_deref().unwrap_or("unknown error")
        );
    }

    let stdin = BufReader::new(tokio::io::stdin());
    let outcome = drive_completions(&scheduler, stdin, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;

    let progress = scheduler.progress().await;
    println!(
        "{}/{} children completed ({:?})",
        progress.completed, progress.total, outcome
    );
    if outcome == RunOutcome::Interrupted {
        scheduler.stop().await;
    }

    drop(scheduler);
    let _ = logger.await;
    if let Some(printer) = printer {
        let _ = printer.await;
    }
    Ok(0)
}

/// Feed completion notifications, one task id per line, until the epic is
/// complete, the input ends or `shutdown` resolves.
pub async fn drive_completions<R, S>(
    scheduler: &EpicScheduler,
    reader: R,
    shutdown: S,
) -> Result<RunOutcome, CliError>
where
    R: AsyncBufRead + Unpin,
    S: Future<Output = ()>,
{
    if scheduler.is_epic_complete().await {
        return Ok(RunOutcome::Completed);
    }

    let mut lines = reader.lines();
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("interrupted; stopping epic");
                return Ok(RunOutcome::Interrupted);
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            tracing::info!("completion input closed");
            return Ok(RunOutcome::InputClosed);
        };

        let task_id = line.trim();
        if task_id.is_empty() {
            continue;
        }

        match scheduler.complete_task(task_id).await {
            Ok(Some(next)) if next.success => {
                println!("{} done -> started {}", task_id, next.task_id);
            }
            Ok(Some(next)) => {
                println!(
                    "{} done -> spawn for {} failed: {}",
                    task_id,
                    next.task_id,
                    next.error.as_deref().unwrap_or("unknown error")
                );
            }
            Ok(None) => println!("{} done", task_id),
            Err(SchedulerError::UnknownTask(id)) => {
                tracing::warn!(task_id = %id, "ignoring completion for unknown task");
                continue;
            }
            Err(e) => return Err(e.into()),
        }

        if scheduler.is_epic_complete().await {
            return Ok(RunOutcome::Completed);
        }
    }
}

fn spawn_json_printer(
    mut rx: broadcast::Receiver<epicflow_core::api::SchedulerEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(line) => println!("{line}"),
                    Err(e) => tracing::warn!(error = %e, "failed to encode event"),
                },
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
