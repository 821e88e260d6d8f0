use epicflow_core::api::{AppConfig, CliError, EpicScheduler, SchedulerEvent, SchedulerOptions};
use tokio::sync::broadcast;

/// Wire the configured provider and runtime into a scheduler.
pub fn build_scheduler(cfg: &AppConfig) -> Result<EpicScheduler, CliError> {
    let provider = epicflow_plugins::factory::build_task_provider(cfg)
        .map_err(|e| CliError::Config(format!("task provider: {e:#}")))?;
    let runtime = epicflow_plugins::factory::build_agent_runtime(cfg)
        .map_err(|e| CliError::Config(format!("agent runtime: {e:#}")))?;

    tracing::info!(
        provider = provider.name(),
        runtime = runtime.name(),
        max_concurrent = cfg.scheduler.max_concurrent,
        mode = ?cfg.scheduler.mode,
        "scheduler configured"
    );
    Ok(EpicScheduler::new(
        provider,
        runtime,
        SchedulerOptions::from(&cfg.scheduler),
    ))
}

/// Forward scheduler events to the log until the channel closes.
pub fn spawn_event_logger(mut rx: broadcast::Receiver<SchedulerEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => log_event(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "event logger lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn log_event(event: &SchedulerEvent) {
    match event {
        SchedulerEvent::EpicStarted { epic_id, total, .. } => {
            tracing::info!("Epic {} started with {} children", epic_id, total);
        }
        SchedulerEvent::TaskStatusChanged { task_id, status, .. } => {
            tracing::debug!("Task {} -> {}", task_id, status);
        }
        SchedulerEvent::AgentSpawned {
            task_id,
            agent_id,
            running,
            ..
        } => {
            tracing::info!("Agent {} started for {} ({} running)", agent_id, task_id, running);
        }
        SchedulerEvent::SpawnFailed { task_id, error, .. } => {
            tracing::error!("Spawn for {} failed: {}", task_id, error);
        }
        SchedulerEvent::TaskCompleted {
            task_id, progress, ..
        } => {
            tracing::info!(
                "Task {} completed ({}/{}, {}%)",
                task_id,
                progress.completed,
                progress.total,
                progress.percentage()
            );
        }
        SchedulerEvent::OrphanedSpawn {
            task_id, agent_id, ..
        } => {
            tracing::warn!("Agent {} for {} outlived its epic", agent_id, task_id);
        }
        SchedulerEvent::EpicStalled {
            epic_id, blocked, ..
        } => {
            tracing::warn!("Epic {} stalled with {} blocked children", epic_id, blocked);
        }
        SchedulerEvent::EpicCompleted { epic_id, .. } | SchedulerEvent::EpicStopped { epic_id, .. } => {
            tracing::info!("Epic {}: {}", epic_id, event.name());
        }
    }
}
