use thiserror::Error;

use super::scheduler::SchedulerError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
    #[error("command failed: {0}")]
    Command(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}
