use clap::{Args as ClapArgs, Parser, Subcommand};
use epicflow_core::api::{AppConfig, ExecutionMode};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Parallel,
    Sequential,
}

impl From<ModeArg> for ExecutionMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Parallel => ExecutionMode::Parallel,
            ModeArg::Sequential => ExecutionMode::Sequential,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "epicflow", version, about = "Run an epic's child tasks as concurrent agents")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

/// Overrides for the `[scheduler]` config section.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct SchedulerArgs {
    /// Maximum number of agents running at once.
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// all | p0 | p0-p1 | p0-p2 | none
    #[arg(long)]
    pub review_threshold: Option<String>,

    /// Only spawn agents on explicit request.
    #[arg(long, default_value_t = false)]
    pub no_auto_spawn: bool,
}

impl SchedulerArgs {
    pub fn apply(&self, cfg: &mut AppConfig) {
        if let Some(max) = self.max_concurrent {
            cfg.scheduler.max_concurrent = max;
        }
        if let Some(mode) = self.mode {
            cfg.scheduler.mode = mode.into();
        }
        if let Some(threshold) = &self.review_threshold {
            cfg.scheduler.review_threshold = match threshold.parse() {
                Ok(t) => t,
                Err(never) => match never {},
            };
        }
        if self.no_auto_spawn {
            cfg.scheduler.auto_spawn = false;
        }
    }
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// Epic whose children should be executed.
    pub epic_id: String,

    #[command(flatten)]
    pub scheduler: SchedulerArgs,

    /// Print scheduler events to stdout as JSON lines.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    #[arg(long)]
    pub session_id: Option<String>,

    #[command(flatten)]
    pub scheduler: SchedulerArgs,
}

impl ServeArgs {
    pub fn apply(&self, cfg: &mut AppConfig) {
        if let Some(host) = &self.host {
            cfg.http_server.host = host.clone();
        }
        if let Some(port) = self.port {
            cfg.http_server.port = port;
        }
        self.scheduler.apply(cfg);
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch an epic and feed completions from stdin, one task id per line.
    Run(RunArgs),
    /// Expose the scheduler over HTTP.
    Serve(ServeArgs),
}
