use serde::{Deserialize, Serialize};

use crate::epic::types::{ExecutionMode, ExecutionSettings, ReviewThreshold};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub task_provider: TaskProviderConfig,

    #[serde(default)]
    pub agent_runtime: AgentRuntimeConfig,

    #[serde(default)]
    pub http_server: HttpServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default)]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "epicflow_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: false,
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub mode: ExecutionMode,

    #[serde(default)]
    pub review_threshold: ReviewThreshold,

    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    #[serde(default = "default_auto_spawn")]
    pub auto_spawn: bool,

    /// Delay between spawns of the initial wave.
    #[serde(default = "default_stagger_ms")]
    pub stagger_ms: u64,

    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_max_concurrent() -> usize {
    3
}

fn default_auto_spawn() -> bool {
    true
}

fn default_stagger_ms() -> u64 {
    500
}

fn default_event_capacity() -> usize {
    256
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::default(),
            review_threshold: ReviewThreshold::default(),
            max_concurrent: default_max_concurrent(),
            auto_spawn: default_auto_spawn(),
            stagger_ms: default_stagger_ms(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl SchedulerConfig {
    pub fn default_settings(&self) -> ExecutionSettings {
        ExecutionSettings {
            mode: self.mode,
            review_threshold: self.review_threshold.clone(),
            max_concurrent: self.max_concurrent,
            auto_spawn: self.auto_spawn,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpEndpointConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for HttpEndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileProviderConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DryRunRuntimeConfig {}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider")]
pub enum TaskProviderConfig {
    #[serde(rename = "http")]
    Http(HttpEndpointConfig),
    #[serde(rename = "file")]
    File(FileProviderConfig),
}

impl Default for TaskProviderConfig {
    fn default() -> Self {
        TaskProviderConfig::Http(HttpEndpointConfig::default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider")]
pub enum AgentRuntimeConfig {
    #[serde(rename = "http")]
    Http(HttpEndpointConfig),
    #[serde(rename = "dry-run")]
    DryRun(DryRunRuntimeConfig),
}

impl Default for AgentRuntimeConfig {
    fn default() -> Self {
        AgentRuntimeConfig::Http(HttpEndpointConfig::default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_http_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub port: u16,
}

fn default_http_host() -> String {
    "127.0.0.1".to_string()
}

fn default_http_port() -> u16 {
    8787
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: default_http_host(),
            port: default_http_port(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg: AppConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.scheduler.max_concurrent, 3);
        assert_eq!(cfg.scheduler.stagger_ms, 500);
        assert_eq!(cfg.http_server.port, 8787);
        assert!(matches!(cfg.task_provider, TaskProviderConfig::Http(_)));
        assert!(matches!(cfg.agent_runtime, AgentRuntimeConfig::Http(_)));
    }

    #[test]
    fn tagged_sections_parse() {
        let cfg: AppConfig = toml::from_str(
            r#"
[scheduler]
mode = "sequential"
review_threshold = "p0-p1"
max_concurrent = 5
auto_spawn = false

[task_provider]
provider = "file"
path = "/tmp/epic.json"

[agent_runtime]
provider = "dry-run"
"#,
        )
        .unwrap();

        let settings = cfg.scheduler.default_settings();
        assert_eq!(settings.mode, ExecutionMode::Sequential);
        assert_eq!(settings.review_threshold, ReviewThreshold::P0P1);
        assert_eq!(settings.max_concurrent, 5);
        assert!(!settings.auto_spawn);

        match cfg.task_provider {
            TaskProviderConfig::File(f) => assert_eq!(f.path, "/tmp/epic.json"),
            other => panic!("unexpected provider: {other:?}"),
        }
        assert!(matches!(cfg.agent_runtime, AgentRuntimeConfig::DryRun(_)));
    }
}
