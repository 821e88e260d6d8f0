use std::path::{Path, PathBuf};

use super::types::{AgentRuntimeConfig, AppConfig, TaskProviderConfig};

/// Get the default epicflow data directory: ~/.epicflow
pub fn get_epicflow_data_dir() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".epicflow"))
}

/// Config files in priority order: $EPICFLOW_CONFIG, ~/.epicflow/config.toml, ./config.toml
pub fn config_file_candidates() -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Ok(v) = std::env::var("EPICFLOW_CONFIG") {
        if !v.trim().is_empty() {
            out.push(PathBuf::from(v));
        }
    }
    if let Ok(dir) = get_epicflow_data_dir() {
        out.push(dir.join("config.toml"));
    }
    out.push(PathBuf::from("config.toml"));
    out
}

pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("read {} failed: {e}", path.display()))?;
    let cfg = toml::from_str::<AppConfig>(&s)
        .map_err(|e| anyhow::anyhow!("parse {} failed: {e}", path.display()))?;
    Ok(cfg)
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    let mut cfg = match config_file_candidates().into_iter().find(|p| p.exists()) {
        Some(path) => load_from_path(&path)?,
        None => AppConfig::default(),
    };

    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok())?;
    Ok(cfg)
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

/// Environment variable overrides (highest priority).
fn apply_env_overrides<F>(cfg: &mut AppConfig, get: F) -> anyhow::Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let TaskProviderConfig::Http(ref mut http) = cfg.task_provider {
        if let Some(v) = non_empty(get("EPICFLOW_PROVIDER_URL")) {
            http.base_url = v;
        }
        if let Some(v) = non_empty(get("EPICFLOW_PROVIDER_API_KEY")) {
            http.api_key = v;
        }
    }

    if let AgentRuntimeConfig::Http(ref mut http) = cfg.agent_runtime {
        if let Some(v) = non_empty(get("EPICFLOW_RUNTIME_URL")) {
            http.base_url = v;
        }
        if let Some(v) = non_empty(get("EPICFLOW_RUNTIME_API_KEY")) {
            http.api_key = v;
        }
    }

    if let Some(v) = non_empty(get("EPICFLOW_MAX_CONCURRENT")) {
        cfg.scheduler.max_concurrent = v
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("EPICFLOW_MAX_CONCURRENT must be an integer, got {v:?}"))?;
    }

    Ok(())
}
