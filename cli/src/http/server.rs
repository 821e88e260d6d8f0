use super::{
    middleware::{create_middleware_stack, create_trace_layer, request_logger},
    routes::create_router,
    AppState,
};
use crate::app::{build_scheduler, spawn_event_logger};
use crate::commands::cli::ServeArgs;
use axum::middleware;
use epicflow_core::api::{AppConfig, CliError};
use std::net::SocketAddr;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl From<&AppConfig> for ServerConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            host: cfg.http_server.host.clone(),
            port: cfg.http_server.port,
        }
    }
}

/// `epicflow serve`
pub async fn handle_serve(args: ServeArgs, mut cfg: AppConfig) -> Result<(), CliError> {
    args.apply(&mut cfg);
    let session_id = args
        .session_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let scheduler = build_scheduler(&cfg)?;
    let _logger = spawn_event_logger(scheduler.subscribe());

    let (shutdown_tx, _) = broadcast::channel(1);
    let state = AppState::new(session_id, scheduler, shutdown_tx);

    start_server(ServerConfig::from(&cfg), state)
        .await
        .map_err(|e: Box<dyn std::error::Error + Send + Sync>| CliError::Command(e.to_string()))
}

pub async fn start_server(
    config: ServerConfig,
    state: AppState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = create_router(state.clone())
        .layer(middleware::from_fn(request_logger))
        .layer(create_trace_layer())
        .layer(create_middleware_stack());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        session_id = %state.session_id,
        "HTTP server listening on http://{}",
        addr
    );

    let mut shutdown_rx = state.shutdown_tx.subscribe();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = signal::ctrl_c() => {
                    info!("Received Ctrl+C signal");
                }
                _ = shutdown_rx.recv() => {
                    info!("Received shutdown signal from API");
                }
                _ = wait_for_sigterm() => {
                    info!("Received SIGTERM signal");
                }
            }
            info!("Starting graceful shutdown...");
        })
        .await?;

    // In-flight agents keep running; the scheduler only forgets them.
    state.scheduler.stop().await;
    info!("Server shutdown complete");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_sigterm() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::warn!("Failed to install SIGTERM handler: {}", e);
            std::future::pending::<()>().await
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_sigterm() {
    std::future::pending::<()>().await
}
