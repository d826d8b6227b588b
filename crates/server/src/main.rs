use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docpipe_core::config::ToolCommandConfig;
use docpipe_core::{load_config, validate_config, Config};
use docpipe_server::api::create_router;
use docpipe_server::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("DOCPIPE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Extraction service: {}", config.upstream.extraction_url);
    info!("Annotation service: {}", config.upstream.annotation_url);
    info!("Buffer directory: {:?}", config.pipeline.buffer_dir);
    info!(
        "Max concurrent runs: {}, cleanup: {:?}",
        config.pipeline.max_concurrent_runs, config.pipeline.cleanup
    );
    warn_incomplete_tool_setup(&config);

    tokio::fs::create_dir_all(&config.pipeline.buffer_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create buffer directory {:?}",
                config.pipeline.buffer_dir
            )
        })?;

    // Create app state
    let state = Arc::new(
        AppState::from_config(config.clone()).context("Failed to create upstream client")?,
    );

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

/// Tool homes are resolved per request, so a missing one is only a warning
/// at startup.
fn warn_incomplete_tool_setup(config: &Config) {
    let pipeline = &config.pipeline;
    let uses = |command: &ToolCommandConfig, name: &str| {
        command.command.referenced().iter().any(|p| p == name)
    };
    let any_uses = |name: &str| uses(&pipeline.scheduler, name) || uses(&pipeline.converter, name);

    if any_uses("scheduler_home") && pipeline.tools.resolve_scheduler_home().is_none() {
        warn!(
            env = %pipeline.tools.scheduler_home_env,
            "Scheduler home is not set; annotation requests will fail until it is"
        );
    }
    if any_uses("annotator_home") && pipeline.tools.resolve_annotator_home().is_none() {
        warn!(
            env = %pipeline.tools.annotator_home_env,
            "Annotator home is not set; annotation requests will fail until it is"
        );
    }
    if !pipeline.job_template.is_file() {
        warn!(
            path = %pipeline.job_template.display(),
            "Job template not found; annotation requests will fail until it exists"
        );
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
