//! Resume Cache demo process
//!
//! Runs the prime workload against a `TimedCache` and exposes a control API
//! for pausing and resuming the process-side resources.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use resume_cache::api::{create_router, AppState};
use resume_cache::tasks::{PrimeCache, PrimeWorkload};
use resume_cache::{Config, LifecycleManager, TimedCache};

/// Main entry point for the demo process.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from the properties file and environment variables
/// 3. Create the cache, which schedules its first sweep
/// 4. Register the cache and the workload with the lifecycle manager
/// 5. Start the workload and, if configured, the simulated checkpoint
/// 6. Serve the control API until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber with env filter
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resume_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "{} Starting application (PID {})",
        chrono::Local::now().format("%H:%M:%S%.3f"),
        std::process::id()
    );

    let config = Config::load();
    info!(
        "Configuration loaded: interval={}s, initial_cache_clean_delay={}s, cache_timeout={}s, sweep_interval={}s, port={}",
        config.interval,
        config.initial_cache_clean_delay,
        config.cache_timeout,
        config.sweep_interval,
        config.server_port
    );

    let cache: Arc<PrimeCache> = Arc::new(TimedCache::new(config.cache_settings())?);
    info!("Cache initialized");

    let lifecycle = Arc::new(LifecycleManager::new());
    lifecycle.register(cache.clone());

    let mut workload = PrimeWorkload::new(cache.clone(), config.workload_settings());
    let (checkpoint_tx, mut checkpoint_rx) = mpsc::channel(1);
    if let Some(after_runs) = config.checkpoint_after_runs {
        info!("Simulated checkpoint after run {}", after_runs);
        workload = workload.with_checkpoint(after_runs, checkpoint_tx);
    }
    let workload = Arc::new(workload);
    lifecycle.register(workload.clone());
    workload.start().await?;

    // Checkpoint requests come from the workload loop, which the checkpoint
    // itself stops, so they are served from a separate task
    let checkpoint_pause = Duration::from_secs(config.checkpoint_pause);
    let checkpoint_lifecycle = lifecycle.clone();
    tokio::spawn(async move {
        while checkpoint_rx.recv().await.is_some() {
            if let Err(err) = checkpoint_lifecycle.checkpoint(checkpoint_pause).await {
                error!("Checkpoint failed: {}", err);
            }
        }
    });

    let app = create_router(AppState::new(cache.clone(), lifecycle.clone()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Control API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("control API failed")?;

    if workload.is_running().await {
        workload.stop().await?;
    }
    cache.shutdown().await;
    info!("Shutdown complete, {} elements cached", cache.size());
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
