use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use ems_api_rust::{config, routes, state};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, TB_USERNAME, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::config();
    tracing::info!("Starting EMS API in {:?} mode", config.environment);

    let (db, state) = state::bootstrap(config).await?;

    if config.scheduler.sync_on_startup {
        let sync = state.sync.clone();
        tokio::spawn(async move {
            match sync.sync_directory().await {
                Ok(report) => tracing::info!("Startup sync cached {} devices", report.count),
                Err(e) => tracing::error!("Startup sync failed: {}", e),
            }
        });
    }

    let cancel = CancellationToken::new();
    let poller = state.scheduler.clone().start(cancel.clone());

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("EMS API listening on http://{}", bind_addr);

    let shutdown = cancel.clone();
    axum::serve(listener, routes::app(state))
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown requested");
            shutdown.cancel();
        })
        .await
        .context("server error")?;

    cancel.cancel();
    let _ = poller.await;
    db.close().await;
    Ok(())
}
