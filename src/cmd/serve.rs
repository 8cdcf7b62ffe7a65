use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use reelgrab::{create_router, AppState, Config, RouterOptions};

use super::build_service;

pub async fn cmd_serve(config: Config) -> Result<()> {
    let service = build_service(&config)?;
    let renderer = Arc::clone(service.renderer());
    let options = RouterOptions::from(&config);

    info!(
        renderer = renderer.name(),
        device = %config.device,
        selection = ?config.selection,
        allow = %config.allow.describe(),
        static_dir = ?options.static_dir,
        "Starting reelgrab {}",
        reelgrab::VERSION
    );

    let app = create_router(AppState::new(service), &options);

    let listener = bind(&config.host, config.port).await?;
    let addr = listener.local_addr().context("listener has no local address")?;

    info!("Listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    renderer.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Bind `host:port`, where `host` may be a name such as `localhost`.
async fn bind(host: &str, port: u16) -> Result<TcpListener> {
    TcpListener::bind((host, port))
        .await
        .with_context(|| format!("failed to bind {host}:{port}"))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn binds_host_names() {
        let listener = bind("localhost", 0).await.unwrap();
        assert!(listener.local_addr().unwrap().ip().is_loopback());
    }

    #[tokio::test]
    async fn binds_ip_literals() {
        let listener = bind("127.0.0.1", 0).await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }
}
