use crate::{create_router, AppState};
use anyhow::{Context, Result};
use rating_core::Settings;
use std::net::SocketAddr;
use tokio::signal;
use tracing::info;

pub struct Server {
    state: AppState,
    host: String,
    port: u16,
}

/// Resolve `host` (IP literal or hostname) to the first listen address.
pub async fn resolve_listen_addr(host: &str, port: u16) -> Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await
        .with_context(|| format!("resolving listen address {}:{}", host, port))?
        .next()
        .with_context(|| format!("no address found for {}:{}", host, port))
}

impl Server {
    pub fn new(settings: Settings) -> Result<Self> {
        let host = settings.server.host.clone();
        let port = settings.server.port;
        let state = AppState::new(settings).context("initialising application state")?;
        Ok(Self { state, host, port })
    }

    pub async fn run(self) -> Result<()> {
        let addr = resolve_listen_addr(&self.host, self.port).await?;
        let router = create_router(self.state);

        // Bind with tuned socket options for better keep-alive behavior
        let listener = {
            let socket = if addr.is_ipv6() {
                tokio::net::TcpSocket::new_v6()
            } else {
                tokio::net::TcpSocket::new_v4()
            }?;

            // Reuse addr to improve rebind under restarts
            let _ = socket.set_reuseaddr(true);
            let _ = socket.set_keepalive(true);

            socket
                .bind(addr)
                .with_context(|| format!("binding {}", addr))?;
            socket.listen(1024)?
        };

        info!("rating-service listening on http://{}", addr);
        info!("  POST /delta - Receive change notifications");
        info!("  GET /health - Liveness check");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("serving HTTP")?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}
