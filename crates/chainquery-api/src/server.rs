use crate::{create_router, AppState};
use chainquery_core::{ChainQueryError, ConfigManager, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

pub struct Server {
    state: AppState,
    addr: SocketAddr,
}

impl Server {
    pub fn new(addr: SocketAddr, config: Arc<ConfigManager>) -> Self {
        Self {
            state: AppState::new(config),
            addr,
        }
    }

    /// Bind address from the `[server]` section
    pub fn from_config(config: Arc<ConfigManager>) -> Result<Self> {
        let server = &config.config().server;
        let addr: SocketAddr = format!("{}:{}", server.host, server.port)
            .parse()
            .map_err(|e| ChainQueryError::Validation(format!("invalid bind address: {}", e)))?;
        Ok(Self::new(addr, config))
    }

    pub async fn run(self) -> Result<()> {
        let model_enabled = self.state.resolver.has_model();
        let router = create_router(self.state);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;

        info!("ChainQuery API listening on http://{}", self.addr);
        info!(
            "Model-assisted analysis: {}",
            if model_enabled { "enabled" } else { "disabled" }
        );
        info!("  GET  /health");
        info!("  POST /api/query/resolve");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
