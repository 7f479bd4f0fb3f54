use std::future::Future;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use tos_core::BlobService;
use tos_store::OpenedStore;

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::icon::IconFinder;
use crate::router::build_router;
use crate::state::AppState;

/// tos HTTP server.
pub struct TosServer {
    config: ServerConfig,
}

impl TosServer {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serve until Ctrl-C / SIGTERM.
    pub async fn serve(self) -> ServerResult<()> {
        self.serve_with_shutdown(shutdown_signal()).await
    }

    /// Serve until `signal` resolves. Pending long-poll reads are cancelled
    /// (503) so the graceful drain does not wait out their deadlines.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.config.validate()?;
        let opened = tos_store::open(&self.config.store).await?;
        let sweeper = match &opened {
            OpenedStore::Memory(store) => {
                Some(store.spawn_sweeper(Duration::from_secs(self.config.memory_sweep_secs)))
            }
            OpenedStore::Redis(_) => None,
        };

        let service = BlobService::new(opened.kv(), self.config.core())?;
        let icons = IconFinder::new(&self.config.icon)?;
        let shutdown = CancellationToken::new();
        let state = AppState::new(service, icons, shutdown.clone());
        let app = build_router(state, self.config.max_body_bytes);

        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("tos server listening on {}", listener.local_addr()?);
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                signal.await;
                info!("shutting down; cancelling pending waits");
                shutdown.cancel();
            })
            .await?;

        if let Some(sweeper) = sweeper {
            sweeper.abort();
        }
        Ok(())
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[test]
    fn server_construction() {
        let server = TosServer::new(ServerConfig::default());
        assert_eq!(server.config().bind_addr, "0.0.0.0:5678".parse().unwrap());
    }

    #[tokio::test]
    async fn invalid_config_fails_before_binding() {
        let config = ServerConfig {
            entry_ttl_secs: 0,
            ..ServerConfig::default()
        };
        let result = TosServer::new(config)
            .serve_with_shutdown(std::future::ready(()))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn serves_and_shuts_down() {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..ServerConfig::default()
        };
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(TosServer::new(config).serve_with_shutdown(async move {
            let _ = rx.await;
        }));
        tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}
