//! Resource server.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handlers::AppState;
use crate::router::build_router;
use c9_repo::{ObjectStore, RepoConfig};
use std::sync::Arc;
use tokio::net::TcpListener;

/// The resource server.
///
/// Owns the opened repository and serves the blob, user and group resources
/// over HTTP until a shutdown signal arrives.
///
/// # Example
///
/// ```rust,ignore
/// use c9_server::{C9Server, ServerConfig};
///
/// let server = C9Server::open(ServerConfig::default())?;
/// server.serve().await?;
/// ```
pub struct C9Server {
    config: ServerConfig,
    store: Arc<ObjectStore>,
}

impl C9Server {
    /// Opens the repository named in `config`.
    pub fn open(config: ServerConfig) -> ServerResult<Self> {
        let repo_config = RepoConfig::new().sync_on_commit(config.sync_on_commit);
        let store = ObjectStore::open_with_config(&config.data_dir, repo_config)?;
        Ok(Self::with_store(config, store))
    }

    /// Wraps an already opened repository.
    pub fn with_store(config: ServerConfig, store: ObjectStore) -> Self {
        Self {
            config,
            store: Arc::new(store),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Builds the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(AppState::new(Arc::clone(&self.store)), &self.config)
    }

    /// Serves requests until interrupted, then closes the repository.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(
            addr = %self.config.bind_addr,
            data_dir = %self.config.data_dir.display(),
            "c9 server listening"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;

        match Arc::try_unwrap(self.store) {
            Ok(store) => store.close(),
            Err(_) => tracing::warn!("repository still referenced at shutdown"),
        }
        tracing::info!("c9 server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
