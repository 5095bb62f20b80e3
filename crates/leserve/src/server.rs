//! Server instance management

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::signal;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::handlers::{build_app, AppState};
use leroutage::SharedStorage;
use lestockage::Storage;

/// LeServe HTTP server
///
/// Owns the shared storage handle and runs the Axum server until a
/// shutdown signal arrives.
pub struct LeServeServer {
    /// Server configuration
    config: ServerConfig,

    /// Storage shared with handlers and the intake router
    storage: SharedStorage,
}

impl LeServeServer {
    /// Create new server instance
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    ///
    /// # Returns
    ///
    /// `Result<LeServeServer, ApiError>` - Server or error
    pub fn new(config: ServerConfig) -> Result<Self, ApiError> {
        if let Err(e) = config.validate() {
            return Err(ApiError::internal(format!("Invalid config: {}", e)));
        }

        let storage = Storage::open_with_config(&config.db_path, config.storage_config())
            .map_err(|e| {
                error!("Failed to open storage: {}", e);
                ApiError::internal(format!("Failed to open storage: {}", e))
            })?;

        Ok(Self::with_storage(config, storage))
    }

    /// Create a server over an already opened storage
    pub fn with_storage(config: ServerConfig, storage: Storage) -> Self {
        Self {
            config,
            storage: Arc::new(Mutex::new(storage)),
        }
    }

    /// Get socket address for binding
    pub fn socket_addr(&self) -> Result<SocketAddr, ApiError> {
        self.config.socket_addr().map_err(ApiError::internal)
    }

    /// Start server and serve until Ctrl+C or SIGTERM
    pub async fn start(&self) -> Result<(), ApiError> {
        let addr = self.socket_addr()?;

        let state = AppState::new_from_arc(Arc::clone(&self.storage), self.config.clone());
        let app = build_app(state);

        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            error!("Failed to bind to {}: {:?}", addr, e);
            ApiError::internal(format!("Failed to bind to {}: {}", addr, e))
        })?;

        info!("Server listening on: {}", self.server_url());

        axum::serve(listener, app)
            .with_graceful_shutdown(Self::wait_for_shutdown())
            .await
            .map_err(|e| ApiError::internal(format!("Server error: {}", e)))?;

        self.checkpoint();
        Ok(())
    }

    /// Wait for shutdown signal
    ///
    /// Resolves on Ctrl+C, or SIGTERM on Unix. A handler that cannot be
    /// installed is logged and never fires.
    pub async fn wait_for_shutdown() {
        let ctrl_c = async {
            match signal::ctrl_c().await {
                Ok(()) => info!("Received shutdown signal"),
                Err(e) => {
                    warn!("Failed to install Ctrl+C handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(unix)]
        let terminate = async {
            use tokio::signal::unix;
            match unix::signal(unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                    info!("Received TERM signal");
                }
                Err(e) => {
                    warn!("Failed to install TERM handler: {}", e);
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

    /// Flush the WAL before exit
    fn checkpoint(&self) {
        match self.storage.lock() {
            Ok(mut storage) => {
                if let Err(e) = storage.close() {
                    warn!("WAL checkpoint failed: {}", e);
                }
            }
            Err(e) => warn!("storage mutex poisoned at shutdown: {}", e),
        }
    }

    /// Get storage handle
    #[must_use]
    pub fn storage(&self) -> SharedStorage {
        Arc::clone(&self.storage)
    }

    /// Get server URL
    #[must_use]
    pub fn server_url(&self) -> String {
        self.config.server_url()
    }
}
