//! Server setup and lifecycle management

use crate::api::create_router;
use crate::api::rest::caller::RequestVerifier;
use crate::api::rest::state::AppState;
use crate::config::DaemonConfig;
use crate::counters::CounterHost;
use crate::error::{DaemonError, DaemonResult};
use crate::llm::{HttpLanguageModel, LanguageModel};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Tally Daemon Server
pub struct Server {
    config: DaemonConfig,
    counters: Arc<CounterHost>,
    llm: Arc<dyn LanguageModel>,
}

impl Server {
    /// Create a new server with the given configuration
    ///
    /// Loads the snapshot before anything listens. With the abort policy a
    /// corrupt snapshot fails here.
    pub fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let counters = Arc::new(CounterHost::boot(&config.store)?);
        let llm = HttpLanguageModel::new(config.llm.clone())
            .map_err(|e| DaemonError::Config(e.to_string()))?;

        Ok(Self::with_components(config, counters, Arc::new(llm)))
    }

    /// Assemble a server from prebuilt parts.
    pub fn with_components(
        config: DaemonConfig,
        counters: Arc<CounterHost>,
        llm: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            config,
            counters,
            llm,
        }
    }

    /// Build the HTTP application for this server.
    pub fn app(&self) -> axum::Router {
        let state = AppState::new(
            self.counters.clone(),
            self.llm.clone(),
            Arc::new(RequestVerifier::new(self.config.auth.clock_skew_secs)),
            self.config.server.max_body_size,
        );
        create_router(state, &self.config.server)
    }

    /// Run the server until Ctrl+C or SIGTERM
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Tally daemon listening on {}", addr);
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already-bound listener until `shutdown` resolves.
    ///
    /// In-flight requests drain before the snapshot is written.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> DaemonResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.app();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("Tally daemon shutting down");

        self.counters.persist().await?;
        if let Some(entries) = self.counters.entry_count().await {
            tracing::info!(entries, "Counter snapshot written");
        }

        Ok(())
    }
}

/// Graceful shutdown signal handler
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
