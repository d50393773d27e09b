//! Server setup and lifecycle management

use crate::api::create_router;
use crate::config::{AppConfig, HandlersConfig, StorageBackend, StorageConfig};
use crate::error::ServerResult;
use crate::state::AppState;
use jarvis_core::ImprovementType;
use jarvis_evolution::{
    EvolutionEngine, HandlerRegistry, ImprovementHandler, JournalHandler, Scheduler, StrategyTuner,
};
use jarvis_storage::{HistoryStore, JsonlHistory, MemoryHistory};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Register the built-in handlers for every enabled improvement type.
pub fn build_registry(handlers: &HandlersConfig) -> HandlerRegistry {
    let tuner: Arc<dyn ImprovementHandler> = Arc::new(StrategyTuner::new());
    let journal: Arc<dyn ImprovementHandler> = Arc::new(JournalHandler::new(tuner));

    let mut registry = HandlerRegistry::new();
    for kind in ImprovementType::ALL {
        if handlers.is_enabled(kind) {
            registry.register(kind, Arc::clone(&journal));
        } else {
            tracing::info!(kind = %kind, "Handler disabled by configuration");
        }
    }
    registry
}

/// Open the configured history backend.
pub async fn open_history(storage: &StorageConfig) -> ServerResult<Arc<dyn HistoryStore>> {
    let history: Arc<dyn HistoryStore> = match storage.backend {
        StorageBackend::Jsonl => Arc::new(JsonlHistory::open(&storage.data_dir).await?),
        StorageBackend::Memory => Arc::new(MemoryHistory::new()),
    };
    Ok(history)
}

/// Open the configured history backend without taking the writer lock.
pub async fn open_history_read_only(storage: &StorageConfig) -> ServerResult<Arc<dyn HistoryStore>> {
    let history: Arc<dyn HistoryStore> = match storage.backend {
        StorageBackend::Jsonl => Arc::new(JsonlHistory::open_read_only(&storage.data_dir).await?),
        StorageBackend::Memory => Arc::new(MemoryHistory::new()),
    };
    Ok(history)
}

/// Open the evolution engine described by the configuration.
pub async fn open_engine(config: &AppConfig) -> ServerResult<Arc<EvolutionEngine>> {
    let history = open_history(&config.storage).await?;
    let registry = build_registry(&config.handlers);
    let engine = EvolutionEngine::open(config.engine.clone(), history, registry).await?;
    Ok(Arc::new(engine))
}

/// Open an engine for inspecting status and history.
///
/// Safe to use next to a running server; cycles it runs cannot be recorded.
pub async fn inspect_engine(config: &AppConfig) -> ServerResult<Arc<EvolutionEngine>> {
    let history = open_history_read_only(&config.storage).await?;
    let engine = EvolutionEngine::open(config.engine.clone(), history, HandlerRegistry::new()).await?;
    Ok(Arc::new(engine))
}

/// Jarvis server
pub struct Server {
    config: AppConfig,
    engine: Arc<EvolutionEngine>,
}

impl Server {
    /// Create a new server with the given configuration
    pub async fn new(config: AppConfig) -> ServerResult<Self> {
        let engine = open_engine(&config).await?;
        Ok(Self { config, engine })
    }

    /// The server's engine
    pub fn engine(&self) -> &Arc<EvolutionEngine> {
        &self.engine
    }

    /// Run the server until a shutdown signal arrives
    pub async fn run(self) -> ServerResult<()> {
        let addr = self.config.server.listen_addr;

        // Create router
        let state = AppState::new(Arc::clone(&self.engine));
        let app = create_router(state, self.config.server.enable_cors);

        // Create listener
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Jarvis listening on {}", addr);

        // Start scheduler in background
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let scheduler = if self.config.engine.auto_evolve {
            Some(Scheduler::spawn(
                Arc::clone(&self.engine),
                self.config.engine.interval(),
                shutdown_rx,
            ))
        } else {
            tracing::info!("Automatic evolution disabled");
            None
        };

        // Run server with graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Jarvis shutting down");

        // Stop scheduler; a running cycle finishes first
        let _ = shutdown_tx.send(true);
        if let Some(handle) = scheduler {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Scheduler task ended abnormally");
            }
        }

        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install signal handler");
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
