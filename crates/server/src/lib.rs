//! Jarvis server - the HTTP contract of the evolution engine.
//!
//! Provides:
//! - REST API for engine status, manual triggers, history and metric intake
//! - Layered configuration (defaults, file, `JARVIS_` environment)
//! - Logging setup
//! - Server lifecycle with the interval scheduler and graceful shutdown

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod server;
pub mod state;

pub use api::create_router;
pub use config::{AppConfig, HandlersConfig, LoggingConfig, ServerConfig, StorageBackend, StorageConfig};
pub use error::{ApiError, ServerError, ServerResult};
pub use logging::init_logging;
pub use server::{build_registry, inspect_engine, open_engine, open_history, open_history_read_only, Server};
pub use state::AppState;
