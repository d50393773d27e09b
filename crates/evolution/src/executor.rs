//! Application executor - runs improvement handlers in isolation.

use async_trait::async_trait;
use jarvis_core::{FailureKind, Improvement, ImprovementType, Outcome};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Something that can carry out an improvement of one or more types.
#[async_trait]
pub trait ImprovementHandler: Send + Sync {
    /// Handler name, used in logs.
    fn name(&self) -> &str;

    /// Apply the improvement.
    async fn apply(&self, improvement: &Improvement) -> Result<(), anyhow::Error>;
}

/// Maps improvement types to their handlers.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<ImprovementType, Arc<dyn ImprovementHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a type, replacing any previous one.
    pub fn register(&mut self, kind: ImprovementType, handler: Arc<dyn ImprovementHandler>) {
        self.handlers.insert(kind, handler);
    }

    /// Builder form of [`HandlerRegistry::register`].
    pub fn with(mut self, kind: ImprovementType, handler: Arc<dyn ImprovementHandler>) -> Self {
        self.register(kind, handler);
        self
    }

    /// Handler for a type.
    pub fn get(&self, kind: ImprovementType) -> Option<Arc<dyn ImprovementHandler>> {
        self.handlers.get(&kind).cloned()
    }

    /// Whether a type has a handler.
    pub fn contains(&self, kind: ImprovementType) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Unregister a type.
    pub fn remove(&mut self, kind: ImprovementType) -> Option<Arc<dyn ImprovementHandler>> {
        self.handlers.remove(&kind)
    }

    /// Registered types, sorted.
    pub fn kinds(&self) -> Vec<ImprovementType> {
        let mut kinds: Vec<_> = self.handlers.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.handlers.iter().map(|(kind, h)| (kind.as_str(), h.name())))
            .finish()
    }
}

/// Applies selected improvements, one at a time, each under a time budget.
///
/// A handler that errors, panics or outlives its budget yields a failed
/// [`Outcome`]; it never takes the caller down with it.
#[derive(Debug, Clone)]
pub struct ApplicationExecutor {
    registry: HandlerRegistry,
    timeout: Duration,
}

impl ApplicationExecutor {
    /// Create an executor.
    pub fn new(registry: HandlerRegistry, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    /// Registered handlers.
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Apply one improvement and report how it went.
    pub async fn apply(&self, improvement: &Improvement) -> Outcome {
        let started = Instant::now();

        let Some(handler) = self.registry.get(improvement.kind) else {
            tracing::warn!(kind = %improvement.kind, "No handler registered");
            return Outcome::failed(
                FailureKind::NoHandler,
                format!("no handler registered for {}", improvement.kind),
                started.elapsed(),
            );
        };

        let name = handler.name().to_string();
        let owned = improvement.clone();
        let mut task = tokio::spawn(async move { handler.apply(&owned).await });

        match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(Ok(Ok(()))) => {
                tracing::info!(
                    handler = %name,
                    improvement_id = %improvement.id,
                    module = %improvement.target_module,
                    "Improvement applied"
                );
                Outcome::succeeded(started.elapsed())
            }
            Ok(Ok(Err(e))) => {
                tracing::warn!(handler = %name, improvement_id = %improvement.id, error = %e, "Handler failed");
                Outcome::failed(FailureKind::HandlerFailed, format!("{:#}", e), started.elapsed())
            }
            Ok(Err(join_error)) => {
                let message = if join_error.is_panic() {
                    format!("handler {} panicked", name)
                } else {
                    format!("handler {} was cancelled", name)
                };
                tracing::error!(handler = %name, improvement_id = %improvement.id, "{}", message);
                Outcome::failed(FailureKind::HandlerFailed, message, started.elapsed())
            }
            Err(_) => {
                task.abort();
                tracing::warn!(
                    handler = %name,
                    improvement_id = %improvement.id,
                    timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                    "Handler timed out"
                );
                Outcome::failed(
                    FailureKind::Timeout,
                    format!("handler {} exceeded {:?}", name, self.timeout),
                    started.elapsed(),
                )
            }
        }
    }
}
