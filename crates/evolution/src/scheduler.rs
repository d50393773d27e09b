//! Interval scheduler - triggers scheduled cycles.

use crate::{EngineError, EvolutionEngine};
use jarvis_core::Trigger;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Runs a scheduled cycle every interval until told to stop.
pub struct Scheduler;

impl Scheduler {
    /// Spawn the scheduling loop.
    ///
    /// The loop exits once `shutdown` carries `true` or its sender is
    /// dropped. A cycle already running is allowed to finish.
    pub fn spawn(
        engine: Arc<EvolutionEngine>,
        period: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately.
            ticker.tick().await;

            engine.set_active(true);
            info!(period_secs = period.as_secs(), "Evolution scheduler started");

            loop {
                if *shutdown.borrow() {
                    break;
                }
                tokio::select! {
                    _ = ticker.tick() => {
                        match engine.run_cycle(Trigger::Scheduled).await {
                            Ok(report) => debug!(
                                cycle_id = %report.cycle.cycle_id,
                                success = report.success(),
                                "Scheduled cycle complete"
                            ),
                            Err(EngineError::Busy) => debug!("Skipping tick, a cycle is already running"),
                            Err(e) => warn!(error = %e, "Scheduled cycle failed"),
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }

            engine.set_active(false);
            info!("Evolution scheduler stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EngineConfig, HandlerRegistry};
    use jarvis_storage::MemoryHistory;

    async fn engine() -> Arc<EvolutionEngine> {
        let engine = EvolutionEngine::open(
            EngineConfig::default(),
            Arc::new(MemoryHistory::new()),
            HandlerRegistry::new(),
        )
        .await
        .unwrap();
        Arc::new(engine)
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_runs_cycles_each_interval() {
        let engine = engine().await;
        let (stop, shutdown) = watch::channel(false);
        let handle = Scheduler::spawn(Arc::clone(&engine), Duration::from_secs(60), shutdown);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(engine.is_active());
        assert_eq!(engine.status().total_evolutions, 0);

        tokio::time::sleep(Duration::from_secs(150)).await;
        assert_eq!(engine.status().total_evolutions, 2);

        stop.send(true).unwrap();
        handle.await.unwrap();
        assert!(!engine.is_active());
        assert!(!engine.status().evolution_active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_sender_stops_scheduler() {
        let engine = engine().await;
        let (stop, shutdown) = watch::channel(false);
        let handle = Scheduler::spawn(Arc::clone(&engine), Duration::from_secs(5), shutdown);

        drop(stop);
        handle.await.unwrap();
        assert!(!engine.is_active());
    }
}
