//! Cancellable periodic refresh
//!
//! The loop runs as a tokio task and rebuilds the forest on every tick.
//! Builders may block (file reads, HTTP fetches), so each rebuild runs on
//! the blocking pool. Shutdown is checked before every tick.

use super::{clamp_interval, Forest};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Handle to a running refresh loop
///
/// Dropping the handle also stops the loop after its current rebuild.
pub struct RefreshHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Stop the loop and wait for it to exit
    pub async fn shutdown(self) {
        tracing::info!("Stopping forest refresh loop");
        // A closed channel means the loop already exited
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            tracing::error!("Forest refresh loop ended abnormally: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Forest {
    /// Rebuild every registered tree each `interval` on a background task
    ///
    /// The first rebuild happens one interval after the call. Must be called
    /// from within a tokio runtime. A zero interval is raised to 1ms.
    pub fn spawn_refresh(self: &Arc<Self>, interval: Duration) -> RefreshHandle {
        let interval = clamp_interval(interval);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let forest = Arc::clone(self);

        tracing::info!("Forest refresh loop starting (interval {:?})", interval);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    biased;

                    _ = shutdown_rx.recv() => {
                        tracing::info!("Forest refresh loop shutting down");
                        break;
                    }

                    _ = ticker.tick() => {
                        let forest = Arc::clone(&forest);
                        let rebuild = tokio::task::spawn_blocking(move || {
                            forest.build();
                        });
                        if let Err(e) = rebuild.await {
                            tracing::error!("Forest rebuild task failed: {}", e);
                        }
                    }
                }
            }
        });

        RefreshHandle { shutdown_tx, task }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_before_first_tick() {
        tokio_test::block_on(async {
            let forest = Arc::new(Forest::default());
            let handle = forest.spawn_refresh(Duration::from_secs(3600));
            handle.shutdown().await;
            assert!(forest.is_empty());
        });
    }

    #[test]
    fn test_zero_interval_is_accepted() {
        tokio_test::block_on(async {
            let forest = Arc::new(Forest::default());
            let handle = forest.spawn_refresh(Duration::ZERO);
            tokio::time::sleep(Duration::from_millis(20)).await;
            assert!(!handle.is_finished());
            handle.shutdown().await;
        });
    }
}
