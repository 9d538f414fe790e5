//! Expiration Sweeper Task
//!
//! Background task that periodically removes expired cache entries.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::cache::{current_timestamp_nanos, EntryTable};

// == Sweeper ==
/// Handle to a running sweep task.
///
/// The task only holds the table, so it never keeps the owning cache alive.
/// Stopping is idempotent and never blocks; a stopped sweeper cannot restart.
#[derive(Debug)]
pub struct Sweeper {
    /// Sender to signal shutdown to the sweep task
    shutdown_tx: watch::Sender<bool>,
    /// Task handle, taken by the first `join`
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Sweeper {
    /// Spawns a task that sweeps `table` once per `interval`.
    ///
    /// The first sweep runs one full interval after spawning. Must be called
    /// from within a Tokio runtime.
    pub fn spawn(table: Arc<RwLock<EntryTable>>, interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run(table, interval, shutdown_rx));

        Self {
            shutdown_tx,
            handle: Mutex::new(Some(handle)),
        }
    }

    // == Stop ==
    /// Signals the task to stop. Returns true only for the call that stopped it.
    pub fn stop(&self) -> bool {
        !self.shutdown_tx.send_replace(true)
    }

    /// Returns whether stop has not yet been signalled.
    pub fn is_running(&self) -> bool {
        !*self.shutdown_tx.borrow()
    }

    // == Join ==
    /// Waits for the task to exit. Call after `stop`, otherwise this waits forever.
    pub async fn join(&self) {
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run(table: Arc<RwLock<EntryTable>>, interval: Duration, mut shutdown_rx: watch::Receiver<bool>) {
    debug!("Starting expiration sweeper with interval of {:?}", interval);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Skip the immediate first tick
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // One exclusive critical section per pass
                let removed = table.write().await.delete_expired(current_timestamp_nanos());

                if removed > 0 {
                    info!("TTL sweep: removed {} expired entries", removed);
                } else {
                    debug!("TTL sweep: no expired entries found");
                }
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }

    debug!("Expiration sweeper stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Expiration;

    fn shared_table() -> Arc<RwLock<EntryTable>> {
        Arc::new(RwLock::new(EntryTable::new(None)))
    }

    #[tokio::test]
    async fn test_sweeper_removes_expired_entries() {
        let table = shared_table();
        table
            .write()
            .await
            .set("expire_soon".to_string(), "value".to_string(), Expiration::After(Duration::from_millis(50)));

        let sweeper = Sweeper::spawn(table.clone(), Duration::from_millis(100));

        tokio::time::sleep(Duration::from_millis(350)).await;

        assert_eq!(table.read().await.len(), 0, "Expired entry should have been swept");

        sweeper.stop();
    }

    #[tokio::test]
    async fn test_sweeper_preserves_valid_entries() {
        let table = shared_table();
        {
            let mut guard = table.write().await;
            guard.set("long_lived".to_string(), "value".to_string(), Expiration::After(Duration::from_secs(3600)));
            guard.set("immortal".to_string(), "value".to_string(), Expiration::Never);
        }

        let sweeper = Sweeper::spawn(table.clone(), Duration::from_millis(50));

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(table.read().await.len(), 2, "Valid entries should not be removed");

        sweeper.stop();
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let sweeper = Sweeper::spawn(shared_table(), Duration::from_millis(50));

        assert!(sweeper.is_running());
        assert!(sweeper.stop());
        assert!(!sweeper.stop());
        assert!(!sweeper.is_running());

        tokio::time::timeout(Duration::from_secs(1), sweeper.join())
            .await
            .expect("sweeper should exit after stop");

        // Joining twice returns immediately
        sweeper.join().await;
    }

    #[tokio::test]
    async fn test_stopped_sweeper_leaves_expired_entries() {
        let table = shared_table();
        let sweeper = Sweeper::spawn(table.clone(), Duration::from_millis(50));
        sweeper.stop();
        sweeper.join().await;

        table
            .write()
            .await
            .set("dead".to_string(), 1_i64, Expiration::After(Duration::from_millis(10)));

        tokio::time::sleep(Duration::from_millis(200)).await;

        let guard = table.read().await;
        assert_eq!(guard.len(), 1);
        assert!(guard.get("dead").is_none());
    }

    #[tokio::test]
    async fn test_drop_stops_task() {
        let sweeper = Sweeper::spawn(shared_table(), Duration::from_millis(50));
        let handle = sweeper.handle.lock().unwrap().take().unwrap();

        drop(sweeper);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("task should exit once the sweeper is dropped")
            .unwrap();
    }
}
