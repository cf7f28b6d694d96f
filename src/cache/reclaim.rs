//! Background reclamation of expired cache entries
//!
//! Expiry is judged lazily at read time, so expired rows are harmless but
//! take up space. The reclaimer periodically purges them and reports what it
//! did over a tokio channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::CacheStore;

/// Messages sent from the background reclaimer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReclaimMessage {
    /// A sweep finished, removing this many entries
    Reclaimed(usize),
    /// A sweep failed
    ReclaimFailed(String),
}

/// Configuration for the reclaim interval
#[derive(Debug, Clone)]
pub struct ReclaimConfig {
    /// Time between sweeps
    pub interval: Duration,
    /// Whether the reclaimer runs at all
    pub enabled: bool,
}

impl Default for ReclaimConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(900), // 15 minutes
            enabled: true,
        }
    }
}

/// Handle for controlling the background reclaimer
pub struct Reclaimer {
    /// Channel for receiving sweep results
    pub receiver: mpsc::Receiver<ReclaimMessage>,
    /// Flag to signal shutdown
    shutdown_tx: mpsc::Sender<()>,
}

impl Reclaimer {
    /// Spawns the background sweep task
    ///
    /// Must be called from within a tokio runtime. The first sweep runs one
    /// full interval after spawning.
    pub fn spawn(store: Arc<dyn CacheStore>, config: ReclaimConfig) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel(32);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        if config.enabled {
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(config.interval);
                // Skip the first tick (immediate)
                interval.tick().await;

                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            let store = store.clone();
                            let message = match tokio::task::spawn_blocking(move || store.purge_expired()).await {
                                Ok(Ok(removed)) => {
                                    debug!(removed, "reclaimed expired cache entries");
                                    ReclaimMessage::Reclaimed(removed)
                                }
                                Ok(Err(e)) => {
                                    warn!(error = %e, "cache reclaim failed");
                                    ReclaimMessage::ReclaimFailed(e.to_string())
                                }
                                Err(e) => {
                                    warn!(error = %e, "cache reclaim task panicked");
                                    ReclaimMessage::ReclaimFailed(e.to_string())
                                }
                            };
                            // Nobody listening is fine; never block sweeps on a full channel
                            let _ = msg_tx.try_send(message);
                        }
                        _ = shutdown_rx.recv() => {
                            break;
                        }
                    }
                }
            });
        }

        Self {
            receiver: msg_rx,
            shutdown_tx,
        }
    }

    /// Shuts down the background sweep task
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}
