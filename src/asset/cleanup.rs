//! Orphan cleanup queue
//!
//! Deletes image files that are no longer referenced by any product. Work is
//! submitted without blocking the caller and executed by a background tokio
//! worker. Every attempt is logged, counted, and broadcast to subscribers.

use super::storage::{AssetStore, DeleteOutcome};
use crate::error::ApiError;
use crate::types::ProductId;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const OUTCOME_CHANNEL_CAPACITY: usize = 256;

/// Result of one deletion attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupResult {
    Deleted,
    NotFound,
    Failed(String),
}

/// Observable outcome of one deletion attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupOutcome {
    pub filename: String,
    /// Product whose image set released the file
    pub product_id: ProductId,
    pub result: CleanupResult,
}

/// Queue statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupStats {
    pub submitted: usize,
    pub deleted: usize,
    pub not_found: usize,
    pub failed: usize,
}

impl CleanupStats {
    /// Submitted jobs without an outcome yet
    pub fn pending(&self) -> usize {
        self.submitted
            .saturating_sub(self.deleted + self.not_found + self.failed)
    }

    fn record(&mut self, result: &CleanupResult) {
        match result {
            CleanupResult::Deleted => self.deleted += 1,
            CleanupResult::NotFound => self.not_found += 1,
            CleanupResult::Failed(_) => self.failed += 1,
        }
    }
}

#[derive(Debug)]
struct CleanupJob {
    filename: String,
    product_id: ProductId,
}

/// Background deletion queue for orphaned assets
pub struct CleanupQueue {
    sender: Mutex<Option<mpsc::UnboundedSender<CleanupJob>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    outcomes: broadcast::Sender<CleanupOutcome>,
    stats: Arc<RwLock<CleanupStats>>,
}

impl CleanupQueue {
    /// Start the worker on the current tokio runtime.
    pub fn start(store: Arc<dyn AssetStore>) -> Result<Self, ApiError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|e| {
            ApiError::Runtime(format!("Cleanup queue requires a tokio runtime: {}", e))
        })?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let (outcomes, _) = broadcast::channel(OUTCOME_CHANNEL_CAPACITY);
        let stats = Arc::new(RwLock::new(CleanupStats::default()));

        let worker = handle.spawn(Self::worker_loop(
            receiver,
            store,
            outcomes.clone(),
            Arc::clone(&stats),
        ));

        info!("Started asset cleanup worker");

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
            outcomes,
            stats,
        })
    }

    /// Queue `filenames` for deletion. Returns immediately.
    pub fn submit<I>(&self, product_id: ProductId, filenames: I)
    where
        I: IntoIterator<Item = String>,
    {
        let sender = self.sender.lock();
        for filename in filenames {
            self.stats.write().submitted += 1;
            let job = CleanupJob {
                filename,
                product_id,
            };
            let rejected = match sender.as_ref() {
                Some(tx) => tx.send(job).err().map(|e| e.0),
                None => Some(job),
            };
            if let Some(job) = rejected {
                error!(
                    filename = %job.filename,
                    product_id = job.product_id,
                    "Cleanup queue stopped, orphaned asset not deleted"
                );
                self.finish(CleanupOutcome {
                    filename: job.filename,
                    product_id: job.product_id,
                    result: CleanupResult::Failed("cleanup queue stopped".to_string()),
                });
            } else {
                debug!(product_id, "Queued orphaned asset for deletion");
            }
        }
    }

    /// Receive outcomes of attempts made after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<CleanupOutcome> {
        self.outcomes.subscribe()
    }

    pub fn stats(&self) -> CleanupStats {
        self.stats.read().clone()
    }

    /// Stop accepting work, drain pending jobs, and wait for the worker.
    pub async fn shutdown(&self) {
        drop(self.sender.lock().take());
        let worker = self.worker.lock().take();
        if let Some(handle) = worker {
            if let Err(e) = handle.await {
                error!(error = %e, "Cleanup worker terminated abnormally");
            }
            info!(stats = ?self.stats(), "Stopped asset cleanup worker");
        }
    }

    fn finish(&self, outcome: CleanupOutcome) {
        Self::publish(&self.stats, &self.outcomes, outcome);
    }

    fn publish(
        stats: &RwLock<CleanupStats>,
        outcomes: &broadcast::Sender<CleanupOutcome>,
        outcome: CleanupOutcome,
    ) {
        stats.write().record(&outcome.result);
        // No subscribers is fine
        let _ = outcomes.send(outcome);
    }

    async fn worker_loop(
        mut receiver: mpsc::UnboundedReceiver<CleanupJob>,
        store: Arc<dyn AssetStore>,
        outcomes: broadcast::Sender<CleanupOutcome>,
        stats: Arc<RwLock<CleanupStats>>,
    ) {
        while let Some(job) = receiver.recv().await {
            let store = Arc::clone(&store);
            let filename = job.filename.clone();
            let attempt = tokio::task::spawn_blocking(move || store.delete(&filename)).await;

            let result = match attempt {
                Ok(Ok(DeleteOutcome::Deleted)) => {
                    info!(
                        filename = %job.filename,
                        product_id = job.product_id,
                        "Deleted orphaned asset"
                    );
                    CleanupResult::Deleted
                }
                Ok(Ok(DeleteOutcome::NotFound)) => {
                    warn!(
                        filename = %job.filename,
                        product_id = job.product_id,
                        "Orphaned asset already absent"
                    );
                    CleanupResult::NotFound
                }
                Ok(Err(e)) => {
                    error!(
                        filename = %job.filename,
                        product_id = job.product_id,
                        error = %e,
                        "Failed to delete orphaned asset"
                    );
                    CleanupResult::Failed(e.to_string())
                }
                Err(e) => {
                    error!(
                        filename = %job.filename,
                        product_id = job.product_id,
                        error = %e,
                        "Cleanup task panicked"
                    );
                    CleanupResult::Failed(e.to_string())
                }
            };

            Self::publish(
                &stats,
                &outcomes,
                CleanupOutcome {
                    filename: job.filename,
                    product_id: job.product_id,
                    result,
                },
            );
        }
        debug!("Cleanup worker channel closed");
    }
}
