//! Concurrent batch enhancement
//!
//! Fan-out: one task per entry on a `JoinSet`, at most `max_concurrency`
//! enhancing at once. Fan-in: a single reducer drains completions in the
//! order they finish, so counters, result lists and progress events have
//! exactly one writer. Item failures never abort the batch.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info, warn};

use crate::error::{FeedbackError, Result};
use crate::feedback::enhance::FeedbackEnhancer;
use crate::types::{EnhancedFeedback, FeedbackEntry};

/// Default number of enhancements allowed in flight at once
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Consolidated outcome of one batch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub total_entries: usize,
    pub processed_entries: usize,
    pub successful_entries: usize,
    pub failed_entries: usize,
    /// Completion order, not submission order
    pub results: Vec<EnhancedFeedback>,
    /// One message per failed item
    pub errors: Vec<String>,
    pub completed: bool,
}

/// One progress notification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub processed: usize,
    pub total: usize,
    pub percentage: f64,
}

impl BatchProgress {
    pub fn new(processed: usize, total: usize) -> Self {
        let percentage = if total == 0 {
            100.0
        } else {
            processed as f64 / total as f64 * 100.0
        };
        Self {
            processed,
            total,
            percentage,
        }
    }
}

/// Receives batch notifications, in order, from the reducer
pub trait BatchObserver: Send + Sync {
    /// Called after every item completes; `processed` never decreases
    fn on_progress(&self, _progress: &BatchProgress) {}

    /// Called once with the final result. An error here fails the batch.
    fn on_complete(&self, _result: &BatchResult) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Event on a batch subscription stream
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Progress(BatchProgress),
    Completed(BatchResult),
}

/// Observer that forwards notifications into an ordered channel
///
/// Sends to a dropped receiver are ignored, so a caller can stop listening
/// without affecting the batch.
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<BatchEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BatchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl BatchObserver for ChannelObserver {
    fn on_progress(&self, progress: &BatchProgress) {
        let _ = self.tx.send(BatchEvent::Progress(*progress));
    }

    fn on_complete(&self, result: &BatchResult) -> anyhow::Result<()> {
        let _ = self.tx.send(BatchEvent::Completed(result.clone()));
        Ok(())
    }
}

/// Point-in-time view of a running batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSnapshot {
    pub total_entries: usize,
    pub processed_entries: usize,
    pub successful_entries: usize,
    pub failed_entries: usize,
    pub completed: bool,
}

/// Live counters for a batch, readable from any thread while it runs
#[derive(Clone, Default)]
pub struct BatchStatus {
    inner: Arc<StatusInner>,
}

#[derive(Default)]
struct StatusInner {
    total: AtomicUsize,
    processed: AtomicUsize,
    successful: AtomicUsize,
    failed: AtomicUsize,
    completed: AtomicBool,
}

impl BatchStatus {
    fn new(total: usize) -> Self {
        let status = Self::default();
        status.inner.total.store(total, Ordering::SeqCst);
        status
    }

    /// `processed` is bumped before the success/failure counter, so readers
    /// always see `successful + failed <= processed`.
    pub fn snapshot(&self) -> BatchSnapshot {
        let completed = self.inner.completed.load(Ordering::SeqCst);
        let successful = self.inner.successful.load(Ordering::SeqCst);
        let failed = self.inner.failed.load(Ordering::SeqCst);
        let processed = self.inner.processed.load(Ordering::SeqCst);
        BatchSnapshot {
            total_entries: self.inner.total.load(Ordering::SeqCst),
            processed_entries: processed,
            successful_entries: successful,
            failed_entries: failed,
            completed,
        }
    }
}

/// Handle to a batch running in the background
pub struct BatchHandle {
    batch_id: String,
    status: BatchStatus,
    task: JoinHandle<BatchResult>,
}

impl BatchHandle {
    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    pub fn status(&self) -> BatchSnapshot {
        self.status.snapshot()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the batch to resolve
    pub async fn join(self) -> Result<BatchResult> {
        self.task
            .await
            .map_err(|e| FeedbackError::Aggregation(format!("batch task failed: {}", e)))
    }
}

struct ItemOutcome {
    id: String,
    outcome: std::result::Result<EnhancedFeedback, String>,
}

/// Runs an enhancer over many entries concurrently
#[derive(Clone)]
pub struct BatchProcessor {
    enhancer: Arc<dyn FeedbackEnhancer>,
    max_concurrency: usize,
}

impl BatchProcessor {
    pub fn new(enhancer: Arc<dyn FeedbackEnhancer>, max_concurrency: usize) -> Self {
        Self {
            enhancer,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Run a batch and wait for its result
    pub async fn run(
        &self,
        entries: Vec<FeedbackEntry>,
        observer: Option<Arc<dyn BatchObserver>>,
    ) -> BatchResult {
        let status = BatchStatus::new(entries.len());
        self.execute(entries, observer, status).await
    }

    /// Start a batch in the background. Dropping the handle detaches it.
    pub fn spawn(
        &self,
        entries: Vec<FeedbackEntry>,
        observer: Option<Arc<dyn BatchObserver>>,
    ) -> BatchHandle {
        let batch_id = format!("BATCH-{}", chrono::Utc::now().timestamp_millis());
        let status = BatchStatus::new(entries.len());
        let processor = self.clone();
        let task_status = status.clone();
        let task = tokio::spawn(async move { processor.execute(entries, observer, task_status).await });

        BatchHandle {
            batch_id,
            status,
            task,
        }
    }

    async fn execute(
        &self,
        entries: Vec<FeedbackEntry>,
        observer: Option<Arc<dyn BatchObserver>>,
        status: BatchStatus,
    ) -> BatchResult {
        let total = entries.len();
        info!("Starting batch processing for {} feedback entries", total);

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for entry in entries {
            let enhancer = self.enhancer.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let id = entry.id_label();
                // Inner task so a panicking enhancer is reported against its entry
                let outcome = match tokio::spawn(async move { enhancer.enhance(entry).await }).await {
                    Ok(Ok(enhanced)) => Ok(enhanced),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(e) => Err(join_error_message(e)),
                };
                ItemOutcome { id, outcome }
            });
        }

        let mut results = Vec::with_capacity(total);
        let mut errors = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            let item = joined.unwrap_or_else(|e| ItemOutcome {
                id: "unknown".to_string(),
                outcome: Err(join_error_message(e)),
            });

            let processed = status.inner.processed.fetch_add(1, Ordering::SeqCst) + 1;
            match item.outcome {
                Ok(enhanced) => {
                    status.inner.successful.fetch_add(1, Ordering::SeqCst);
                    results.push(enhanced);
                }
                Err(cause) => {
                    status.inner.failed.fetch_add(1, Ordering::SeqCst);
                    warn!("Failed to process feedback ID {}: {}", item.id, cause);
                    errors.push(format!("Error processing feedback ID {}: {}", item.id, cause));
                }
            }

            if let Some(observer) = &observer {
                observer.on_progress(&BatchProgress::new(processed, total));
            }
        }

        let snapshot = status.snapshot();
        let mut result = BatchResult {
            total_entries: total,
            processed_entries: snapshot.processed_entries,
            successful_entries: snapshot.successful_entries,
            failed_entries: snapshot.failed_entries,
            results,
            errors,
            completed: true,
        };

        match finalize(&result, observer.as_deref()) {
            Ok(()) => {
                status.inner.completed.store(true, Ordering::SeqCst);
                info!(
                    "Batch processing completed: {} successful, {} failed out of {} total",
                    result.successful_entries, result.failed_entries, total
                );
            }
            Err(e) => {
                error!("Batch processing failed: {}", e);
                // Drops every result gathered so far, keeping only the counters
                result.completed = false;
                result.results.clear();
                result.errors = vec![format!("Batch processing failed: {}", e)];
            }
        }

        result
    }
}

fn finalize(result: &BatchResult, observer: Option<&dyn BatchObserver>) -> Result<()> {
    if result.successful_entries + result.failed_entries != result.processed_entries
        || result.processed_entries != result.total_entries
    {
        return Err(FeedbackError::Aggregation(format!(
            "counter mismatch: {} successful + {} failed vs {} processed of {}",
            result.successful_entries,
            result.failed_entries,
            result.processed_entries,
            result.total_entries
        )));
    }

    if let Some(observer) = observer {
        observer
            .on_complete(result)
            .map_err(|e| FeedbackError::Aggregation(e.to_string()))?;
    }
    Ok(())
}

fn join_error_message(err: tokio::task::JoinError) -> String {
    if err.is_panic() {
        let panic = err.into_panic();
        if let Some(msg) = panic.downcast_ref::<&str>() {
            format!("task panicked: {}", msg)
        } else if let Some(msg) = panic.downcast_ref::<String>() {
            format!("task panicked: {}", msg)
        } else {
            "task panicked".to_string()
        }
    } else {
        format!("task failed: {}", err)
    }
}
