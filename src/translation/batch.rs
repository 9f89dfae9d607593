/*!
 * Batch translation processing.
 *
 * Entries are translated one request each through a bounded worker pool.
 * Every worker writes into the slot of its entry's index, so the output
 * order never depends on completion order. A failed entry keeps its
 * source text and the batch carries on.
 */

use log::{debug, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;
use futures::stream::{self, StreamExt};

use crate::cancellation::CancellationToken;
use crate::errors::{ProviderError, TranslationError};
use crate::providers::{Provider, TranslationRequest};

/// Default number of requests in flight
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Completion counter that observers may sample at any time
#[derive(Debug)]
pub struct BatchProgress {
    completed: AtomicUsize,
    total: usize,
}

impl BatchProgress {
    pub fn new(total: usize) -> Self {
        Self {
            completed: AtomicUsize::new(0),
            total,
        }
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Completed share in `0.0..=1.0`, 1.0 for an empty batch
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.completed() as f64 / self.total as f64
    }

    fn mark_done(&self) -> usize {
        self.completed.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Result of a completed batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    /// One text per input entry, in input order
    pub translations: Vec<String>,
    /// Entries that kept their source text because the service failed
    pub failed_indices: Vec<usize>,
    /// Blank entries passed through without a request
    pub skipped_blank: usize,
}

impl BatchReport {
    pub fn failure_count(&self) -> usize {
        self.failed_indices.len()
    }
}

enum EntryOutcome {
    Translated,
    Fallback,
    Skipped,
    Abandoned,
}

/// Batch translator for subtitle texts
#[derive(Debug, Clone)]
pub struct BatchTranslator {
    /// The translation provider to use
    provider: Arc<dyn Provider>,

    /// Maximum number of concurrent requests
    max_concurrent_requests: usize,
}

impl BatchTranslator {
    /// Create a new batch translator
    pub fn new(provider: Arc<dyn Provider>, max_concurrent_requests: usize) -> Self {
        Self {
            provider,
            max_concurrent_requests: max_concurrent_requests.max(1),
        }
    }

    pub fn max_concurrent_requests(&self) -> usize {
        self.max_concurrent_requests
    }

    /// Check the provider answers before queueing a whole file
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        self.provider.test_connection().await
    }

    /// Translate `entries`, returning one text per entry in the same order
    pub async fn translate(
        &self,
        entries: &[String],
        source_language: &str,
        target_language: &str,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, TranslationError> {
        let progress = Arc::new(BatchProgress::new(entries.len()));
        self.translate_with_progress(entries, source_language, target_language, cancel, progress, |_, _| {})
            .await
    }

    /// Like [`translate`](Self::translate), reporting through `progress` and `progress_callback`
    ///
    /// The counter moves only after an entry's slot is filled. When `cancel`
    /// fires, entries not yet sent are abandoned and the call fails with
    /// [`TranslationError::Cancelled`].
    pub async fn translate_with_progress(
        &self,
        entries: &[String],
        source_language: &str,
        target_language: &str,
        cancel: &CancellationToken,
        progress: Arc<BatchProgress>,
        progress_callback: impl Fn(usize, usize) + Send + Sync,
    ) -> Result<BatchReport, TranslationError> {
        let total = entries.len();
        let slots: Arc<Mutex<Vec<Option<String>>>> = Arc::new(Mutex::new(vec![None; total]));

        // Create a semaphore to limit concurrent requests
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_requests));
        let progress_callback = &progress_callback;

        let outcomes = stream::iter(entries.iter().enumerate())
            .map(|(index, text)| {
                let provider = Arc::clone(&self.provider);
                let semaphore = Arc::clone(&semaphore);
                let slots = Arc::clone(&slots);
                let progress = Arc::clone(&progress);
                let request = TranslationRequest::new(text.clone(), source_language, target_language);

                async move {
                    let _permit = semaphore.acquire().await.ok();

                    if cancel.is_cancelled() {
                        return (index, EntryOutcome::Abandoned);
                    }

                    let (text, outcome) = if request.text.trim().is_empty() {
                        (request.text.clone(), EntryOutcome::Skipped)
                    } else {
                        let source_text = request.text.clone();
                        let result = tokio::select! {
                            biased;
                            _ = cancel.cancelled() => return (index, EntryOutcome::Abandoned),
                            result = provider.complete(request) => result,
                        };
                        match result {
                            Ok(response) => (response.text, EntryOutcome::Translated),
                            Err(e) => {
                                warn!("Entry {} kept untranslated: {}", index + 1, e);
                                (source_text, EntryOutcome::Fallback)
                            }
                        }
                    };

                    slots.lock()[index] = Some(text);
                    let current = progress.mark_done();
                    progress_callback(current, total);

                    (index, outcome)
                }
            })
            .buffer_unordered(self.max_concurrent_requests)
            .collect::<Vec<_>>()
            .await;

        let mut failed_indices = Vec::new();
        let mut skipped_blank = 0;
        let mut abandoned = 0;
        for (index, outcome) in outcomes {
            match outcome {
                EntryOutcome::Translated => {}
                EntryOutcome::Fallback => failed_indices.push(index),
                EntryOutcome::Skipped => skipped_blank += 1,
                EntryOutcome::Abandoned => abandoned += 1,
            }
        }

        if abandoned > 0 {
            return Err(TranslationError::Cancelled {
                completed: progress.completed(),
                total,
            });
        }
        failed_indices.sort_unstable();

        let translations: Vec<String> = std::mem::take(&mut *slots.lock())
            .into_iter()
            .zip(entries)
            .map(|(slot, source)| slot.unwrap_or_else(|| source.clone()))
            .collect();

        debug!(
            "Batch finished: {} entries, {} failed, {} blank",
            total,
            failed_indices.len(),
            skipped_blank
        );

        Ok(BatchReport {
            translations,
            failed_indices,
            skipped_blank,
        })
    }
}
