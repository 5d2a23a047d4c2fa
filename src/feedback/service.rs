//! Feedback service: store, cache, batch processor and labeler wired together
//!
//! Every write through the service invalidates the cache so the next read
//! sees it. Writes made directly on the store do not.

use anyhow::Context;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::ai::llm::{LlmClient, UnconfiguredCompletion};
use crate::ai::sentiment::{LexiconLabeler, SentimentLabeler};
use crate::config::Config;
use crate::error::{FeedbackError, Result};
use crate::feedback::batch::{BatchHandle, BatchObserver, BatchProcessor, BatchResult};
use crate::feedback::cache::EnhancedCache;
use crate::feedback::enhance::{Enhancer, FeedbackEnhancer};
use crate::feedback::summary::FeedbackSummary;
use crate::store::FeedbackStore;
use crate::types::{EnhancedFeedback, FeedbackEntry};

/// One submitted comment
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    #[serde(default)]
    pub customer: String,
    #[serde(default)]
    pub department: String,
    pub comment: String,
}

/// Longest text accepted for standalone sentiment analysis
pub const MAX_SENTIMENT_TEXT: usize = 5000;

pub struct FeedbackService {
    store: Arc<FeedbackStore>,
    enhancer: Arc<dyn FeedbackEnhancer>,
    cache: EnhancedCache,
    batch: BatchProcessor,
    labeler: Arc<dyn SentimentLabeler>,
}

impl FeedbackService {
    pub fn new(
        store: Arc<FeedbackStore>,
        enhancer: Arc<dyn FeedbackEnhancer>,
        labeler: Arc<dyn SentimentLabeler>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            cache: EnhancedCache::new(store.clone(), enhancer.clone()),
            batch: BatchProcessor::new(enhancer.clone(), max_concurrency),
            enhancer,
            store,
            labeler,
        }
    }

    /// Wire up the production collaborators from configuration
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = LlmClient::from_config(config).context("Failed to create completion client")?;
        Self::with_completion(config, Arc::new(client))
    }

    /// Service that needs no API key. Store and labelling operations behave
    /// normally; every enhancement comes back as an "Error in processing"
    /// record.
    pub fn store_only(config: &Config) -> anyhow::Result<Self> {
        Self::with_completion(config, Arc::new(UnconfiguredCompletion::new(config.llm.provider)))
    }

    fn with_completion(
        config: &Config,
        client: Arc<dyn crate::ai::llm::TextCompletion>,
    ) -> anyhow::Result<Self> {
        let store = Arc::new(FeedbackStore::new(config.store_path()?));
        Ok(Self::new(
            store,
            Arc::new(Enhancer::new(client)),
            Arc::new(LexiconLabeler::new()),
            config.batch.max_concurrency,
        ))
    }

    pub fn store(&self) -> &FeedbackStore {
        &self.store
    }

    /// Label and persist a new comment
    pub async fn submit(
        &self,
        customer: &str,
        department: &str,
        comment: &str,
    ) -> Result<FeedbackEntry> {
        let sentiment = self.labeler.label(comment)?;
        let entry = FeedbackEntry::new(customer, department, comment).with_sentiment(sentiment);
        let saved = self.store.save(entry)?;
        self.cache.invalidate().await;
        Ok(saved)
    }

    /// Sentiment label for free text, without storing anything
    pub fn analyze_sentiment(&self, text: &str) -> Result<String> {
        if text.chars().count() > MAX_SENTIMENT_TEXT {
            return Err(FeedbackError::Validation(format!(
                "Text must be between 1 and {} characters",
                MAX_SENTIMENT_TEXT
            )));
        }
        self.labeler.label(text)
    }

    /// Label one submission and enhance it, without storing it.
    ///
    /// The entry gets today's date and a time-derived id. A blank comment is
    /// rejected; enhancement failures are folded into the record.
    pub async fn enhance_one(&self, request: FeedbackRequest) -> Result<EnhancedFeedback> {
        let sentiment = self.labeler.label(&request.comment)?;
        let id = chrono::Utc::now().timestamp_millis().max(0) as u64;
        let entry = FeedbackEntry::new(request.customer, request.department, request.comment)
            .with_id(id)
            .with_sentiment(sentiment);
        debug!("Enhancing single feedback ID: {}", id);
        self.enhancer.enhance(entry).await
    }

    /// [`enhance_one`](Self::enhance_one), then persist the result
    pub async fn process_one(&self, request: FeedbackRequest) -> Result<EnhancedFeedback> {
        let enhanced = self.enhance_one(request).await?;
        self.save_enhanced(&enhanced).await?;
        Ok(enhanced)
    }

    pub async fn enhanced(&self) -> Result<Arc<Vec<EnhancedFeedback>>> {
        self.cache.get_enhanced().await
    }

    pub async fn summary(&self) -> Result<FeedbackSummary> {
        let all = self.cache.get_enhanced().await?;
        Ok(FeedbackSummary::from_enhanced(&all))
    }

    /// Persist the base fields of an enhanced record. A missing date becomes today.
    pub async fn save_enhanced(&self, enhanced: &EnhancedFeedback) -> Result<FeedbackEntry> {
        let mut entry = enhanced.base.clone();
        if entry.date.is_none() {
            entry.date = Some(chrono::Local::now().date_naive());
        }
        let saved = self.store.save(entry)?;
        self.cache.invalidate().await;
        info!("Saved enhanced feedback ID: {}", saved.id_label());
        Ok(saved)
    }

    pub async fn delete(&self, id: u64) -> Result<()> {
        if !self.store.delete_by_id(id)? {
            return Err(FeedbackError::NotFound(id));
        }
        self.cache.invalidate().await;
        Ok(())
    }

    /// Drop the cached view so the next read rebuilds it
    pub async fn refresh(&self) {
        self.cache.invalidate().await;
    }

    /// Turn requests into dated, labelled entries with batch-unique ids.
    ///
    /// Labelling failures fall back to `NEUTRAL`; an empty batch or a blank
    /// comment is rejected.
    pub fn prepare_batch(&self, requests: Vec<FeedbackRequest>) -> Result<Vec<FeedbackEntry>> {
        if requests.is_empty() {
            return Err(FeedbackError::Validation("batch contains no feedback".to_string()));
        }
        if let Some(pos) = requests.iter().position(|r| r.comment.trim().is_empty()) {
            return Err(FeedbackError::Validation(format!(
                "feedback #{} in batch has a blank comment",
                pos + 1
            )));
        }

        let base_id = chrono::Utc::now().timestamp_millis().max(0) as u64 * 1000;
        Ok(requests
            .into_iter()
            .enumerate()
            .map(|(i, request)| {
                let sentiment = self.labeler.label_or_neutral(&request.comment);
                FeedbackEntry::new(request.customer, request.department, request.comment)
                    .with_id(base_id + i as u64)
                    .with_sentiment(sentiment)
            })
            .collect())
    }

    pub async fn run_batch(
        &self,
        entries: Vec<FeedbackEntry>,
        observer: Option<Arc<dyn BatchObserver>>,
    ) -> BatchResult {
        self.batch.run(entries, observer).await
    }

    pub fn spawn_batch(
        &self,
        entries: Vec<FeedbackEntry>,
        observer: Option<Arc<dyn BatchObserver>>,
    ) -> BatchHandle {
        self.batch.spawn(entries, observer)
    }
}
