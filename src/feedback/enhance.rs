//! Single-record enhancement
//!
//! Asks the completion backend for a category and an actionable insight.
//! Never fails: collaborator errors become an "Error in processing" record.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::ai::llm::TextCompletion;
use crate::error::Result;
use crate::types::{
    EnhancedFeedback, FeedbackEntry, CATEGORIES, ERROR_CATEGORY, NO_ACTION_INSIGHT,
    UNCATEGORIZED,
};

static CATEGORY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""category"\s*:\s*"([^"]+)""#).unwrap());
static INSIGHT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""actionableInsight"\s*:\s*"([^"]+)""#).unwrap());

/// Turns one feedback entry into an enhanced record
///
/// This is the seam the batch processor and the cache fan out over.
#[async_trait]
pub trait FeedbackEnhancer: Send + Sync {
    async fn enhance(&self, entry: FeedbackEntry) -> Result<EnhancedFeedback>;
}

/// Completion-backed enhancer
#[derive(Clone)]
pub struct Enhancer {
    client: Arc<dyn TextCompletion>,
}

impl Enhancer {
    pub fn new(client: Arc<dyn TextCompletion>) -> Self {
        Self { client }
    }

    /// Enhance without a `Result`; every failure is folded into the record.
    pub async fn enhance_entry(&self, entry: FeedbackEntry) -> EnhancedFeedback {
        let prompt = build_prompt(&entry);

        let (category, insight) = match self.client.complete(&prompt).await {
            Ok(response) => {
                let response = response.trim();
                debug!("Enhancement response for feedback ID {}: {}", entry.id_label(), response);
                (
                    extract_field(response, Field::Category)
                        .unwrap_or_else(|| UNCATEGORIZED.to_string()),
                    extract_field(response, Field::ActionableInsight)
                        .unwrap_or_else(|| NO_ACTION_INSIGHT.to_string()),
                )
            }
            Err(e) => {
                warn!("Failed to enhance feedback ID {}: {}", entry.id_label(), e);
                (
                    ERROR_CATEGORY.to_string(),
                    format!("Could not generate insight due to API error: {}", e),
                )
            }
        };

        EnhancedFeedback::new(entry, category, insight)
    }
}

#[async_trait]
impl FeedbackEnhancer for Enhancer {
    async fn enhance(&self, entry: FeedbackEntry) -> Result<EnhancedFeedback> {
        Ok(self.enhance_entry(entry).await)
    }
}

/// Fields pulled out of the model reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Category,
    ActionableInsight,
}

/// Find `"<field>": "<value>"` anywhere in the reply, ignoring surrounding prose
pub fn extract_field(response: &str, field: Field) -> Option<String> {
    let re = match field {
        Field::Category => &*CATEGORY_RE,
        Field::ActionableInsight => &*INSIGHT_RE,
    };
    re.captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Instruction sent to the completion backend for one entry
pub fn build_prompt(entry: &FeedbackEntry) -> String {
    format!(
        "You are an AI assistant specialized in customer feedback analysis.
Analyze the following customer feedback and:
1. Categorize the feedback into one of these categories: {categories}.
2. Provide a specific actionable insight or recommendation based on the feedback.

Format your response as JSON with two fields: \"category\" and \"actionableInsight\".
Keep your response concise but insightful.

Customer Feedback:
Comment: {comment}
Department: {department}
Sentiment: {sentiment}

Provide the category and actionable insight as JSON:
",
        categories = category_list(),
        comment = entry.comment.as_deref().unwrap_or("Not provided"),
        department = entry.department.as_deref().unwrap_or("Not provided"),
        sentiment = entry.sentiment.as_deref().unwrap_or("Not provided"),
    )
}

// "A, B, or C"
fn category_list() -> String {
    match CATEGORIES.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{}, or {}", rest.join(", "), last),
        Some((last, _)) => last.to_string(),
        None => String::new(),
    }
}
