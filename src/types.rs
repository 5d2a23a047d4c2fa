//! Shared types used across modules
//!
//! The feedback record, its enhanced form, and the category taxonomy.

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Categories the enhancement prompt asks the model to choose from
pub const CATEGORIES: &[&str] = &[
    "Product Quality",
    "Customer Service",
    "Store Experience",
    "Website/App",
    "Delivery",
    "Price/Value",
    "Inventory/Stock",
    "Other",
];

/// Category used when the model answered without a recognisable category
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Category used when the enhancement call itself failed
pub const ERROR_CATEGORY: &str = "Error in processing";

/// Insight used when the model answered without a recognisable insight
pub const NO_ACTION_INSIGHT: &str = "No specific action recommended.";

/// A raw customer comment record
///
/// Every field is optional because stored blocks may omit any line except
/// the `Feedback #<id>` header, and submissions have no id until saved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntry {
    pub id: Option<u64>,
    pub customer: Option<String>,
    pub department: Option<String>,
    pub date: Option<NaiveDate>,
    pub comment: Option<String>,
    pub sentiment: Option<String>,
}

impl FeedbackEntry {
    /// New submission dated today, without id or sentiment
    pub fn new(
        customer: impl Into<String>,
        department: impl Into<String>,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            customer: Some(customer.into()),
            department: Some(department.into()),
            date: Some(Local::now().date_naive()),
            comment: Some(comment.into()),
            sentiment: None,
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_sentiment(mut self, sentiment: impl Into<String>) -> Self {
        self.sentiment = Some(sentiment.into());
        self
    }

    /// Id rendered for log and error messages (`null` when unassigned)
    pub fn id_label(&self) -> String {
        self.id.map(|id| id.to_string()).unwrap_or_else(|| "null".to_string())
    }
}

/// A feedback entry plus the AI-derived category and insight
///
/// Holds the complete base record rather than extending it; on the wire the
/// base fields are flattened next to the enhancement fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedFeedback {
    #[serde(flatten)]
    pub base: FeedbackEntry,
    pub category: String,
    pub actionable_insight: String,
    pub enhanced_at: DateTime<Local>,
}

impl EnhancedFeedback {
    /// Wrap a base record, stamping `enhanced_at` now
    pub fn new(
        base: FeedbackEntry,
        category: impl Into<String>,
        actionable_insight: impl Into<String>,
    ) -> Self {
        Self {
            base,
            category: category.into(),
            actionable_insight: actionable_insight.into(),
            enhanced_at: Local::now(),
        }
    }

    pub fn id(&self) -> Option<u64> {
        self.base.id
    }

    pub fn department(&self) -> Option<&str> {
        self.base.department.as_deref()
    }

    pub fn sentiment(&self) -> Option<&str> {
        self.base.sentiment.as_deref()
    }

    /// Whether the enhancement fell back because the collaborator failed
    pub fn is_fallback(&self) -> bool {
        self.category == ERROR_CATEGORY
    }

    /// Drop the non-persisted fields
    pub fn into_entry(self) -> FeedbackEntry {
        self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry_defaults() {
        let entry = FeedbackEntry::new("Alice", "Electronics", "Great service");
        assert_eq!(entry.id, None);
        assert_eq!(entry.sentiment, None);
        assert_eq!(entry.date, Some(Local::now().date_naive()));
        assert_eq!(entry.id_label(), "null");
        assert_eq!(entry.with_id(7).id_label(), "7");
    }

    #[test]
    fn test_enhanced_serializes_flat() {
        let base = FeedbackEntry::new("Bob", "Grocery", "Slow checkout")
            .with_id(2)
            .with_sentiment("NEGATIVE");
        let enhanced = EnhancedFeedback::new(base, "Store Experience", "Open more lanes");

        let json = serde_json::to_value(&enhanced).unwrap();
        assert_eq!(json["id"], 2);
        assert_eq!(json["customer"], "Bob");
        assert_eq!(json["category"], "Store Experience");
        assert_eq!(json["actionableInsight"], "Open more lanes");
        assert!(json.get("base").is_none());
        assert!(json.get("enhancedAt").is_some());
    }

    #[test]
    fn test_into_entry_keeps_base() {
        let base = FeedbackEntry::new("Carol", "Bakery", "Fresh bread").with_id(3);
        let enhanced = EnhancedFeedback::new(base.clone(), ERROR_CATEGORY, "n/a");
        assert!(enhanced.is_fallback());
        assert_eq!(enhanced.id(), Some(3));
        assert_eq!(enhanced.department(), Some("Bakery"));
        assert_eq!(enhanced.into_entry(), base);
    }
}
