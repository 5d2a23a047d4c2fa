//! Dashboard summary over the enhanced view

use serde::Serialize;
use std::collections::BTreeMap;

use crate::types::EnhancedFeedback;

/// How many entries the summary lists as recent
pub const RECENT_LIMIT: usize = 5;

const UNKNOWN: &str = "Unknown";

/// Aggregate counts plus the most recent entries
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSummary {
    pub total_feedback: usize,
    pub sentiment_counts: BTreeMap<String, usize>,
    pub category_counts: BTreeMap<String, usize>,
    pub department_counts: BTreeMap<String, usize>,
    /// Highest ids first
    pub recent_feedback: Vec<EnhancedFeedback>,
}

impl FeedbackSummary {
    pub fn from_enhanced(all: &[EnhancedFeedback]) -> Self {
        let mut summary = FeedbackSummary {
            total_feedback: all.len(),
            ..Default::default()
        };

        for feedback in all {
            bump(&mut summary.sentiment_counts, feedback.sentiment());
            bump(&mut summary.category_counts, Some(feedback.category.as_str()));
            bump(&mut summary.department_counts, feedback.department());
        }

        let mut recent: Vec<_> = all.to_vec();
        recent.sort_by(|a, b| b.id().cmp(&a.id()));
        recent.truncate(RECENT_LIMIT);
        summary.recent_feedback = recent;

        summary
    }
}

fn bump(counts: &mut BTreeMap<String, usize>, key: Option<&str>) {
    *counts.entry(key.unwrap_or(UNKNOWN).to_string()).or_insert(0) += 1;
}
