//! Sentiment labelling
//!
//! The labelling model is pluggable through [`SentimentLabeler`]. The bundled
//! [`LexiconLabeler`] scores each sentence against small word lists and takes
//! the majority label across sentences.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::warn;

use crate::error::{FeedbackError, Result};

pub const POSITIVE: &str = "POSITIVE";
pub const NEGATIVE: &str = "NEGATIVE";
pub const NEUTRAL: &str = "NEUTRAL";

/// Assigns a sentiment label to free text
pub trait SentimentLabeler: Send + Sync {
    /// Fails with [`FeedbackError::Validation`] on blank text
    fn label(&self, text: &str) -> Result<String>;

    /// Label, mapping any failure to `NEUTRAL`
    fn label_or_neutral(&self, text: &str) -> String {
        self.label(text).unwrap_or_else(|e| {
            warn!("Failed sentiment analysis for entry, using NEUTRAL: {}", e);
            NEUTRAL.to_string()
        })
    }
}

static SENTENCE_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+").unwrap());
static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z']+").unwrap());

const POSITIVE_WORDS: &[&str] = &[
    "amazing", "awesome", "best", "clean", "delighted", "easy", "excellent", "fantastic",
    "fast", "friendly", "good", "great", "happy", "helpful", "love", "loved", "nice",
    "perfect", "pleasant", "polite", "quick", "recommend", "satisfied", "thanks", "wonderful",
];

const NEGATIVE_WORDS: &[&str] = &[
    "awful", "bad", "broken", "dirty", "disappointed", "disappointing", "expensive", "hate",
    "late", "long", "missing", "never", "overpriced", "poor", "rude", "slow", "terrible",
    "unhelpful", "unhappy", "useless", "worst", "wrong",
];

const NEGATIONS: &[&str] = &["not", "no", "isn't", "wasn't", "don't", "didn't"];

/// Word-list sentiment labeler
#[derive(Debug, Default, Clone)]
pub struct LexiconLabeler;

impl LexiconLabeler {
    pub fn new() -> Self {
        Self
    }

    fn sentence_label(sentence: &str) -> &'static str {
        let mut score = 0i32;
        let mut negate = false;

        for word in WORD.find_iter(sentence) {
            let word = word.as_str().to_lowercase();
            let polarity = if POSITIVE_WORDS.contains(&word.as_str()) {
                1
            } else if NEGATIVE_WORDS.contains(&word.as_str()) {
                -1
            } else {
                0
            };

            if polarity != 0 {
                score += if negate { -polarity } else { polarity };
                negate = false;
            } else if NEGATIONS.contains(&word.as_str()) {
                negate = true;
            }
        }

        match score.cmp(&0) {
            std::cmp::Ordering::Greater => POSITIVE,
            std::cmp::Ordering::Less => NEGATIVE,
            std::cmp::Ordering::Equal => NEUTRAL,
        }
    }
}

impl SentimentLabeler for LexiconLabeler {
    fn label(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(FeedbackError::Validation(
                "Comment cannot be null or empty".to_string(),
            ));
        }

        let mut counts: HashMap<&'static str, usize> = HashMap::new();
        for sentence in SENTENCE_SPLIT.split(text).filter(|s| !s.trim().is_empty()) {
            *counts.entry(Self::sentence_label(sentence)).or_insert(0) += 1;
        }

        // max_by_key keeps the last maximum, so ties go to the later label
        let label = [NEGATIVE, POSITIVE, NEUTRAL]
            .into_iter()
            .filter(|l| counts.contains_key(l))
            .max_by_key(|l| counts[l])
            .unwrap_or(NEUTRAL);

        Ok(label.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_text_is_rejected() {
        let labeler = LexiconLabeler::new();
        assert!(matches!(labeler.label("   "), Err(FeedbackError::Validation(_))));
        assert_eq!(labeler.label_or_neutral(""), NEUTRAL);
    }

    #[test]
    fn test_simple_labels() {
        let labeler = LexiconLabeler::new();
        assert_eq!(labeler.label("Great service, very friendly staff!").unwrap(), POSITIVE);
        assert_eq!(labeler.label("Checkout was slow and the cashier was rude.").unwrap(), NEGATIVE);
        assert_eq!(labeler.label("I bought a lamp.").unwrap(), NEUTRAL);
    }

    #[test]
    fn test_negation_flips() {
        let labeler = LexiconLabeler::new();
        assert_eq!(labeler.label("The staff was not helpful").unwrap(), NEGATIVE);
        assert_eq!(labeler.label("Honestly not bad").unwrap(), POSITIVE);
    }

    #[test]
    fn test_majority_across_sentences() {
        let labeler = LexiconLabeler::new();
        let text = "Delivery was late. The box was broken. The driver was friendly.";
        assert_eq!(labeler.label(text).unwrap(), NEGATIVE);
    }

    #[test]
    fn test_only_punctuation_is_neutral() {
        assert_eq!(LexiconLabeler::new().label("?!").unwrap(), NEUTRAL);
    }
}
