//! Feedback Insights - Customer Feedback Enhancement Library
//!
//! A store for retail customer feedback with:
//! - A plain-text, human-readable feedback file
//! - Sentiment labelling for submitted comments
//! - LLM-derived categories and actionable insights (Gemini or OpenRouter)
//! - Bounded-concurrency batch enhancement with progress notifications
//! - A single-flight cache of the fully enhanced view
//!
//! # Example
//!
//! ```ignore
//! use feedback_insights::config::Config;
//! use feedback_insights::feedback::FeedbackService;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let service = FeedbackService::from_config(&Config::load()?)?;
//!     let summary = service.summary().await?;
//!     println!("{} entries", summary.total_feedback);
//!     Ok(())
//! }
//! ```

// Core modules (order matters for cross-module dependencies)
pub mod types;
pub mod error;
pub mod config;
pub mod store;
pub mod ai;
pub mod feedback;
pub mod cli;

// Re-export commonly used types for convenience
pub use types::{EnhancedFeedback, FeedbackEntry};

pub use error::{FeedbackError, Result};

pub use config::Config;

pub use store::{FeedbackSource, FeedbackStore};

pub use ai::{LexiconLabeler, LlmClient, SentimentLabeler, TextCompletion};

pub use feedback::{
    BatchProcessor,
    BatchResult,
    EnhancedCache,
    Enhancer,
    FeedbackEnhancer,
    FeedbackService,
    FeedbackSummary,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get the library info
pub fn info() -> String {
    format!("{} v{} - Customer Feedback Enhancement Library", NAME, VERSION)
}
