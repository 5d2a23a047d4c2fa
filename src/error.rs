//! Error taxonomy for the feedback pipeline
//!
//! Library code returns [`FeedbackError`]; the binary wraps it in `anyhow`.

use thiserror::Error;

/// Result type for feedback operations
pub type Result<T> = std::result::Result<T, FeedbackError>;

#[derive(Error, Debug)]
pub enum FeedbackError {
    /// Backing file exists but could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored block could not be turned into an entry
    #[error("Malformed record: {0}")]
    Malformed(String),

    /// The text-completion collaborator failed
    #[error("External service error{}: {message}", status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    ExternalService {
        status: Option<u16>,
        message: String,
    },

    /// Caller supplied input the core refuses to work with
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The batch reduction step failed after every item had resolved
    #[error("Batch aggregation failed: {0}")]
    Aggregation(String),

    /// A lock holder panicked
    #[error("Lock poisoned: {0}")]
    LockPoisoned(&'static str),

    #[error("Feedback not found: {0}")]
    NotFound(u64),

    /// The highest stored id leaves no room for another
    #[error("No feedback id available after {0}")]
    IdExhausted(u64),
}

impl From<crate::ai::llm::CompletionError> for FeedbackError {
    fn from(err: crate::ai::llm::CompletionError) -> Self {
        FeedbackError::ExternalService {
            status: err.status(),
            message: err.to_string(),
        }
    }
}
