//! Feedback enhancement pipeline

pub mod batch;
pub mod cache;
pub mod enhance;
pub mod service;
pub mod summary;

// Re-export commonly used types
pub use batch::{
    BatchEvent, BatchHandle, BatchObserver, BatchProcessor, BatchProgress, BatchResult,
    BatchSnapshot, ChannelObserver,
};
pub use cache::EnhancedCache;
pub use enhance::{Enhancer, FeedbackEnhancer};
pub use service::{FeedbackRequest, FeedbackService};
pub use summary::FeedbackSummary;
