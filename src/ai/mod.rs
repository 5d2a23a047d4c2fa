//! AI collaborators: text completion and sentiment labelling

pub mod llm;
pub mod sentiment;

pub use llm::{
    CompletionError, LlmClient, ProviderConfig, ProviderKind, TextCompletion,
    UnconfiguredCompletion,
};
pub use sentiment::{LexiconLabeler, SentimentLabeler};
