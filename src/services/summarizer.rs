use async_trait::async_trait;

use crate::error::AppResult;

/// One piece of content handed to a [`Summarizer`], labelled with the file it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarySection {
    pub content: String,
    pub file: String,
    pub summary: String,
}

/// Compresses a set of diff sections into a shorter text.
///
/// Failures are expected to be recoverable: callers keep the original content.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, sections: &[SummarySection]) -> AppResult<String>;
}
