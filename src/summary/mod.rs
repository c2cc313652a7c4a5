//! Compresses a change set into a report that fits a token budget.
//!
//! Stages run in order: [`tree::build_tree`], [`collect::collect_diffs`],
//! [`preprocess::summarize_large_files`], [`group::group_by_directory`],
//! [`waves::summarize_in_waves`] and [`report::format_report`].

pub mod collect;
pub mod group;
pub mod preprocess;
pub mod report;
pub mod tree;
pub mod waves;

#[cfg(test)]
pub mod testing;

use tracing::info;

use crate::domain::change::FileChange;
use crate::domain::diff::DirectoryDiff;
use crate::error::AppResult;
use crate::services::{DiffProvider, Summarizer, TokenCounter};

use self::preprocess::FileLimits;
use self::waves::WaveLimits;

pub const DEFAULT_MAX_TOKENS: usize = 2048;
pub const DEFAULT_MIN_TOKENS_FOR_SUMMARY: usize = 400;
pub const DEFAULT_MAX_CONCURRENT: usize = 6;
pub const DEFAULT_FETCH_CONCURRENCY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryOptions {
    pub max_tokens: usize,
    pub min_tokens_for_summary: usize,
    /// Per-file ceiling; a quarter of `max_tokens` when unset.
    pub max_file_tokens: Option<usize>,
    pub max_concurrent: usize,
    pub fetch_concurrency: usize,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            min_tokens_for_summary: DEFAULT_MIN_TOKENS_FOR_SUMMARY,
            max_file_tokens: None,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
        }
    }
}

impl SummaryOptions {
    pub fn file_token_ceiling(&self) -> usize {
        self.max_file_tokens.unwrap_or(self.max_tokens / 4)
    }
}

/// Result of one summarization run.
#[derive(Debug, Clone)]
pub struct SummaryRun {
    pub report: String,
    pub files: usize,
    pub groups: Vec<DirectoryDiff>,
}

impl SummaryRun {
    pub fn total_tokens(&self) -> usize {
        self.groups.iter().map(DirectoryDiff::token_count).sum()
    }

    pub fn summarized_directories(&self) -> usize {
        self.groups.iter().filter(|group| group.is_summarized()).count()
    }
}

/// Runs the whole pipeline over `changes`.
///
/// Only diff retrieval can fail; summarization failures fall back to the raw diffs.
pub async fn summarize_changes(
    changes: &[FileChange],
    options: &SummaryOptions,
    provider: &dyn DiffProvider,
    summarizer: &dyn Summarizer,
    tokens: &dyn TokenCounter,
) -> AppResult<SummaryRun> {
    let root = tree::build_tree(changes);
    let root = collect::collect_diffs(root, provider, tokens, options.fetch_concurrency).await?;
    info!(
        files = changes.len(),
        directories = root.directory_paths().len(),
        tokens = root.token_count(),
        "collected diffs"
    );

    let root = preprocess::summarize_large_files(
        root,
        FileLimits {
            max_file_tokens: options.file_token_ceiling(),
            min_tokens_for_summary: options.min_tokens_for_summary,
            max_concurrent: options.max_concurrent,
        },
        summarizer,
        tokens,
    )
    .await;

    let groups = group::group_by_directory(root);
    let mut groups = waves::summarize_in_waves(
        groups,
        WaveLimits {
            max_tokens: options.max_tokens,
            min_tokens_for_summary: options.min_tokens_for_summary,
            max_concurrent: options.max_concurrent,
        },
        summarizer,
        tokens,
    )
    .await;

    groups.sort_by(|a, b| b.token_count().cmp(&a.token_count()));
    let report = report::format_report(&groups);

    Ok(SummaryRun {
        report,
        files: changes.len(),
        groups,
    })
}
