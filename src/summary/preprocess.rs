use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::domain::diff::{DiffNode, FileDiff};
use crate::error::AppResult;
use crate::services::{SummarySection, Summarizer, TokenCounter};

/// Thresholds for file-level pre-summarization.
#[derive(Debug, Clone, Copy)]
pub struct FileLimits {
    pub max_file_tokens: usize,
    pub min_tokens_for_summary: usize,
    pub max_concurrent: usize,
}

impl FileLimits {
    fn selects(&self, file: &FileDiff) -> bool {
        file.token_count() > self.max_file_tokens
            && file.token_count() >= self.min_tokens_for_summary
    }
}

/// Replaces the diff of every oversized file with a summary.
///
/// Selected files are summarized in sequential waves of at most
/// `max_concurrent` calls. A file whose summarization fails keeps its
/// original diff; nothing in this stage returns an error.
pub async fn summarize_large_files(
    mut root: DiffNode,
    limits: FileLimits,
    summarizer: &dyn Summarizer,
    tokens: &dyn TokenCounter,
) -> DiffNode {
    let mut selected = root
        .files_mut()
        .into_iter()
        .filter(|file| limits.selects(file))
        .collect::<Vec<_>>();

    if selected.is_empty() {
        return root;
    }
    info!(
        files = selected.len(),
        max_file_tokens = limits.max_file_tokens,
        "pre-summarizing oversized files"
    );

    let wave_size = limits.max_concurrent.max(1);
    for wave in selected.chunks_mut(wave_size) {
        let results = join_all(wave.iter().map(|file| summarize_file(file, summarizer))).await;

        for (file, result) in wave.iter_mut().zip(results) {
            match result {
                Ok(summary) => {
                    let before = file.token_count();
                    file.replace_diff(summary, tokens);
                    debug!(
                        file = file.file(),
                        before,
                        after = file.token_count(),
                        "summarized file"
                    );
                }
                Err(err) => {
                    warn!(file = file.file(), error = %err, "file summarization failed, keeping original diff");
                }
            }
        }
    }

    root
}

async fn summarize_file(file: &FileDiff, summarizer: &dyn Summarizer) -> AppResult<String> {
    let section = SummarySection {
        content: file.diff().to_string(),
        file: file.file().to_string(),
        summary: file.summary().to_string(),
    };
    summarizer.summarize(std::slice::from_ref(&section)).await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::summary::testing::{ByteCounter, ScriptedSummarizer, populated_tree};

    fn limits(max_file_tokens: usize, min_tokens_for_summary: usize, max_concurrent: usize) -> FileLimits {
        FileLimits {
            max_file_tokens,
            min_tokens_for_summary,
            max_concurrent,
        }
    }

    #[tokio::test]
    async fn summarizes_oversized_file() {
        let big = "x".repeat(5000);
        let root = populated_tree(&[("src/big.rs", big.as_str()), ("src/small.rs", "+s")]);
        let summarizer = ScriptedSummarizer::returning("big file rewritten");

        let root = summarize_large_files(root, limits(500, 400, 6), &summarizer, &ByteCounter).await;

        let src = &root.children["src"];
        assert_eq!(src.diffs[0].diff(), "big file rewritten");
        assert!(src.diffs[0].token_count() < 5000);
        assert_eq!(src.diffs[0].token_count(), ByteCounter.count("big file rewritten"));
        assert_eq!(src.diffs[1].diff(), "+s");
        assert_eq!(summarizer.called_files(), vec![vec!["src/big.rs".to_string()]]);
    }

    #[tokio::test]
    async fn leaves_files_below_summary_threshold() {
        let medium = "x".repeat(300);
        let root = populated_tree(&[("a.rs", medium.as_str())]);
        let summarizer = ScriptedSummarizer::returning("short");

        let root = summarize_large_files(root, limits(100, 400, 6), &summarizer, &ByteCounter).await;

        assert_eq!(root.diffs[0].token_count(), 300);
        assert_eq!(summarizer.call_count(), 0);
    }

    #[tokio::test]
    async fn failure_keeps_original_diff() {
        let big = "y".repeat(1000);
        let root = populated_tree(&[("a/one.rs", big.as_str()), ("b/two.rs", big.as_str())]);
        let summarizer = ScriptedSummarizer::failing_on("done", &["a/one.rs"]);

        let root = summarize_large_files(root, limits(100, 100, 6), &summarizer, &ByteCounter).await;

        assert_eq!(root.children["a"].diffs[0].diff(), big);
        assert_eq!(root.children["a"].diffs[0].token_count(), 1000);
        assert_eq!(root.children["b"].diffs[0].diff(), "done");
    }

    #[tokio::test]
    async fn waves_respect_concurrency_limit() {
        let big = "z".repeat(800);
        let files = (0..7)
            .map(|i| (format!("dir/f{i}.rs"), big.clone()))
            .collect::<Vec<_>>();
        let refs = files
            .iter()
            .map(|(path, diff)| (path.as_str(), diff.as_str()))
            .collect::<Vec<_>>();
        let root = populated_tree(&refs);
        let summarizer = ScriptedSummarizer::returning("s");

        let root = summarize_large_files(root, limits(100, 100, 3), &summarizer, &ByteCounter).await;

        assert_eq!(summarizer.call_count(), 7);
        assert!(summarizer.peak_in_flight.load(Ordering::SeqCst) <= 3);
        assert!(root.files().iter().all(|file| file.diff() == "s"));
    }
}
