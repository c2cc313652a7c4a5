use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::domain::diff::DirectoryDiff;
use crate::error::AppResult;
use crate::services::{SummarySection, Summarizer, TokenCounter};

#[derive(Debug, Clone, Copy)]
pub struct WaveLimits {
    pub max_tokens: usize,
    pub min_tokens_for_summary: usize,
    pub max_concurrent: usize,
}

/// Summarizes the largest directory groups until the total fits `max_tokens`.
///
/// Groups are visited largest first (ties in input order) in waves of at most
/// `max_concurrent` concurrent calls. The loop stops as soon as the budget is
/// met, or when no unsummarized group at or above `min_tokens_for_summary`
/// remains ahead of the cursor. A group whose summarization fails keeps its
/// content and is not retried. The groups are returned in input order.
pub async fn summarize_in_waves(
    mut groups: Vec<DirectoryDiff>,
    limits: WaveLimits,
    summarizer: &dyn Summarizer,
    tokens: &dyn TokenCounter,
) -> Vec<DirectoryDiff> {
    let order = order_by_size(&groups);
    let mut total = groups.iter().map(DirectoryDiff::token_count).sum::<usize>();
    let mut cursor = 0;
    let mut waves = 0;

    while total > limits.max_tokens && cursor < order.len() {
        let wave = next_wave(&groups, &order, &mut cursor, limits);
        if wave.is_empty() {
            break;
        }
        waves += 1;
        debug!(wave = waves, size = wave.len(), total, "starting summarization wave");

        let results = join_all(
            wave.iter()
                .map(|&index| summarize_group(&groups[index], summarizer)),
        )
        .await;

        for (&index, result) in wave.iter().zip(results) {
            let group = &mut groups[index];
            match result {
                Ok(summary) => {
                    let before = group.token_count();
                    group.apply_summary(summary, tokens);
                    total = total - before + group.token_count();
                    debug!(
                        directory = group.display_path(),
                        before,
                        after = group.token_count(),
                        "summarized directory"
                    );
                }
                Err(err) => {
                    warn!(
                        directory = group.display_path(),
                        error = %err,
                        "directory summarization failed, keeping original diffs"
                    );
                }
            }
        }
    }

    if total > limits.max_tokens {
        info!(total, max_tokens = limits.max_tokens, waves, "token budget not reached");
    } else {
        info!(total, waves, "token budget satisfied");
    }
    groups
}

/// Indices of `groups` by descending token count; the sort is stable.
pub fn order_by_size(groups: &[DirectoryDiff]) -> Vec<usize> {
    let mut order = (0..groups.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| groups[b].token_count().cmp(&groups[a].token_count()));
    order
}

/// Collects up to `max_concurrent` eligible indices starting at `cursor`.
///
/// The cursor moves past every index it inspects, eligible or not.
pub fn next_wave(
    groups: &[DirectoryDiff],
    order: &[usize],
    cursor: &mut usize,
    limits: WaveLimits,
) -> Vec<usize> {
    let capacity = limits.max_concurrent.max(1);
    let mut wave = Vec::with_capacity(capacity);
    while *cursor < order.len() && wave.len() < capacity {
        let index = order[*cursor];
        *cursor += 1;
        let group = &groups[index];
        if group.is_summarized() || group.token_count() < limits.min_tokens_for_summary {
            continue;
        }
        wave.push(index);
    }
    wave
}

async fn summarize_group(group: &DirectoryDiff, summarizer: &dyn Summarizer) -> AppResult<String> {
    let sections = group
        .diffs
        .iter()
        .map(|file| SummarySection {
            content: file.diff().to_string(),
            file: file.file().to_string(),
            summary: file.summary().to_string(),
        })
        .collect::<Vec<_>>();
    summarizer.summarize(&sections).await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use proptest::prelude::*;

    use super::*;
    use crate::summary::testing::{ByteCounter, ScriptedSummarizer, file_diff};

    fn group(path: &str, tokens: usize) -> DirectoryDiff {
        let mut group = DirectoryDiff::new(path);
        group.push(file_diff(&format!("{path}/file.rs"), &"x".repeat(tokens)));
        group
    }

    fn limits(max_tokens: usize, min_tokens_for_summary: usize, max_concurrent: usize) -> WaveLimits {
        WaveLimits {
            max_tokens,
            min_tokens_for_summary,
            max_concurrent,
        }
    }

    fn total(groups: &[DirectoryDiff]) -> usize {
        groups.iter().map(DirectoryDiff::token_count).sum()
    }

    #[tokio::test]
    async fn under_budget_runs_no_wave() {
        let groups = vec![group("src", 100), group("lib", 100)];
        let summarizer = ScriptedSummarizer::returning("s");

        let groups = summarize_in_waves(groups, limits(1000, 400, 6), &summarizer, &ByteCounter).await;

        assert_eq!(summarizer.call_count(), 0);
        assert!(groups.iter().all(|group| !group.is_summarized()));
        assert_eq!(total(&groups), 200);
    }

    #[tokio::test]
    async fn stops_once_budget_is_met() {
        let groups = (0..10).map(|i| group(&format!("d{i}"), 600)).collect::<Vec<_>>();
        let summarizer = ScriptedSummarizer::returning(&"s".repeat(10));

        let groups = summarize_in_waves(groups, limits(1000, 400, 3), &summarizer, &ByteCounter).await;

        // Each summary saves 590 tokens: 6000 -> 4230 -> 2460 -> 690.
        let calls = summarizer.called_files();
        assert_eq!(calls.len(), 9);
        assert_eq!(calls[0], vec!["d0/file.rs".to_string()]);
        assert_eq!(calls[2], vec!["d2/file.rs".to_string()]);
        assert!(total(&groups) <= 1000);
        assert!(groups[..9].iter().all(DirectoryDiff::is_summarized));
        assert!(!groups[9].is_summarized());
        assert!(summarizer.peak_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn largest_groups_go_first_and_output_keeps_input_order() {
        let groups = vec![group("small", 500), group("huge", 3000), group("mid", 1000)];
        let summarizer = ScriptedSummarizer::returning("s");

        let groups = summarize_in_waves(groups, limits(2000, 400, 1), &summarizer, &ByteCounter).await;

        assert_eq!(summarizer.called_files(), vec![vec!["huge/file.rs".to_string()]]);
        let paths = groups.iter().map(|group| group.path.as_str()).collect::<Vec<_>>();
        assert_eq!(paths, vec!["small", "huge", "mid"]);
        assert_eq!(groups[1].summary(), Some("s"));
        assert_eq!(total(&groups), 1501);
    }

    #[tokio::test]
    async fn groups_below_threshold_are_never_selected() {
        let groups = vec![group("tiny", 350), group("big", 900)];
        let summarizer = ScriptedSummarizer::returning("s");

        let groups = summarize_in_waves(groups, limits(100, 400, 6), &summarizer, &ByteCounter).await;

        assert!(!groups[0].is_summarized());
        assert_eq!(groups[0].token_count(), 350);
        assert!(groups[1].is_summarized());
        assert!(total(&groups) > 100);
    }

    #[tokio::test]
    async fn failed_group_is_kept_and_not_retried() {
        let groups = vec![group("a", 800), group("b", 700), group("c", 600)];
        let summarizer = ScriptedSummarizer::failing_on("s", &["a/file.rs"]);

        let groups = summarize_in_waves(groups, limits(500, 400, 2), &summarizer, &ByteCounter).await;

        assert!(!groups[0].is_summarized());
        assert_eq!(groups[0].token_count(), 800);
        assert!(groups[1].is_summarized());
        assert!(groups[2].is_summarized());
        let attempts_on_a = summarizer
            .called_files()
            .iter()
            .filter(|files| files.contains(&"a/file.rs".to_string()))
            .count();
        assert_eq!(attempts_on_a, 1);
    }

    #[tokio::test]
    async fn always_failing_summarizer_leaves_groups_untouched() {
        let original = vec![group("a", 800), group("b", 700)];
        let summarizer = ScriptedSummarizer::failing();

        let groups = summarize_in_waves(original.clone(), limits(10, 100, 6), &summarizer, &ByteCounter).await;

        assert_eq!(groups, original);
    }

    #[tokio::test]
    async fn directory_summary_receives_every_member_file() {
        let mut src = DirectoryDiff::new("src");
        src.push(file_diff("src/a.rs", &"a".repeat(300)));
        src.push(file_diff("src/b.rs", &"b".repeat(300)));
        let summarizer = ScriptedSummarizer::returning("both");

        summarize_in_waves(vec![src], limits(100, 400, 6), &summarizer, &ByteCounter).await;

        assert_eq!(
            summarizer.called_files(),
            vec![vec!["src/a.rs".to_string(), "src/b.rs".to_string()]]
        );
    }

    #[test]
    fn ties_keep_input_order() {
        let groups = vec![group("a", 600), group("b", 900), group("c", 600), group("d", 600)];
        assert_eq!(order_by_size(&groups), vec![1, 0, 2, 3]);
    }

    #[test]
    fn wave_skips_ineligible_and_advances_cursor() {
        let mut summarized = group("done", 5000);
        summarized.apply_summary("x".repeat(4000), &ByteCounter);
        let groups = vec![summarized, group("small", 50), group("a", 900), group("b", 800)];
        let order = order_by_size(&groups);
        let mut cursor = 0;

        let wave = next_wave(&groups, &order, &mut cursor, limits(0, 400, 1));
        assert_eq!(wave, vec![2]);
        assert_eq!(cursor, 2);

        let wave = next_wave(&groups, &order, &mut cursor, limits(0, 400, 5));
        assert_eq!(wave, vec![3]);
        assert_eq!(cursor, 4);

        assert!(next_wave(&groups, &order, &mut cursor, limits(0, 400, 5)).is_empty());
    }

    proptest! {
        #[test]
        fn converges_or_exhausts_candidates(
            sizes in prop::collection::vec(0usize..2000, 0..20),
            max_tokens in 0usize..5000,
            min_tokens in 0usize..800,
            max_concurrent in 1usize..5,
        ) {
            let groups = sizes
                .iter()
                .enumerate()
                .map(|(i, &size)| group(&format!("d{i}"), size))
                .collect::<Vec<_>>();
            let summarizer = ScriptedSummarizer::returning("s");
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();

            let groups = runtime.block_on(summarize_in_waves(
                groups,
                limits(max_tokens, min_tokens, max_concurrent),
                &summarizer,
                &ByteCounter,
            ));

            let exhausted = sizes
                .iter()
                .zip(&groups)
                .filter(|(size, _)| **size >= min_tokens)
                .all(|(_, group)| group.is_summarized());
            prop_assert!(total(&groups) <= max_tokens || exhausted);
            prop_assert!(summarizer.peak_in_flight.load(Ordering::SeqCst) <= max_concurrent);
            for group in &groups {
                if let Some(summary) = group.summary() {
                    prop_assert_eq!(group.token_count(), ByteCounter.count(summary));
                }
            }
        }
    }
}
