//! Deterministic stand-ins for the engine's collaborators.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::domain::change::{FileChange, FileStatus};
use crate::domain::diff::{DiffNode, FileDiff};
use crate::error::{AppError, AppResult};
use crate::services::{DiffProvider, SummarySection, Summarizer, TokenCounter};

/// One token per byte, so budgets in tests are plain string lengths.
pub struct ByteCounter;

impl TokenCounter for ByteCounter {
    fn count(&self, text: &str) -> usize {
        text.len()
    }
}

pub struct MapDiffs(pub HashMap<String, String>);

impl MapDiffs {
    pub fn new(entries: &[(&str, &str)]) -> Self {
        Self(
            entries
                .iter()
                .map(|(path, diff)| (path.to_string(), diff.to_string()))
                .collect(),
        )
    }
}

#[async_trait]
impl DiffProvider for MapDiffs {
    async fn diff(&self, change: &FileChange) -> AppResult<String> {
        self.0.get(&change.file_path).cloned().ok_or_else(|| {
            AppError::VersionControl(format!("no diff for {}", change.file_path))
        })
    }
}

/// Returns `output` for every call, except for sections whose file is in `fail_on`.
/// Records each call's file list and the peak number of calls in flight.
pub struct ScriptedSummarizer {
    output: String,
    fail_on: Vec<String>,
    fail_all: bool,
    in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
    pub calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedSummarizer {
    pub fn returning(output: &str) -> Self {
        Self {
            output: output.to_string(),
            fail_on: Vec::new(),
            fail_all: false,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::returning("")
        }
    }

    pub fn failing_on(output: &str, files: &[&str]) -> Self {
        Self {
            fail_on: files.iter().map(|file| file.to_string()).collect(),
            ..Self::returning(output)
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or(0)
    }

    pub fn called_files(&self) -> Vec<Vec<String>> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Summarizer for ScriptedSummarizer {
    async fn summarize(&self, sections: &[SummarySection]) -> AppResult<String> {
        let files = sections
            .iter()
            .map(|section| section.file.clone())
            .collect::<Vec<_>>();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(files.clone());
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_all || files.iter().any(|file| self.fail_on.contains(file)) {
            return Err(AppError::Summarization("scripted failure".to_string()));
        }
        Ok(self.output.clone())
    }
}

pub fn change(path: &str) -> FileChange {
    FileChange::new(path, FileStatus::Modified)
}

pub fn file_diff(path: &str, diff: &str) -> FileDiff {
    let mut file = FileDiff::placeholder(change(path));
    file.replace_diff(diff.to_string(), &ByteCounter);
    file
}

/// A tree with every file's diff already populated.
pub fn populated_tree(files: &[(&str, &str)]) -> DiffNode {
    let mut root = DiffNode::root();
    for (path, diff) in files {
        let file = file_diff(path, diff);
        root.descend_or_create(&file.change().directory_segments())
            .diffs
            .push(file);
    }
    root
}
