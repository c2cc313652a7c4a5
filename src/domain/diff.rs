use std::collections::BTreeMap;

use crate::domain::change::FileChange;
use crate::services::TokenCounter;

/// A changed file together with its diff text.
///
/// `token_count` always describes the current `diff`; the only way to swap the
/// text is [`FileDiff::replace_diff`], which recounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    change: FileChange,
    diff: String,
    token_count: usize,
}

impl FileDiff {
    /// A file whose diff has not been fetched yet.
    pub fn placeholder(change: FileChange) -> Self {
        Self {
            change,
            diff: String::new(),
            token_count: 0,
        }
    }

    pub fn change(&self) -> &FileChange {
        &self.change
    }

    pub fn file(&self) -> &str {
        &self.change.file_path
    }

    pub fn summary(&self) -> &str {
        &self.change.summary
    }

    pub fn diff(&self) -> &str {
        &self.diff
    }

    pub fn token_count(&self) -> usize {
        self.token_count
    }

    pub fn replace_diff(&mut self, diff: String, tokens: &dyn TokenCounter) {
        self.token_count = tokens.count(&diff);
        self.diff = diff;
    }

    /// Owning directory, `""` for files at the repository root.
    pub fn directory(&self) -> String {
        self.change.directory_segments().join("/")
    }
}

/// One directory of the change tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffNode {
    pub path: Vec<String>,
    pub diffs: Vec<FileDiff>,
    pub children: BTreeMap<String, DiffNode>,
}

impl DiffNode {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn path_string(&self) -> String {
        self.path.join("/")
    }

    /// Walks `segments` from this node, creating missing children on the way.
    pub fn descend_or_create(&mut self, segments: &[String]) -> &mut DiffNode {
        let mut node = self;
        for segment in segments {
            let mut child_path = node.path.clone();
            child_path.push(segment.clone());
            node = node
                .children
                .entry(segment.clone())
                .or_insert_with(|| DiffNode {
                    path: child_path,
                    ..DiffNode::default()
                });
        }
        node
    }

    /// Files in traversal order: a node's own files, then each child subtree by key.
    pub fn files(&self) -> Vec<&FileDiff> {
        let mut out = Vec::new();
        self.push_files(&mut out);
        out
    }

    fn push_files<'a>(&'a self, out: &mut Vec<&'a FileDiff>) {
        out.extend(self.diffs.iter());
        for child in self.children.values() {
            child.push_files(out);
        }
    }

    pub fn files_mut(&mut self) -> Vec<&mut FileDiff> {
        let mut out = Vec::new();
        self.push_files_mut(&mut out);
        out
    }

    fn push_files_mut<'a>(&'a mut self, out: &mut Vec<&'a mut FileDiff>) {
        out.extend(self.diffs.iter_mut());
        for child in self.children.values_mut() {
            child.push_files_mut(out);
        }
    }

    pub fn into_files(self) -> Vec<FileDiff> {
        let mut out = Vec::new();
        self.push_into_files(&mut out);
        out
    }

    fn push_into_files(self, out: &mut Vec<FileDiff>) {
        out.extend(self.diffs);
        for (_, child) in self.children {
            child.push_into_files(out);
        }
    }

    /// Paths of every node that directly holds at least one file.
    pub fn directory_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        if !self.diffs.is_empty() {
            out.push(self.path_string());
        }
        for child in self.children.values() {
            out.extend(child.directory_paths());
        }
        out
    }

    pub fn token_count(&self) -> usize {
        self.files().iter().map(|diff| diff.token_count()).sum()
    }
}

/// All file diffs sharing one exact parent directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryDiff {
    pub path: String,
    pub diffs: Vec<FileDiff>,
    summary: Option<String>,
    token_count: usize,
}

impl DirectoryDiff {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            diffs: Vec::new(),
            summary: None,
            token_count: 0,
        }
    }

    pub fn push(&mut self, diff: FileDiff) {
        self.token_count += diff.token_count();
        self.diffs.push(diff);
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn is_summarized(&self) -> bool {
        self.summary.is_some()
    }

    pub fn token_count(&self) -> usize {
        self.token_count
    }

    /// Replaces the group's content with `summary`; the token count now measures the summary.
    pub fn apply_summary(&mut self, summary: String, tokens: &dyn TokenCounter) {
        self.token_count = tokens.count(&summary);
        self.summary = Some(summary);
    }

    pub fn display_path(&self) -> &str {
        if self.path.is_empty() { "." } else { &self.path }
    }
}
