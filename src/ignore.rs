use std::fs;
use std::path::Path;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::domain::change::FileChange;
use crate::error::{AppError, AppResult};

pub const IGNORE_FILE_NAME: &str = ".diffsumignore";

pub const DEFAULT_IGNORED_FILES: &[&str] = &[
    "Cargo.lock",
    "package-lock.json",
    "npm-shrinkwrap.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "poetry.lock",
    "Pipfile.lock",
    "Gemfile.lock",
    "composer.lock",
    "go.sum",
];

pub const DEFAULT_IGNORED_EXTENSIONS: &[&str] = &["min.js", "min.css", "map"];

/// Paths that never reach the summarization engine.
///
/// File patterns follow `.gitignore` conventions: a pattern without a `/`
/// matches the file name at any depth, a leading `/` anchors it to the
/// repository root and a trailing `/` matches everything below a directory.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    set: GlobSet,
}

impl IgnoreRules {
    pub fn new(files: &[String], extensions: &[String]) -> AppResult<Self> {
        let mut builder = GlobSetBuilder::new();

        for pattern in files.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
            builder.add(compile(pattern, &anchor(pattern))?);
        }
        for ext in extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.'))
            .filter(|e| !e.is_empty())
        {
            builder.add(compile(ext, &format!("**/*.{ext}"))?);
        }

        let set = builder
            .build()
            .map_err(|err| AppError::Configuration(format!("invalid ignore rules: {err}")))?;
        Ok(Self { set })
    }

    pub fn none() -> Self {
        Self {
            set: GlobSet::empty(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn is_ignored(&self, change: &FileChange) -> bool {
        self.set.is_match(&change.file_path)
    }

    /// Splits `changes` into kept and ignored, both in their original order.
    pub fn partition(&self, changes: Vec<FileChange>) -> (Vec<FileChange>, Vec<FileChange>) {
        if self.is_empty() {
            return (changes, Vec::new());
        }
        changes.into_iter().partition(|change| !self.is_ignored(change))
    }
}

pub fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

/// Reads patterns from an ignore file, one per line. Blank lines and `#` comments are skipped.
pub fn read_ignore_file(path: &Path) -> AppResult<Vec<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(err) => Err(AppError::Io(err)),
    }
}

fn anchor(pattern: &str) -> String {
    if let Some(dir) = pattern.strip_suffix('/') {
        return format!("{}/**", anchor(dir));
    }
    if let Some(rooted) = pattern.strip_prefix('/') {
        return rooted.to_string();
    }
    if pattern.contains('/') || pattern.starts_with("**") {
        pattern.to_string()
    } else {
        format!("**/{pattern}")
    }
}

fn compile(original: &str, glob: &str) -> AppResult<globset::Glob> {
    GlobBuilder::new(glob)
        .literal_separator(true)
        .build()
        .map_err(|err| {
            AppError::Configuration(format!("invalid ignore pattern '{original}': {err}"))
        })
}
