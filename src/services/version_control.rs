use async_trait::async_trait;

use crate::domain::change::FileChange;
use crate::error::AppResult;

/// Which changes a run looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeSource {
    Staged,
    WorkingTree,
    Range(String),
}

impl ChangeSource {
    pub fn from_args(range: Option<String>, all: bool) -> Self {
        match (range, all) {
            (Some(range), _) => ChangeSource::Range(range),
            (None, true) => ChangeSource::WorkingTree,
            (None, false) => ChangeSource::Staged,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ChangeSource::Staged => "staged changes".to_string(),
            ChangeSource::WorkingTree => "working tree changes".to_string(),
            ChangeSource::Range(range) => format!("changes in {range}"),
        }
    }
}

#[async_trait]
pub trait VersionControlService: Send + Sync {
    async fn list_changes(&self, source: &ChangeSource) -> AppResult<Vec<FileChange>>;
    async fn file_diff(&self, change: &FileChange, source: &ChangeSource) -> AppResult<String>;
    async fn commit(&self, message: &str) -> AppResult<()>;
}

/// Supplies the diff text of a single changed file.
#[async_trait]
pub trait DiffProvider: Send + Sync {
    async fn diff(&self, change: &FileChange) -> AppResult<String>;
}

/// Binds a [`VersionControlService`] to one [`ChangeSource`].
pub struct SourceDiffs<'a> {
    pub version_control: &'a dyn VersionControlService,
    pub source: &'a ChangeSource,
}

#[async_trait]
impl<'a> DiffProvider for SourceDiffs<'a> {
    async fn diff(&self, change: &FileChange) -> AppResult<String> {
        self.version_control.file_diff(change, self.source).await
    }
}
