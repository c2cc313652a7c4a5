use std::path::PathBuf;
use std::process::Stdio;
use std::sync::OnceLock;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::domain::change::{FileChange, FileStatus, parse_name_status};
use crate::error::{AppError, AppResult};
use crate::services::{ChangeSource, VersionControlService};

pub struct GitCli {
    workspace_root: PathBuf,
    has_head: OnceLock<bool>,
}

impl GitCli {
    pub fn new(workspace_root: PathBuf) -> Self {
        Self {
            workspace_root,
            has_head: OnceLock::new(),
        }
    }

    /// Whether `HEAD` resolves; false in a repository without commits.
    async fn has_head(&self) -> bool {
        if let Some(known) = self.has_head.get() {
            return *known;
        }
        let resolved = Command::new("git")
            .args(["rev-parse", "--verify", "--quiet", "HEAD"])
            .current_dir(&self.workspace_root)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false);
        if !resolved {
            debug!("HEAD does not resolve, diffing the index instead");
        }
        *self.has_head.get_or_init(|| resolved)
    }

    async fn revision_for(&self, source: &ChangeSource) -> Vec<String> {
        let has_head = match source {
            ChangeSource::WorkingTree => self.has_head().await,
            _ => true,
        };
        revision_args(source, has_head)
    }

    async fn run(&self, args: &[String]) -> AppResult<String> {
        debug!(?args, "running git");
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.workspace_root)
            .output()
            .await
            .map_err(|err| AppError::VersionControl(format!("failed to run git: {err}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::VersionControl(format!(
                "git {} failed: {}",
                args.first().map(String::as_str).unwrap_or_default(),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn untracked_diff(&self, change: &FileChange) -> AppResult<String> {
        let path = self.workspace_root.join(&change.file_path);
        let content = tokio::fs::read(&path).await.map_err(|err| {
            AppError::VersionControl(format!("failed to read {}: {err}", path.display()))
        })?;
        Ok(render_new_file(
            &change.file_path,
            &String::from_utf8_lossy(&content),
        ))
    }
}

#[async_trait]
impl VersionControlService for GitCli {
    async fn list_changes(&self, source: &ChangeSource) -> AppResult<Vec<FileChange>> {
        let mut args = vec![
            "diff".to_string(),
            "--name-status".to_string(),
            "-M".to_string(),
        ];
        args.extend(self.revision_for(source).await);
        let mut changes = parse_name_status(&self.run(&args).await?);

        if *source == ChangeSource::WorkingTree {
            let untracked = self
                .run(&[
                    "ls-files".to_string(),
                    "--others".to_string(),
                    "--exclude-standard".to_string(),
                ])
                .await?;
            changes.extend(parse_untracked(&untracked));
        }
        Ok(changes)
    }

    async fn file_diff(&self, change: &FileChange, source: &ChangeSource) -> AppResult<String> {
        if change.status == FileStatus::Untracked {
            return self.untracked_diff(change).await;
        }
        let revision = self.revision_for(source).await;
        self.run(&diff_args(change, revision)).await
    }

    async fn commit(&self, message: &str) -> AppResult<()> {
        if message.trim().is_empty() {
            return Err(AppError::VersionControl(
                "commit message cannot be empty".to_string(),
            ));
        }

        let mut child = Command::new("git")
            .args(["commit", "-F", "-"])
            .current_dir(&self.workspace_root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| AppError::VersionControl(format!("failed to run git: {err}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(message.as_bytes()).await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::VersionControl(format!(
                "git commit failed: {}",
                stderr.trim()
            )));
        }
        Ok(())
    }
}

/// Without a `HEAD`, every tracked file is new in the index, so the working
/// tree is diffed against the index and untracked files are listed separately.
fn revision_args(source: &ChangeSource, has_head: bool) -> Vec<String> {
    match source {
        ChangeSource::Staged => vec!["--cached".to_string()],
        ChangeSource::WorkingTree if has_head => vec!["HEAD".to_string()],
        ChangeSource::WorkingTree => vec!["--cached".to_string()],
        ChangeSource::Range(range) => vec![range.clone()],
    }
}

fn diff_args(change: &FileChange, revision: Vec<String>) -> Vec<String> {
    let mut args = vec!["diff".to_string(), "-M".to_string()];
    args.extend(revision);
    args.push("--".to_string());
    if let Some(old) = &change.old_file_path {
        args.push(old.clone());
    }
    args.push(change.file_path.clone());
    args
}

fn parse_untracked(output: &str) -> Vec<FileChange> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|path| FileChange::new(path, FileStatus::Untracked))
        .collect()
}

fn render_new_file(path: &str, content: &str) -> String {
    let mut diff = format!("--- /dev/null\n+++ b/{path}\n");
    for line in content.lines() {
        diff.push('+');
        diff.push_str(line);
        diff.push('\n');
    }
    diff
}
