#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
    Untracked,
    Unknown,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Added => "added",
            FileStatus::Modified => "modified",
            FileStatus::Deleted => "deleted",
            FileStatus::Renamed => "renamed",
            FileStatus::Untracked => "untracked",
            FileStatus::Unknown => "unknown",
        }
    }

    /// Maps a `git diff --name-status` code (`M`, `A`, `R087`, ...) to a status.
    pub fn from_code(code: &str) -> Self {
        match code.trim().chars().next() {
            Some('A') => FileStatus::Added,
            Some('M') => FileStatus::Modified,
            Some('D') => FileStatus::Deleted,
            Some('R') => FileStatus::Renamed,
            Some('?') => FileStatus::Untracked,
            _ => FileStatus::Unknown,
        }
    }
}

/// One changed path in a change set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub file_path: String,
    pub old_file_path: Option<String>,
    pub status: FileStatus,
    pub summary: String,
}

impl FileChange {
    pub fn new(file_path: impl Into<String>, status: FileStatus) -> Self {
        let file_path = file_path.into();
        let summary = format!("{}: {}", status.as_str(), file_path);
        Self {
            file_path,
            old_file_path: None,
            status,
            summary,
        }
    }

    pub fn renamed(old_file_path: impl Into<String>, file_path: impl Into<String>) -> Self {
        let old_file_path = old_file_path.into();
        let file_path = file_path.into();
        let summary = format!("renamed: {old_file_path} -> {file_path}");
        Self {
            file_path,
            old_file_path: Some(old_file_path),
            status: FileStatus::Renamed,
            summary,
        }
    }

    /// Directory segments of the path, filename dropped.
    pub fn directory_segments(&self) -> Vec<String> {
        let mut segments = self
            .file_path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();
        segments.pop();
        segments
    }
}

/// Parses `git diff --name-status` output. Lines that do not carry a path are skipped.
pub fn parse_name_status(output: &str) -> Vec<FileChange> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split('\t');
            let code = fields.next()?.trim();
            if code.is_empty() {
                return None;
            }
            let first = fields.next()?.trim();
            if first.is_empty() {
                return None;
            }
            match FileStatus::from_code(code) {
                FileStatus::Renamed => match fields.next().map(str::trim) {
                    Some(new_path) if !new_path.is_empty() => {
                        Some(FileChange::renamed(first, new_path))
                    }
                    _ => Some(FileChange::new(first, FileStatus::Renamed)),
                },
                status => Some(FileChange::new(first, status)),
            }
        })
        .collect()
}
