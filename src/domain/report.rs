/// What the language model is asked to write from the compressed diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    CommitMessage,
    Changelog,
    Review,
    Recap,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::CommitMessage => "commit message",
            ReportKind::Changelog => "changelog",
            ReportKind::Review => "review",
            ReportKind::Recap => "recap",
        }
    }
}
