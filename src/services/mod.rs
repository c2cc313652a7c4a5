pub mod language_model;
pub mod summarizer;
pub mod tokens;
pub mod version_control;

pub use language_model::LanguageModelService;
pub use summarizer::{SummarySection, Summarizer};
pub use tokens::TokenCounter;
pub use version_control::{ChangeSource, DiffProvider, SourceDiffs, VersionControlService};
