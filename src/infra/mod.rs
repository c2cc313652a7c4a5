pub mod git;
pub mod llm;
pub mod summarizer;
pub mod tokens;
