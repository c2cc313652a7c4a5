use async_trait::async_trait;

use crate::error::AppResult;

#[async_trait]
pub trait LanguageModelService: Send + Sync {
    /// Runs one completion: `instructions` frame the task, `context` carries the material.
    async fn generate(&self, instructions: &str, context: &str) -> AppResult<String>;
}
