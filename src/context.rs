use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::{LanguageModelService, Summarizer, TokenCounter, VersionControlService};

#[derive(Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub version_control: Arc<dyn VersionControlService>,
    pub language_model: Arc<dyn LanguageModelService>,
    pub summarizer: Arc<dyn Summarizer>,
    pub tokens: Arc<dyn TokenCounter>,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        version_control: Arc<dyn VersionControlService>,
        language_model: Arc<dyn LanguageModelService>,
        summarizer: Arc<dyn Summarizer>,
        tokens: Arc<dyn TokenCounter>,
    ) -> Self {
        Self {
            config,
            version_control,
            language_model,
            summarizer,
            tokens,
        }
    }
}
