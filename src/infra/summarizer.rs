use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::cache::SummaryCache;
use crate::error::{AppError, AppResult};
use crate::prompts::SUMMARIZE_DIFF;
use crate::services::{LanguageModelService, SummarySection, Summarizer};

/// Summarizes diff sections through a language model, consulting a cache first.
pub struct LlmSummarizer {
    language_model: Arc<dyn LanguageModelService>,
    model_name: String,
    cache: Option<Mutex<SummaryCache>>,
}

impl LlmSummarizer {
    pub fn new(
        language_model: Arc<dyn LanguageModelService>,
        model_name: String,
        cache: Option<SummaryCache>,
    ) -> Self {
        Self {
            language_model,
            model_name,
            cache: cache.map(Mutex::new),
        }
    }

    /// Writes cached summaries back to disk. Failures are logged only.
    pub fn persist_cache(&self) {
        let Some(cache) = &self.cache else {
            return;
        };
        match cache.lock() {
            Ok(cache) => match cache.save() {
                Ok(()) => debug!(entries = cache.len(), "saved summary cache"),
                Err(err) => warn!(error = %err, "failed to save summary cache"),
            },
            Err(_) => warn!("summary cache lock poisoned, not saving"),
        }
    }

    fn cached(&self, key: &str) -> Option<String> {
        self.cache
            .as_ref()
            .and_then(|cache| cache.lock().ok())
            .and_then(|cache| cache.get(key))
    }

    fn remember(&self, key: String, summary: &str) {
        if let Some(mut cache) = self.cache.as_ref().and_then(|cache| cache.lock().ok()) {
            cache.insert(key, summary);
        }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, sections: &[SummarySection]) -> AppResult<String> {
        if sections.is_empty() {
            return Err(AppError::Summarization("nothing to summarize".to_string()));
        }

        let key = SummaryCache::compute_key(SUMMARIZE_DIFF, &self.model_name, sections);
        if let Some(summary) = self.cached(&key) {
            debug!(sections = sections.len(), "summary cache hit");
            return Ok(summary);
        }

        let summary = self
            .language_model
            .generate(SUMMARIZE_DIFF, &render_sections(sections))
            .await?;
        if summary.trim().is_empty() {
            return Err(AppError::Summarization(
                "language model returned an empty summary".to_string(),
            ));
        }

        self.remember(key, &summary);
        Ok(summary)
    }
}

fn render_sections(sections: &[SummarySection]) -> String {
    sections
        .iter()
        .map(|section| {
            format!(
                "### {} ({})\n{}\n",
                section.file,
                section.summary,
                section.content.trim_end()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
