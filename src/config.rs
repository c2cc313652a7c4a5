use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::ignore::{
    DEFAULT_IGNORED_EXTENSIONS, DEFAULT_IGNORED_FILES, IGNORE_FILE_NAME, IgnoreRules, owned,
    read_ignore_file,
};
use crate::summary::SummaryOptions;

const APP_DIR_NAME: &str = "diffsum";
const CONFIG_FILE_NAME: &str = "config.toml";
const PROJECT_FILE_NAME: &str = ".diffsum.toml";
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub workspace_root: PathBuf,
    pub llm_provider: LlmProvider,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub summary: SummaryOptions,
    pub ignore: IgnoreRules,
    pub cache_summaries: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmProvider {
    Gemini,
    Custom(String),
}

impl LlmProvider {
    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "gemini" => LlmProvider::Gemini,
            other => LlmProvider::Custom(other.to_string()),
        }
    }
}

/// Values read from a TOML file; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredConfig {
    pub llm_provider: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: Option<String>,
    pub max_tokens: Option<usize>,
    pub min_tokens_for_summary: Option<usize>,
    pub max_file_tokens: Option<usize>,
    pub max_concurrent: Option<usize>,
    pub fetch_concurrency: Option<usize>,
    /// Replaces the built-in lockfile list when set.
    pub ignored_files: Option<Vec<String>>,
    pub ignored_extensions: Option<Vec<String>>,
    pub cache_summaries: Option<bool>,
}

impl StoredConfig {
    /// Loads the global profile.
    pub fn load() -> AppResult<Self> {
        Self::load_from(&config_file_path()?)
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).map_err(|err| {
                AppError::Configuration(format!("invalid config file {}: {err}", path.display()))
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(AppError::Io(err)),
        }
    }

    pub fn save(&self) -> AppResult<()> {
        self.save_to(&config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = toml::to_string_pretty(self)
            .map_err(|err| AppError::Configuration(format!("failed to write config: {err}")))?;
        fs::write(path, data)?;
        Ok(())
    }

    /// Fields set in `other` win.
    pub fn merge(self, other: StoredConfig) -> Self {
        Self {
            llm_provider: other.llm_provider.or(self.llm_provider),
            gemini_api_key: other.gemini_api_key.or(self.gemini_api_key),
            gemini_model: other.gemini_model.or(self.gemini_model),
            max_tokens: other.max_tokens.or(self.max_tokens),
            min_tokens_for_summary: other.min_tokens_for_summary.or(self.min_tokens_for_summary),
            max_file_tokens: other.max_file_tokens.or(self.max_file_tokens),
            max_concurrent: other.max_concurrent.or(self.max_concurrent),
            fetch_concurrency: other.fetch_concurrency.or(self.fetch_concurrency),
            ignored_files: other.ignored_files.or(self.ignored_files),
            ignored_extensions: other.ignored_extensions.or(self.ignored_extensions),
            cache_summaries: other.cache_summaries.or(self.cache_summaries),
        }
    }

    fn from_env(lookup: &dyn Fn(&str) -> Option<String>) -> AppResult<Self> {
        Ok(Self {
            llm_provider: lookup("DIFFSUM_LLM_PROVIDER"),
            gemini_api_key: lookup("GEMINI_API_KEY"),
            gemini_model: lookup("DIFFSUM_MODEL"),
            max_tokens: env_number(lookup, "DIFFSUM_MAX_TOKENS")?,
            min_tokens_for_summary: env_number(lookup, "DIFFSUM_MIN_TOKENS_FOR_SUMMARY")?,
            max_file_tokens: env_number(lookup, "DIFFSUM_MAX_FILE_TOKENS")?,
            max_concurrent: env_number(lookup, "DIFFSUM_MAX_CONCURRENT")?,
            fetch_concurrency: env_number(lookup, "DIFFSUM_FETCH_CONCURRENCY")?,
            ignored_files: lookup("DIFFSUM_IGNORED_FILES").map(|value| split_list(&value)),
            ignored_extensions: lookup("DIFFSUM_IGNORED_EXTENSIONS").map(|value| split_list(&value)),
            cache_summaries: None,
        })
    }
}

fn env_number(lookup: &dyn Fn(&str) -> Option<String>, name: &str) -> AppResult<Option<usize>> {
    lookup(name)
        .map(|value| {
            value.trim().parse::<usize>().map_err(|_| {
                AppError::Configuration(format!("{name} must be a non-negative integer, got '{value}'"))
            })
        })
        .transpose()
}

/// Splits a comma-separated list, dropping empty items.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Command-line values that override every file and environment source.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub max_tokens: Option<usize>,
    pub min_tokens_for_summary: Option<usize>,
    pub max_file_tokens: Option<usize>,
    pub max_concurrent: Option<usize>,
    pub model: Option<String>,
    pub no_cache: bool,
    /// Extra ignore patterns, added to the configured ones.
    pub ignore: Vec<String>,
    pub no_ignore: bool,
}

impl AppConfig {
    /// Resolves configuration for `workspace_root`: flags, then environment,
    /// then `.diffsum.toml`, then the global profile, then defaults.
    /// Patterns in `.diffsumignore` are added to the ignore list.
    pub fn load(workspace_root: &Path, overrides: &ConfigOverrides) -> AppResult<Self> {
        let global = StoredConfig::load()?;
        let project = StoredConfig::load_from(&workspace_root.join(PROJECT_FILE_NAME))?;
        let lookup = |name: &str| env::var(name).ok().filter(|value| !value.is_empty());
        let from_env = StoredConfig::from_env(&lookup)?;

        let mut overrides = overrides.clone();
        let mut ignore = read_ignore_file(&workspace_root.join(IGNORE_FILE_NAME))?;
        ignore.append(&mut overrides.ignore);
        overrides.ignore = ignore;

        Self::resolve(
            workspace_root,
            global.merge(project).merge(from_env),
            &overrides,
        )
    }

    pub fn resolve(
        workspace_root: &Path,
        stored: StoredConfig,
        overrides: &ConfigOverrides,
    ) -> AppResult<Self> {
        let defaults = SummaryOptions::default();
        let summary = SummaryOptions {
            max_tokens: overrides
                .max_tokens
                .or(stored.max_tokens)
                .unwrap_or(defaults.max_tokens),
            min_tokens_for_summary: overrides
                .min_tokens_for_summary
                .or(stored.min_tokens_for_summary)
                .unwrap_or(defaults.min_tokens_for_summary),
            max_file_tokens: overrides.max_file_tokens.or(stored.max_file_tokens),
            max_concurrent: overrides
                .max_concurrent
                .or(stored.max_concurrent)
                .unwrap_or(defaults.max_concurrent),
            fetch_concurrency: stored
                .fetch_concurrency
                .unwrap_or(defaults.fetch_concurrency),
        };
        validate(&summary)?;

        let ignore = if overrides.no_ignore {
            IgnoreRules::none()
        } else {
            let mut files = stored
                .ignored_files
                .unwrap_or_else(|| owned(DEFAULT_IGNORED_FILES));
            files.extend(overrides.ignore.iter().cloned());
            let extensions = stored
                .ignored_extensions
                .unwrap_or_else(|| owned(DEFAULT_IGNORED_EXTENSIONS));
            IgnoreRules::new(&files, &extensions)?
        };

        Ok(Self {
            workspace_root: workspace_root.to_path_buf(),
            llm_provider: stored
                .llm_provider
                .as_deref()
                .map(LlmProvider::parse)
                .unwrap_or(LlmProvider::Gemini),
            gemini_api_key: stored.gemini_api_key,
            gemini_model: overrides
                .model
                .clone()
                .or(stored.gemini_model)
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            summary,
            ignore,
            cache_summaries: !overrides.no_cache && stored.cache_summaries.unwrap_or(true),
        })
    }
}

fn validate(options: &SummaryOptions) -> AppResult<()> {
    if options.max_tokens == 0 {
        return Err(AppError::Configuration(
            "max_tokens must be greater than zero".to_string(),
        ));
    }
    if options.max_concurrent == 0 {
        return Err(AppError::Configuration(
            "max_concurrent must be at least 1".to_string(),
        ));
    }
    if options.fetch_concurrency == 0 {
        return Err(AppError::Configuration(
            "fetch_concurrency must be at least 1".to_string(),
        ));
    }
    Ok(())
}

pub fn config_directory() -> AppResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or_else(|| {
            AppError::Configuration("could not determine the user config directory".to_string())
        })
}

pub fn config_file_path() -> AppResult<PathBuf> {
    Ok(config_directory()?.join(CONFIG_FILE_NAME))
}
