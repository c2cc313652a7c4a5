use std::io::{self, BufRead, Write};

use clap::{Args, Subcommand};

use crate::config::{StoredConfig, config_file_path, split_list};
use crate::error::{AppError, AppResult};

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Run the interactive configuration wizard.
    Init,
    /// Show the stored configuration (secrets masked).
    Show,
}

pub fn run(command: ConfigCommand) -> AppResult<()> {
    match command {
        ConfigCommand::Init => run_init(),
        ConfigCommand::Show => run_show(),
    }
}

fn run_init() -> AppResult<()> {
    let mut cfg = StoredConfig::load()?;

    println!("Configuring diffsum.");
    println!("Press Enter to keep the current value, '-' to clear it.");
    println!("Secrets are stored in the local config file; protect your filesystem accordingly.");
    println!();

    let stdin = io::stdin();
    edit_stored(&mut cfg, &mut stdin.lock(), &mut io::stdout())?;
    cfg.save()?;

    let path = config_file_path()?;
    println!("\nConfiguration saved to {}", path.display());
    Ok(())
}

fn edit_stored(
    cfg: &mut StoredConfig,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> AppResult<()> {
    let mut term = Prompter { input, output };
    term.apply("LLM provider (gemini/custom)", &mut cfg.llm_provider, false)?;
    term.apply("Gemini API key", &mut cfg.gemini_api_key, true)?;
    term.apply("Gemini model", &mut cfg.gemini_model, false)?;
    term.apply_number("Token budget for diff context", &mut cfg.max_tokens)?;
    term.apply_number(
        "Minimum tokens worth summarizing",
        &mut cfg.min_tokens_for_summary,
    )?;
    term.apply_number("Per-file token ceiling", &mut cfg.max_file_tokens)?;
    term.apply_number("Concurrent summarization calls", &mut cfg.max_concurrent)?;
    term.apply_number("Concurrent diff fetches", &mut cfg.fetch_concurrency)?;
    term.apply_list("Ignored files (comma-separated globs)", &mut cfg.ignored_files)?;
    term.apply_list(
        "Ignored extensions (comma-separated)",
        &mut cfg.ignored_extensions,
    )?;
    Ok(())
}

fn run_show() -> AppResult<()> {
    let cfg = StoredConfig::load()?;
    let path = config_file_path()?;

    println!("Configuration file: {}", path.display());
    println!("LLM provider: {}", display_value(&cfg.llm_provider));
    println!("Gemini API key: {}", mask_secret(&cfg.gemini_api_key));
    println!("Gemini model: {}", display_value(&cfg.gemini_model));
    println!("Token budget: {}", display_number(cfg.max_tokens));
    println!(
        "Minimum tokens for summary: {}",
        display_number(cfg.min_tokens_for_summary)
    );
    println!("Per-file token ceiling: {}", display_number(cfg.max_file_tokens));
    println!("Concurrent calls: {}", display_number(cfg.max_concurrent));
    println!("Fetch concurrency: {}", display_number(cfg.fetch_concurrency));
    println!("Ignored files: {}", display_list(&cfg.ignored_files));
    println!("Ignored extensions: {}", display_list(&cfg.ignored_extensions));
    println!(
        "Summary cache: {}",
        cfg.cache_summaries
            .map(|enabled| if enabled { "on" } else { "off" })
            .unwrap_or("<not set>")
    );

    Ok(())
}

struct Prompter<'a, R, W> {
    input: &'a mut R,
    output: &'a mut W,
}

impl<R: BufRead, W: Write> Prompter<'_, R, W> {
    fn apply(&mut self, field: &str, target: &mut Option<String>, secret: bool) -> AppResult<()> {
        match self.prompt(field, target.as_deref(), secret)? {
            PromptAction::Keep => {}
            PromptAction::Clear => *target = None,
            PromptAction::Set(value) => *target = Some(value),
        }
        Ok(())
    }

    fn apply_number(&mut self, field: &str, target: &mut Option<usize>) -> AppResult<()> {
        let current = target.map(|value| value.to_string());
        match self.prompt(field, current.as_deref(), false)? {
            PromptAction::Keep => {}
            PromptAction::Clear => *target = None,
            PromptAction::Set(value) => {
                let parsed = value.parse::<usize>().map_err(|_| {
                    AppError::Configuration(format!("{field} must be a non-negative integer"))
                })?;
                *target = Some(parsed);
            }
        }
        Ok(())
    }

    fn apply_list(&mut self, field: &str, target: &mut Option<Vec<String>>) -> AppResult<()> {
        let current = target.as_ref().map(|items| items.join(", "));
        match self.prompt(field, current.as_deref(), false)? {
            PromptAction::Keep => {}
            PromptAction::Clear => *target = None,
            PromptAction::Set(value) => *target = Some(split_list(&value)),
        }
        Ok(())
    }

    fn prompt(&mut self, field: &str, current: Option<&str>, secret: bool) -> AppResult<PromptAction> {
        let out = &mut *self.output;
        match (current, secret) {
            (Some(_), true) => write!(out, "{field} [****] (Enter to keep, '-' to clear): ")?,
            (Some(value), false) => {
                write!(out, "{field} [{value}] (Enter to keep, '-' to clear): ")?
            }
            (None, _) => write!(out, "{field} (Enter to skip): ")?,
        }
        out.flush()?;

        let mut line = String::new();
        self.input.read_line(&mut line)?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            Ok(PromptAction::Keep)
        } else if trimmed == "-" {
            Ok(PromptAction::Clear)
        } else {
            Ok(PromptAction::Set(trimmed.to_string()))
        }
    }
}

fn display_value(value: &Option<String>) -> String {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .unwrap_or_else(|| "<not set>".to_string())
}

fn display_number(value: Option<usize>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "<not set>".to_string())
}

fn display_list(value: &Option<Vec<String>>) -> String {
    match value {
        Some(items) if items.is_empty() => "<none>".to_string(),
        Some(items) => items.join(", "),
        None => "<defaults>".to_string(),
    }
}

fn mask_secret(value: &Option<String>) -> String {
    match value {
        Some(token) if token.chars().count() > 6 => {
            let chars = token.chars().collect::<Vec<_>>();
            let prefix = chars[..3].iter().collect::<String>();
            let suffix = chars[chars.len() - 3..].iter().collect::<String>();
            format!("{prefix}***{suffix}")
        }
        Some(token) if !token.is_empty() => "***".to_string(),
        _ => "<not set>".to_string(),
    }
}

enum PromptAction {
    Keep,
    Clear,
    Set(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_long_secrets() {
        assert_eq!(mask_secret(&Some("abcdefghij".to_string())), "abc***hij");
        assert_eq!(mask_secret(&Some("abc".to_string())), "***");
        assert_eq!(mask_secret(&None), "<not set>");
    }

    #[test]
    fn displays_unset_values() {
        assert_eq!(display_value(&Some(String::new())), "<not set>");
        assert_eq!(display_number(Some(2048)), "2048");
        assert_eq!(display_number(None), "<not set>");
        assert_eq!(display_list(&None), "<defaults>");
        assert_eq!(display_list(&Some(Vec::new())), "<none>");
    }

    #[test]
    fn wizard_edits_every_setting() {
        let mut cfg = StoredConfig {
            gemini_api_key: Some("old-secret".to_string()),
            max_tokens: Some(1000),
            ..StoredConfig::default()
        };
        let answers = "gemini\n\nflash-2\n4096\n\n-\n3\n12\nCargo.lock, *.snap\nmin.js\n";
        let mut output = Vec::new();

        edit_stored(&mut cfg, &mut answers.as_bytes(), &mut output).unwrap();

        assert_eq!(cfg.llm_provider.as_deref(), Some("gemini"));
        assert_eq!(cfg.gemini_api_key.as_deref(), Some("old-secret"));
        assert_eq!(cfg.gemini_model.as_deref(), Some("flash-2"));
        assert_eq!(cfg.max_tokens, Some(4096));
        assert_eq!(cfg.max_file_tokens, None);
        assert_eq!(cfg.max_concurrent, Some(3));
        assert_eq!(cfg.fetch_concurrency, Some(12));
        assert_eq!(
            cfg.ignored_files,
            Some(vec!["Cargo.lock".to_string(), "*.snap".to_string()])
        );
        assert_eq!(cfg.ignored_extensions, Some(vec!["min.js".to_string()]));

        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("Gemini API key [****]"));
        assert!(!shown.contains("old-secret"));
        assert!(shown.contains("Concurrent diff fetches (Enter to skip)"));
    }

    #[test]
    fn wizard_rejects_non_numeric_budget() {
        let mut cfg = StoredConfig::default();
        let answers = "\n\n\nlots\n";
        let result = edit_stored(&mut cfg, &mut answers.as_bytes(), &mut Vec::new());
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }
}
