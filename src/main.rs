mod cache;
mod cmd;
mod config;
mod context;
mod domain;
mod error;
mod ignore;
mod infra;
mod prompts;
mod services;
mod summary;
mod workflow;

use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cache::SummaryCache;
use crate::cmd::config::{self as config_cmd, ConfigArgs};
use crate::cmd::report::{self, ApplyMode, SourceArgs};
use crate::config::{AppConfig, ConfigOverrides, LlmProvider};
use crate::context::AppContext;
use crate::domain::report::ReportKind;
use crate::error::AppResult;
use crate::infra::git::GitCli;
use crate::infra::llm::GeminiClient;
use crate::infra::summarizer::LlmSummarizer;
use crate::infra::tokens::EstimatingTokenCounter;
use crate::services::LanguageModelService;

#[derive(Parser)]
#[command(
    name = "diffsum",
    author,
    version,
    about = "Summarize source-control changes with a language model"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the compressed diff context that would be sent to the model.
    Context(SourceArgs),
    /// Draft a commit message.
    Commit(CommitArgs),
    /// Draft a changelog entry.
    Changelog(SourceArgs),
    /// Draft a code review.
    Review(SourceArgs),
    /// Draft a short recap of the changes.
    Recap(SourceArgs),
    /// Manage CLI configuration.
    Config(ConfigArgs),
}

#[derive(Args)]
struct CommitArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Run `git commit` with the drafted message once approved.
    #[arg(long)]
    apply: bool,
    /// Commit without asking for approval.
    #[arg(long, requires = "apply")]
    yes: bool,
}

impl CommitArgs {
    fn mode(&self) -> ApplyMode {
        match (self.apply, self.yes) {
            (false, _) => ApplyMode::Print,
            (true, false) => ApplyMode::Confirm,
            (true, true) => ApplyMode::Unattended,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(error) = run(cli.command).await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(command: Commands) -> AppResult<()> {
    match command {
        Commands::Config(args) => config_cmd::run(args.command),
        Commands::Context(args) => {
            with_context(args.overrides(), move |ctx| async move {
                report::run_context(&ctx, &args).await
            })
            .await
        }
        Commands::Commit(args) => {
            let mode = args.mode();
            let source = args.source;
            with_context(source.overrides(), move |ctx| async move {
                report::run_report(&ctx, &source, ReportKind::CommitMessage, mode).await
            })
            .await
        }
        Commands::Changelog(args) => run_kind(args, ReportKind::Changelog).await,
        Commands::Review(args) => run_kind(args, ReportKind::Review).await,
        Commands::Recap(args) => run_kind(args, ReportKind::Recap).await,
    }
}

async fn run_kind(args: SourceArgs, kind: ReportKind) -> AppResult<()> {
    with_context(args.overrides(), move |ctx| async move {
        report::run_report(&ctx, &args, kind, ApplyMode::Print).await
    })
    .await
}

fn language_model_for(config: &AppConfig) -> Arc<dyn LanguageModelService> {
    if config.gemini_api_key.is_none() {
        warn!("Gemini API key not configured; summarization and drafting will fail");
    }
    if let LlmProvider::Custom(provider) = &config.llm_provider {
        warn!(%provider, "LLM provider not supported, falling back to Gemini");
    }
    Arc::new(GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
    ))
}

/// Builds the application context, runs `body`, then persists the summary cache.
async fn with_context<F, Fut>(overrides: ConfigOverrides, body: F) -> AppResult<()>
where
    F: FnOnce(AppContext) -> Fut,
    Fut: std::future::Future<Output = AppResult<()>>,
{
    let cwd = std::env::current_dir()?;
    let config = AppConfig::load(&cwd, &overrides)?;

    let language_model = language_model_for(&config);

    let cache = if config.cache_summaries {
        match SummaryCache::load() {
            Ok(cache) => Some(cache),
            Err(err) => {
                warn!(error = %err, "summary cache unavailable, starting empty");
                None
            }
        }
    } else {
        None
    };
    let summarizer = Arc::new(LlmSummarizer::new(
        language_model.clone(),
        config.gemini_model.clone(),
        cache,
    ));

    let git = Arc::new(GitCli::new(config.workspace_root.clone()));
    info!(workspace = %config.workspace_root.display(), "starting run");
    let context = AppContext::new(
        config,
        git,
        language_model,
        summarizer.clone(),
        Arc::new(EstimatingTokenCounter),
    );

    let result = body(context).await;
    summarizer.persist_cache();
    result
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::path::Path;
    use std::sync::Mutex;

    use super::*;
    use crate::config::StoredConfig;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if let Ok(mut out) = self.0.lock() {
                out.extend_from_slice(buf);
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn unknown_provider_warns_through_tracing() {
        let stored = StoredConfig {
            llm_provider: Some("openai".to_string()),
            gemini_api_key: Some("key".to_string()),
            ..StoredConfig::default()
        };
        let config =
            AppConfig::resolve(Path::new("."), stored, &ConfigOverrides::default()).unwrap();
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            language_model_for(&config);
        });

        let logged = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logged.contains("WARN"));
        assert!(logged.contains("provider=openai"));
        assert!(logged.contains("falling back to Gemini"));
    }

    fn commit_mode(argv: &[&str]) -> ApplyMode {
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Commit(args) => args.mode(),
            _ => panic!("expected the commit command"),
        }
    }

    #[test]
    fn apply_asks_for_approval_unless_confirmed() {
        assert_eq!(commit_mode(&["diffsum", "commit"]), ApplyMode::Print);
        assert_eq!(commit_mode(&["diffsum", "commit", "--apply"]), ApplyMode::Confirm);
        assert_eq!(
            commit_mode(&["diffsum", "commit", "--apply", "--yes"]),
            ApplyMode::Unattended
        );
    }

    #[test]
    fn yes_requires_apply() {
        assert!(Cli::try_parse_from(["diffsum", "commit", "--yes"]).is_err());
    }

    #[test]
    fn ignore_flag_repeats() {
        let cli = Cli::try_parse_from([
            "diffsum", "context", "--ignore", "*.snap", "--ignore", "docs/",
        ])
        .unwrap();
        match cli.command {
            Commands::Context(args) => assert_eq!(args.ignore, vec!["*.snap", "docs/"]),
            _ => panic!("expected the context command"),
        }
    }
}
