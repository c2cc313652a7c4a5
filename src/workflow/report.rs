use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::context::AppContext;
use crate::domain::report::ReportKind;
use crate::error::{AppError, AppResult};
use crate::prompts::instructions_for;
use crate::services::{ChangeSource, SourceDiffs};
use crate::summary::{SummaryRun, summarize_changes};

pub struct ContextOutcome {
    pub run: SummaryRun,
    /// Changed files left out by the ignore rules.
    pub ignored: usize,
    pub elapsed: Duration,
}

pub struct ReportOutcome {
    pub context: ContextOutcome,
    pub text: String,
}

/// Lists the changes in `source`, drops ignored paths and compresses the
/// remaining diffs into a budgeted report.
pub async fn build_context(ctx: &AppContext, source: &ChangeSource) -> AppResult<ContextOutcome> {
    let started = Instant::now();
    let listed = ctx.version_control.list_changes(source).await?;
    if listed.is_empty() {
        return Err(AppError::VersionControl(format!(
            "no {} found",
            source.describe()
        )));
    }

    let (changes, ignored) = ctx.config.ignore.partition(listed);
    for change in &ignored {
        debug!(file = %change.file_path, "ignored");
    }
    if changes.is_empty() {
        return Err(AppError::VersionControl(format!(
            "all {} changed files in {} are ignored",
            ignored.len(),
            source.describe()
        )));
    }
    if !ignored.is_empty() {
        info!(ignored = ignored.len(), kept = changes.len(), "skipping ignored files");
    }

    let provider = SourceDiffs {
        version_control: ctx.version_control.as_ref(),
        source,
    };
    let run = summarize_changes(
        &changes,
        &ctx.config.summary,
        &provider,
        ctx.summarizer.as_ref(),
        ctx.tokens.as_ref(),
    )
    .await?;

    Ok(ContextOutcome {
        run,
        ignored: ignored.len(),
        elapsed: started.elapsed(),
    })
}

/// Builds the context for `source` and asks the language model to write `kind` from it.
pub async fn write_report(
    ctx: &AppContext,
    source: &ChangeSource,
    kind: ReportKind,
) -> AppResult<ReportOutcome> {
    let context = build_context(ctx, source).await?;
    let text = ctx
        .language_model
        .generate(instructions_for(kind), &context.run.report)
        .await?;

    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::LanguageModel(format!(
            "language model returned an empty {}",
            kind.as_str()
        )));
    }

    Ok(ReportOutcome {
        context,
        text: text.to_string(),
    })
}
