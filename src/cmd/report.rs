use std::io::{self, BufRead, Write};

use clap::Args;

use crate::config::ConfigOverrides;
use crate::context::AppContext;
use crate::domain::report::ReportKind;
use crate::error::AppResult;
use crate::services::ChangeSource;
use crate::workflow::report::{ContextOutcome, build_context, write_report};

#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Summarize a revision range (e.g. v1.2.0..HEAD) instead of staged changes.
    #[arg(long, conflicts_with = "all")]
    pub range: Option<String>,
    /// Include unstaged and untracked changes.
    #[arg(short, long)]
    pub all: bool,
    /// Overall token budget for the diff context.
    #[arg(long)]
    pub max_tokens: Option<usize>,
    /// Smallest file or directory worth summarizing, in tokens.
    #[arg(long)]
    pub min_tokens: Option<usize>,
    /// Per-file ceiling before a file is summarized on its own.
    #[arg(long)]
    pub max_file_tokens: Option<usize>,
    /// Maximum concurrent summarization calls.
    #[arg(long)]
    pub max_concurrent: Option<usize>,
    /// Language model to use.
    #[arg(long)]
    pub model: Option<String>,
    /// Skip the on-disk summary cache.
    #[arg(long)]
    pub no_cache: bool,
    /// Leave matching paths out of the report (glob, repeatable).
    #[arg(long = "ignore", value_name = "GLOB")]
    pub ignore: Vec<String>,
    /// Include lockfiles and other ignored paths.
    #[arg(long)]
    pub no_ignore: bool,
}

impl SourceArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            max_tokens: self.max_tokens,
            min_tokens_for_summary: self.min_tokens,
            max_file_tokens: self.max_file_tokens,
            max_concurrent: self.max_concurrent,
            model: self.model.clone(),
            no_cache: self.no_cache,
            ignore: self.ignore.clone(),
            no_ignore: self.no_ignore,
        }
    }

    pub fn source(&self) -> ChangeSource {
        ChangeSource::from_args(self.range.clone(), self.all)
    }
}

/// Prints the compressed diff context itself.
pub async fn run_context(ctx: &AppContext, args: &SourceArgs) -> AppResult<()> {
    let outcome = build_context(ctx, &args.source()).await?;
    report_progress(&outcome);
    print!("{}", outcome.run.report);
    Ok(())
}

/// What to do with a drafted commit message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Print the draft only.
    Print,
    /// Show the draft and commit once the user approves it.
    Confirm,
    /// Commit the draft as is.
    Unattended,
}

pub async fn run_report(
    ctx: &AppContext,
    args: &SourceArgs,
    kind: ReportKind,
    mode: ApplyMode,
) -> AppResult<()> {
    let source = args.source();
    let outcome = write_report(ctx, &source, kind).await?;
    report_progress(&outcome.context);

    let message = match mode {
        ApplyMode::Print => {
            println!("{}", outcome.text);
            return Ok(());
        }
        ApplyMode::Unattended => {
            println!("{}", outcome.text);
            outcome.text
        }
        ApplyMode::Confirm => {
            let stdin = io::stdin();
            match review_draft(&outcome.text, &mut stdin.lock(), &mut io::stdout())? {
                Verdict::Approved(message) => message,
                Verdict::Aborted => {
                    eprintln!("Commit aborted.");
                    return Ok(());
                }
            }
        }
    };

    ctx.version_control.commit(&message).await?;
    eprintln!("Committed {}.", source.describe());
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Verdict {
    Approved(String),
    Aborted,
}

/// Shows `draft` and asks to approve, edit or abort until the user decides.
/// End of input counts as abort.
fn review_draft(
    draft: &str,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> AppResult<Verdict> {
    let mut message = draft.to_string();
    loop {
        writeln!(output, "\n{message}\n")?;
        write!(output, "Commit with this message? [a]pprove, [e]dit, a[b]ort: ")?;
        output.flush()?;

        let mut answer = String::new();
        if input.read_line(&mut answer)? == 0 {
            return Ok(Verdict::Aborted);
        }
        match answer.trim().to_lowercase().as_str() {
            "a" | "approve" | "y" | "yes" => return Ok(Verdict::Approved(message)),
            "b" | "abort" | "n" | "no" | "q" => return Ok(Verdict::Aborted),
            "e" | "edit" => {
                writeln!(
                    output,
                    "Enter the new message, then a line with a single '.':"
                )?;
                let edited = read_message(input)?;
                if edited.is_empty() {
                    writeln!(output, "Empty message, keeping the previous one.")?;
                } else {
                    message = edited;
                }
            }
            _ => writeln!(output, "Please answer a, e or b.")?,
        }
    }
}

fn read_message(input: &mut impl BufRead) -> AppResult<String> {
    let mut lines = Vec::new();
    loop {
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim_end_matches(['\r', '\n']);
        if line == "." {
            break;
        }
        lines.push(line.to_string());
    }
    Ok(lines.join("\n").trim().to_string())
}

fn report_progress(outcome: &ContextOutcome) {
    let run = &outcome.run;
    let ignored = if outcome.ignored > 0 {
        format!(", {} ignored", outcome.ignored)
    } else {
        String::new()
    };
    eprintln!(
        "Summarized {} files{} in {} directories ({} compressed) to {} tokens in {} ms",
        run.files,
        ignored,
        run.groups.len(),
        run.summarized_directories(),
        run.total_tokens(),
        outcome.elapsed.as_millis()
    );
}
