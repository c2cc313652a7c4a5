use crate::domain::report::ReportKind;

pub const SUMMARIZE_DIFF: &str = "\
You compress source code diffs for a downstream writer.
Summarize the changes below in a few short bullet points.
Keep file names, function names and other identifiers verbatim.
Describe what changed and its visible effect; omit unchanged context.
Do not invent changes that are not in the diff.";

const COMMIT_MESSAGE: &str = "\
Write a git commit message for the changes below.
Start with an imperative subject line of at most 72 characters, then a blank line,
then a short body explaining what changed and why. Output only the message.";

const CHANGELOG: &str = "\
Write a changelog entry for the changes below.
Group items under Added, Changed, Fixed and Removed headings, omitting empty groups.
Use one concise bullet per user-visible change. Output Markdown only.";

const REVIEW: &str = "\
Review the changes below as an experienced maintainer.
List likely bugs, risky edge cases and missing tests first, then smaller suggestions.
Reference files by path. Be specific and brief.";

const RECAP: &str = "\
Write a short recap of the changes below for a teammate who has not seen them.
Use a few sentences of plain prose covering the main themes.";

pub fn instructions_for(kind: ReportKind) -> &'static str {
    match kind {
        ReportKind::CommitMessage => COMMIT_MESSAGE,
        ReportKind::Changelog => CHANGELOG,
        ReportKind::Review => REVIEW,
        ReportKind::Recap => RECAP,
    }
}
