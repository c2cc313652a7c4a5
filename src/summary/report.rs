use crate::domain::diff::DirectoryDiff;

/// Renders directory groups, in the order given, as one text block.
///
/// Summarized groups carry their file labels and the generated summary; the
/// rest carry their file labels followed by each raw diff.
pub fn format_report(groups: &[DirectoryDiff]) -> String {
    let mut out = String::new();
    for (position, group) in groups.iter().enumerate() {
        if position > 0 {
            out.push('\n');
        }
        out.push_str(&format!("## {}\n", group.display_path()));
        for file in &group.diffs {
            out.push_str(&format!("- {}\n", file.summary()));
        }

        match group.summary() {
            Some(summary) => {
                out.push_str(&format!("\nSummary:\n{}\n", summary.trim_end()));
            }
            None => {
                for file in &group.diffs {
                    out.push_str(&format!("\n### {}\n{}", file.file(), file.diff()));
                    if !file.diff().ends_with('\n') {
                        out.push('\n');
                    }
                }
            }
        }
    }
    out
}
