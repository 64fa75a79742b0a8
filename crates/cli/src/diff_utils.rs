//! Line-level rendering of file changes between two versions

use owo_colors::OwoColorize;
use similar::{ChangeTag, TextDiff};

/// Content with a NUL byte in the first 8KB is treated as binary
pub fn is_binary(content: &[u8]) -> bool {
    content.iter().take(8192).any(|&b| b == 0)
}

/// Colored unified diff of one file
///
/// `old` is `None` for an added file and `new` is `None` for a removed one;
/// both sides then diff against empty text.
pub fn render_file_diff(
    name: &str,
    old: Option<&[u8]>,
    new: Option<&[u8]>,
    context_lines: usize,
) -> String {
    let (marker, label) = match (old, new) {
        (None, Some(_)) => ("A".green().to_string(), "added"),
        (Some(_), None) => ("D".red().to_string(), "removed"),
        _ => ("M".yellow().to_string(), "modified"),
    };
    let mut output = format!("{} {} {}\n", marker, name.bold(), format!("({label})").dimmed());

    let old = old.unwrap_or_default();
    let new = new.unwrap_or_default();
    if is_binary(old) || is_binary(new) {
        output.push_str(&format!(
            "    {}\n",
            format!("binary content, {} -> {} bytes", old.len(), new.len()).dimmed()
        ));
        return output;
    }

    let old_text = String::from_utf8_lossy(old);
    let new_text = String::from_utf8_lossy(new);
    let diff = TextDiff::from_lines(&old_text, &new_text);

    for (index, hunk) in diff
        .unified_diff()
        .context_radius(context_lines)
        .iter_hunks()
        .enumerate()
    {
        if index > 0 {
            output.push('\n');
        }
        output.push_str(&format!("    {}\n", hunk.header().to_string().cyan()));

        for change in hunk.iter_changes() {
            let line = change.value();
            let rendered = match change.tag() {
                ChangeTag::Delete => format!("-{line}").red().to_string(),
                ChangeTag::Insert => format!("+{line}").green().to_string(),
                ChangeTag::Equal => format!(" {line}").dimmed().to_string(),
            };
            output.push_str("    ");
            output.push_str(&rendered);
            if !line.ends_with('\n') {
                output.push('\n');
            }
        }
    }

    output
}
