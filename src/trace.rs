use crate::snippet::SnippetKind;

const PREVIEW_CHARS: usize = 60;

/// One console line announcing the snippet about to be typed.
///
/// Shows the first non-blank line of the snippet, truncated.
pub fn snippet_trace_line(kind: SnippetKind, text: &str) -> String {
    let first = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");

    let mut preview: String = first.chars().take(PREVIEW_CHARS).collect();
    if first.chars().count() > PREVIEW_CHARS {
        preview.push_str("...");
    }

    format!("Typing {} {:?}...", kind.label(), preview)
}

pub fn print_trace_line(line: &str) {
    const RESET: &str = "\x1b[0m";
    const TYPING: &str = "\x1b[34m";

    if let Some(rest) = line.strip_prefix("Typing") {
        eprintln!("{TYPING}Typing{RESET}{rest}");
    } else {
        eprintln!("{line}");
    }
}
