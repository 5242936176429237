// Sanitization at every boundary where untrusted text enters the system:
// uploaded file names, CSV cell values, model output, user questions.
// All functions here are pure and total: they never fail, and re-applying
// them to already-sanitized text is a no-op.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Maximum length of a sanitized filename (characters).
const MAX_FILENAME_LENGTH: usize = 255;

/// Maximum length of a CSV column key (characters).
const MAX_KEY_LENGTH: usize = 255;

/// Maximum length of a CSV cell value (characters).
const MAX_CELL_LENGTH: usize = 10_000;

/// Maximum length of a follow-up question (characters).
const MAX_QUESTION_LENGTH: usize = 1_000;

static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b.*?</script\s*>").unwrap());
static EVENT_HANDLER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\bon\w+\s*=\s*["'][^"']*["']"#).unwrap());
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</?[^>]+(>|$)").unwrap());
static JAVASCRIPT_URI: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)javascript:").unwrap());
static DATA_HTML_URI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)data:\s*text/html").unwrap());
static INJECTION_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[INST\]|\[/INST\]|<\|im_start\|>|<\|im_end\|>|```system|```assistant|```user")
        .unwrap()
});

/// Truncate to at most `max` characters, never splitting a code point.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Sanitize an uploaded filename: strip any directory prefix, replace
/// characters outside `[A-Za-z0-9\-_. ]` with `_`, truncate to 255 chars.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);
    let safe: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();
    truncate_chars(&safe, MAX_FILENAME_LENGTH).to_string()
}

/// Sanitize one CSV row: truncate keys, strip ASCII control characters
/// (except newline, tab and carriage return) from values, bound value length.
pub fn sanitize_csv_row(row: &HashMap<String, String>) -> HashMap<String, String> {
    row.iter()
        .map(|(key, value)| {
            let safe_key = truncate_chars(key, MAX_KEY_LENGTH).to_string();
            let stripped: String = value
                .chars()
                .filter(|c| !c.is_control() || matches!(c, '\n' | '\t' | '\r'))
                .collect();
            let safe_value = truncate_chars(&stripped, MAX_CELL_LENGTH).to_string();
            (safe_key, safe_value)
        })
        .collect()
}

/// Sanitize every row of a CSV dataset.
pub fn sanitize_csv_data(rows: &[HashMap<String, String>]) -> Vec<HashMap<String, String>> {
    rows.iter().map(sanitize_csv_row).collect()
}

/// Sanitize AI-generated text for safe rendering: strips script blocks with
/// their content, event-handler attributes, remaining HTML tags (content
/// preserved), and dangerous URI schemes.
pub fn sanitize_ai_output(text: &str) -> String {
    let cleaned = SCRIPT_BLOCK.replace_all(text, "");
    let cleaned = EVENT_HANDLER.replace_all(&cleaned, "");
    let mut cleaned = HTML_TAG.replace_all(&cleaned, "").into_owned();
    // Removing a URI scheme can splice its surroundings into a fresh one
    // ("javajavascript:script:"), so strip to a fixpoint.
    loop {
        let next = JAVASCRIPT_URI.replace_all(&cleaned, "");
        let next = DATA_HTML_URI.replace_all(&next, "");
        if next == cleaned {
            break;
        }
        cleaned = next.into_owned();
    }
    cleaned.trim().to_string()
}

/// Sanitize a user follow-up question: strip known prompt-injection
/// delimiter tokens, truncate to 1000 chars, trim surrounding whitespace.
pub fn sanitize_user_question(question: &str) -> String {
    let stripped = INJECTION_MARKER.replace_all(question, "");
    truncate_chars(&stripped, MAX_QUESTION_LENGTH).trim().to_string()
}
