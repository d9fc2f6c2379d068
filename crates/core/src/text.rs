//! Text normalization for extracted slide text.
//!
//! PowerPoint stores soft line breaks as vertical tabs and happily keeps
//! non-breaking spaces and decomposed accents around, so every run passes
//! through here before it reaches the slide model.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Regex to collapse multiple whitespace characters into one.
static WHITESPACE_COLLAPSE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{00A0}\u{2007}\u{202F}]+").unwrap());

/// Characters that PowerPoint uses as in-run line breaks.
const SOFT_BREAK_CHARS: &[char] = &['\u{000B}', '\u{2028}', '\u{2029}'];

/// Normalize one text run.
///
/// - Applies Unicode NFC composition
/// - Turns soft breaks and `\r\n`/`\r` into `\n`
/// - Collapses horizontal whitespace runs to single spaces
/// - Trims every line and the result
pub fn normalize_run(text: &str) -> String {
    let composed: String = text.nfc().collect();

    let unified = composed
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace(SOFT_BREAK_CHARS, "\n");

    unified
        .split('\n')
        .map(|line| {
            let collapsed = WHITESPACE_COLLAPSE_REGEX.replace_all(line, " ");
            collapsed.trim().to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Length in characters, not bytes.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}
