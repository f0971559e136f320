//! Scrubs script-originated error text before it leaves the engine.

use regex::Regex;
use std::sync::LazyLock;

/// Longest message, in characters, that redaction returns.
pub const MAX_MESSAGE_LEN: usize = 200;

static PATTERNS: LazyLock<[(Regex, &'static str); 5]> = LazyLock::new(|| {
    [
        (compile(r"/\S+"), "[path]"),
        (compile(r"\b[A-Za-z]:\\\S+"), "[path]"),
        (compile(r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b"), "[ip]"),
        (
            compile(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}"),
            "[email]",
        ),
        // Addresses at a literal IP were split by the `[ip]` pass; fold the local part in too.
        (compile(r"[a-zA-Z0-9._%+-]+@\[ip\]"), "[email]"),
    ]
});

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("redaction patterns are valid literals")
}

/// Replace paths, IPv4 addresses and emails with fixed tokens, then truncate.
///
/// Truncation can expose a match that was not one before (`1.2.3.4567` cut to `1.2.3.456`),
/// so the pass repeats until the output no longer changes. The result is a fixed point, which
/// makes `redact(redact(s)) == redact(s)`.
pub fn redact(text: &str) -> String {
    let mut current = pass(text);
    loop {
        let next = pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn pass(text: &str) -> String {
    let mut out = text.to_string();
    for (pattern, token) in PATTERNS.iter() {
        out = pattern.replace_all(&out, *token).into_owned();
    }
    truncate(out)
}

fn truncate(text: String) -> String {
    match text.char_indices().nth(MAX_MESSAGE_LEN) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text,
    }
}
