//! Host ops reachable from the sandbox
//!
//! The only op is the write-only log sink behind `console`. The bootstrap script captures it in
//! a closure and removes `Deno` afterwards, so user code can never name it directly.

use deno_core::{op2, Extension, OpState};
use serde::Deserialize;

/// Lines a single call may log before further output is dropped.
pub const MAX_LOG_LINES: usize = 100;

/// Characters kept per logged line.
pub const MAX_LOG_LINE_CHARS: usize = 1000;

/// Per-call log allowance, stored in the isolate's `OpState`.
#[derive(Debug, Default)]
pub struct LogBudget {
    pub emitted: usize,
    pub dropped: usize,
}

impl LogBudget {
    /// Charge one line against the budget. Returns the text to log, cut to
    /// [`MAX_LOG_LINE_CHARS`], or `None` once the line allowance is spent.
    pub fn admit(&mut self, message: &str) -> Option<String> {
        if self.emitted >= MAX_LOG_LINES {
            self.dropped += 1;
            return None;
        }
        self.emitted += 1;
        Some(message.chars().take(MAX_LOG_LINE_CHARS).collect())
    }
}

#[derive(Debug, Deserialize)]
struct LogLine {
    level: String,
    message: String,
}

#[op2]
fn op_sandbox_log(state: &mut OpState, #[serde] line: LogLine) {
    let Some(message) = state.borrow_mut::<LogBudget>().admit(&line.message) else {
        return;
    };
    match line.level.as_str() {
        "warn" => tracing::warn!(target: "verdict::script", "{}", message),
        _ => tracing::debug!(target: "verdict::script", "{}", message),
    }
}

/// Extension carrying the sandbox ops
pub fn create_sandbox_extension() -> Extension {
    Extension {
        name: "verdict_sandbox",
        ops: std::borrow::Cow::Owned(vec![op_sandbox_log()]),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_allowance() {
        let mut budget = LogBudget::default();
        for i in 0..MAX_LOG_LINES {
            assert!(budget.admit(&format!("line {i}")).is_some());
        }
        for _ in 0..25 {
            assert_eq!(budget.admit("one too many"), None);
        }
        assert_eq!(budget.emitted, MAX_LOG_LINES);
        assert_eq!(budget.dropped, 25);
    }

    #[test]
    fn test_long_line_cut() {
        let mut budget = LogBudget::default();
        let line = budget.admit(&"é".repeat(MAX_LOG_LINE_CHARS * 3)).unwrap();
        assert_eq!(line.chars().count(), MAX_LOG_LINE_CHARS);

        assert_eq!(budget.admit("short").as_deref(), Some("short"));
        assert_eq!(budget.emitted, 2);
        assert_eq!(budget.dropped, 0);
    }
}
