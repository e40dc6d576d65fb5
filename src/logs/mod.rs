//! Framework log parsing.
//!
//! Converts a free-text log stream into an ordered sequence of leveled
//! [`LogEntry`]s. Every line is tried against the grammars in
//! [`grammar::GRAMMARS`] in order. A line no grammar accepts becomes exception
//! text of the previous entry when it looks like a stack frame, and is
//! dropped otherwise.

pub mod grammar;

use crate::core::{LogEntry, LogLevel, INFRASTRUCTURE_KEYWORDS};
use serde::{Deserialize, Serialize};

/// Entries of one log source, in file order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedLog {
    pub entries: Vec<LogEntry>,
    /// Lines that were neither leveled nor continuation lines.
    pub dropped_lines: usize,
}

impl ParsedLog {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn errors(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(|e| e.level.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(|e| e.level == LogLevel::Warn)
    }

    /// Entries mentioning connectivity, timeout or session problems.
    pub fn infrastructure(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries
            .iter()
            .filter(|e| mentions_infrastructure(&e.full_text()))
    }

    /// Append another source's entries, keeping each source's order.
    pub fn extend(&mut self, other: ParsedLog) {
        self.entries.extend(other.entries);
        self.dropped_lines += other.dropped_lines;
    }
}

/// Whether the text hits a connectivity/timeout/session keyword.
pub fn mentions_infrastructure(text: &str) -> bool {
    let lower = text.to_lowercase();
    INFRASTRUCTURE_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Parse a log document. Pure and idempotent.
pub fn parse_log(content: &str) -> ParsedLog {
    let mut parsed = ParsedLog::default();

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        if let Some(leveled) = grammar::parse_leveled(line) {
            parsed.entries.push(LogEntry {
                timestamp: leveled.timestamp,
                level: leveled.level,
                component: leveled.component,
                message: leveled.message,
                exception: None,
                line: index + 1,
            });
            continue;
        }

        match parsed.entries.last_mut() {
            Some(previous) if grammar::is_continuation(line) => {
                let frame = line.trim_end();
                match previous.exception.as_mut() {
                    Some(exception) => {
                        exception.push('\n');
                        exception.push_str(frame);
                    }
                    None => previous.exception = Some(frame.to_string()),
                }
            }
            _ => {
                if !line.trim().is_empty() {
                    parsed.dropped_lines += 1;
                }
            }
        }
    }

    parsed
}
