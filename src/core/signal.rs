//! Text signals fed to the rule engine.
//!
//! Producers hand the rule engine very different shapes: raw strings,
//! parsed report records, log entries and correlated failures. Each of them
//! implements [`Signal`] so matching code only ever sees `text()`.

use super::{FailureRecord, LogEntry};
use std::borrow::Cow;

/// Anything that can be matched against rule keywords.
pub trait Signal {
    fn text(&self) -> Cow<'_, str>;
}

impl Signal for str {
    fn text(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

impl Signal for String {
    fn text(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_str())
    }
}

impl<T: Signal + ?Sized> Signal for &T {
    fn text(&self) -> Cow<'_, str> {
        (**self).text()
    }
}

impl Signal for FailureRecord {
    /// Failure type label, message and the first stack line. Deeper frames are
    /// left out so library package names do not trigger framework keywords.
    fn text(&self) -> Cow<'_, str> {
        let first_frame = self
            .stack_trace
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("");
        Cow::Owned(
            [self.failure_type_label.as_str(), self.error_message.as_str(), first_frame]
                .iter()
                .filter(|part| !part.is_empty())
                .copied()
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }
}

impl Signal for LogEntry {
    fn text(&self) -> Cow<'_, str> {
        match &self.exception {
            Some(_) => Cow::Owned(self.full_text()),
            None => Cow::Borrowed(self.message.as_str()),
        }
    }
}
