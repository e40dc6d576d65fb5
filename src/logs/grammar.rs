//! Leveled-line grammars, tried in order.

use crate::core::LogLevel;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// The parts of a leveled log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeveledLine {
    pub timestamp: Option<String>,
    pub level: LogLevel,
    pub component: String,
    pub message: String,
}

/// One accepted line shape.
pub struct Grammar {
    pub name: &'static str,
    pattern: Regex,
}

impl Grammar {
    fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("valid log grammar"),
        }
    }

    pub fn parse(&self, line: &str) -> Option<LeveledLine> {
        let caps = self.pattern.captures(line)?;
        let level = LogLevel::parse(caps.name("level")?.as_str())?;
        Some(LeveledLine {
            timestamp: named(&caps, "ts"),
            level,
            component: named(&caps, "component")
                .or_else(|| named(&caps, "thread"))
                .unwrap_or_default(),
            message: named(&caps, "msg").unwrap_or_default(),
        })
    }
}

fn named(caps: &Captures<'_>, name: &str) -> Option<String> {
    caps.name(name)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

const DATE_TIME: &str = r"\d{4}-\d{2}-\d{2}[ T]\d{2}:\d{2}:\d{2}(?:[.,]\d+)?(?:Z|[+-]\d{2}:?\d{2})?";
const CLOCK: &str = r"\d{2}:\d{2}:\d{2}(?:[.,]\d+)?";

/// Grammars in the order they are tried:
///
/// 1. timestamp first: `2024-03-01 10:00:02,123 ERROR [main] com.acme.LoginPage - click failed`
/// 2. bracketed level first: `[ERROR] 10:00:02 LoginPage - click failed`
/// 3. level with thread: `ERROR [pool-1-thread-2] LoginPage: click failed`
pub static GRAMMARS: Lazy<Vec<Grammar>> = Lazy::new(|| {
    vec![
        Grammar::new(
            "timestamp-first",
            &format!(
                r"^\[?(?P<ts>{DATE_TIME})\]?\s+\[?(?P<level>[A-Za-z]+)\]?\s+(?:\[(?P<thread>[^\]]*)\]\s+)?(?:(?P<component>[\w.$/-]+)\s+-\s+)?(?P<msg>.*)$"
            ),
        ),
        Grammar::new(
            "bracket-level-first",
            &format!(
                r"^\[(?P<level>[A-Za-z]+)\]\s+(?:(?P<ts>{DATE_TIME}|{CLOCK})\s+)?(?:(?P<component>[\w.$/-]+)\s+-\s+)?(?P<msg>.*)$"
            ),
        ),
        Grammar::new(
            "level-with-thread",
            r"^(?P<level>[A-Za-z]+)\s+\[(?P<thread>[^\]]+)\]\s+(?:(?P<component>[\w.$/-]+)\s*(?:-|:)\s+)?(?P<msg>.*)$",
        ),
    ]
});

/// Try each grammar in order; the first that accepts the line wins.
pub fn parse_leveled(line: &str) -> Option<LeveledLine> {
    GRAMMARS.iter().find_map(|g| g.parse(line))
}

/// A non-leveled line continues the previous entry's exception only when it
/// looks like a stack frame.
pub fn is_continuation(line: &str) -> bool {
    if line.trim().is_empty() {
        return false;
    }
    let trimmed = line.trim_start();
    line.starts_with(char::is_whitespace)
        || trimmed.starts_with("at ")
        || trimmed.starts_with("Caused by:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_first() {
        let line =
            parse_leveled("2024-03-01 10:00:02,123 ERROR [main] com.acme.LoginPage - click failed")
                .unwrap();
        assert_eq!(line.timestamp.as_deref(), Some("2024-03-01 10:00:02,123"));
        assert_eq!(line.level, LogLevel::Error);
        assert_eq!(line.component, "com.acme.LoginPage");
        assert_eq!(line.message, "click failed");
    }

    #[test]
    fn test_timestamp_first_without_component_uses_thread() {
        let line = parse_leveled("2024-03-01T10:00:02Z WARN [worker-3] retrying").unwrap();
        assert_eq!(line.level, LogLevel::Warn);
        assert_eq!(line.component, "worker-3");
        assert_eq!(line.message, "retrying");
    }

    #[test]
    fn test_bracket_level_first() {
        let line = parse_leveled("[ERROR] 10:00:02 LoginPage - element not clickable").unwrap();
        assert_eq!(line.level, LogLevel::Error);
        assert_eq!(line.timestamp.as_deref(), Some("10:00:02"));
        assert_eq!(line.component, "LoginPage");
        assert_eq!(line.message, "element not clickable");

        let bare = parse_leveled("[INFO] Tests run: 5, Failures: 1").unwrap();
        assert_eq!(bare.level, LogLevel::Info);
        assert_eq!(bare.component, "");
        assert_eq!(bare.message, "Tests run: 5, Failures: 1");
    }

    #[test]
    fn test_level_with_thread() {
        let line = parse_leveled("SEVERE [pool-1-thread-2] CheckoutTest: payment widget missing")
            .unwrap();
        assert_eq!(line.level, LogLevel::Error);
        assert_eq!(line.component, "CheckoutTest");
        assert_eq!(line.message, "payment widget missing");
    }

    #[test]
    fn test_non_level_word_rejected() {
        assert!(parse_leveled("Running [suite] now").is_none());
        assert!(parse_leveled("plain text line").is_none());
    }

    #[test]
    fn test_continuation_detection() {
        assert!(is_continuation("\tat com.acme.X.y(X.java:1)"));
        assert!(is_continuation("    ... 12 more"));
        assert!(is_continuation("at Object.<anonymous> (spec.js:3:1)"));
        assert!(is_continuation("Caused by: java.net.ConnectException"));
        assert!(!is_continuation("org.openqa.selenium.TimeoutException: boom"));
        assert!(!is_continuation("   "));
    }
}
