//! Failure signatures: a stable identity for "the same recurring failure".

use crate::core::FailureType;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const MAX_PATTERN_CHARS: usize = 200;
const SIGNATURE_HEX_CHARS: usize = 16;

static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}\b")
        .expect("valid regex")
});
static ISO_TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(?:[.,]\d+)?(?:Z|[+-]\d{2}:?\d{2})?")
        .expect("valid regex")
});
static CLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{1,2}:\d{2}:\d{2}(?:[.,]\d+)?\b").expect("valid regex"));
static HEX_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b0x[0-9a-fA-F]+\b").expect("valid regex"));
static IDENTITY_HASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@[0-9a-fA-F]{4,}\b").expect("valid regex"));
static DOUBLE_QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#""[^"]*""#).expect("valid regex"));
static SINGLE_QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r"'[^']*'").expect("valid regex"));
static LINE_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bline\s+\d+").expect("valid regex"));
static LINE_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r":\d+\b").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Strip run-specific noise from an error message so recurrences compare equal.
pub fn normalize_error(message: &str) -> String {
    let steps: [(&Lazy<Regex>, &str); 9] = [
        (&UUID, "<uuid>"),
        (&ISO_TIMESTAMP, "<ts>"),
        (&CLOCK, "<ts>"),
        (&HEX_ADDRESS, "<addr>"),
        (&IDENTITY_HASH, "@<hash>"),
        (&DOUBLE_QUOTED, "<str>"),
        (&SINGLE_QUOTED, "<str>"),
        (&LINE_WORD, "line <n>"),
        (&LINE_SUFFIX, ":<n>"),
    ];
    let replaced = steps
        .iter()
        .fold(message.to_string(), |text, (pattern, replacement)| {
            pattern.replace_all(&text, *replacement).into_owned()
        });
    let collapsed = WHITESPACE.replace_all(replaced.trim(), " ");
    collapsed.chars().take(MAX_PATTERN_CHARS).collect()
}

/// Hex digest prefix identifying one (test, type, normalized error) triple.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FailureSignature(String);

impl FailureSignature {
    pub fn compute(test_name: &str, failure_type: FailureType, error_message: &str) -> Self {
        let pattern = normalize_error(error_message);
        let mut hasher = Sha256::new();
        hasher.update(test_name.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(failure_type.as_str().as_bytes());
        hasher.update(b"\x1f");
        hasher.update(pattern.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        Self(digest[..SIGNATURE_HEX_CHARS].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FailureSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FailureSignature {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization_strips_run_noise() {
        let a = normalize_error(
            "Element <button id=\"submit-42\"> not clickable at 2024-03-01T10:00:02.123Z (line 42) obj@1a2b3c addr 0x7ffe1234",
        );
        let b = normalize_error(
            "Element <button id=\"submit-97\"> not clickable at 2024-03-02T11:30:59.999Z (line 7) obj@9f8e7d addr 0x0000beef",
        );
        assert_eq!(a, b);
        assert!(a.contains("<ts>"));
        assert!(a.contains("line <n>"));
        assert!(a.contains("@<hash>"));
        assert!(a.contains("<addr>"));
    }

    #[test]
    fn test_normalization_handles_uuids_frames_and_clock() {
        assert_eq!(
            normalize_error("order 123e4567-e89b-12d3-a456-426614174000 failed at LoginPage.java:42 10:00:02"),
            "order <uuid> failed at LoginPage.java:<n> <ts>"
        );
        assert_eq!(normalize_error("expected 'a' but   got\n'b'"), "expected <str> but got <str>");
    }

    #[test]
    fn test_pattern_is_truncated() {
        let long = "x".repeat(500);
        assert_eq!(normalize_error(&long).chars().count(), 200);
    }

    #[test]
    fn test_signature_is_stable_and_discriminating() {
        let a = FailureSignature::compute("a.B.c", FailureType::ProductDefect, "boom at 10:00:01");
        let b = FailureSignature::compute("a.B.c", FailureType::ProductDefect, "boom at 11:22:33");
        let other_type = FailureSignature::compute("a.B.c", FailureType::EnvironmentIssue, "boom");
        let other_test = FailureSignature::compute("a.B.d", FailureType::ProductDefect, "boom");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 16);
        assert_ne!(a, other_type);
        assert_ne!(a, other_test);
    }
}
