//! Flaky/deterministic evaluation of one signature's history.

use super::FailureHistory;
use crate::core::{FailureType, Nature};

/// Below this many occurrences the nature is always unknown.
pub const MIN_OCCURRENCES: u32 = 3;
pub const INSUFFICIENT_HISTORY_CONFIDENCE: f64 = 0.3;
pub const TIE_CONFIDENCE: f64 = 0.5;

const DETERMINISTIC_STREAK: u32 = 3;
const LONG_RUNNING_OCCURRENCES: u32 = 5;

/// Scores for each nature, before picking a winner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NatureScores {
    pub flaky: f64,
    pub deterministic: f64,
}

pub fn nature_scores(history: &FailureHistory) -> NatureScores {
    let mut flaky = 0.0;
    if history.pass_count > 0 {
        flaky += 0.4;
    }
    if history.different_error_count > 0 {
        flaky += 0.3;
    }
    if history.failure_type == FailureType::EnvironmentIssue {
        flaky += 0.3;
    }

    let mut deterministic = 0.0;
    if history.consecutive_failures >= DETERMINISTIC_STREAK {
        deterministic += 0.4;
    }
    if matches!(
        history.failure_type,
        FailureType::ProductDefect | FailureType::AutomationDefect
    ) {
        deterministic += 0.3;
    }
    if history.occurrences >= LONG_RUNNING_OCCURRENCES && history.pass_count == 0 {
        deterministic += 0.3;
    }

    NatureScores {
        flaky,
        deterministic,
    }
}

/// The nature and its confidence. The strictly larger score wins.
pub fn evaluate(history: &FailureHistory) -> (Nature, f64) {
    if history.occurrences < MIN_OCCURRENCES {
        return (Nature::Unknown, INSUFFICIENT_HISTORY_CONFIDENCE);
    }
    let scores = nature_scores(history);
    // Scores are sums of tenths; compare at that resolution.
    let flaky = (scores.flaky * 10.0).round() as i64;
    let deterministic = (scores.deterministic * 10.0).round() as i64;
    match flaky.cmp(&deterministic) {
        std::cmp::Ordering::Greater => (Nature::Flaky, scores.flaky.min(1.0)),
        std::cmp::Ordering::Less => (Nature::Deterministic, scores.deterministic.min(1.0)),
        std::cmp::Ordering::Equal => (Nature::Unknown, TIE_CONFIDENCE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::FailureSignature;
    use chrono::Utc;

    fn history(failure_type: FailureType) -> FailureHistory {
        FailureHistory::new(
            FailureSignature::from("sig"),
            "a.B.c",
            failure_type,
            "boom",
            Utc::now(),
        )
    }

    #[test]
    fn test_insufficient_history_is_unknown() {
        let mut h = history(FailureType::ProductDefect);
        h.occurrences = 2;
        h.consecutive_failures = 2;
        assert_eq!(evaluate(&h), (Nature::Unknown, 0.3));
    }

    #[test]
    fn test_streak_of_product_defects_is_deterministic() {
        let mut h = history(FailureType::ProductDefect);
        h.occurrences = 5;
        h.consecutive_failures = 5;
        let (nature, confidence) = evaluate(&h);
        assert_eq!(nature, Nature::Deterministic);
        assert!((confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_passes_and_environment_make_it_flaky() {
        let mut h = history(FailureType::EnvironmentIssue);
        h.occurrences = 4;
        h.consecutive_failures = 1;
        h.pass_count = 2;
        let (nature, confidence) = evaluate(&h);
        assert_eq!(nature, Nature::Flaky);
        assert!((confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_tie_is_unknown_at_half() {
        // flaky: pass 0.4; deterministic: streak 0.4
        let mut h = history(FailureType::Unknown);
        h.occurrences = 4;
        h.consecutive_failures = 3;
        h.pass_count = 1;
        assert_eq!(evaluate(&h), (Nature::Unknown, TIE_CONFIDENCE));
    }

    #[test]
    fn test_floating_point_sums_still_tie() {
        // flaky: 0.4 + 0.3 = 0.7; deterministic: 0.4 + 0.3 = 0.7
        let mut h = history(FailureType::AutomationDefect);
        h.occurrences = 3;
        h.consecutive_failures = 3;
        h.pass_count = 1;
        h.different_error_count = 1;
        assert_eq!(evaluate(&h).0, Nature::Unknown);
    }
}
