use super::classifier;
use super::signature::{normalize_error, FailureSignature};
use crate::core::{FailureType, Nature};
use crate::scoring::HistoryConsistency;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything remembered about one signature across runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FailureHistory {
    pub signature: FailureSignature,
    pub test_name: String,
    pub failure_type: FailureType,
    pub error_pattern: String,
    pub occurrences: u32,
    pub consecutive_failures: u32,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub pass_count: u32,
    pub different_error_count: u32,
    pub nature: Nature,
    pub nature_confidence: f64,
}

impl FailureHistory {
    pub fn new(
        signature: FailureSignature,
        test_name: &str,
        failure_type: FailureType,
        error_message: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            signature,
            test_name: test_name.to_string(),
            failure_type,
            error_pattern: normalize_error(error_message),
            occurrences: 0,
            consecutive_failures: 0,
            first_seen: now,
            last_seen: now,
            pass_count: 0,
            different_error_count: 0,
            nature: Nature::Unknown,
            nature_confidence: classifier::INSUFFICIENT_HISTORY_CONFIDENCE,
        }
    }

    pub fn consistency(&self) -> HistoryConsistency {
        if self.occurrences < classifier::MIN_OCCURRENCES {
            HistoryConsistency::Unknown
        } else if self.pass_count > 0 || self.different_error_count > 0 {
            HistoryConsistency::Inconsistent
        } else {
            HistoryConsistency::Consistent
        }
    }

    fn reevaluate(&mut self) {
        let (nature, confidence) = classifier::evaluate(self);
        self.nature = nature;
        self.nature_confidence = confidence;
    }
}

/// All signatures, plus the latest signature seen per test so a changed error
/// can be detected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryTable {
    #[serde(default = "snapshot_version")]
    pub version: u32,
    #[serde(default)]
    entries: BTreeMap<FailureSignature, FailureHistory>,
    #[serde(default)]
    latest_by_test: BTreeMap<String, FailureSignature>,
}

fn snapshot_version() -> u32 {
    SNAPSHOT_VERSION
}

impl Default for HistoryTable {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            entries: BTreeMap::new(),
            latest_by_test: BTreeMap::new(),
        }
    }
}

impl HistoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, signature: &FailureSignature) -> Option<&FailureHistory> {
        self.entries.get(signature)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FailureHistory> {
        self.entries.values()
    }

    /// Record one failing occurrence and re-evaluate its nature.
    pub fn record_failure(
        &mut self,
        test_name: &str,
        failure_type: FailureType,
        error_message: &str,
        now: DateTime<Utc>,
    ) -> &FailureHistory {
        let signature = FailureSignature::compute(test_name, failure_type, error_message);
        let changed_error = self
            .latest_by_test
            .get(test_name)
            .is_some_and(|previous| *previous != signature);

        let entry = self.entries.entry(signature.clone()).or_insert_with(|| {
            FailureHistory::new(signature.clone(), test_name, failure_type, error_message, now)
        });
        entry.occurrences += 1;
        entry.consecutive_failures += 1;
        entry.last_seen = now;
        if changed_error {
            entry.different_error_count += 1;
        }
        entry.reevaluate();

        self.latest_by_test.insert(test_name.to_string(), signature);
        entry
    }

    /// Record a passing run of a test. Every signature of that test gets its
    /// streak reset; counts never decrease. Returns the entries touched.
    pub fn record_pass(&mut self, test_name: &str) -> usize {
        let mut touched = 0;
        for entry in self.entries.values_mut().filter(|e| e.test_name == test_name) {
            entry.pass_count += 1;
            entry.consecutive_failures = 0;
            entry.reevaluate();
            touched += 1;
        }
        touched
    }

    /// Evict entries not seen within the retention window. Never called
    /// implicitly.
    pub fn cleanup(&mut self, retention: Duration, now: DateTime<Utc>) -> usize {
        let cutoff = now - retention;
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.last_seen >= cutoff);
        let entries = &self.entries;
        self.latest_by_test
            .retain(|_, signature| entries.contains_key(signature));
        before - self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn at(day: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap() + Duration::days(day)
    }

    #[test]
    fn test_occurrences_count_each_record() {
        let mut table = HistoryTable::new();
        for day in 0..4 {
            table.record_failure("a.B.c", FailureType::ProductDefect, "boom", at(day));
        }
        assert_eq!(table.len(), 1);
        let entry = table.iter().next().unwrap();
        assert_eq!(entry.occurrences, 4);
        assert_eq!(entry.consecutive_failures, 4);
        assert_eq!(entry.first_seen, at(0));
        assert_eq!(entry.last_seen, at(3));
    }

    #[test]
    fn test_pass_resets_streak_but_keeps_counts() {
        let mut table = HistoryTable::new();
        table.record_failure("a.B.c", FailureType::ProductDefect, "boom", at(0));
        table.record_failure("a.B.c", FailureType::ProductDefect, "boom", at(1));
        assert_eq!(table.record_pass("a.B.c"), 1);
        assert_eq!(table.record_pass("x.Y.z"), 0);
        let entry = table.iter().next().unwrap();
        assert_eq!(entry.occurrences, 2);
        assert_eq!(entry.consecutive_failures, 0);
        assert_eq!(entry.pass_count, 1);
    }

    #[test]
    fn test_changed_error_counts_on_new_signature() {
        let mut table = HistoryTable::new();
        table.record_failure("a.B.c", FailureType::ProductDefect, "boom", at(0));
        let second = table
            .record_failure("a.B.c", FailureType::ProductDefect, "completely different", at(1))
            .clone();
        assert_eq!(second.different_error_count, 1);
        // Back to the first error: that entry now records the change too.
        let first = table
            .record_failure("a.B.c", FailureType::ProductDefect, "boom", at(2))
            .clone();
        assert_eq!(first.different_error_count, 1);
        assert_eq!(first.occurrences, 2);
    }

    #[test]
    fn test_nature_updates_on_recurrence() {
        let mut table = HistoryTable::new();
        let mut nature = Nature::Unknown;
        for day in 0..5 {
            nature = table
                .record_failure("a.B.c", FailureType::ProductDefect, "boom", at(day))
                .nature;
            if day < 2 {
                assert_eq!(nature, Nature::Unknown);
            }
        }
        assert_eq!(nature, Nature::Deterministic);
    }

    #[test]
    fn test_consistency_input() {
        let mut table = HistoryTable::new();
        let sig = table
            .record_failure("a.B.c", FailureType::ProductDefect, "boom", at(0))
            .signature
            .clone();
        assert_eq!(table.get(&sig).unwrap().consistency(), HistoryConsistency::Unknown);
        table.record_failure("a.B.c", FailureType::ProductDefect, "boom", at(1));
        table.record_failure("a.B.c", FailureType::ProductDefect, "boom", at(2));
        assert_eq!(table.get(&sig).unwrap().consistency(), HistoryConsistency::Consistent);
        table.record_pass("a.B.c");
        assert_eq!(table.get(&sig).unwrap().consistency(), HistoryConsistency::Inconsistent);
    }

    #[test]
    fn test_cleanup_evicts_only_stale_entries() {
        let mut table = HistoryTable::new();
        table.record_failure("old.T.a", FailureType::ProductDefect, "boom", at(0));
        table.record_failure("new.T.b", FailureType::ProductDefect, "boom", at(40));
        let evicted = table.cleanup(Duration::days(30), at(45));
        assert_eq!(evicted, 1);
        assert_eq!(table.len(), 1);
        assert_eq!(table.iter().next().unwrap().test_name, "new.T.b");
    }
}
