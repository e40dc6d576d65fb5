//! Cross-source correlation of failing report records with log entries.
//!
//! For each failing [`FailureRecord`] the engine selects related error and
//! warning entries from an independent log source, refines the coarse
//! category, extracts a root cause and scores how trustworthy the
//! association is.
//!
//! Matching tiers, first tier with a hit wins:
//! 1. the entry's component contains the test class name
//! 2. the entry's message contains the test method name
//! 3. the entry's message contains the test class name
//! 4. fallback: the last three error entries of the log

use crate::core::{FailureCategory, FailureRecord, LogEntry, Signal};
use crate::logs::{mentions_infrastructure, ParsedLog};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Confidence when no log source is available.
pub const NO_LOG_CONFIDENCE: f64 = 0.5;

const BASE_CONFIDENCE: f64 = 0.5;
const ERROR_MATCHED_BONUS: f64 = 0.2;
const COMPONENT_MATCH_BONUS: f64 = 0.2;
const TYPE_IN_EXCEPTION_BONUS: f64 = 0.1;
const FALLBACK_ERROR_COUNT: usize = 3;

/// How the matched entries were selected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    ComponentName,
    MethodName,
    ClassName,
    Fallback,
    Unmatched,
    NoLogSource,
}

/// Log evidence quality, used by the confidence scorer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogQuality {
    Poor,
    Fair,
    Good,
}

/// One failing record with the log evidence associated to it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CorrelatedFailure {
    pub record: FailureRecord,
    pub errors: Vec<LogEntry>,
    pub warnings: Vec<LogEntry>,
    pub category: FailureCategory,
    pub root_cause: String,
    pub is_infrastructure: bool,
    pub confidence: f64,
    pub match_kind: MatchKind,
}

impl CorrelatedFailure {
    /// `None` when no log source was available at all.
    pub fn log_quality(&self) -> Option<LogQuality> {
        match self.match_kind {
            MatchKind::NoLogSource => None,
            MatchKind::ComponentName if self.errors.iter().any(|e| e.exception.is_some()) => {
                Some(LogQuality::Good)
            }
            MatchKind::ComponentName | MatchKind::MethodName | MatchKind::ClassName
                if !self.errors.is_empty() =>
            {
                Some(LogQuality::Fair)
            }
            _ => Some(LogQuality::Poor),
        }
    }

    pub fn has_log_source(&self) -> bool {
        self.match_kind != MatchKind::NoLogSource
    }
}

impl Signal for CorrelatedFailure {
    fn text(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.root_cause.as_str())
    }
}

/// Correlates report records against an optional log source.
pub struct CorrelationEngine<'a> {
    log: Option<&'a ParsedLog>,
}

impl<'a> CorrelationEngine<'a> {
    pub fn new(log: Option<&'a ParsedLog>) -> Self {
        Self { log }
    }

    /// One [`CorrelatedFailure`] per failing record, in record order.
    /// Passed and skipped records are not correlated.
    pub fn correlate(&self, records: &[FailureRecord]) -> Vec<CorrelatedFailure> {
        records
            .iter()
            .filter(|r| r.is_failing())
            .map(|r| self.correlate_one(r))
            .collect()
    }

    pub fn correlate_one(&self, record: &FailureRecord) -> CorrelatedFailure {
        match self.log {
            Some(log) => correlate_with_log(record, log),
            None => CorrelatedFailure {
                record: record.clone(),
                errors: Vec::new(),
                warnings: Vec::new(),
                category: record.category,
                root_cause: record.first_error_line().to_string(),
                is_infrastructure: record.category == FailureCategory::Infrastructure,
                confidence: NO_LOG_CONFIDENCE,
                match_kind: MatchKind::NoLogSource,
            },
        }
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    !needle.is_empty() && haystack.to_lowercase().contains(&needle.to_lowercase())
}

type EntryPredicate<'r> = Box<dyn Fn(&LogEntry) -> bool + 'r>;

fn tiers(record: &FailureRecord) -> Vec<(MatchKind, EntryPredicate<'_>)> {
    let class = record.simple_class_name();
    let method = record.method_name();
    vec![
        (
            MatchKind::ComponentName,
            Box::new(move |e: &LogEntry| contains_ci(&e.component, class)),
        ),
        (
            MatchKind::MethodName,
            Box::new(move |e: &LogEntry| contains_ci(&e.message, method)),
        ),
        (
            MatchKind::ClassName,
            Box::new(move |e: &LogEntry| contains_ci(&e.message, class)),
        ),
    ]
}

fn select_entries(
    record: &FailureRecord,
    log: &ParsedLog,
) -> (MatchKind, Vec<LogEntry>, Vec<LogEntry>) {
    for (kind, predicate) in tiers(record) {
        let errors: Vec<LogEntry> = log.errors().filter(|e| predicate(e)).cloned().collect();
        let warnings: Vec<LogEntry> = log.warnings().filter(|e| predicate(e)).cloned().collect();
        if !errors.is_empty() || !warnings.is_empty() {
            return (kind, errors, warnings);
        }
    }

    let all_errors: Vec<&LogEntry> = log.errors().collect();
    if all_errors.is_empty() {
        return (MatchKind::Unmatched, Vec::new(), Vec::new());
    }
    let tail = all_errors.len().saturating_sub(FALLBACK_ERROR_COUNT);
    let fallback = all_errors[tail..].iter().map(|e| (*e).clone()).collect();
    (MatchKind::Fallback, fallback, Vec::new())
}

fn correlate_with_log(record: &FailureRecord, log: &ParsedLog) -> CorrelatedFailure {
    let (match_kind, errors, warnings) = select_entries(record, log);

    let infra_hit = errors
        .iter()
        .chain(warnings.iter())
        .any(|e| mentions_infrastructure(&e.full_text()));
    let category = if infra_hit {
        FailureCategory::Infrastructure
    } else {
        record.category
    };

    let label = record.failure_type_label.trim();
    let type_in_exception = !label.is_empty()
        && errors
            .iter()
            .any(|e| e.exception.as_deref().is_some_and(|x| x.contains(label)));

    let mut confidence = BASE_CONFIDENCE;
    if !errors.is_empty() {
        confidence += ERROR_MATCHED_BONUS;
    }
    if match_kind == MatchKind::ComponentName {
        confidence += COMPONENT_MATCH_BONUS;
    }
    if type_in_exception {
        confidence += TYPE_IN_EXCEPTION_BONUS;
    }

    let root_cause = root_cause_from(&errors).unwrap_or_else(|| record.first_error_line().to_string());

    CorrelatedFailure {
        record: record.clone(),
        errors,
        warnings,
        category,
        root_cause,
        is_infrastructure: category == FailureCategory::Infrastructure,
        confidence: confidence.min(1.0),
        match_kind,
    }
}

/// The innermost `Caused by:` of the first matched exception, else the first
/// matched error message.
fn root_cause_from(errors: &[LogEntry]) -> Option<String> {
    let innermost_cause = errors.iter().find_map(|e| {
        e.exception.as_deref().and_then(|x| {
            x.lines()
                .map(str::trim)
                .filter_map(|l| l.strip_prefix("Caused by:"))
                .last()
                .map(|cause| cause.trim().to_string())
        })
    });
    innermost_cause.or_else(|| {
        errors
            .iter()
            .map(|e| e.message.trim())
            .find(|m| !m.is_empty())
            .map(str::to_string)
    })
}
