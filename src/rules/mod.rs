//! Rule engine: keyword rules matched against text signals.
//!
//! A [`RulePack`] is an ordered, versioned set of [`Rule`]s for one framework
//! (or the generic fallback). [`RuleEngine::match_rules`] returns every rule
//! whose predicate accepts at least one signal, sorted by priority then
//! confidence. [`RuleEngine::classify`] reduces the matches to one
//! [`Classification`].
//!
//! # Predicate
//!
//! Keywords are case-insensitive substrings.
//!
//! 1. An `exclude` keyword in any signal vetoes the rule.
//! 2. A non-empty `all` list requires every keyword in the same signal.
//! 3. Otherwise a non-empty `any` list requires at least one keyword.
//! 4. A rule with neither list never matches.

pub mod builtin;
pub mod detect;
pub mod loader;
pub mod registry;

pub use detect::detect_framework;
pub use registry::RuleRegistry;

use crate::core::{FailureType, Signal};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

pub const DEFAULT_PRIORITY: u32 = 100;

/// Returned by [`RuleEngine::classify`] when nothing matched.
pub const UNMATCHED_CONFIDENCE: f64 = 0.2;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    #[serde(default)]
    pub any: Vec<String>,
    #[serde(default)]
    pub all: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    pub failure_type: FailureType,
    pub confidence: f64,
    /// Lower runs first.
    #[serde(default = "default_priority")]
    pub priority: u32,
}

fn default_priority() -> u32 {
    DEFAULT_PRIORITY
}

fn lowered(keywords: Vec<String>) -> Vec<String> {
    keywords
        .into_iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

impl Rule {
    /// Build a rule with keywords normalized to lowercase.
    pub fn new(
        id: impl Into<String>,
        failure_type: FailureType,
        confidence: f64,
        priority: u32,
    ) -> Self {
        Self {
            id: id.into(),
            framework: None,
            any: Vec::new(),
            all: Vec::new(),
            exclude: Vec::new(),
            failure_type,
            confidence: confidence.clamp(0.0, 1.0),
            priority,
        }
    }

    pub fn with_any<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.any = lowered(keywords.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_all<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.all = lowered(keywords.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_exclude<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = lowered(keywords.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_framework(mut self, framework: impl Into<String>) -> Self {
        self.framework = Some(framework.into());
        self
    }

    fn is_excluded(&self, lowered_signals: &[String]) -> bool {
        self.exclude
            .iter()
            .any(|k| lowered_signals.iter().any(|s| s.contains(k.as_str())))
    }

    fn accepts(&self, lowered_signal: &str) -> bool {
        if !self.all.is_empty() {
            self.all.iter().all(|k| lowered_signal.contains(k.as_str()))
        } else {
            self.any.iter().any(|k| lowered_signal.contains(k.as_str()))
        }
    }

    /// Whether this rule matches the given (already lowercased) signals.
    pub fn matches(&self, lowered_signals: &[String]) -> bool {
        !self.is_excluded(lowered_signals) && lowered_signals.iter().any(|s| self.accepts(s))
    }
}

/// Where a pack was loaded from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PackSource {
    /// A key path inside the central configuration document.
    Config { key_path: String },
    /// A standalone rule file.
    File { path: PathBuf },
    BuiltIn,
}

impl std::fmt::Display for PackSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackSource::Config { key_path } => write!(f, "config key '{key_path}'"),
            PackSource::File { path } => write!(f, "{}", path.display()),
            PackSource::BuiltIn => f.write_str("built-in"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RulePack {
    pub name: String,
    pub version: String,
    pub framework: Option<String>,
    pub rules: Vec<Rule>,
    /// Malformed entries dropped while loading.
    pub skipped: usize,
    /// Built-in pack whose rules are appended after this pack's own.
    pub extends: Option<String>,
    pub source: PackSource,
}

impl RulePack {
    pub fn new(name: impl Into<String>, rules: Vec<Rule>) -> Self {
        Self {
            name: name.into(),
            version: "1".to_string(),
            framework: None,
            rules,
            skipped: 0,
            extends: None,
            source: PackSource::BuiltIn,
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Outcome of classifying one failure's signals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub failure_type: FailureType,
    pub confidence: f64,
    /// Matched rules, sorted, de-duplicated by id.
    pub matched: Vec<Rule>,
}

impl Classification {
    pub fn unmatched() -> Self {
        Self {
            failure_type: FailureType::Unknown,
            confidence: UNMATCHED_CONFIDENCE,
            matched: Vec::new(),
        }
    }

    pub fn is_match(&self) -> bool {
        !self.matched.is_empty()
    }

    /// The rule that decided the classification.
    pub fn best(&self) -> Option<&Rule> {
        best_by_confidence(&self.matched)
    }

    /// Matched rules beyond the best one that agree on its failure type.
    pub fn extra_agreeing(&self) -> usize {
        let Some(best) = self.best() else {
            return 0;
        };
        self.matched
            .iter()
            .filter(|r| r.failure_type == best.failure_type)
            .count()
            .saturating_sub(1)
    }

    pub fn rule_ids(&self) -> Vec<&str> {
        self.matched.iter().map(|r| r.id.as_str()).collect()
    }
}

/// Highest confidence; on a tie the earlier rule wins.
fn best_by_confidence(rules: &[Rule]) -> Option<&Rule> {
    rules.iter().fold(None, |best: Option<&Rule>, rule| match best {
        Some(b) if b.confidence >= rule.confidence => Some(b),
        _ => Some(rule),
    })
}

/// Two-key stable sort: priority ascending, then confidence descending.
pub fn sort_rules(rules: &mut [Rule]) {
    rules.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| b.confidence.total_cmp(&a.confidence))
    });
}

/// Matches signals against one resolved pack.
#[derive(Clone, Debug)]
pub struct RuleEngine {
    pack: Arc<RulePack>,
}

impl RuleEngine {
    pub fn new(pack: Arc<RulePack>) -> Self {
        Self { pack }
    }

    pub fn pack(&self) -> &RulePack {
        &self.pack
    }

    /// Every rule matching at least one signal, sorted by
    /// (priority asc, confidence desc).
    pub fn match_rules<S: Signal>(&self, signals: &[S]) -> Vec<Rule> {
        let lowered: Vec<String> = signals
            .iter()
            .map(|s| s.text().to_lowercase())
            .filter(|s| !s.trim().is_empty())
            .collect();
        if lowered.is_empty() {
            return Vec::new();
        }

        let mut matched: Vec<Rule> = self
            .pack
            .rules
            .iter()
            .filter(|rule| rule.matches(&lowered))
            .cloned()
            .collect();
        sort_rules(&mut matched);
        matched
    }

    pub fn classify<S: Signal>(&self, signals: &[S]) -> Classification {
        let mut seen = HashSet::new();
        let matched: Vec<Rule> = self
            .match_rules(signals)
            .into_iter()
            .filter(|rule| seen.insert(rule.id.clone()))
            .collect();

        let Some(best) = best_by_confidence(&matched) else {
            return Classification::unmatched();
        };
        log::debug!(
            "Rule '{}' classified failure as {} ({:.2}) out of {} match(es)",
            best.id,
            best.failure_type,
            best.confidence,
            matched.len()
        );
        let (failure_type, confidence) = (best.failure_type, best.confidence);
        Classification {
            failure_type,
            confidence,
            matched,
        }
    }
}
