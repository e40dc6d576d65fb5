use crate::core::Signal;
use crate::correlation::LogQuality;
use crate::rules::Classification;
use serde::{Deserialize, Serialize};

pub const RULE_WEIGHT: f64 = 0.35;
pub const SIGNAL_WEIGHT: f64 = 0.25;
pub const HISTORY_WEIGHT: f64 = 0.20;
pub const LOG_WEIGHT: f64 = 0.20;

const MAX_AGREEMENT_BONUS: f64 = 0.2;
const AGREEMENT_STEP: f64 = 0.1;
const MAX_AI_BONUS: f64 = 0.3;
const LONG_SIGNAL_CHARS: usize = 20;

/// Whether a signature's past behaviour is self-consistent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryConsistency {
    Consistent,
    /// Passed in between, or failed with a different error.
    Inconsistent,
    /// Too few occurrences to tell.
    #[default]
    Unknown,
}

/// Optional external agreement with the deterministic classification.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AiSignal {
    pub agrees: bool,
    pub confidence: f64,
}

impl AiSignal {
    pub fn new(agrees: bool, confidence: f64) -> Self {
        Self {
            agrees,
            confidence: clamp_unit(confidence),
        }
    }
}

/// Everything the scorer looks at, flattened to plain values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInputs {
    /// Confidence of the best matched rule, `None` when nothing matched.
    pub best_rule_confidence: Option<f64>,
    /// Matched rules beyond the best one agreeing on its failure type.
    pub agreeing_rules: usize,
    pub matched_rules: usize,
    pub has_stack_trace: bool,
    pub has_code_reference: bool,
    pub signal_count: usize,
    pub has_long_signal: bool,
    pub occurrences: u32,
    pub consistency: HistoryConsistency,
    /// `None` when no automation log was available.
    pub log_quality: Option<LogQuality>,
    pub has_application_logs: bool,
}

impl ConfidenceInputs {
    pub fn from_classification(classification: &Classification) -> Self {
        Self {
            best_rule_confidence: classification.best().map(|r| r.confidence),
            agreeing_rules: classification.extra_agreeing(),
            matched_rules: classification.matched.len(),
            ..Default::default()
        }
    }

    pub fn with_signals<S: Signal>(mut self, signals: &[S]) -> Self {
        let texts: Vec<String> = signals
            .iter()
            .map(|s| s.text().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        self.signal_count = texts.len();
        self.has_long_signal = texts.iter().any(|t| t.chars().count() > LONG_SIGNAL_CHARS);
        self
    }

    pub fn with_history(mut self, occurrences: u32, consistency: HistoryConsistency) -> Self {
        self.occurrences = occurrences;
        self.consistency = consistency;
        self
    }

    pub fn with_logs(mut self, quality: Option<LogQuality>, has_application_logs: bool) -> Self {
        self.log_quality = quality;
        self.has_application_logs = has_application_logs;
        self
    }
}

/// Component scores, their weighted base, and the final confidence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    pub rule_score: f64,
    pub signal_score: f64,
    pub history_score: f64,
    pub log_score: f64,
    pub ai_bonus: f64,
    pub base: f64,
    #[serde(rename = "final")]
    pub final_confidence: f64,
    pub matched_rules: usize,
    pub signal_count: usize,
    pub occurrences: u32,
    pub ai_adjusted: bool,
    pub notes: Vec<String>,
}

impl ConfidenceBreakdown {
    /// Apply the AI agreement signal. Disagreement withholds the bonus; the
    /// base is never lowered. Applying a second time has no effect.
    #[must_use]
    pub fn apply_ai(mut self, ai: &AiSignal) -> Self {
        if self.ai_adjusted {
            log::debug!("AI adjustment already applied; ignoring second signal");
            return self;
        }
        self.ai_adjusted = true;

        if ai.agrees {
            let headroom = (1.0 - self.base).max(0.0);
            self.ai_bonus = MAX_AI_BONUS.min(headroom) * clamp_unit(ai.confidence);
            self.notes.push(format!(
                "AI agreed ({:.0}%): +{:.3}",
                ai.confidence * 100.0,
                self.ai_bonus
            ));
        } else {
            self.ai_bonus = 0.0;
            self.notes
                .push("AI disagreed; bonus withheld, classification unchanged".to_string());
        }
        self.final_confidence = (self.base + self.ai_bonus).min(1.0);
        self
    }

    pub fn final_percent(&self) -> u32 {
        (self.final_confidence * 100.0).round() as u32
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Pure scorer; holds no state.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConfidenceScorer;

impl ConfidenceScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn rule_score(inputs: &ConfidenceInputs) -> f64 {
        match inputs.best_rule_confidence {
            None => 0.0,
            Some(best) => {
                let bonus = (AGREEMENT_STEP * inputs.agreeing_rules as f64).min(MAX_AGREEMENT_BONUS);
                clamp_unit(best + bonus)
            }
        }
    }

    pub fn signal_score(inputs: &ConfidenceInputs) -> f64 {
        let mut score = 0.1;
        if inputs.has_stack_trace {
            score += 0.3;
        }
        if inputs.has_code_reference {
            score += 0.3;
        }
        score += (0.1 * inputs.signal_count as f64).min(0.3);
        if inputs.has_long_signal {
            score += 0.1;
        }
        clamp_unit(score)
    }

    pub fn history_score(inputs: &ConfidenceInputs) -> f64 {
        match inputs.occurrences {
            0 => 0.2,
            1 | 2 => 0.4,
            _ if inputs.consistency == HistoryConsistency::Inconsistent => 0.5,
            3 => 0.6,
            4 => 0.7,
            _ => 0.9,
        }
    }

    pub fn log_score(inputs: &ConfidenceInputs) -> f64 {
        let Some(quality) = inputs.log_quality else {
            return 0.3;
        };
        let tier = match quality {
            LogQuality::Poor => 0.4,
            LogQuality::Fair => 0.5,
            LogQuality::Good => 0.7,
        };
        let app_bonus = if inputs.has_application_logs { 0.3 } else { 0.0 };
        clamp_unit(tier + app_bonus)
    }

    pub fn score(&self, inputs: &ConfidenceInputs) -> ConfidenceBreakdown {
        let rule_score = Self::rule_score(inputs);
        let signal_score = Self::signal_score(inputs);
        let history_score = Self::history_score(inputs);
        let log_score = Self::log_score(inputs);
        let base = (RULE_WEIGHT * rule_score
            + SIGNAL_WEIGHT * signal_score
            + HISTORY_WEIGHT * history_score
            + LOG_WEIGHT * log_score)
            .min(1.0);

        let mut notes = Vec::new();
        match inputs.best_rule_confidence {
            None => notes.push("no rule matched".to_string()),
            Some(_) if inputs.agreeing_rules > 0 => notes.push(format!(
                "{} additional rule(s) agree",
                inputs.agreeing_rules
            )),
            Some(_) => {}
        }
        if inputs.log_quality.is_none() {
            notes.push("no automation log".to_string());
        }
        if inputs.consistency == HistoryConsistency::Inconsistent {
            notes.push("history is inconsistent".to_string());
        }

        ConfidenceBreakdown {
            rule_score,
            signal_score,
            history_score,
            log_score,
            ai_bonus: 0.0,
            base,
            final_confidence: base,
            matched_rules: inputs.matched_rules,
            signal_count: inputs.signal_count,
            occurrences: inputs.occurrences,
            ai_adjusted: false,
            notes,
        }
    }

    /// Score and, when present, apply the AI signal.
    pub fn score_with_ai(&self, inputs: &ConfidenceInputs, ai: Option<&AiSignal>) -> ConfidenceBreakdown {
        let breakdown = self.score(inputs);
        match ai {
            Some(ai) => breakdown.apply_ai(ai),
            None => breakdown,
        }
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn quality() -> impl Strategy<Value = Option<LogQuality>> {
        prop_oneof![
            Just(None),
            Just(Some(LogQuality::Poor)),
            Just(Some(LogQuality::Fair)),
            Just(Some(LogQuality::Good)),
        ]
    }

    fn consistency() -> impl Strategy<Value = HistoryConsistency> {
        prop_oneof![
            Just(HistoryConsistency::Consistent),
            Just(HistoryConsistency::Inconsistent),
            Just(HistoryConsistency::Unknown),
        ]
    }

    prop_compose! {
        fn inputs()(
            best in proptest::option::of(0.0..=1.0f64),
            agreeing in 0usize..6,
            stack in any::<bool>(),
            code in any::<bool>(),
            count in 0usize..10,
            long in any::<bool>(),
            occurrences in 0u32..20,
            consistency in consistency(),
            quality in quality(),
            app in any::<bool>(),
        ) -> ConfidenceInputs {
            ConfidenceInputs {
                best_rule_confidence: best,
                agreeing_rules: agreeing,
                matched_rules: agreeing + usize::from(best.is_some()),
                has_stack_trace: stack,
                has_code_reference: code,
                signal_count: count,
                has_long_signal: long,
                occurrences,
                consistency,
                log_quality: quality,
                has_application_logs: app,
            }
        }
    }

    proptest! {
        #[test]
        fn components_and_base_stay_in_unit_range(inputs in inputs()) {
            let b = ConfidenceScorer::new().score(&inputs);
            for score in [b.rule_score, b.signal_score, b.history_score, b.log_score] {
                prop_assert!((0.0..=1.0).contains(&score));
            }
            let weighted = RULE_WEIGHT * b.rule_score
                + SIGNAL_WEIGHT * b.signal_score
                + HISTORY_WEIGHT * b.history_score
                + LOG_WEIGHT * b.log_score;
            prop_assert!(weighted <= 1.0 + 1e-9);
            prop_assert!((b.base - weighted.min(1.0)).abs() < 1e-12);
        }

        #[test]
        fn agreeing_ai_never_lowers_confidence(inputs in inputs(), ai_conf in 0.0..=1.0f64) {
            let plain = ConfidenceScorer::new().score(&inputs);
            let adjusted = plain.clone().apply_ai(&AiSignal::new(true, ai_conf));
            prop_assert!(adjusted.final_confidence >= plain.final_confidence);
            prop_assert!(adjusted.final_confidence <= 1.0);
            prop_assert!((adjusted.final_confidence - (adjusted.base + adjusted.ai_bonus).min(1.0)).abs() < 1e-12);
        }

        #[test]
        fn disagreeing_ai_changes_nothing_but_notes(inputs in inputs(), ai_conf in 0.0..=1.0f64) {
            let plain = ConfidenceScorer::new().score(&inputs);
            let adjusted = plain.clone().apply_ai(&AiSignal::new(false, ai_conf));
            prop_assert_eq!(adjusted.base, plain.base);
            prop_assert_eq!(adjusted.final_confidence, plain.final_confidence);
            prop_assert_eq!(adjusted.ai_bonus, 0.0);
        }
    }
}
