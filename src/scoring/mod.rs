//! Confidence scoring.
//!
//! Four evidence components, each in `[0, 1]`, are combined with fixed
//! weights into a base confidence. An optional AI agreement signal can then
//! add a bonus on top, never more than the headroom left below 1.0.

pub mod confidence;

pub use confidence::{
    AiSignal, ConfidenceBreakdown, ConfidenceInputs, ConfidenceScorer, HistoryConsistency,
    HISTORY_WEIGHT, LOG_WEIGHT, RULE_WEIGHT, SIGNAL_WEIGHT,
};
