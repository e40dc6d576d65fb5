// Export modules for library usage
pub mod ci;
pub mod cli;
pub mod commands;
pub mod config;
pub mod core;
pub mod correlation;
pub mod error;
pub mod formatting;
pub mod history;
pub mod io;
pub mod logs;
pub mod observability;
pub mod pipeline;
pub mod report;
pub mod rules;
pub mod scoring;
pub mod testkit;

// Re-export commonly used types
pub use crate::core::{
    CodeReference, FailureCategory, FailureRecord, FailureType, LogEntry, LogLevel, Nature,
    TestStatus,
};

pub use crate::error::{Result, TriageError};

pub use crate::report::{parse_report, ParsedReport, ReportCounters, ReportParser};

pub use crate::logs::{parse_log, ParsedLog};

pub use crate::correlation::{CorrelatedFailure, CorrelationEngine, LogQuality, MatchKind};

pub use crate::rules::{Classification, Rule, RuleEngine, RulePack, RuleRegistry};

pub use crate::scoring::{AiSignal, ConfidenceBreakdown, ConfidenceInputs, ConfidenceScorer};

pub use crate::history::{
    FailureHistory, FailureSignature, HistoryStore, HistoryTable, InMemoryHistoryStore,
};

pub use crate::ci::{AnnotationBlock, CiConfig, CiDecision, CiOutput, Platform, RunSummary};

pub use crate::pipeline::{InputSource, RunInputs, RunOutcome, TriagePipeline};

pub use crate::config::{load_config, LoadedConfig, TriageConfig};

pub use crate::io::output::{create_writer, OutputFormat, OutputWriter};
