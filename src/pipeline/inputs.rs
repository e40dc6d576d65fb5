//! Run inputs and per-input failures.

use crate::error::{Result, TriageError};
use crate::scoring::AiSignal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One report or log document, on disk or already in memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputSource {
    File(PathBuf),
    Inline { name: String, content: String },
}

impl InputSource {
    pub fn inline(name: impl Into<String>, content: impl Into<String>) -> Self {
        InputSource::Inline {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn label(&self) -> String {
        match self {
            InputSource::File(path) => path.display().to_string(),
            InputSource::Inline { name, .. } => name.clone(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            InputSource::File(path) => Some(path),
            InputSource::Inline { .. } => None,
        }
    }

    pub fn read(&self) -> Result<String> {
        match self {
            InputSource::File(path) => std::fs::read_to_string(path)
                .map_err(|e| TriageError::from_io_error(e, Some(path.clone()))),
            InputSource::Inline { content, .. } => Ok(content.clone()),
        }
    }
}

impl From<PathBuf> for InputSource {
    fn from(path: PathBuf) -> Self {
        InputSource::File(path)
    }
}

impl From<&Path> for InputSource {
    fn from(path: &Path) -> Self {
        InputSource::File(path.to_path_buf())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Report,
    Log,
    ApplicationLog,
    AiSignals,
}

impl std::fmt::Display for InputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            InputKind::Report => "report",
            InputKind::Log => "log",
            InputKind::ApplicationLog => "application log",
            InputKind::AiSignals => "AI signals",
        })
    }
}

/// An input that could not be used. The run continues without it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputError {
    pub source: String,
    pub kind: InputKind,
    pub code: String,
    pub message: String,
}

impl InputError {
    pub fn new(source: &InputSource, kind: InputKind, error: &TriageError) -> Self {
        Self {
            source: source.label(),
            kind,
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

/// Everything one triage run reads.
#[derive(Clone, Debug, Default)]
pub struct RunInputs {
    pub reports: Vec<InputSource>,
    /// Automation (framework) logs, merged into one source.
    pub logs: Vec<InputSource>,
    /// Application-under-test logs, merged into one source.
    pub app_logs: Vec<InputSource>,
    /// Rule pack to use; detected from report and log text when `None`.
    pub framework: Option<String>,
    /// AI agreement per qualified test id.
    pub ai_signals: HashMap<String, AiSignal>,
    /// AI signal documents; entries in `ai_signals` win over file entries.
    pub ai_signal_files: Vec<InputSource>,
}

impl RunInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_report(mut self, source: impl Into<InputSource>) -> Self {
        self.reports.push(source.into());
        self
    }

    pub fn with_log(mut self, source: impl Into<InputSource>) -> Self {
        self.logs.push(source.into());
        self
    }

    pub fn with_app_log(mut self, source: impl Into<InputSource>) -> Self {
        self.app_logs.push(source.into());
        self
    }

    pub fn with_framework(mut self, framework: impl Into<String>) -> Self {
        self.framework = Some(framework.into());
        self
    }

    pub fn with_ai_signal(mut self, test_id: impl Into<String>, signal: AiSignal) -> Self {
        self.ai_signals.insert(test_id.into(), signal);
        self
    }

    pub fn with_ai_signal_file(mut self, source: impl Into<InputSource>) -> Self {
        self.ai_signal_files.push(source.into());
        self
    }

    /// Merge AI signal files with the inline signals. Unusable files are
    /// recorded in `errors` and skipped.
    pub fn resolve_ai_signals(&self, errors: &mut Vec<InputError>) -> HashMap<String, AiSignal> {
        let mut merged = HashMap::new();
        for source in &self.ai_signal_files {
            match source
                .read()
                .and_then(|content| parse_ai_signals(&content, source.path()))
            {
                Ok(signals) => merged.extend(signals),
                Err(e) => {
                    log::warn!("Ignoring AI signals from {}: {}", source.label(), e);
                    errors.push(InputError::new(source, InputKind::AiSignals, &e));
                }
            }
        }
        merged.extend(self.ai_signals.iter().map(|(k, v)| (k.clone(), *v)));
        merged
    }
}

#[derive(Deserialize)]
struct RawAiSignal {
    agrees: bool,
    confidence: f64,
}

/// Parse an AI signal document: `{ "<test id>": { "agrees": bool, "confidence": f64 } }`.
/// Confidences are clamped into [0, 1].
pub fn parse_ai_signals(content: &str, path: Option<&Path>) -> Result<HashMap<String, AiSignal>> {
    let raw: HashMap<String, RawAiSignal> = serde_json::from_str(content).map_err(|e| {
        TriageError::parse(
            format!("invalid AI signal document: {e}"),
            path.map(Path::to_path_buf),
        )
    })?;
    Ok(raw
        .into_iter()
        .map(|(test, signal)| (test, AiSignal::new(signal.agrees, signal.confidence)))
        .collect())
}

pub fn load_ai_signals(path: &Path) -> Result<HashMap<String, AiSignal>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| TriageError::from_io_error(e, Some(path.to_path_buf())))?;
    parse_ai_signals(&content, Some(path))
}
