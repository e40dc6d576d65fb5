use crate::ci::{CiConfig, MAX_EXCERPT_CHARS};
use crate::io::output::OutputFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const CONFIG_FILE_NAME: &str = ".failtriage.toml";
pub const DEFAULT_HISTORY_PATH: &str = ".failtriage/history.json";
pub const DEFAULT_RETENTION_DAYS: u32 = 30;
pub const DEFAULT_RULES_DIR: &str = "rules";

/// Root configuration structure for failtriage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriageConfig {
    /// CI decision table and annotation platform
    #[serde(default)]
    pub ci: CiConfig,

    /// Cross-run failure history
    #[serde(default)]
    pub history: HistoryConfig,

    /// Rule pack selection
    #[serde(default)]
    pub rules: RulesConfig,

    /// Output defaults
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub path: PathBuf,
    pub retention_days: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_HISTORY_PATH),
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

/// `[rules]`. Framework rule tables may also live under this section
/// (`[rules.selenium]`); they are read from the raw document by the rule
/// registry, not through this struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Rule pack to use; detected from report and log text when unset.
    pub framework: Option<String>,
    /// Directory holding standalone `<framework>.toml|yaml|json` rule files.
    pub directory: PathBuf,
    /// Central rule document (TOML, YAML or JSON). Defaults to this
    /// configuration file.
    pub central: Option<PathBuf>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            framework: None,
            directory: PathBuf::from(DEFAULT_RULES_DIR),
            central: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub default_format: OutputFormat,
    pub max_excerpt_chars: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_format: OutputFormat::Terminal,
            max_excerpt_chars: MAX_EXCERPT_CHARS,
        }
    }
}

impl TriageConfig {
    /// Replace invalid values with defaults, warning for each.
    pub fn sanitized(mut self) -> Self {
        self.ci = self.ci.sanitized();
        if self.history.retention_days == 0 {
            log::warn!(
                "history.retention_days must be positive; using default {}",
                DEFAULT_RETENTION_DAYS
            );
            self.history.retention_days = DEFAULT_RETENTION_DAYS;
        }
        if self.output.max_excerpt_chars > MAX_EXCERPT_CHARS {
            log::warn!(
                "output.max_excerpt_chars = {} exceeds {}; capping",
                self.output.max_excerpt_chars,
                MAX_EXCERPT_CHARS
            );
            self.output.max_excerpt_chars = MAX_EXCERPT_CHARS;
        }
        self
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.history.retention_days))
    }
}
