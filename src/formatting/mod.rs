//! Terminal styling for triage output.

use crate::ci::CiDecision;
use crate::core::Nature;
use colored::*;
use std::env;
use std::io::IsTerminal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "always" => Some(Self::Always),
            "never" => Some(Self::Never),
            _ => None,
        }
    }

    pub fn should_use_color(&self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => detect_color_support(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormattingConfig {
    pub color: ColorMode,
    /// Unicode markers (`✗`, `⚠`, `✓`) instead of `[FAIL]`-style tags.
    pub symbols: bool,
}

impl Default for FormattingConfig {
    fn default() -> Self {
        Self {
            color: ColorMode::Auto,
            symbols: true,
        }
    }
}

impl FormattingConfig {
    /// Honors `NO_COLOR`, `CLICOLOR=0` and `CLICOLOR_FORCE=1`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // https://no-color.org
        if env::var_os("NO_COLOR").is_some() {
            config.color = ColorMode::Never;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            config.color = ColorMode::Never;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v == "1") {
            config.color = ColorMode::Always;
        }
        if !config.color.should_use_color() {
            config.symbols = false;
        }
        config
    }

    /// ASCII-only, no colors.
    pub fn plain() -> Self {
        Self {
            color: ColorMode::Never,
            symbols: false,
        }
    }
}

/// Applies a [`FormattingConfig`] to triage-specific labels.
#[derive(Debug, Clone, Copy)]
pub struct Styler {
    color: bool,
    symbols: bool,
}

impl Styler {
    pub fn new(config: FormattingConfig) -> Self {
        Self {
            color: config.color.should_use_color(),
            symbols: config.symbols,
        }
    }

    pub fn plain() -> Self {
        Self::new(FormattingConfig::plain())
    }

    fn paint(&self, text: &str, f: impl FnOnce(&str) -> ColoredString) -> String {
        if self.color {
            f(text).to_string()
        } else {
            text.to_string()
        }
    }

    pub fn header(&self, text: &str) -> String {
        self.paint(text, |t| t.blue().bold())
    }

    pub fn bold(&self, text: &str) -> String {
        self.paint(text, |t| t.bold())
    }

    pub fn dim(&self, text: &str) -> String {
        self.paint(text, |t| t.dimmed())
    }

    pub fn error(&self, text: &str) -> String {
        self.paint(text, |t| t.red())
    }

    pub fn decision_marker(&self, decision: CiDecision) -> &'static str {
        match (decision, self.symbols) {
            (CiDecision::Fail, true) => "✗",
            (CiDecision::Warn, true) => "⚠",
            (CiDecision::Pass, true) => "✓",
            (CiDecision::Fail, false) => "[FAIL]",
            (CiDecision::Warn, false) => "[WARN]",
            (CiDecision::Pass, false) => "[PASS]",
        }
    }

    pub fn decision(&self, decision: CiDecision) -> String {
        let text = decision.as_str();
        match decision {
            CiDecision::Fail => self.paint(text, |t| t.red().bold()),
            CiDecision::Warn => self.paint(text, |t| t.yellow()),
            CiDecision::Pass => self.paint(text, |t| t.green()),
        }
    }

    pub fn nature(&self, nature: Nature) -> String {
        let text = nature.as_str();
        match nature {
            Nature::Flaky => self.paint(text, |t| t.magenta()),
            Nature::Deterministic => self.paint(text, |t| t.cyan()),
            Nature::Unknown => self.dim(text),
        }
    }

    /// Confidence as a percentage, green at or above 85%, yellow at or
    /// above 65%.
    pub fn confidence(&self, confidence: f64) -> String {
        let text = format!("{:.0}%", confidence * 100.0);
        if confidence >= 0.85 {
            self.paint(&text, |t| t.green())
        } else if confidence >= 0.65 {
            self.paint(&text, |t| t.yellow())
        } else {
            self.paint(&text, |t| t.red())
        }
    }
}

fn detect_color_support() -> bool {
    if env::var("TERM").is_ok_and(|term| term == "dumb") {
        return false;
    }
    std::io::stdout().is_terminal()
}
