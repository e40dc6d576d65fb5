//! Unified error type for failtriage operations.
//!
//! Every fallible library operation returns [`TriageError`]. The type provides:
//! - Clear categorization via variants (Io, Format, Parse, Config, Rule, History)
//! - Stable error codes that CI scripts can match on (E001, E010, ...)
//! - Error classification via [`TriageError::is_user_fixable`]
//!
//! # Error Codes
//!
//! Codes are grouped by range:
//! - E001-E009: reading artifacts from disk
//! - E010-E019: Artifact format and parse errors
//! - E020-E029: Configuration documents
//! - E030-E039: Rule pack errors
//! - E040-E049: History store errors
//!
//! A "no match" is never an error: an unmatched rule, an uncorrelated log
//! entry or an absent history record are ordinary low-confidence values.
//!
//! # Example
//!
//! ```rust
//! use failtriage::error::{ErrorCode, TriageError};
//!
//! let err = TriageError::format("testng-results.xml", "html", Some("report.html".into()));
//! assert_eq!(err.code(), ErrorCode::FORMAT_WRONG_ARTIFACT);
//! assert!(err.to_string().contains("testng-results.xml"));
//! ```

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Stable code attached to every [`TriageError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ErrorCode(&'static str);

impl ErrorCode {
    /// Artifact path does not exist
    pub const IO_FILE_NOT_FOUND: ErrorCode = ErrorCode("E001");
    /// Artifact path is not readable
    pub const IO_PERMISSION_DENIED: ErrorCode = ErrorCode("E002");
    /// Any other read or write failure
    pub const IO_GENERIC: ErrorCode = ErrorCode("E009");

    /// Format error - the artifact is not the expected machine-readable report
    pub const FORMAT_WRONG_ARTIFACT: ErrorCode = ErrorCode("E010");
    /// Parse error - malformed XML or log content
    pub const PARSE_MALFORMED: ErrorCode = ErrorCode("E011");
    /// Parse error - generic
    pub const PARSE_GENERIC: ErrorCode = ErrorCode("E019");

    /// Config value out of range or of the wrong type
    pub const CONFIG_INVALID: ErrorCode = ErrorCode("E020");
    /// Config error - unreadable document
    pub const CONFIG_UNREADABLE: ErrorCode = ErrorCode("E021");
    /// Other configuration problems
    pub const CONFIG_GENERIC: ErrorCode = ErrorCode("E029");

    /// Rule error - malformed rule entry
    pub const RULE_MALFORMED: ErrorCode = ErrorCode("E030");
    /// Rule error - pack could not be resolved
    pub const RULE_PACK_MISSING: ErrorCode = ErrorCode("E031");

    /// History error - snapshot could not be decoded
    pub const HISTORY_CORRUPT: ErrorCode = ErrorCode("E040");
    /// History error - generic
    pub const HISTORY_GENERIC: ErrorCode = ErrorCode("E049");

    /// The code as printed, e.g. `E010`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Main error type for failtriage operations.
#[derive(Debug, Clone, Error)]
pub enum TriageError {
    /// File system errors.
    #[error("[{code}] I/O error: {message}")]
    Io {
        code: ErrorCode,
        message: String,
        path: Option<PathBuf>,
        cause: Option<Arc<std::io::Error>>,
    },

    /// The artifact has the wrong shape. Fatal for that one input only.
    #[error("[{code}] {message}")]
    Format {
        code: ErrorCode,
        /// Name of the artifact that was expected.
        expected: String,
        /// What was found instead.
        found: String,
        message: String,
        path: Option<PathBuf>,
    },

    /// Recognized artifact with malformed content.
    #[error("[{code}] Parse error: {message}")]
    Parse {
        code: ErrorCode,
        message: String,
        path: Option<PathBuf>,
        line: Option<usize>,
    },

    /// Configuration errors.
    #[error("[{code}] Configuration error: {message}")]
    Config {
        code: ErrorCode,
        message: String,
        field: Option<String>,
        path: Option<PathBuf>,
    },

    /// Rule pack errors.
    #[error("[{code}] Rule error: {message}")]
    Rule {
        code: ErrorCode,
        message: String,
        rule_id: Option<String>,
    },

    /// History store errors.
    #[error("[{code}] History error: {message}")]
    History {
        code: ErrorCode,
        message: String,
        path: Option<PathBuf>,
    },
}

/// Library result alias.
pub type Result<T> = std::result::Result<T, TriageError>;

impl TriageError {
    /// Wrap an I/O failure, picking the code from its kind.
    #[must_use]
    pub fn from_io_error(err: std::io::Error, path: Option<PathBuf>) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::IO_FILE_NOT_FOUND,
            std::io::ErrorKind::PermissionDenied => ErrorCode::IO_PERMISSION_DENIED,
            _ => ErrorCode::IO_GENERIC,
        };
        let message = match &path {
            Some(p) => format!("{}: {}", p.display(), err),
            None => err.to_string(),
        };
        Self::Io {
            code,
            message,
            path,
            cause: Some(Arc::new(err)),
        }
    }

    /// Create a format error naming the artifact the caller should supply instead.
    #[must_use]
    pub fn format(
        expected: impl Into<String>,
        found: impl Into<String>,
        path: Option<PathBuf>,
    ) -> Self {
        let expected = expected.into();
        let found = found.into();
        let location = path
            .as_ref()
            .map(|p| format!(" ({})", p.display()))
            .unwrap_or_default();
        let message = format!(
            "unsupported report format '{found}'{location}: expected the machine-readable {expected}"
        );
        Self::Format {
            code: ErrorCode::FORMAT_WRONG_ARTIFACT,
            expected,
            found,
            message,
            path,
        }
    }

    /// Create a parse error.
    #[must_use]
    pub fn parse(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::Parse {
            code: ErrorCode::PARSE_MALFORMED,
            message: message.into(),
            path,
            line: None,
        }
    }

    /// Generic configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCode::CONFIG_GENERIC,
            message: message.into(),
            field: None,
            path: None,
        }
    }

    /// Configuration error tied to one field.
    #[must_use]
    pub fn config_with_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCode::CONFIG_INVALID,
            message: message.into(),
            field: Some(field.into()),
            path: None,
        }
    }

    /// Create a configuration error for a document that could not be read or decoded.
    #[must_use]
    pub fn config_with_path(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::Config {
            code: ErrorCode::CONFIG_UNREADABLE,
            message: message.into(),
            field: None,
            path: Some(path.into()),
        }
    }

    /// Create an error for a malformed rule entry.
    #[must_use]
    pub fn rule(message: impl Into<String>, rule_id: Option<String>) -> Self {
        Self::Rule {
            code: ErrorCode::RULE_MALFORMED,
            message: message.into(),
            rule_id,
        }
    }

    /// Create an error for a rule pack that no source could provide.
    #[must_use]
    pub fn rule_pack_missing(framework: &str) -> Self {
        Self::Rule {
            code: ErrorCode::RULE_PACK_MISSING,
            message: format!("no rule pack available for framework '{framework}'"),
            rule_id: None,
        }
    }

    /// Create a history store error.
    #[must_use]
    pub fn history(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::History {
            code: ErrorCode::HISTORY_CORRUPT,
            message: message.into(),
            path,
        }
    }

    /// Get the error code.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Io { code, .. }
            | Self::Format { code, .. }
            | Self::Parse { code, .. }
            | Self::Config { code, .. }
            | Self::Rule { code, .. }
            | Self::History { code, .. } => *code,
        }
    }

    /// Short category label used in input error listings.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Io { .. } => "I/O",
            Self::Format { .. } => "Format",
            Self::Parse { .. } => "Parse",
            Self::Config { .. } => "Config",
            Self::Rule { .. } => "Rule",
            Self::History { .. } => "History",
        }
    }

    /// Message without the code prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Io { message, .. }
            | Self::Format { message, .. }
            | Self::Parse { message, .. }
            | Self::Config { message, .. }
            | Self::Rule { message, .. }
            | Self::History { message, .. } => message,
        }
    }

    /// Artifact or document path, when known.
    #[must_use]
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { path, .. }
            | Self::Format { path, .. }
            | Self::Parse { path, .. }
            | Self::Config { path, .. }
            | Self::History { path, .. } => path.as_ref(),
            Self::Rule { .. } => None,
        }
    }

    /// Whether this is a wrong-artifact format error.
    #[must_use]
    pub fn is_format_error(&self) -> bool {
        matches!(self, Self::Format { .. })
    }

    /// Whether rerunning with different inputs or config can fix this.
    ///
    /// User-fixable errors include wrong artifacts, malformed reports,
    /// configuration and rule mistakes. I/O failures are not.
    #[must_use]
    pub fn is_user_fixable(&self) -> bool {
        !matches!(self, Self::Io { .. })
    }
}

impl From<std::io::Error> for TriageError {
    fn from(err: std::io::Error) -> Self {
        Self::from_io_error(err, None)
    }
}

impl From<quick_xml::Error> for TriageError {
    fn from(err: quick_xml::Error) -> Self {
        Self::parse(err.to_string(), None)
    }
}
