//! Resolve the source location a failure points at from its stack trace.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A file/line/symbol triple pointing into test or product code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeReference {
    pub file: String,
    pub line: u32,
    pub symbol: String,
}

impl std::fmt::Display for CodeReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} ({})", self.file, self.line, self.symbol)
    }
}

static JAVA_FRAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*at\s+([\w$.]+)\.([\w$<>]+)\(([^:()]+):(\d+)\)").expect("valid regex")
});

static PYTHON_FRAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*File "([^"]+)", line (\d+), in (\S+)"#).expect("valid regex")
});

static JS_FRAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*at (?:([^\s(]+) )?\(?([^()\s]+\.(?:js|mjs|cjs|jsx|ts|tsx)):(\d+):\d+\)?")
        .expect("valid regex")
});

const LIBRARY_PREFIXES: &[&str] = &[
    "java.",
    "javax.",
    "jdk.",
    "sun.",
    "com.sun.",
    "kotlin.",
    "org.testng.",
    "org.junit.",
    "junit.",
    "org.openqa.selenium.",
    "io.restassured.",
    "com.microsoft.playwright.",
    "org.apache.",
    "org.hamcrest.",
    "org.assertj.",
    "net.serenitybdd.",
    "io.cucumber.",
];

const LIBRARY_PATH_MARKERS: &[&str] = &[
    "site-packages",
    "/lib/python",
    "node_modules",
    "node:internal",
    "<frozen",
];

fn is_library_class(class: &str) -> bool {
    LIBRARY_PREFIXES.iter().any(|p| class.starts_with(p))
}

fn is_library_path(path: &str) -> bool {
    LIBRARY_PATH_MARKERS.iter().any(|m| path.contains(m))
}

fn parse_frame(line: &str) -> Option<(CodeReference, bool)> {
    if let Some(caps) = JAVA_FRAME.captures(line) {
        let class = &caps[1];
        let line_no = caps[4].parse().ok()?;
        return Some((
            CodeReference {
                file: caps[3].to_string(),
                line: line_no,
                symbol: format!("{}.{}", class, &caps[2]),
            },
            is_library_class(class),
        ));
    }
    if let Some(caps) = PYTHON_FRAME.captures(line) {
        let path = &caps[1];
        return Some((
            CodeReference {
                file: path.to_string(),
                line: caps[2].parse().ok()?,
                symbol: caps[3].to_string(),
            },
            is_library_path(path),
        ));
    }
    if let Some(caps) = JS_FRAME.captures(line) {
        let path = &caps[2];
        return Some((
            CodeReference {
                file: path.to_string(),
                line: caps[3].parse().ok()?,
                symbol: caps
                    .get(1)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_else(|| "<anonymous>".to_string()),
            },
            is_library_path(path),
        ));
    }
    None
}

/// Find the most relevant frame in a stack trace.
///
/// A frame whose symbol starts with `preferred_class` wins; otherwise the
/// first frame outside well-known framework and library code. Python traces
/// list the innermost frame last, so for them the last user frame is taken.
pub fn resolve_code_reference(
    stack_trace: &str,
    preferred_class: Option<&str>,
) -> Option<CodeReference> {
    let frames: Vec<(CodeReference, bool)> = stack_trace.lines().filter_map(parse_frame).collect();

    if let Some(class) = preferred_class.filter(|c| !c.is_empty()) {
        let prefix = format!("{class}.");
        if let Some((frame, _)) = frames.iter().find(|(f, _)| f.symbol.starts_with(&prefix)) {
            return Some(frame.clone());
        }
    }

    let python_trace = stack_trace.contains("Traceback (most recent call last)");
    let mut user_frames = frames.into_iter().filter(|(_, library)| !library);
    if python_trace {
        user_frames.last().map(|(f, _)| f)
    } else {
        user_frames.next().map(|(f, _)| f)
    }
}
