//! Annotation rendering.
//!
//! Every platform receives the same [`AnnotationBlock::body`]; only the
//! envelope around it differs.

use super::decision::CiDecision;
use crate::core::{CodeReference, FailureType, Nature};
use serde::{Deserialize, Serialize};

/// Upper bound for the error excerpt, in characters.
pub const MAX_EXCERPT_CHARS: usize = 500;
const ELLIPSIS: &str = "...";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Github,
    Gitlab,
    Azure,
    Markdown,
    #[default]
    Plain,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::Github,
        Platform::Gitlab,
        Platform::Azure,
        Platform::Markdown,
        Platform::Plain,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "github" | "github-actions" | "gha" => Some(Platform::Github),
            "gitlab" | "gitlab-ci" => Some(Platform::Gitlab),
            "azure" | "azure-devops" | "ado" => Some(Platform::Azure),
            "markdown" | "md" | "pr-comment" => Some(Platform::Markdown),
            "plain" | "text" => Some(Platform::Plain),
            _ => None,
        }
    }

    /// Guess the platform from well-known CI environment variables.
    pub fn detect_from_env() -> Option<Self> {
        let set = |name: &str| std::env::var_os(name).is_some();
        if set("GITHUB_ACTIONS") {
            Some(Platform::Github)
        } else if set("GITLAB_CI") {
            Some(Platform::Gitlab)
        } else if set("TF_BUILD") {
            Some(Platform::Azure)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Platform::Github => "github",
            Platform::Gitlab => "gitlab",
            Platform::Azure => "azure",
            Platform::Markdown => "markdown",
            Platform::Plain => "plain",
        };
        f.write_str(name)
    }
}

/// Fixed-structure annotation content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnnotationBlock {
    pub title: String,
    pub failure_type: FailureType,
    pub confidence_percent: u32,
    pub nature: Nature,
    pub summary: String,
    pub location: Option<CodeReference>,
    pub excerpt: Option<String>,
    pub recommendation: String,
    pub decision: CiDecision,
    pub signature: String,
}

impl AnnotationBlock {
    /// The platform-independent content.
    pub fn body(&self) -> String {
        let mut lines = vec![
            self.title.clone(),
            format!(
                "Type: {} ({})",
                self.failure_type.title(),
                self.failure_type.as_str()
            ),
            format!("Confidence: {}%", self.confidence_percent),
            format!("Nature: {}", self.nature),
            format!("Summary: {}", self.summary),
        ];
        if let Some(location) = &self.location {
            lines.push(format!("Location: {location}"));
        }
        if let Some(excerpt) = &self.excerpt {
            lines.push("Error excerpt:".to_string());
            lines.extend(excerpt.lines().map(|l| format!("    {l}")));
        }
        lines.push(format!("Recommendation: {}", self.recommendation));
        lines.join("\n")
    }

    fn severity(&self) -> &'static str {
        match self.decision {
            CiDecision::Fail => "error",
            _ => "warning",
        }
    }

    /// Wrap the body in the platform envelope. `generated_at` is the unix
    /// timestamp GitLab section markers require.
    pub fn render(&self, platform: Platform, generated_at: i64) -> String {
        let body = self.body();
        match platform {
            Platform::Plain => body,
            Platform::Github => {
                let mut properties = vec![format!("title={}", escape_github_property(&self.title))];
                if let Some(location) = &self.location {
                    properties.push(format!("file={}", escape_github_property(&location.file)));
                    properties.push(format!("line={}", location.line));
                }
                format!(
                    "::{} {}::{}",
                    self.severity(),
                    properties.join(","),
                    escape_github_data(&body)
                )
            }
            Platform::Gitlab => {
                let section = format!("failtriage_{}", self.signature);
                format!(
                    "\x1b[0Ksection_start:{generated_at}:{section}[collapsed=true]\r\x1b[0K{}\n{body}\n\x1b[0Ksection_end:{generated_at}:{section}\r\x1b[0K",
                    self.title
                )
            }
            Platform::Azure => {
                let mut properties = vec![format!("type={}", self.severity())];
                if let Some(location) = &self.location {
                    properties.push(format!("sourcepath={}", location.file));
                    properties.push(format!("linenumber={}", location.line));
                }
                format!(
                    "##vso[task.logissue {}]{}\n{body}",
                    properties.join(";"),
                    self.title
                )
            }
            Platform::Markdown => format!(
                "<!-- failtriage:{} -->\n<details>\n<summary>{}</summary>\n\n```text\n{body}\n```\n\n</details>",
                self.signature, self.title
            ),
        }
    }
}

fn escape_github_data(text: &str) -> String {
    text.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn escape_github_property(text: &str) -> String {
    escape_github_data(text)
        .replace(':', "%3A")
        .replace(',', "%2C")
}

/// Cut an error text to at most `max_chars` characters, marking the cut.
pub fn truncate_excerpt(text: &str, max_chars: usize) -> Option<String> {
    let max_chars = max_chars.min(MAX_EXCERPT_CHARS);
    let trimmed = text.trim();
    if trimmed.is_empty() || max_chars == 0 {
        return None;
    }
    if trimmed.chars().count() <= max_chars {
        return Some(trimmed.to_string());
    }
    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let mut cut: String = trimmed.chars().take(keep).collect();
    cut.push_str(ELLIPSIS);
    Some(cut)
}

/// Next step for a reader, by type, nature and decision.
pub fn recommendation(failure_type: FailureType, nature: Nature, decision: CiDecision) -> String {
    let advice = match (nature, failure_type) {
        (Nature::Flaky, _) => {
            "Intermittent failure: stabilise or quarantine the test instead of blocking the merge."
        }
        (Nature::Deterministic, FailureType::ProductDefect) => {
            "Reproducible product defect: investigate recent application changes touching this behaviour."
        }
        (_, FailureType::ProductDefect) => {
            "Likely product defect: reproduce locally and check recent application changes."
        }
        (_, FailureType::AutomationDefect) => {
            "Fix the test code: review locators, waits and test data used by this test."
        }
        (_, FailureType::EnvironmentIssue) => {
            "Check the test environment (grid, network, dependent services) and re-run once healthy."
        }
        (_, FailureType::ConfigurationIssue) => {
            "Fix the run configuration (drivers, credentials, environment variables) before re-running."
        }
        (_, FailureType::Unknown) => {
            "Not enough evidence to classify: inspect the logs and stack trace manually."
        }
    };
    match decision {
        CiDecision::Fail => format!("Blocking. {advice}"),
        _ => advice.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block() -> AnnotationBlock {
        AnnotationBlock {
            title: "com.acme.LoginTest.testLogin: Product defect".to_string(),
            failure_type: FailureType::ProductDefect,
            confidence_percent: 91,
            nature: Nature::Deterministic,
            summary: "expected [Welcome] but found [Error]".to_string(),
            location: Some(CodeReference {
                file: "LoginTest.java".to_string(),
                line: 17,
                symbol: "com.acme.LoginTest.testLogin".to_string(),
            }),
            excerpt: Some("java.lang.AssertionError: expected [Welcome]\nbut found [Error]".to_string()),
            recommendation: recommendation(
                FailureType::ProductDefect,
                Nature::Deterministic,
                CiDecision::Fail,
            ),
            decision: CiDecision::Fail,
            signature: "0123456789abcdef".to_string(),
        }
    }

    #[test]
    fn test_body_has_fixed_structure() {
        let body = block().body();
        let labels: Vec<&str> = body
            .lines()
            .filter_map(|l| l.split_once(':').map(|(label, _)| label))
            .filter(|l| !l.starts_with(' '))
            .collect();
        assert_eq!(
            labels,
            vec![
                "com.acme.LoginTest.testLogin",
                "Type",
                "Confidence",
                "Nature",
                "Summary",
                "Location",
                "Error excerpt",
                "Recommendation"
            ]
        );
        assert!(body.contains("Confidence: 91%"));
    }

    #[test]
    fn test_every_platform_carries_the_same_content() {
        let block = block();
        let body = block.body();
        for platform in Platform::ALL {
            let rendered = block.render(platform, 1_700_000_000);
            let unescaped = rendered
                .replace("%0A", "\n")
                .replace("%0D", "\r")
                .replace("%25", "%");
            assert!(
                unescaped.contains(&body),
                "{platform} envelope altered the content"
            );
        }
    }

    #[test]
    fn test_envelopes() {
        let block = block();
        let github = block.render(Platform::Github, 0);
        assert!(github.starts_with("::error title=com.acme.LoginTest.testLogin%3A Product defect,file=LoginTest.java,line=17::"));
        assert!(!github.contains('\n'));

        let azure = block.render(Platform::Azure, 0);
        assert!(azure.starts_with("##vso[task.logissue type=error;sourcepath=LoginTest.java;linenumber=17]"));

        let gitlab = block.render(Platform::Gitlab, 42);
        assert!(gitlab.contains("section_start:42:failtriage_0123456789abcdef[collapsed=true]"));
        assert!(gitlab.contains("section_end:42:failtriage_0123456789abcdef"));

        let markdown = block.render(Platform::Markdown, 0);
        assert!(markdown.starts_with("<!-- failtriage:0123456789abcdef -->"));

        let warn = AnnotationBlock {
            decision: CiDecision::Warn,
            ..block
        };
        assert!(warn.render(Platform::Github, 0).starts_with("::warning "));
    }

    #[test]
    fn test_excerpt_truncation() {
        assert_eq!(truncate_excerpt("  short  ", 500).as_deref(), Some("short"));
        assert!(truncate_excerpt("   ", 500).is_none());
        let long = "é".repeat(800);
        let cut = truncate_excerpt(&long, 10_000).unwrap();
        assert_eq!(cut.chars().count(), MAX_EXCERPT_CHARS);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate_excerpt(&long, 50).unwrap().chars().count(), 50);
    }

    #[test]
    fn test_platform_parse() {
        assert_eq!(Platform::parse("GitHub"), Some(Platform::Github));
        assert_eq!(Platform::parse("ado"), Some(Platform::Azure));
        assert_eq!(Platform::parse("jenkins"), None);
    }
}
