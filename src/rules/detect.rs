//! Framework detection from report and log text.

use super::builtin::GENERIC;

/// Fingerprints checked in order; the first framework with a hit wins.
const FINGERPRINTS: &[(&str, &[&str])] = &[
    ("selenium", &["org.openqa.selenium", "selenium.common.exceptions", "webdriverexception"]),
    ("playwright", &["playwright", "@playwright/test"]),
    ("cypress", &["cypress", "cy.get(", "cy.visit("]),
    ("restassured", &["io.restassured"]),
    ("robot", &["robot.", "robotframework"]),
    ("pytest", &["_pytest", "pytest"]),
];

/// The framework whose fingerprint appears first in priority order, else `generic`.
pub fn detect_framework<'a, I>(texts: I) -> &'static str
where
    I: IntoIterator<Item = &'a str>,
{
    let lowered: Vec<String> = texts.into_iter().map(str::to_lowercase).collect();
    FINGERPRINTS
        .iter()
        .find(|(_, prints)| {
            prints
                .iter()
                .any(|p| lowered.iter().any(|text| text.contains(p)))
        })
        .map(|(name, _)| *name)
        .unwrap_or(GENERIC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_selenium_from_exception_class() {
        let texts = ["org.openqa.selenium.TimeoutException", "whatever"];
        assert_eq!(detect_framework(texts), "selenium");
    }

    #[test]
    fn test_detects_pytest_from_traceback() {
        let texts = ["File \"/usr/lib/python3/site-packages/_pytest/runner.py\", line 3"];
        assert_eq!(detect_framework(texts), "pytest");
    }

    #[test]
    fn test_selenium_wins_over_later_fingerprints() {
        let texts = ["io.restassured.RestAssured", "org.openqa.selenium.WebDriver"];
        assert_eq!(detect_framework(texts), "selenium");
    }

    #[test]
    fn test_falls_back_to_generic() {
        assert_eq!(detect_framework(["java.lang.AssertionError"]), GENERIC);
        assert_eq!(detect_framework(Vec::<&str>::new()), GENERIC);
    }
}
