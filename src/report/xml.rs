//! Small helpers over quick-xml shared by the report dialects.

use crate::error::TriageError;
use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::events::{BytesCData, BytesStart, BytesText};
use std::path::Path;

/// Attribute value by name, unescaped. Absent or undecodable ⇒ `None`.
pub(super) fn attr(element: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| match a.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&a.value).into_owned(),
        })
}

pub(super) fn text(event: &BytesText<'_>) -> String {
    match event.unescape() {
        Ok(value) => value.into_owned(),
        Err(_) => String::from_utf8_lossy(event).into_owned(),
    }
}

pub(super) fn cdata(event: &BytesCData<'_>) -> String {
    String::from_utf8_lossy(event).into_owned()
}

pub(super) fn malformed(err: quick_xml::Error, path: Option<&Path>) -> TriageError {
    TriageError::parse(
        format!("malformed report XML: {err}"),
        path.map(Path::to_path_buf),
    )
}

/// Parse the timestamp forms test frameworks emit. TestNG writes a trailing
/// zone name (`2024-03-01T10:15:30 UTC`, `... IST`) that chrono cannot map,
/// so anything past the seconds field is treated as UTC.
pub(super) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let head: String = raw.chars().take(19).collect();
    NaiveDateTime::parse_from_str(&head, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(&head, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Derive a message from the first stack line when the report omitted one:
/// `pkg.Exception: text` yields `text`.
pub(super) fn message_from_stack(stack: &str) -> String {
    stack
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(|first| {
            first
                .split_once(": ")
                .map(|(_, msg)| msg.to_string())
                .unwrap_or_default()
        })
        .unwrap_or_default()
}
