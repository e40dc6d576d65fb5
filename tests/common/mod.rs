// Test utility module for failtriage integration tests
#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use std::path::{Path, PathBuf};

pub use failtriage::testkit::fixtures;

/// A fixed instant plus `days`, so history tests are reproducible.
pub fn day(days: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_709_287_200, 0).unwrap() + Duration::days(days)
}

/// Write `content` to `dir/name` and return the path.
pub fn write_fixture(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}
