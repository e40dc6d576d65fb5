use super::{FailureHistory, FailureSignature, HistoryTable};
use crate::core::FailureType;
use crate::error::{Result, TriageError};
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::path::Path;

/// Injectable cross-run failure history. Updates to one signature are atomic
/// and applied in call order.
pub trait HistoryStore: Send + Sync {
    fn record_failure(
        &self,
        test_name: &str,
        failure_type: FailureType,
        error_message: &str,
        now: DateTime<Utc>,
    ) -> FailureHistory;

    /// Returns the number of signatures touched.
    fn record_pass(&self, test_name: &str) -> usize;

    fn get(&self, signature: &FailureSignature) -> Option<FailureHistory>;

    fn snapshot(&self) -> HistoryTable;

    fn cleanup(&self, retention: Duration, now: DateTime<Utc>) -> usize;
}

/// One table behind one lock.
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    table: RwLock<HistoryTable>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::from_table(HistoryTable::new())
    }

    pub fn from_table(table: HistoryTable) -> Self {
        Self {
            table: RwLock::new(table),
        }
    }

    /// Load a snapshot. A missing file is an empty history; an unreadable or
    /// malformed one is reported and treated as empty.
    pub fn load(path: &Path) -> Self {
        match load_snapshot(path) {
            Ok(table) => Self::from_table(table),
            Err(e) => {
                log::warn!("Starting with empty failure history: {}", e);
                Self::new()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_snapshot(&self.table.read(), path)
    }

    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }
}

impl HistoryStore for InMemoryHistoryStore {
    fn record_failure(
        &self,
        test_name: &str,
        failure_type: FailureType,
        error_message: &str,
        now: DateTime<Utc>,
    ) -> FailureHistory {
        self.table
            .write()
            .record_failure(test_name, failure_type, error_message, now)
            .clone()
    }

    fn record_pass(&self, test_name: &str) -> usize {
        self.table.write().record_pass(test_name)
    }

    fn get(&self, signature: &FailureSignature) -> Option<FailureHistory> {
        self.table.read().get(signature).cloned()
    }

    fn snapshot(&self) -> HistoryTable {
        self.table.read().clone()
    }

    fn cleanup(&self, retention: Duration, now: DateTime<Utc>) -> usize {
        let evicted = self.table.write().cleanup(retention, now);
        log::info!("Evicted {} stale failure signature(s)", evicted);
        evicted
    }
}

/// Read a JSON snapshot. A missing file yields an empty table.
pub fn load_snapshot(path: &Path) -> Result<HistoryTable> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("No failure history at {}", path.display());
            return Ok(HistoryTable::new());
        }
        Err(e) => return Err(TriageError::from_io_error(e, Some(path.to_path_buf()))),
    };
    let table: HistoryTable = serde_json::from_str(&content).map_err(|e| {
        TriageError::history(
            format!("malformed history snapshot: {e}"),
            Some(path.to_path_buf()),
        )
    })?;
    if table.version != super::SNAPSHOT_VERSION {
        return Err(TriageError::history(
            format!(
                "unsupported history snapshot version {} (expected {})",
                table.version,
                super::SNAPSHOT_VERSION
            ),
            Some(path.to_path_buf()),
        ));
    }
    log::debug!(
        "Loaded {} failure signature(s) from {}",
        table.len(),
        path.display()
    );
    Ok(table)
}

/// Write a JSON snapshot, creating parent directories. The file is replaced
/// through a rename so readers never see a partial snapshot.
pub fn save_snapshot(table: &HistoryTable, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| TriageError::from_io_error(e, Some(parent.to_path_buf())))?;
    }
    let json = serde_json::to_string_pretty(table).map_err(|e| {
        TriageError::history(
            format!("cannot serialize history: {e}"),
            Some(path.to_path_buf()),
        )
    })?;
    let staging = path.with_extension("json.tmp");
    std::fs::write(&staging, json)
        .map_err(|e| TriageError::from_io_error(e, Some(staging.clone())))?;
    std::fs::rename(&staging, path)
        .map_err(|e| TriageError::from_io_error(e, Some(path.to_path_buf())))?;
    Ok(())
}
