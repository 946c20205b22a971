//! In-process scan history.
//!
//! Records are prepended, so `list()` on an untouched store is newest
//! first. Records are never edited, only removed. The JSON snapshot is an
//! optional extra for callers that want history to outlive the process.

use crate::error::HistoryError;
use crate::interpret::{format_percentage, Interpretation};
use crate::location::LocationSample;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;

/// One capture-and-predict cycle, as shown in the history screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    pub id: String,
    /// ISO-8601, UTC.
    pub timestamp: String,
    pub image_uri: String,
    pub disease: String,
    /// Percentage without the sign, e.g. "85.00".
    pub confidence: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationSample>,
}

impl ScanRecord {
    /// Build a record for a successful prediction, stamped now.
    pub fn new(
        image_uri: impl Into<String>,
        interpretation: &Interpretation,
        location: Option<LocationSample>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            image_uri: image_uri.into(),
            disease: interpretation.result.predicted_class.clone(),
            confidence: format_percentage(interpretation.result.confidence),
            location,
        }
    }

    fn parsed_timestamp(&self) -> Option<chrono::DateTime<chrono::FixedOffset>> {
        chrono::DateTime::parse_from_rfc3339(&self.timestamp).ok()
    }
}

/// Ordered, session-scoped collection of scan records.
///
/// Passed explicitly (usually behind an `Arc`) to whatever needs it.
#[derive(Debug, Default)]
pub struct ScanHistoryStore {
    records: Mutex<Vec<ScanRecord>>,
}

impl ScanHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<ScanRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    /// Prepend a record.
    pub fn add(&self, record: ScanRecord) {
        log::info!("[HISTORY] Added scan {} ({})", record.id, record.disease);
        self.lock().insert(0, record);
    }

    /// Remove the record with `id`. Unknown ids are ignored.
    pub fn delete(&self, id: &str) -> bool {
        let mut records = self.lock();
        match records.iter().position(|r| r.id == id) {
            Some(index) => {
                records.remove(index);
                log::info!("[HISTORY] Deleted scan {}", id);
                true
            }
            None => false,
        }
    }

    pub fn clear(&self) {
        let mut records = self.lock();
        log::info!("[HISTORY] Cleared {} scans", records.len());
        records.clear();
    }

    /// Records in store order (insertion, newest first).
    pub fn list(&self) -> Vec<ScanRecord> {
        self.lock().clone()
    }

    /// Records sorted by timestamp, newest first. Unparseable timestamps sort last.
    pub fn list_by_recency(&self) -> Vec<ScanRecord> {
        let mut records = self.list();
        records.sort_by(|a, b| b.parsed_timestamp().cmp(&a.parsed_timestamp()));
        records
    }

    pub fn get(&self, id: &str) -> Option<ScanRecord> {
        self.lock().iter().find(|r| r.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Load a snapshot. A missing file is an empty store.
    pub fn load_json(path: &Path) -> Result<Self, HistoryError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(source) => {
                return Err(HistoryError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        let records: Vec<ScanRecord> =
            serde_json::from_str(&raw).map_err(|source| HistoryError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        log::info!("[HISTORY] Loaded {} scans from {}", records.len(), path.display());
        Ok(Self::with_records(records))
    }

    /// Write a snapshot, creating parent directories.
    pub fn save_json(&self, path: &Path) -> Result<(), HistoryError> {
        let io_err = |source| HistoryError::Io {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(&self.list()).map_err(|source| {
            HistoryError::Serialize {
                path: path.display().to_string(),
                source,
            }
        })?;
        std::fs::write(path, json).map_err(io_err)
    }

    // A poisoned lock only means another thread panicked mid-push; the Vec is still valid.
    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ScanRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}
