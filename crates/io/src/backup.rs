// JSON backup files

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use hermes_core::Order;

use crate::FormatError;

/// Current backup format version.
pub const BACKUP_VERSION: u32 = 1;

/// Full-store snapshot as written to disk.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup<'a> {
    pub version: u32,
    /// ISO-8601 creation time
    pub timestamp: String,
    pub total_records: usize,
    pub data: &'a [Order],
}

impl<'a> Backup<'a> {
    pub fn new(orders: &'a [Order], timestamp: impl Into<String>) -> Self {
        Self {
            version: BACKUP_VERSION,
            timestamp: timestamp.into(),
            total_records: orders.len(),
            data: orders,
        }
    }

    pub fn to_json(&self) -> Result<String, FormatError> {
        serde_json::to_string_pretty(self).map_err(|e| FormatError::Backup(e.to_string()))
    }

    pub fn write(&self, path: &Path) -> Result<(), FormatError> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|e| FormatError::Io(e.to_string()))
    }
}

/// A backup as read back. Entries stay untyped so one bad entry does not
/// reject the whole file; the restore step decides what to do with them.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupFile {
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub total_records: Option<usize>,
    pub data: Vec<Value>,
}

/// Parse backup JSON. Fails when the text is not JSON or `data` is missing
/// or not an array.
pub fn parse_backup(text: &str) -> Result<BackupFile, FormatError> {
    let root: Value = serde_json::from_str(text)
        .map_err(|e| FormatError::Backup(format!("invalid JSON: {e}")))?;

    match root.get("data") {
        Some(Value::Array(_)) => {}
        Some(_) => return Err(FormatError::Backup("'data' must be an array".into())),
        None => return Err(FormatError::Backup("missing 'data' array".into())),
    }

    let backup: BackupFile = serde_json::from_value(root)
        .map_err(|e| FormatError::Backup(e.to_string()))?;

    if let Some(version) = backup.version {
        if version > BACKUP_VERSION {
            log::warn!("backup version {version} is newer than supported version {BACKUP_VERSION}");
        }
    }
    if let Some(expected) = backup.total_records {
        if expected != backup.data.len() {
            log::warn!(
                "backup declares {expected} records but contains {}",
                backup.data.len()
            );
        }
    }

    Ok(backup)
}

pub fn read_backup(path: &Path) -> Result<BackupFile, FormatError> {
    let text = std::fs::read_to_string(path).map_err(|e| FormatError::Io(e.to_string()))?;
    parse_backup(&text)
}

/// Default backup file name: `orders_backup_<timestamp>.json` with `:` made file-safe.
pub fn backup_file_name(timestamp: &str) -> String {
    format!("orders_backup_{}.json", timestamp.replace(':', "-"))
}
