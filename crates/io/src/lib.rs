// File I/O operations

use std::fmt;

pub mod backup;
pub mod csv;
pub mod native;

pub use native::SqliteStore;

/// Failure reading or writing an order file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// CSV text that can't be turned into rows at all.
    Csv(String),
    /// Backup JSON with the wrong shape.
    Backup(String),
    Io(String),
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv(msg) => write!(f, "CSV format error: {msg}"),
            Self::Backup(msg) => write!(f, "backup format error: {msg}"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for FormatError {}
