// Application settings
// Loaded from ~/.config/hermes/settings.json (or $HERMES_CONFIG)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use hermes_core::LookupField;

/// Overrides the settings file location.
pub const CONFIG_ENV: &str = "HERMES_CONFIG";

/// Column titles used when exporting CSV
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderLanguage {
    #[default]
    Russian,
    English,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Storage
    #[serde(rename = "database.path")]
    pub database_path: Option<String>,  // None = <data dir>/hermes/orders.db

    // Import
    #[serde(rename = "import.overwrite")]
    pub import_overwrite: bool,

    #[serde(rename = "import.lookupField")]
    pub import_lookup: LookupField,

    // Export
    #[serde(rename = "export.includeDeleted")]
    pub export_include_deleted: bool,

    #[serde(rename = "export.headers")]
    pub export_headers: HeaderLanguage,

    // Backup
    #[serde(rename = "backup.dir")]
    pub backup_dir: Option<String>,  // None = current directory
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: None,
            import_overwrite: false,
            import_lookup: LookupField::OrderNumber,
            export_include_deleted: false,
            export_headers: HeaderLanguage::Russian,
            backup_dir: None,
        }
    }
}

const DEFAULT_FILE: &str = r#"{
    // Storage
    // null = <data dir>/hermes/orders.db; --db and HERMES_DB take precedence
    "database.path": null,

    // Import: replace matched orders instead of skipping them
    "import.overwrite": false,
    // Key used to find an existing order: "orderNumber" or "bottomNumber"
    "import.lookupField": "orderNumber",

    // Export
    "export.includeDeleted": false,
    // Column titles: "russian" or "english"
    "export.headers": "russian",

    // Backup output directory (null = current directory)
    "backup.dir": null
}
"#;

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return PathBuf::from(path);
        }
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hermes");
        config_dir.join("settings.json")
    }

    /// Database used when neither the settings file nor the command line name one.
    pub fn default_database_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hermes")
            .join("orders.db")
    }

    /// Configured database path, or the default.
    pub fn database_path(&self) -> PathBuf {
        match self.database_path.as_deref() {
            Some(p) if !p.trim().is_empty() => PathBuf::from(p),
            _ => Self::default_database_path(),
        }
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load from an explicit path. A missing file is created with defaults;
    /// an unreadable one is logged and ignored.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            let settings = Self::default();
            Self::create_default_file(path);
            return settings;
        }

        match fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("Error parsing {}: {e}; using default settings", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Error reading {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Parse settings JSON, ignoring `//` comment lines
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::from_str(&cleaned)
    }

    /// Write settings as plain JSON (comments are not preserved).
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| e.to_string())?;

        fs::write(path, json).map_err(|e| e.to_string())
    }

    /// Create default settings file with comments
    fn create_default_file(path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("Error creating config directory: {e}");
                return;
            }
        }

        if let Err(e) = fs::write(path, DEFAULT_FILE) {
            log::warn!("Error writing default settings.json: {e}");
        }
    }
}
