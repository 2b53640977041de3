// Hermes CLI - headless order tracking
// Every command opens the order database, does one thing, and exits.

mod exit_codes;
mod records;
mod transfer;
mod util;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hermes_config::Settings;
use hermes_core::{LookupField, OrderStatus, SaveError, StoreError};
use hermes_io::{FormatError, SqliteStore};

use exit_codes::{
    format_exit_code, save_exit_code, store_exit_code, EXIT_ERROR, EXIT_IO, EXIT_NOT_FOUND,
    EXIT_STORE, EXIT_SUCCESS, EXIT_USAGE, EXIT_VALIDATION,
};

#[derive(Parser)]
#[command(name = "hermes")]
#[command(about = "Manufacturing order tracking (CLI mode, headless)")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Order database file [default: from settings, then <data dir>/hermes/orders.db]
    #[arg(long, global = true, env = "HERMES_DB")]
    db: Option<PathBuf>,

    /// Log to stderr (-v info, -vv debug). RUST_LOG overrides.
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an order
    #[command(after_help = "\
Examples:
  hermes add -n 2024-117 --date 2024-05-02 --material 09G2S --diameter 1200
  hermes add -n 2024-118 --date 2024-05-02 -e welder=Ivanov@2024-05-03 -e cutter=Sidorov")]
    Add {
        #[command(flatten)]
        fields: OrderArgs,

        /// Print the saved order as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change fields of an existing order (unset flags keep their value)
    #[command(after_help = "\
Examples:
  hermes edit 4f9c0e1a-... --material 12X18H10T
  hermes edit 4f9c0e1a-... -e calibration=Orlov@2024-05-10
  hermes edit 4f9c0e1a-... --status active")]
    Edit {
        /// Order id
        id: String,

        #[command(flatten)]
        fields: OrderArgs,

        /// Mark the order active or deleted
        #[arg(long)]
        status: Option<StatusArg>,

        #[arg(long)]
        json: bool,
    },

    /// Print one order
    Show {
        /// Order id
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// List orders, newest first
    #[command(after_help = "\
Examples:
  hermes list
  hermes list --sort orderNumber --asc --limit 20
  hermes list --active --page 2 --json")]
    List {
        /// Field to sort by (camelCase name, e.g. orderNumber, date, createdAt)
        #[arg(long, default_value = "createdAt")]
        sort: String,

        /// Sort ascending instead of descending
        #[arg(long)]
        asc: bool,

        /// Hide soft-deleted orders
        #[arg(long)]
        active: bool,

        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Orders per page
        #[arg(long, default_value_t = 50)]
        limit: usize,

        #[arg(long)]
        json: bool,
    },

    /// Find orders by order number, bottom number or material
    #[command(after_help = "\
Examples:
  hermes search 2024-1
  hermes search 09g2s --json")]
    Search {
        /// Case-insensitive substring, at least 2 characters
        term: String,

        /// Maximum number of results
        #[arg(long, default_value_t = 20)]
        limit: usize,

        #[arg(long)]
        json: bool,
    },

    /// Delete orders (permanently unless --soft)
    Delete {
        /// Order ids
        #[arg(required = true)]
        ids: Vec<String>,

        /// Mark as deleted instead of removing
        #[arg(long)]
        soft: bool,
    },

    /// Remove every order from the database
    Clear {
        /// Confirm; nothing is removed without it
        #[arg(long)]
        yes: bool,
    },

    /// Import orders from a CSV file
    #[command(after_help = "\
Rows are matched against existing orders by order number (or bottom
number with --by bottom-number). Matches are skipped unless --overwrite
is given (or import.overwrite is set in settings; --no-overwrite turns it
off for one run). Rows that fail are reported and counted; the rest are saved.

Exit code 8 means the import finished but some rows failed.

Examples:
  hermes import orders.csv
  hermes import orders.csv --overwrite
  hermes import orders.csv --by bottom-number --json")]
    Import {
        /// CSV file (UTF-8 or Windows-1252)
        file: PathBuf,

        /// Replace matched orders instead of skipping them
        #[arg(long, overrides_with = "no_overwrite")]
        overwrite: bool,

        /// Skip matched orders even if settings enable overwrite
        #[arg(long, overrides_with = "overwrite")]
        no_overwrite: bool,

        /// Key used to find an existing order [default: from settings]
        #[arg(long)]
        by: Option<LookupArg>,

        /// Print the full import report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export orders to CSV
    #[command(after_help = "\
Examples:
  hermes export orders.csv
  hermes export exports/                  (writes exports/orders_export_<date>.csv)
  hermes export - --from 2024-01-01 --to 2024-03-31 --material steel
  hermes export all.csv --include-deleted --headers english")]
    Export {
        /// Output file or directory, or - for stdout
        out: String,

        /// Earliest order date (inclusive, YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Latest order date (inclusive, YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Material substring (case-insensitive)
        #[arg(long)]
        material: Option<String>,

        /// Include soft-deleted orders
        #[arg(long)]
        include_deleted: bool,

        /// Column title language [default: from settings]
        #[arg(long)]
        headers: Option<HeadersArg>,
    },

    /// Write a JSON backup of every order
    Backup {
        /// Output file or directory [default: backup.dir setting, then current directory]
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Replace every order with the contents of a backup
    #[command(after_help = "\
The database is cleared and refilled in one transaction: if the write
fails, the previous contents stay. Entries that cannot be read are
reported and skipped (exit code 8).")]
    Restore {
        /// Backup JSON file
        file: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Counts, materials and date range
    Stats {
        #[arg(long)]
        json: bool,
    },
}

/// Order fields settable from the command line.
#[derive(Args, Debug, Default)]
pub struct OrderArgs {
    /// Order number (letters, digits and hyphens)
    #[arg(long = "number", short = 'n')]
    pub order_number: Option<String>,

    /// Order date
    #[arg(long)]
    pub date: Option<String>,

    #[arg(long)]
    pub diameter: Option<String>,

    #[arg(long)]
    pub thickness: Option<String>,

    #[arg(long)]
    pub type_size: Option<String>,

    #[arg(long)]
    pub cutting: Option<String>,

    /// Bottom number
    #[arg(long = "bottom")]
    pub bottom_number: Option<String>,

    #[arg(long)]
    pub material: Option<String>,

    /// Heat treatment mode
    #[arg(long)]
    pub heat_treatment: Option<String>,

    #[arg(long)]
    pub treatment_date: Option<String>,

    /// Executor as ROLE=NAME[@DATE]; roles: welder, stamping, flanging,
    /// calibration, plug-welder, cutter (repeatable)
    #[arg(long = "executor", short = 'e', value_name = "ROLE=NAME[@DATE]")]
    pub executors: Vec<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum StatusArg {
    Active,
    Deleted,
}

impl From<StatusArg> for OrderStatus {
    fn from(s: StatusArg) -> Self {
        match s {
            StatusArg::Active => OrderStatus::Active,
            StatusArg::Deleted => OrderStatus::Deleted,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LookupArg {
    OrderNumber,
    BottomNumber,
}

impl From<LookupArg> for LookupField {
    fn from(l: LookupArg) -> Self {
        match l {
            LookupArg::OrderNumber => LookupField::OrderNumber,
            LookupArg::BottomNumber => LookupField::BottomNumber,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum HeadersArg {
    Russian,
    English,
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
            "\nbackup format: 1",
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
            "\nbackup format: 1",
        )
    }
}

/// Logs go to stderr so stdout stays clean for --json and `export -`.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A second init (tests) fails harmlessly.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = Settings::load();
    let result = run(cli, &settings);

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn run(cli: Cli, settings: &Settings) -> Result<(), CliError> {
    let db_path = cli.db.unwrap_or_else(|| settings.database_path());
    let mut store = open_store(&db_path)?;

    match cli.command {
        Commands::Add { fields, json } => records::cmd_add(&mut store, fields, json),
        Commands::Edit { id, fields, status, json } => {
            records::cmd_edit(&mut store, &id, fields, status.map(Into::into), json)
        }
        Commands::Show { id, json } => records::cmd_show(&store, &id, json),
        Commands::List { sort, asc, active, page, limit, json } => {
            records::cmd_list(&store, &sort, asc, active, page, limit, json)
        }
        Commands::Search { term, limit, json } => records::cmd_search(&store, &term, limit, json),
        Commands::Delete { ids, soft } => records::cmd_delete(&mut store, &ids, soft),
        Commands::Clear { yes } => records::cmd_clear(&mut store, yes),
        Commands::Stats { json } => records::cmd_stats(&store, json),
        Commands::Import { file, overwrite, no_overwrite, by, json } => {
            let options = hermes_recon::ReconcileOptions {
                overwrite: flag_or_setting(overwrite, no_overwrite, settings.import_overwrite),
                lookup: by.map(Into::into).unwrap_or(settings.import_lookup),
            };
            transfer::cmd_import(&mut store, &file, options, json)
        }
        Commands::Export { out, from, to, material, include_deleted, headers } => {
            let filter = hermes_io::csv::ExportFilter {
                date_from: from,
                date_to: to,
                material,
                include_deleted: include_deleted || settings.export_include_deleted,
            };
            let titles = match headers {
                Some(HeadersArg::English) => hermes_io::csv::Titles::English,
                Some(HeadersArg::Russian) => hermes_io::csv::Titles::Russian,
                None => transfer::titles_from_settings(settings),
            };
            transfer::cmd_export(&store, &out, &filter, titles)
        }
        Commands::Backup { out } => {
            let out = out.or_else(|| settings.backup_dir.as_ref().map(PathBuf::from));
            transfer::cmd_backup(&store, out)
        }
        Commands::Restore { file, json } => transfer::cmd_restore(&mut store, &file, json),
    }
}

/// `--flag` / `--no-flag` pair: whichever was given wins, else the setting.
fn flag_or_setting(on: bool, off: bool, setting: bool) -> bool {
    match (on, off) {
        (true, _) => true,
        (_, true) => false,
        _ => setting,
    }
}

fn open_store(path: &Path) -> Result<SqliteStore, CliError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CliError::io(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
    }
    log::debug!("using database {}", path.display());
    SqliteStore::open(path).map_err(|e| {
        CliError::from(e).with_hint(format!("check --db / HERMES_DB (currently {})", path.display()))
    })
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self { code: EXIT_VALIDATION, message: msg.into(), hint: None }
    }

    pub fn not_found(id: &str) -> Self {
        Self {
            code: EXIT_NOT_FOUND,
            message: format!("order '{id}' not found"),
            hint: Some("use `hermes list` or `hermes search` to find ids".to_string()),
        }
    }

    /// Error with an explicit exit code from the registry.
    pub fn with_code(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        let code = store_exit_code(&err);
        let hint = match &err {
            StoreError::Conflict { existing_id, .. } => {
                Some(format!("order numbers are unique; edit the existing order with `hermes edit {existing_id}`"))
            }
            StoreError::NotFound(_) => {
                Some("use `hermes list` or `hermes search` to find ids".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }
}

impl From<FormatError> for CliError {
    fn from(err: FormatError) -> Self {
        Self { code: format_exit_code(&err), message: err.to_string(), hint: None }
    }
}

impl From<SaveError> for CliError {
    fn from(err: SaveError) -> Self {
        match err {
            SaveError::Store(e) => e.into(),
            e @ SaveError::Validation(_) => {
                Self { code: save_exit_code(&e), message: e.to_string(), hint: None }
            }
        }
    }
}

impl From<hermes_recon::ReconError> for CliError {
    fn from(err: hermes_recon::ReconError) -> Self {
        match err {
            hermes_recon::ReconError::Store(e) => Self {
                code: EXIT_STORE,
                message: format!("restore aborted, database unchanged: {e}"),
                hint: None,
            },
        }
    }
}
