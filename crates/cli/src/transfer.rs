//! `hermes import/export/backup/restore`: moving orders in and out of the database.

use std::path::{Path, PathBuf};

use hermes_config::{HeaderLanguage, Settings};
use hermes_core::{now_timestamp, OrderField, OrderStore, SortDirection};
use hermes_io::backup::{backup_file_name, read_backup, Backup};
use hermes_io::csv::{self, ExportFilter, Titles};
use hermes_recon::{reconcile, restore, ReconcileOptions};

use crate::exit_codes::EXIT_PARTIAL;
use crate::util::print_json;
use crate::CliError;

pub fn titles_from_settings(settings: &Settings) -> Titles {
    match settings.export_headers {
        HeaderLanguage::Russian => Titles::Russian,
        HeaderLanguage::English => Titles::English,
    }
}

/// `dir/name` when `out` is an existing directory (or ends in a separator),
/// `out` itself otherwise.
fn resolve_output(out: &Path, default_name: &str) -> PathBuf {
    let text = out.to_string_lossy();
    let looks_like_dir = text.ends_with(std::path::MAIN_SEPARATOR) || text.ends_with('/');
    if out.is_dir() || looks_like_dir {
        out.join(default_name)
    } else {
        out.to_path_buf()
    }
}

fn ensure_parent(path: &Path) -> Result<(), CliError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .map_err(|e| CliError::io(format!("cannot create {}: {e}", parent.display()))),
        _ => Ok(()),
    }
}

// ── Import ──────────────────────────────────────────────────────────

pub fn cmd_import<S: OrderStore>(
    store: &mut S,
    file: &Path,
    options: ReconcileOptions,
    json: bool,
) -> Result<(), CliError> {
    let candidates = csv::import_file(file).map_err(|e| {
        CliError::from(e).with_hint(format!("while reading {}", file.display()))
    })?;
    log::info!(
        "importing {} rows from {} (lookup: {}, overwrite: {})",
        candidates.len(),
        file.display(),
        options.lookup,
        options.overwrite
    );

    let report = reconcile(store, &candidates, &options);
    let s = report.summary;

    if json {
        print_json(&report)?;
    } else {
        println!(
            "imported: {}, updated: {}, skipped: {}, errors: {} (total {})",
            s.imported, s.updated, s.skipped, s.errors, s.total
        );
        for failure in report.failures() {
            if let hermes_recon::Outcome::Failed { reason } = &failure.outcome {
                eprintln!("  line {}: {}", failure.line, reason);
            }
        }
    }

    if s.errors > 0 {
        return Err(CliError::with_code(
            EXIT_PARTIAL,
            format!("{} of {} rows could not be imported", s.errors, s.total),
        ));
    }
    Ok(())
}

// ── Export ──────────────────────────────────────────────────────────

pub fn cmd_export<S: OrderStore>(
    store: &S,
    out: &str,
    filter: &ExportFilter,
    titles: Titles,
) -> Result<(), CliError> {
    let orders = store.list(OrderField::CreatedAt, SortDirection::Desc)?;
    let selected = filter.apply(&orders);
    let columns = csv::default_columns(titles);

    if out == "-" {
        let text = csv::serialize(selected.iter().copied(), &columns)?;
        print!("{text}");
        return Ok(());
    }

    let path = resolve_output(Path::new(out), &csv::export_file_name(&now_timestamp()));
    ensure_parent(&path)?;
    csv::export_file(selected.iter().copied(), &columns, &path)?;
    println!("exported {} orders to {}", selected.len(), path.display());
    Ok(())
}

// ── Backup / restore ────────────────────────────────────────────────

pub fn cmd_backup<S: OrderStore>(store: &S, out: Option<PathBuf>) -> Result<(), CliError> {
    let orders = store.list(OrderField::CreatedAt, SortDirection::Asc)?;
    let timestamp = now_timestamp();
    let name = backup_file_name(&timestamp);

    let path = match out {
        Some(out) => resolve_output(&out, &name),
        None => PathBuf::from(name),
    };
    ensure_parent(&path)?;

    Backup::new(&orders, timestamp).write(&path)?;
    println!("backed up {} orders to {}", orders.len(), path.display());
    Ok(())
}

pub fn cmd_restore<S: OrderStore>(store: &mut S, file: &Path, json: bool) -> Result<(), CliError> {
    // Shape errors surface here, before the store is touched.
    let backup = read_backup(file)?;
    let report = restore(store, &backup.data)?;
    let s = report.summary;

    if json {
        print_json(&report)?;
    } else {
        println!("restored: {}, errors: {} (total {})", s.restored, s.errors, s.total);
        for rejected in &report.rejected {
            eprintln!("  entry {}: {}", rejected.index, rejected.reason);
        }
    }

    if s.errors > 0 {
        return Err(CliError::with_code(
            EXIT_PARTIAL,
            format!("{} of {} backup entries were skipped", s.errors, s.total),
        ));
    }
    Ok(())
}
