use std::collections::HashSet;

use serde_json::Value;

use hermes_core::validation::validate_for_import;
use hermes_core::{
    new_order_id, now_timestamp, Candidate, Order, OrderStatus, OrderStore, ParsedCandidate,
};

use crate::error::{CandidateError, ReconError};
use crate::matcher::find_existing;
use crate::model::{
    CandidateOutcome, ImportReport, Outcome, ReconcileOptions, RejectedEntry, RestoreReport,
    RestoreSummary,
};

/// Apply a batch of candidates to the store, in input order.
///
/// Each candidate is imported, updated or skipped; a failure affects only
/// that candidate. Later candidates see the effects of earlier ones, so a
/// batch with a repeated key imports the first and skips (or overwrites
/// with) the rest.
pub fn reconcile<S: OrderStore + ?Sized>(
    store: &mut S,
    candidates: &[ParsedCandidate],
    options: &ReconcileOptions,
) -> ImportReport {
    let mut report = ImportReport::default();

    for parsed in candidates {
        let (line, order_number, result) = match parsed {
            Ok(candidate) => (
                candidate.line,
                candidate.order_number.clone(),
                reconcile_one(store, candidate, options),
            ),
            Err(row) => (row.line, String::new(), Err(CandidateError::Row(row.clone()))),
        };

        let outcome = result.unwrap_or_else(|e| {
            log::warn!("line {line}: {e}");
            Outcome::Failed { reason: e.to_string() }
        });
        log::debug!("line {line} ({order_number}): {outcome}");
        report.push(CandidateOutcome { line, order_number, outcome });
    }

    let s = report.summary;
    log::info!(
        "import finished: {} imported, {} updated, {} skipped, {} errors of {}",
        s.imported,
        s.updated,
        s.skipped,
        s.errors,
        s.total
    );
    report
}

fn reconcile_one<S: OrderStore + ?Sized>(
    store: &mut S,
    candidate: &Candidate,
    options: &ReconcileOptions,
) -> Result<Outcome, CandidateError> {
    let existing = find_existing(store, options.lookup, candidate.lookup_value(options.lookup))?;
    let now = now_timestamp();

    let (record, is_update) = match existing {
        Some(existing) if !options.overwrite => {
            return Ok(Outcome::Skipped { existing_id: existing.id });
        }
        Some(existing) => (
            candidate.to_order(existing.id, existing.status, existing.created_at, now),
            true,
        ),
        None => (
            candidate.to_order(new_order_id(), OrderStatus::Active, now.clone(), now),
            false,
        ),
    };

    validate_for_import(&record)?;
    let id = store.put(&record)?;

    Ok(if is_update { Outcome::Updated { id } } else { Outcome::Imported { id } })
}

/// Replace the whole store with the entries of a backup.
///
/// Entries that do not decode into an order, lack an id or order number, or
/// repeat an earlier id or order number are counted as errors and left out.
/// The clear and the writes are one atomic step: if the store rejects it,
/// the previous contents stay and the error is returned.
pub fn restore<S: OrderStore + ?Sized>(
    store: &mut S,
    entries: &[Value],
) -> Result<RestoreReport, ReconError> {
    let mut accepted: Vec<Order> = Vec::with_capacity(entries.len());
    let mut rejected = Vec::new();
    let mut ids = HashSet::new();
    let mut numbers = HashSet::new();
    let now = now_timestamp();

    for (index, entry) in entries.iter().enumerate() {
        let order = match decode_entry(entry, &now) {
            Ok(order) => order,
            Err(reason) => {
                rejected.push(RejectedEntry { index, reason });
                continue;
            }
        };

        // Keys are reserved only by accepted entries.
        let reason = if ids.contains(&order.id) {
            Some(format!("duplicate id '{}'", order.id))
        } else if numbers.contains(&order.order_number) {
            Some(format!("duplicate order number '{}'", order.order_number))
        } else {
            None
        };
        match reason {
            Some(reason) => rejected.push(RejectedEntry { index, reason }),
            None => {
                ids.insert(order.id.clone());
                numbers.insert(order.order_number.clone());
                accepted.push(order);
            }
        }
    }

    for r in &rejected {
        log::warn!("backup entry {}: {}", r.index, r.reason);
    }

    store.replace_all(&accepted)?;

    let summary = RestoreSummary {
        restored: accepted.len(),
        errors: rejected.len(),
        total: entries.len(),
    };
    log::info!(
        "restore finished: {} restored, {} errors of {}",
        summary.restored,
        summary.errors,
        summary.total
    );
    Ok(RestoreReport { summary, rejected })
}

fn decode_entry(entry: &Value, now: &str) -> Result<Order, String> {
    let mut order: Order = serde_json::from_value(entry.clone()).map_err(|e| e.to_string())?;

    if order.id.trim().is_empty() {
        return Err("empty id".into());
    }
    if order.order_number.trim().is_empty() {
        return Err("empty order number".into());
    }
    if order.created_at.is_empty() {
        order.created_at = now.to_string();
    }
    if order.updated_at.is_empty() {
        order.updated_at = order.created_at.clone();
    }
    Ok(order)
}
