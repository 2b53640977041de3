//! Single-order commands: add, edit, show, list, search, delete, clear, stats.

use serde::Serialize;

use hermes_core::{
    archive_order, compute_stats, delete_many, save_order, ExecutorRole, Order, OrderField,
    OrderStatus, OrderStore, SortDirection,
};

use crate::util::{format_details, format_table, print_json};
use crate::{CliError, OrderArgs};

/// Shortest accepted search term.
const MIN_SEARCH_LEN: usize = 2;

/// Parse `ROLE=NAME` or `ROLE=NAME@DATE`.
fn parse_executor(spec: &str) -> Result<(ExecutorRole, String, Option<String>), CliError> {
    let (role, rest) = spec.split_once('=').ok_or_else(|| {
        CliError::args(format!("invalid executor '{spec}': expected ROLE=NAME[@DATE]"))
    })?;
    let role = ExecutorRole::from_key(role).ok_or_else(|| {
        CliError::args(format!("unknown executor role '{}'", role.trim())).with_hint(
            "roles: welder, stamping, flanging, calibration, plug-welder, cutter",
        )
    })?;
    let (name, date) = match rest.rsplit_once('@') {
        Some((name, date)) => (name, Some(date.trim().to_string())),
        None => (rest, None),
    };
    Ok((role, name.trim().to_string(), date))
}

impl OrderArgs {
    /// Copy every given flag onto the order; unset flags leave fields alone.
    pub fn apply(self, order: &mut Order) -> Result<(), CliError> {
        // Validate executors first so a bad flag changes nothing.
        let executors = self
            .executors
            .iter()
            .map(|spec| parse_executor(spec))
            .collect::<Result<Vec<_>, _>>()?;

        let fields = [
            (self.order_number, &mut order.order_number),
            (self.date, &mut order.date),
            (self.diameter, &mut order.diameter),
            (self.thickness, &mut order.thickness),
            (self.type_size, &mut order.type_size),
            (self.cutting, &mut order.cutting),
            (self.bottom_number, &mut order.bottom_number),
            (self.material, &mut order.material),
            (self.heat_treatment, &mut order.heat_treatment),
            (self.treatment_date, &mut order.treatment_date),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                *slot = value.trim().to_string();
            }
        }

        for (role, name, date) in executors {
            let slot = order.executor_mut(role);
            slot.name = name;
            if let Some(date) = date {
                slot.date = date;
            }
        }
        Ok(())
    }
}

fn report_saved(verb: &str, order: &Order, json: bool) -> Result<(), CliError> {
    if json {
        return print_json(order);
    }
    println!("{verb} order {} ({})", order.order_number, order.id);
    Ok(())
}

pub fn cmd_add<S: OrderStore>(store: &mut S, fields: OrderArgs, json: bool) -> Result<(), CliError> {
    if fields.order_number.is_none() {
        return Err(CliError::args("--number is required"));
    }
    let mut order = Order::new("");
    fields.apply(&mut order)?;

    let saved = save_order(store, order)?;
    report_saved("added", &saved, json)
}

pub fn cmd_edit<S: OrderStore>(
    store: &mut S,
    id: &str,
    fields: OrderArgs,
    status: Option<OrderStatus>,
    json: bool,
) -> Result<(), CliError> {
    let mut order = store.get(id)?.ok_or_else(|| CliError::not_found(id))?;
    fields.apply(&mut order)?;
    if let Some(status) = status {
        order.status = status;
    }

    let saved = save_order(store, order)?;
    report_saved("updated", &saved, json)
}

pub fn cmd_show<S: OrderStore>(store: &S, id: &str, json: bool) -> Result<(), CliError> {
    let order = store.get(id)?.ok_or_else(|| CliError::not_found(id))?;
    if json {
        return print_json(&order);
    }
    print!("{}", format_details(&order));
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Pagination {
    current_page: usize,
    total_pages: usize,
    total_count: usize,
    limit: usize,
}

#[derive(Serialize)]
struct ListOutput<'a> {
    orders: &'a [Order],
    pagination: Pagination,
}

pub fn cmd_list<S: OrderStore>(
    store: &S,
    sort: &str,
    asc: bool,
    active_only: bool,
    page: usize,
    limit: usize,
    json: bool,
) -> Result<(), CliError> {
    let field = OrderField::from_key(sort).ok_or_else(|| {
        CliError::args(format!("unknown sort field '{sort}'"))
            .with_hint("use a camelCase field name, e.g. orderNumber, date, material, createdAt")
    })?;
    if page == 0 || limit == 0 {
        return Err(CliError::args("--page and --limit must be at least 1"));
    }
    let dir = if asc { SortDirection::Asc } else { SortDirection::Desc };

    let mut orders = store.list(field, dir)?;
    if active_only {
        orders.retain(Order::is_active);
    }

    let total_count = orders.len();
    let start = (page - 1).saturating_mul(limit).min(total_count);
    let end = start.saturating_add(limit).min(total_count);
    let shown = &orders[start..end];

    if json {
        return print_json(&ListOutput {
            orders: shown,
            pagination: Pagination {
                current_page: page,
                total_pages: total_count.div_ceil(limit),
                total_count,
                limit,
            },
        });
    }

    print!("{}", format_table(shown));
    if total_count > shown.len() {
        eprintln!("showing {} of {} orders (page {})", shown.len(), total_count, page);
    }
    Ok(())
}

#[derive(Serialize)]
struct SearchOutput<'a> {
    query: &'a str,
    results: &'a [Order],
    total: usize,
}

pub fn cmd_search<S: OrderStore>(store: &S, term: &str, limit: usize, json: bool) -> Result<(), CliError> {
    let term = term.trim();
    if term.chars().count() < MIN_SEARCH_LEN {
        return Err(CliError::args(format!(
            "search term must be at least {MIN_SEARCH_LEN} characters"
        )));
    }

    let mut results = store.search(term, OrderField::CreatedAt, SortDirection::Desc)?;
    results.truncate(limit);

    if json {
        return print_json(&SearchOutput { query: term, results: &results, total: results.len() });
    }
    if results.is_empty() {
        eprintln!("no orders match '{term}'");
        return Ok(());
    }
    print!("{}", format_table(&results));
    Ok(())
}

pub fn cmd_delete<S: OrderStore>(store: &mut S, ids: &[String], soft: bool) -> Result<(), CliError> {
    if soft {
        for id in ids {
            let order = archive_order(store, id)?;
            println!("archived order {} ({})", order.order_number, order.id);
        }
        return Ok(());
    }

    if let [id] = ids {
        if !store.delete(id)? {
            return Err(CliError::not_found(id));
        }
        println!("deleted order {id}");
        return Ok(());
    }

    let (deleted, errors) = delete_many(store, ids);
    println!("deleted {deleted} orders");
    if errors > 0 {
        return Err(CliError::with_code(
            crate::exit_codes::EXIT_NOT_FOUND,
            format!("{errors} of {} orders could not be deleted", ids.len()),
        ));
    }
    Ok(())
}

pub fn cmd_clear<S: OrderStore>(store: &mut S, yes: bool) -> Result<(), CliError> {
    if !yes {
        return Err(CliError::args("refusing to remove every order without confirmation")
            .with_hint("pass --yes, and consider `hermes backup` first"));
    }
    let removed = store.clear_all()?;
    println!("removed {removed} orders");
    Ok(())
}

pub fn cmd_stats<S: OrderStore>(store: &S, json: bool) -> Result<(), CliError> {
    let orders = store.list(OrderField::CreatedAt, SortDirection::Desc)?;
    let stats = compute_stats(&orders);
    if json {
        return print_json(&stats);
    }

    println!("total:      {}", stats.total);
    println!("active:     {}", stats.active);
    println!("deleted:    {}", stats.deleted);
    println!("materials:  {}", stats.materials);
    if let (Some(first), Some(last)) = (&stats.earliest_date, &stats.latest_date) {
        println!("dates:      {first} .. {last}");
    }
    Ok(())
}
