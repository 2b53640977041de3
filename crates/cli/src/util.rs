use serde::Serialize;
use unicode_width::UnicodeWidthStr;

use hermes_core::{ExecutorRole, Order};

use crate::CliError;

/// Display width of a string, accounting for wide characters.
pub(crate) fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Truncate a string to fit within `width` display columns, adding ".." if truncated.
pub(crate) fn truncate_display(s: &str, width: usize) -> String {
    if display_width(s) <= width {
        return s.to_string();
    }
    if width < 3 {
        return s
            .chars()
            .next()
            .filter(|ch| unicode_width::UnicodeWidthChar::width(*ch).unwrap_or(0) <= width)
            .map(String::from)
            .unwrap_or_default();
    }

    // Stop at width - 2 to leave room for ".."
    let budget = width - 2;
    let mut used = 0;
    let mut end_byte = 0;
    for (i, ch) in s.char_indices() {
        let cw = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + cw > budget {
            end_byte = i;
            break;
        }
        used += cw;
        end_byte = i + ch.len_utf8();
    }

    format!("{}..", &s[..end_byte])
}

/// Pad or truncate a string to exactly `width` display columns.
pub(crate) fn pad_right(s: &str, width: usize) -> String {
    let sw = display_width(s);
    if sw > width {
        truncate_display(s, width)
    } else {
        format!("{}{}", s, " ".repeat(width - sw))
    }
}

/// Print one JSON value on stdout.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::general(format!("cannot serialize output: {e}")))?;
    println!("{json}");
    Ok(())
}

const TABLE_COLUMNS: &[(&str, usize)] = &[
    ("ID", 8),
    ("NUMBER", 14),
    ("DATE", 10),
    ("BOTTOM", 12),
    ("MATERIAL", 14),
    ("DIAMETER", 8),
    ("STATUS", 7),
];

/// Fixed-width table of orders, ids shortened to 8 characters.
pub(crate) fn format_table(orders: &[Order]) -> String {
    let mut out = String::new();
    let header: Vec<String> = TABLE_COLUMNS.iter().map(|(t, w)| pad_right(t, *w)).collect();
    out.push_str(header.join("  ").trim_end());
    out.push('\n');

    for order in orders {
        let short_id: String = order.id.chars().take(8).collect();
        let cells = [
            short_id.as_str(),
            order.order_number.as_str(),
            order.date.as_str(),
            order.bottom_number.as_str(),
            order.material.as_str(),
            order.diameter.as_str(),
            order.status.as_str(),
        ];
        let line: Vec<String> = cells
            .iter()
            .zip(TABLE_COLUMNS)
            .map(|(cell, (_, w))| pad_right(cell, *w))
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
    out
}

/// Multi-line detail view of one order.
pub(crate) fn format_details(order: &Order) -> String {
    let rows = [
        ("id", order.id.as_str()),
        ("order number", order.order_number.as_str()),
        ("date", order.date.as_str()),
        ("diameter", order.diameter.as_str()),
        ("thickness", order.thickness.as_str()),
        ("type size", order.type_size.as_str()),
        ("cutting", order.cutting.as_str()),
        ("bottom number", order.bottom_number.as_str()),
        ("material", order.material.as_str()),
        ("heat treatment", order.heat_treatment.as_str()),
        ("treatment date", order.treatment_date.as_str()),
        ("status", order.status.as_str()),
        ("created", order.created_at.as_str()),
        ("updated", order.updated_at.as_str()),
    ];

    let mut out = String::new();
    for (label, value) in rows {
        out.push_str(&format!("{}{}\n", pad_right(label, 16), value));
    }

    for role in ExecutorRole::ALL {
        let executor = order.executor(role);
        if executor.is_empty() {
            continue;
        }
        let mut line = format!("{}{}", pad_right(role.key(), 16), executor.name);
        if !executor.date.is_empty() {
            line.push_str(&format!(" ({})", executor.date));
        }
        out.push_str(&line);
        out.push('\n');
    }
    out
}
