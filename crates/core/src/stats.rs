use std::collections::BTreeSet;

use serde::Serialize;

use crate::order::{Order, OrderStatus};

/// Summary figures over a set of orders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub total: usize,
    pub active: usize,
    pub deleted: usize,
    /// Distinct non-empty materials among active orders.
    pub materials: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub earliest_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_date: Option<String>,
}

pub fn compute_stats(orders: &[Order]) -> OrderStats {
    let mut stats = OrderStats { total: orders.len(), ..OrderStats::default() };
    let mut materials = BTreeSet::new();

    for order in orders {
        match order.status {
            OrderStatus::Active => stats.active += 1,
            OrderStatus::Deleted => {
                stats.deleted += 1;
                continue;
            }
        }
        let material = order.material.trim();
        if !material.is_empty() {
            materials.insert(material.to_lowercase());
        }
        let date = order.date.trim();
        if date.is_empty() {
            continue;
        }
        if stats.earliest_date.as_deref().map_or(true, |d| date < d) {
            stats.earliest_date = Some(date.to_string());
        }
        if stats.latest_date.as_deref().map_or(true, |d| date > d) {
            stats.latest_date = Some(date.to_string());
        }
    }

    stats.materials = materials.len();
    stats
}
