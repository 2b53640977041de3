use hermes_core::store::compare_recency;
use hermes_core::{LookupField, Order, OrderStore, StoreError};

/// Find the record a candidate with `value` in the `lookup` key refers to.
///
/// An empty value never matches. When several records share the value
/// (bottom numbers are not unique) the most recently updated one wins,
/// then the smallest id.
pub fn find_existing<S: OrderStore + ?Sized>(
    store: &S,
    lookup: LookupField,
    value: &str,
) -> Result<Option<Order>, StoreError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    let matches = store.find_by_field(lookup.field(), value)?;
    if matches.len() > 1 {
        log::debug!("{} records share {lookup} '{value}'", matches.len());
    }
    Ok(pick_match(matches))
}

pub fn pick_match(matches: Vec<Order>) -> Option<Order> {
    matches.into_iter().min_by(compare_recency)
}
