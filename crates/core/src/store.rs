//! Record store abstraction shared by the in-memory and SQLite backends,
//! plus the single-record operations built on top of it.

use std::cmp::Ordering;
use std::fmt;

use crate::order::{
    normalize_executors, now_timestamp, Order, OrderField, OrderStatus, SortDirection,
    EXECUTOR_SLOTS,
};
use crate::validation::{validate_for_save, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No record with this id.
    NotFound(String),
    /// Order number already belongs to another record.
    Conflict { order_number: String, existing_id: String },
    /// Record cannot be stored as given (e.g. empty id).
    InvalidRecord(String),
    /// Underlying storage failure.
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "order '{id}' not found"),
            Self::Conflict { order_number, existing_id } => write!(
                f,
                "order number '{order_number}' already used by order '{existing_id}'"
            ),
            Self::InvalidRecord(msg) => write!(f, "invalid record: {msg}"),
            Self::Backend(msg) => write!(f, "storage error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Storage for orders keyed by `id`.
///
/// Implementations must keep `orderNumber` unique across ids and must store
/// exactly six executor slots per record.
pub trait OrderStore {
    fn get(&self, id: &str) -> Result<Option<Order>, StoreError>;

    /// Insert or replace by id. Returns the id written.
    fn put(&mut self, order: &Order) -> Result<String, StoreError>;

    /// Returns false when nothing was deleted.
    fn delete(&mut self, id: &str) -> Result<bool, StoreError>;

    fn list(&self, sort: OrderField, dir: SortDirection) -> Result<Vec<Order>, StoreError>;

    /// Exact-match lookup, most recently updated first.
    fn find_by_field(&self, field: OrderField, value: &str) -> Result<Vec<Order>, StoreError>;

    /// Remove every record. Returns how many were removed.
    fn clear_all(&mut self) -> Result<usize, StoreError>;

    /// Atomically replace the whole contents. On error the previous contents
    /// must be left untouched.
    fn replace_all(&mut self, orders: &[Order]) -> Result<(), StoreError>;

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.list(OrderField::Id, SortDirection::Asc)?.len())
    }

    /// Case-insensitive substring match on order number, bottom number and material.
    fn search(
        &self,
        term: &str,
        sort: OrderField,
        dir: SortDirection,
    ) -> Result<Vec<Order>, StoreError> {
        let needle = term.trim().to_lowercase();
        let all = self.list(sort, dir)?;
        if needle.is_empty() {
            return Ok(all);
        }
        Ok(all.into_iter().filter(|o| matches_search(o, &needle)).collect())
    }
}

fn matches_search(order: &Order, needle: &str) -> bool {
    [&order.order_number, &order.bottom_number, &order.material]
        .iter()
        .any(|v| v.to_lowercase().contains(needle))
}

/// Ordering used by every backend for `list`: string comparison on the
/// field, ties broken by id so the result is deterministic.
pub fn compare_orders(a: &Order, b: &Order, field: OrderField, dir: SortDirection) -> Ordering {
    let primary = a.field(field).cmp(b.field(field));
    let primary = match dir {
        SortDirection::Asc => primary,
        SortDirection::Desc => primary.reverse(),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

/// Newest `updatedAt` first, then id ascending.
pub fn compare_recency(a: &Order, b: &Order) -> Ordering {
    b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id))
}

/// Shape checks every backend applies before a write.
pub fn prepare_for_write(order: &Order) -> Result<Order, StoreError> {
    if order.id.trim().is_empty() {
        return Err(StoreError::InvalidRecord("empty id".into()));
    }
    let mut record = order.clone();
    if record.executors.len() != EXECUTOR_SLOTS {
        record.executors = normalize_executors(record.executors);
    }
    Ok(record)
}

/// Error from [`save_order`] and the other single-record operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveError {
    Validation(ValidationError),
    Store(StoreError),
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(e) => write!(f, "{e}"),
            Self::Store(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SaveError {}

impl From<ValidationError> for SaveError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<StoreError> for SaveError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

/// Form-style save: validate, keep the stored `createdAt` for an existing
/// id (or stamp a new one), stamp `updatedAt`, write.
pub fn save_order<S: OrderStore + ?Sized>(store: &mut S, order: Order) -> Result<Order, SaveError> {
    validate_for_save(&order)?;

    let mut record = order;
    let now = now_timestamp();
    match store.get(&record.id)? {
        Some(existing) => record.created_at = existing.created_at,
        None if record.created_at.is_empty() => record.created_at = now.clone(),
        None => {}
    }
    record.updated_at = now;

    store.put(&record)?;
    log::debug!("saved order {} ({})", record.id, record.order_number);
    Ok(record)
}

/// Soft delete: mark the order deleted without removing it.
pub fn archive_order<S: OrderStore + ?Sized>(store: &mut S, id: &str) -> Result<Order, StoreError> {
    let mut order = store.get(id)?.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
    order.status = OrderStatus::Deleted;
    order.updated_at = now_timestamp();
    store.put(&order)?;
    log::debug!("archived order {id}");
    Ok(order)
}

/// Delete several ids, counting failures instead of stopping.
/// Returns `(deleted, errors)`.
pub fn delete_many<S: OrderStore + ?Sized>(store: &mut S, ids: &[String]) -> (usize, usize) {
    let mut deleted = 0;
    let mut errors = 0;
    for id in ids {
        match store.delete(id) {
            Ok(true) => deleted += 1,
            Ok(false) => {
                log::warn!("order {id} not found, nothing deleted");
                errors += 1;
            }
            Err(e) => {
                log::warn!("failed to delete order {id}: {e}");
                errors += 1;
            }
        }
    }
    (deleted, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn dated(number: &str) -> Order {
        let mut o = Order::new(number);
        o.date = "2024-04-01".into();
        o
    }

    #[test]
    fn save_stamps_and_preserves_created_at() {
        let mut store = MemoryStore::new();
        let saved = save_order(&mut store, dated("A-1")).unwrap();
        assert!(!saved.created_at.is_empty());
        assert_eq!(saved.created_at, saved.updated_at);

        let mut edit = saved.clone();
        edit.material = "Steel".into();
        edit.created_at = "1999-01-01T00:00:00.000Z".into();
        let resaved = save_order(&mut store, edit).unwrap();
        assert_eq!(resaved.created_at, saved.created_at);
        assert_eq!(resaved.id, saved.id);
        assert_eq!(store.get(&saved.id).unwrap().unwrap().material, "Steel");
    }

    #[test]
    fn save_rejects_invalid_order() {
        let mut store = MemoryStore::new();
        let err = save_order(&mut store, Order::new("A-1")).unwrap_err();
        assert_eq!(err, SaveError::Validation(ValidationError::MissingField("date")));
        let err = save_order(&mut store, dated("A 1")).unwrap_err();
        assert!(matches!(err, SaveError::Validation(ValidationError::InvalidOrderNumber(_))));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn save_maps_conflict() {
        let mut store = MemoryStore::new();
        save_order(&mut store, dated("A-1")).unwrap();
        let err = save_order(&mut store, dated("A-1")).unwrap_err();
        assert!(matches!(err, SaveError::Store(StoreError::Conflict { .. })));
    }

    #[test]
    fn archive_marks_deleted() {
        let mut store = MemoryStore::new();
        let saved = save_order(&mut store, dated("A-1")).unwrap();
        let archived = archive_order(&mut store, &saved.id).unwrap();
        assert_eq!(archived.status, OrderStatus::Deleted);
        assert_eq!(store.get(&saved.id).unwrap().unwrap().status, OrderStatus::Deleted);
        assert_eq!(
            archive_order(&mut store, "missing").unwrap_err(),
            StoreError::NotFound("missing".into())
        );
    }

    #[test]
    fn delete_many_counts_misses() {
        let mut store = MemoryStore::new();
        let a = save_order(&mut store, dated("A-1")).unwrap();
        let b = save_order(&mut store, dated("A-2")).unwrap();
        let (deleted, errors) = delete_many(&mut store, &[a.id, "nope".into(), b.id]);
        assert_eq!((deleted, errors), (2, 1));
        assert_eq!(store.count().unwrap(), 0);
    }
}
