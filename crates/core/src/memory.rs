// In-process order store

use std::collections::{BTreeMap, HashMap};

use crate::order::{Order, OrderField, SortDirection};
use crate::store::{compare_orders, compare_recency, prepare_for_write, OrderStore, StoreError};

/// Order store held entirely in memory, keyed by id.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    records: BTreeMap<String, Order>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn owner_of(&self, order_number: &str) -> Option<&str> {
        self.records
            .values()
            .find(|o| o.order_number == order_number)
            .map(|o| o.id.as_str())
    }
}

impl OrderStore for MemoryStore {
    fn get(&self, id: &str) -> Result<Option<Order>, StoreError> {
        Ok(self.records.get(id).cloned())
    }

    fn put(&mut self, order: &Order) -> Result<String, StoreError> {
        let record = prepare_for_write(order)?;
        if let Some(existing_id) = self.owner_of(&record.order_number) {
            if existing_id != record.id {
                return Err(StoreError::Conflict {
                    order_number: record.order_number.clone(),
                    existing_id: existing_id.to_string(),
                });
            }
        }
        let id = record.id.clone();
        self.records.insert(id.clone(), record);
        Ok(id)
    }

    fn delete(&mut self, id: &str) -> Result<bool, StoreError> {
        Ok(self.records.remove(id).is_some())
    }

    fn list(&self, sort: OrderField, dir: SortDirection) -> Result<Vec<Order>, StoreError> {
        let mut orders: Vec<Order> = self.records.values().cloned().collect();
        orders.sort_by(|a, b| compare_orders(a, b, sort, dir));
        Ok(orders)
    }

    fn find_by_field(&self, field: OrderField, value: &str) -> Result<Vec<Order>, StoreError> {
        let mut found: Vec<Order> = self
            .records
            .values()
            .filter(|o| o.field(field) == value)
            .cloned()
            .collect();
        found.sort_by(compare_recency);
        Ok(found)
    }

    fn clear_all(&mut self) -> Result<usize, StoreError> {
        let n = self.records.len();
        self.records.clear();
        Ok(n)
    }

    fn replace_all(&mut self, orders: &[Order]) -> Result<(), StoreError> {
        // Stage into a fresh map so a rejected record leaves `self` untouched.
        let mut staged: BTreeMap<String, Order> = BTreeMap::new();
        let mut owners: HashMap<String, String> = HashMap::new();
        for order in orders {
            let record = prepare_for_write(order)?;
            if let Some(existing_id) = owners.get(&record.order_number) {
                if *existing_id != record.id {
                    return Err(StoreError::Conflict {
                        order_number: record.order_number.clone(),
                        existing_id: existing_id.clone(),
                    });
                }
            }
            owners.insert(record.order_number.clone(), record.id.clone());
            staged.insert(record.id.clone(), record);
        }
        self.records = staged;
        Ok(())
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.records.len())
    }
}
