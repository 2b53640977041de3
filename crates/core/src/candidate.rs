use std::fmt;

use crate::order::{
    normalize_executors, Executor, ExecutorRole, LookupField, Order, OrderStatus, EXECUTOR_SLOTS,
};

/// An externally sourced order (CSV row) that has not been committed yet.
/// Identity and timestamps are assigned by the reconciler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidate {
    /// 1-based source line, for reporting.
    pub line: usize,
    pub date: String,
    pub order_number: String,
    pub diameter: String,
    pub thickness: String,
    pub type_size: String,
    pub cutting: String,
    pub bottom_number: String,
    pub material: String,
    pub heat_treatment: String,
    pub treatment_date: String,
    pub executors: Vec<Executor>,
}

impl Candidate {
    pub fn new(order_number: impl Into<String>) -> Self {
        Self { order_number: order_number.into(), ..Self::default() }
    }

    pub fn lookup_value(&self, lookup: LookupField) -> &str {
        match lookup {
            LookupField::OrderNumber => self.order_number.trim(),
            LookupField::BottomNumber => self.bottom_number.trim(),
        }
    }

    pub fn executor_mut(&mut self, role: ExecutorRole) -> &mut Executor {
        if self.executors.len() < EXECUTOR_SLOTS {
            self.executors.resize_with(EXECUTOR_SLOTS, Executor::default);
        }
        &mut self.executors[role.index()]
    }

    /// Full record with every missing attribute defaulted.
    pub fn to_order(&self, id: String, status: OrderStatus, created_at: String, updated_at: String) -> Order {
        Order {
            id,
            date: self.date.clone(),
            order_number: self.order_number.clone(),
            diameter: self.diameter.clone(),
            thickness: self.thickness.clone(),
            type_size: self.type_size.clone(),
            cutting: self.cutting.clone(),
            bottom_number: self.bottom_number.clone(),
            material: self.material.clone(),
            heat_treatment: self.heat_treatment.clone(),
            treatment_date: self.treatment_date.clone(),
            executors: normalize_executors(self.executors.clone()),
            status,
            created_at,
            updated_at,
        }
    }
}

/// A source row that could not be turned into a candidate at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for RowError {}

/// Output of the CSV mapping step, one entry per data row.
pub type ParsedCandidate = Result<Candidate, RowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_order_fills_defaults() {
        let mut c = Candidate::new("A-1");
        c.executor_mut(ExecutorRole::Cutter).name = "Petrov".into();
        let order = c.to_order("id1".into(), OrderStatus::Active, "c".into(), "u".into());
        assert_eq!(order.executors.len(), 6);
        assert_eq!(order.executor(ExecutorRole::Cutter).name, "Petrov");
        assert_eq!(order.material, "");
        assert_eq!(order.created_at, "c");
    }

    #[test]
    fn lookup_value_is_trimmed() {
        let mut c = Candidate::new(" A-1 ");
        c.bottom_number = "  ".into();
        assert_eq!(c.lookup_value(LookupField::OrderNumber), "A-1");
        assert_eq!(c.lookup_value(LookupField::BottomNumber), "");
    }
}
