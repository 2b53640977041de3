use std::fmt;

use crate::order::Order;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is empty.
    MissingField(&'static str),
    /// Order number contains something other than letters, digits or hyphens.
    InvalidOrderNumber(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing required field '{field}'"),
            Self::InvalidOrderNumber(value) => write!(
                f,
                "order number '{value}' may only contain letters, digits and hyphens"
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

/// `^[A-Za-z0-9-]+$`
pub fn validate_order_number(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::MissingField("orderNumber"));
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ValidationError::InvalidOrderNumber(value.to_string()));
    }
    Ok(())
}

/// Rules applied to imported rows: only the order number is mandatory.
pub fn validate_for_import(order: &Order) -> Result<(), ValidationError> {
    validate_order_number(&order.order_number)
}

/// Rules applied to interactive saves: order number and date.
pub fn validate_for_save(order: &Order) -> Result<(), ValidationError> {
    validate_order_number(&order.order_number)?;
    if order.date.trim().is_empty() {
        return Err(ValidationError::MissingField("date"));
    }
    Ok(())
}
