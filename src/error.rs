//! Error types for costing, allocation and projection

use crate::month::YearMonth;
use thiserror::Error;

/// Errors surfaced by the costing engine
///
/// Validation errors abort a single request. `MissingCostBasis` and
/// `NoProduction` are distinguishable "no data" conditions, never zero-cost results.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CostingError {
    #[error("{field} must have format YYYY-MM with year in [2000, 2100] (got '{value}')")]
    InvalidMonth { field: String, value: String },

    #[error("invalid {field}: {value}")]
    InvalidQuantity { field: String, value: f64 },

    #[error("start month {start} is after end month {end}")]
    InvalidRange { start: YearMonth, end: YearMonth },

    #[error("product {product_id} is invalid: {reason}")]
    InvalidProduct { product_id: u32, reason: String },

    #[error("duplicate record: {0}")]
    DuplicateRecord(String),

    #[error("product {0} not found")]
    ProductNotFound(u32),

    #[error("raw material {0} not found")]
    MaterialNotFound(u32),

    #[error("no indirect costs recorded for base month {base_month}")]
    MissingCostBasis { base_month: YearMonth },

    #[error("no production scheduled for {month}")]
    NoProduction { month: YearMonth },

    #[error("forecaster unavailable: {0}")]
    ForecastUnavailable(String),

    #[error("category '{0}' not found")]
    UnknownCategory(String),

    #[error("no bulk price adjustment to undo")]
    NothingToUndo,

    #[error("no raw materials to adjust")]
    NoMaterialsToAdjust,
}

impl CostingError {
    /// Whether this is an input validation failure (rejected before any computation)
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CostingError::InvalidMonth { .. }
                | CostingError::InvalidQuantity { .. }
                | CostingError::InvalidRange { .. }
                | CostingError::InvalidProduct { .. }
                | CostingError::DuplicateRecord(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_classification() {
        let err = CostingError::InvalidMonth {
            field: "base_month".into(),
            value: "2025-13".into(),
        };
        assert!(err.is_validation());
        assert!(err.to_string().contains("base_month"));

        let missing = CostingError::MissingCostBasis {
            base_month: "2025-01".parse().unwrap(),
        };
        assert!(!missing.is_validation());
        assert_eq!(missing.to_string(), "no indirect costs recorded for base month 2025-01");
    }
}
