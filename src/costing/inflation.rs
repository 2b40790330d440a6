//! Compounding inflation between a cost base month and a production month

use crate::catalog::InflationRecord;
use crate::month::YearMonth;
use crate::repository::InflationRepository;
use serde::{Deserialize, Serialize};

/// Accumulated inflation between two months
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InflationFactor {
    pub base: YearMonth,
    pub target: YearMonth,
    /// Product of `1 + pct/100` over the applied months
    pub factor: f64,
    /// Number of monthly records that contributed
    pub months_applied: usize,
}

impl InflationFactor {
    /// No inflation between `base` and `target`
    pub fn identity(base: YearMonth, target: YearMonth) -> Self {
        Self {
            base,
            target,
            factor: 1.0,
            months_applied: 0,
        }
    }

    /// Accumulated inflation as a percentage
    pub fn accumulated_pct(&self) -> f64 {
        (self.factor - 1.0) * 100.0
    }

    pub fn apply(&self, amount: f64) -> f64 {
        amount * self.factor
    }
}

/// Compounds monthly inflation rates
pub struct InflationAccumulator;

impl InflationAccumulator {
    /// Factor over records with `base < month <= target`
    ///
    /// A target at or before the base never looks back: the factor is 1.0.
    /// Months without a record contribute nothing.
    pub fn compound(base: YearMonth, target: YearMonth, records: &[InflationRecord]) -> InflationFactor {
        if target <= base {
            return InflationFactor::identity(base, target);
        }

        let mut result = InflationFactor::identity(base, target);
        for record in records.iter().filter(|r| r.month > base && r.month <= target) {
            result.factor *= record.factor();
            result.months_applied += 1;
        }
        result
    }

    /// Same as [`compound`](Self::compound), reading the records from a repository
    pub fn from_repository<R: InflationRepository + ?Sized>(
        repo: &R,
        base: YearMonth,
        target: YearMonth,
    ) -> InflationFactor {
        if target <= base {
            return InflationFactor::identity(base, target);
        }
        Self::compound(base, target, &repo.between(base, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    #[test]
    fn test_single_month_ten_percent() {
        let records = vec![InflationRecord::new(ym("2025-02"), 10.0)];
        let f = InflationAccumulator::compound(ym("2025-01"), ym("2025-02"), &records);
        assert_eq!(f.factor, 1.10);
        assert_eq!(f.months_applied, 1);
        assert_relative_eq!(f.accumulated_pct(), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_product_of_factors_in_any_order() {
        let records = vec![
            InflationRecord::new(ym("2025-04"), 1.5),
            InflationRecord::new(ym("2025-02"), 2.0),
            InflationRecord::new(ym("2025-03"), -0.5),
            // Outside the window on both sides
            InflationRecord::new(ym("2025-01"), 50.0),
            InflationRecord::new(ym("2025-05"), 50.0),
        ];
        let f = InflationAccumulator::compound(ym("2025-01"), ym("2025-04"), &records);
        assert_relative_eq!(f.factor, 1.02 * 0.995 * 1.015, epsilon = 1e-12);
        assert_eq!(f.months_applied, 3);
    }

    #[test]
    fn test_no_records_or_no_lookback() {
        let none = InflationAccumulator::compound(ym("2025-01"), ym("2025-06"), &[]);
        assert_eq!(none.factor, 1.0);

        let records = vec![InflationRecord::new(ym("2025-01"), 10.0)];
        let back = InflationAccumulator::compound(ym("2025-03"), ym("2025-01"), &records);
        assert_eq!(back.factor, 1.0);
        let same = InflationAccumulator::compound(ym("2025-03"), ym("2025-03"), &records);
        assert_eq!(same.factor, 1.0);
    }

    #[test]
    fn test_across_year_boundary() {
        let records = vec![
            InflationRecord::new(ym("2024-12"), 3.0),
            InflationRecord::new(ym("2025-01"), 2.0),
        ];
        let f = InflationAccumulator::compound(ym("2024-11"), ym("2025-01"), &records);
        assert_relative_eq!(f.factor, 1.03 * 1.02, epsilon = 1e-12);
        assert_relative_eq!(f.apply(100.0), 105.06, epsilon = 1e-9);
    }
}
