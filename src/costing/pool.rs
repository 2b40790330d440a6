//! Indirect cost pool for a base month, split by distribution type

use super::inflation::InflationFactor;
use crate::catalog::{DistributionType, IndirectCostRecord};
use crate::error::CostingError;
use crate::month::YearMonth;
use serde::{Deserialize, Serialize};

/// Indirect cost totals by distribution type for one base month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndirectCostPool {
    pub base_month: YearMonth,
    pub sp: f64,
    pub gif: f64,
    pub dep: f64,
    pub account_count: usize,
    /// Sum of records flagged as variable
    pub variable_total: f64,
    pub fixed_total: f64,
}

/// Pool totals after inflation adjustment to a production month
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdjustedPool {
    pub sp: f64,
    pub gif: f64,
    pub dep: f64,
    pub factor: f64,
}

impl AdjustedPool {
    pub fn total(&self) -> f64 {
        self.sp + self.gif + self.dep
    }
}

/// Reporting view of a pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSummary {
    pub base_month: YearMonth,
    pub total_sp: f64,
    pub total_gif: f64,
    pub total_dep: f64,
    pub total: f64,
    pub account_count: usize,
    pub fixed_total: f64,
    pub variable_total: f64,
}

impl IndirectCostPool {
    /// Aggregate the records of `base_month`
    ///
    /// Records from other months are ignored. No matching record at all is a
    /// missing cost basis, which is not the same as a zero-cost month.
    pub fn from_records(base_month: YearMonth, records: &[IndirectCostRecord]) -> Result<Self, CostingError> {
        let mut pool = Self {
            base_month,
            sp: 0.0,
            gif: 0.0,
            dep: 0.0,
            account_count: 0,
            variable_total: 0.0,
            fixed_total: 0.0,
        };

        for record in records.iter().filter(|r| r.base_month == base_month) {
            match record.distribution {
                DistributionType::Sp => pool.sp += record.amount,
                DistributionType::Gif => pool.gif += record.amount,
                DistributionType::Dep => pool.dep += record.amount,
            }
            if record.is_variable {
                pool.variable_total += record.amount;
            } else {
                pool.fixed_total += record.amount;
            }
            pool.account_count += 1;
        }

        if pool.account_count == 0 {
            return Err(CostingError::MissingCostBasis { base_month });
        }
        Ok(pool)
    }

    pub fn total(&self) -> f64 {
        self.sp + self.gif + self.dep
    }

    pub fn amount_for(&self, distribution: DistributionType) -> f64 {
        match distribution {
            DistributionType::Sp => self.sp,
            DistributionType::Gif => self.gif,
            DistributionType::Dep => self.dep,
        }
    }

    /// Scale every type by the inflation factor
    pub fn adjusted(&self, inflation: &InflationFactor) -> AdjustedPool {
        AdjustedPool {
            sp: inflation.apply(self.sp),
            gif: inflation.apply(self.gif),
            dep: inflation.apply(self.dep),
            factor: inflation.factor,
        }
    }

    pub fn summary(&self) -> PoolSummary {
        PoolSummary {
            base_month: self.base_month,
            total_sp: self.sp,
            total_gif: self.gif,
            total_dep: self.dep,
            total: self.total(),
            account_count: self.account_count,
            fixed_total: self.fixed_total,
            variable_total: self.variable_total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::costing::InflationAccumulator;
    use crate::catalog::InflationRecord;
    use approx::assert_relative_eq;

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    fn records() -> Vec<IndirectCostRecord> {
        let jan = ym("2025-01");
        vec![
            IndirectCostRecord::new("Sueldos", 1000.0, DistributionType::Sp, jan),
            IndirectCostRecord::new("Luz", 300.0, DistributionType::Gif, jan).variable(),
            IndirectCostRecord::new("Alquiler", 1700.0, DistributionType::Gif, jan),
            IndirectCostRecord::new("Maquinas", 500.0, DistributionType::Dep, jan),
            IndirectCostRecord::new("Sueldos", 9999.0, DistributionType::Sp, ym("2025-02")),
        ]
    }

    #[test]
    fn test_pool_groups_by_type_for_base_month() {
        let pool = IndirectCostPool::from_records(ym("2025-01"), &records()).unwrap();
        assert_eq!(pool.sp, 1000.0);
        assert_eq!(pool.gif, 2000.0);
        assert_eq!(pool.dep, 500.0);
        assert_eq!(pool.total(), 3500.0);
        assert_eq!(pool.account_count, 4);
        assert_eq!(pool.amount_for(DistributionType::Gif), 2000.0);

        let summary = pool.summary();
        assert_eq!(summary.variable_total, 300.0);
        assert_eq!(summary.fixed_total, 3200.0);
    }

    #[test]
    fn test_missing_base_month_is_distinguishable() {
        let err = IndirectCostPool::from_records(ym("2024-12"), &records()).unwrap_err();
        assert_eq!(err, CostingError::MissingCostBasis { base_month: ym("2024-12") });

        // A month whose accounts all sum to zero is still a valid basis
        let zero = vec![IndirectCostRecord::new("Nada", 0.0, DistributionType::Gif, ym("2025-03"))];
        let pool = IndirectCostPool::from_records(ym("2025-03"), &zero).unwrap();
        assert_eq!(pool.total(), 0.0);
    }

    #[test]
    fn test_adjusted_pool() {
        let pool = IndirectCostPool::from_records(ym("2025-01"), &records()).unwrap();
        let infl = InflationAccumulator::compound(
            ym("2025-01"),
            ym("2025-02"),
            &[InflationRecord::new(ym("2025-02"), 10.0)],
        );
        let adjusted = pool.adjusted(&infl);
        assert_relative_eq!(adjusted.sp, 1100.0, epsilon = 1e-9);
        assert_relative_eq!(adjusted.gif, 2200.0, epsilon = 1e-9);
        assert_relative_eq!(adjusted.dep, 550.0, epsilon = 1e-9);
        assert_relative_eq!(adjusted.total(), 3850.0, epsilon = 1e-9);
    }
}
