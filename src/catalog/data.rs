//! Master data records: products, raw materials, recipes, indirect costs, inflation and schedule

use crate::error::CostingError;
use crate::month::YearMonth;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Product identifier
pub type ProductId = u32;

/// Raw material identifier
pub type MaterialId = u32;

/// Packaging category: excluded from the waste-adjusted material subtotal
pub const PACKAGING_CATEGORY: &str = "ENVASES";

/// A manufactured product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique product identifier
    pub id: ProductId,

    /// Short product code
    pub code: String,

    /// Display name
    pub name: String,

    /// Gross input weight of one batch (kg)
    pub batch_weight_kg: f64,

    /// Process waste as a percentage of gross weight (0-100)
    pub waste_pct: f64,

    /// Labor minutes per net kg produced
    pub labor_minutes_per_kg: f64,

    /// Inactive products are excluded from forecasts and summaries
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Product {
    /// Create an active product
    pub fn new(
        id: ProductId,
        code: impl Into<String>,
        name: impl Into<String>,
        batch_weight_kg: f64,
        waste_pct: f64,
        labor_minutes_per_kg: f64,
    ) -> Self {
        Self {
            id,
            code: code.into(),
            name: name.into(),
            batch_weight_kg,
            waste_pct,
            labor_minutes_per_kg,
            active: true,
        }
    }

    /// Check the data model invariants
    pub fn validate(&self) -> Result<(), CostingError> {
        let invalid = |reason: &str| CostingError::InvalidProduct {
            product_id: self.id,
            reason: reason.to_string(),
        };
        if !(0.0..=100.0).contains(&self.waste_pct) {
            return Err(invalid("waste percent must be between 0 and 100"));
        }
        if self.batch_weight_kg < 0.0 || !self.batch_weight_kg.is_finite() {
            return Err(invalid("batch weight must be a non-negative number"));
        }
        if self.labor_minutes_per_kg < 0.0 {
            return Err(invalid("labor minutes per kg cannot be negative"));
        }
        Ok(())
    }

    /// Yield percentage: share of gross input that becomes finished product
    pub fn yield_pct(&self) -> f64 {
        100.0 - self.waste_pct
    }

    /// Net finished weight of one batch (kg)
    pub fn net_batch_weight_kg(&self) -> f64 {
        self.batch_weight_kg * self.yield_pct() / 100.0
    }

    /// Labor minutes needed to produce `kg`
    pub fn labor_minutes_for(&self, kg: f64) -> f64 {
        kg * self.labor_minutes_per_kg
    }
}

/// A purchasable raw material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMaterial {
    pub id: MaterialId,
    pub name: String,
    /// Grouping category (e.g. CARNE, ESPECIAS, ENVASES)
    pub category: String,
    /// Purchase unit (kg, unit, ...)
    pub unit: String,
    /// Cost per unit (>= 0)
    pub unit_cost: f64,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl RawMaterial {
    pub fn new(
        id: MaterialId,
        name: impl Into<String>,
        category: impl Into<String>,
        unit: impl Into<String>,
        unit_cost: f64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            category: category.into(),
            unit: unit.into(),
            unit_cost,
            active: true,
        }
    }

    pub fn is_packaging(&self) -> bool {
        self.category == PACKAGING_CATEGORY
    }
}

/// One ingredient of a product recipe, joined to its raw material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeLine {
    pub product_id: ProductId,
    pub material: RawMaterial,
    /// Quantity of material per batch
    pub quantity: f64,
}

impl RecipeLine {
    pub fn new(product_id: ProductId, material: RawMaterial, quantity: f64) -> Self {
        Self { product_id, material, quantity }
    }

    /// Cost of this line for one batch
    pub fn line_cost(&self) -> f64 {
        self.quantity * self.material.unit_cost
    }
}

/// How an indirect cost is distributed across the production mix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DistributionType {
    /// Salaries and payroll: by labor minutes, falling back to weight
    Sp,
    /// General manufacturing overhead: by weight
    Gif,
    /// Depreciation: by weight
    Dep,
}

impl DistributionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistributionType::Sp => "SP",
            DistributionType::Gif => "GIF",
            DistributionType::Dep => "DEP",
        }
    }
}

impl fmt::Display for DistributionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistributionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SP" => Ok(DistributionType::Sp),
            "GIF" => Ok(DistributionType::Gif),
            "DEP" => Ok(DistributionType::Dep),
            other => Err(format!("Unknown distribution type: {}", other)),
        }
    }
}

/// An indirect cost account amount for a base month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndirectCostRecord {
    pub account: String,
    pub amount: f64,
    pub distribution: DistributionType,
    pub base_month: YearMonth,
    /// Flags costs that vary with volume (reported, not scaled)
    #[serde(default)]
    pub is_variable: bool,
}

impl IndirectCostRecord {
    pub fn new(
        account: impl Into<String>,
        amount: f64,
        distribution: DistributionType,
        base_month: YearMonth,
    ) -> Self {
        Self {
            account: account.into(),
            amount,
            distribution,
            base_month,
            is_variable: false,
        }
    }

    pub fn variable(mut self) -> Self {
        self.is_variable = true;
        self
    }
}

/// Monthly inflation rate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InflationRecord {
    pub month: YearMonth,
    /// Percentage, e.g. 2.5 for 2.5%
    pub pct: f64,
}

impl InflationRecord {
    pub fn new(month: YearMonth, pct: f64) -> Self {
        Self { month, pct }
    }

    /// Multiplicative factor for this month
    pub fn factor(&self) -> f64 {
        1.0 + self.pct / 100.0
    }
}

/// A manually scheduled production run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledProductionEntry {
    pub product_id: ProductId,
    /// Number of batches (> 0)
    pub batches: f64,
    pub date: NaiveDate,
}

impl ScheduledProductionEntry {
    /// Create an entry, rejecting non-positive batch counts and dates outside
    /// the supported year range
    pub fn new(product_id: ProductId, batches: f64, date: NaiveDate) -> Result<Self, CostingError> {
        if !(batches > 0.0) || !batches.is_finite() {
            return Err(CostingError::InvalidQuantity {
                field: "batches".to_string(),
                value: batches,
            });
        }
        YearMonth::new(date.year(), date.month()).map_err(|_| CostingError::InvalidMonth {
            field: "schedule date".to_string(),
            value: date.to_string(),
        })?;
        Ok(Self { product_id, batches, date })
    }

    pub fn month(&self) -> YearMonth {
        YearMonth::from_date(self.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_yield() {
        let product = Product::new(1, "SAL-01", "Salchicha", 100.0, 3.6, 2.0);
        assert!((product.yield_pct() - 96.4).abs() < 1e-12);
        assert!((product.net_batch_weight_kg() - 96.4).abs() < 1e-9);
        assert!((product.labor_minutes_for(10.0) - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_product_validation() {
        assert!(Product::new(1, "A", "A", 10.0, 100.0, 0.0).validate().is_ok());
        let err = Product::new(2, "B", "B", 10.0, 100.5, 0.0).validate().unwrap_err();
        assert!(err.is_validation());
        assert!(Product::new(3, "C", "C", -1.0, 0.0, 0.0).validate().is_err());
    }

    #[test]
    fn test_distribution_type_parse() {
        assert_eq!("sp".parse::<DistributionType>().unwrap(), DistributionType::Sp);
        assert_eq!(" GIF ".parse::<DistributionType>().unwrap(), DistributionType::Gif);
        assert!("XYZ".parse::<DistributionType>().is_err());
        assert_eq!(serde_json::to_string(&DistributionType::Dep).unwrap(), "\"DEP\"");
    }

    #[test]
    fn test_schedule_entry_rejects_non_positive_batches() {
        let date = NaiveDate::from_ymd_opt(2025, 2, 3).unwrap();
        assert!(ScheduledProductionEntry::new(1, 0.0, date).is_err());
        assert!(ScheduledProductionEntry::new(1, -2.0, date).is_err());
        assert!(ScheduledProductionEntry::new(1, f64::NAN, date).is_err());
        let entry = ScheduledProductionEntry::new(1, 1.5, date).unwrap();
        assert_eq!(entry.month().to_string(), "2025-02");

        let too_early = NaiveDate::from_ymd_opt(1999, 12, 31).unwrap();
        let err = ScheduledProductionEntry::new(1, 1.0, too_early).unwrap_err();
        assert!(matches!(err, CostingError::InvalidMonth { .. }));
    }

    #[test]
    fn test_packaging_category() {
        let box_ = RawMaterial::new(1, "Caja", PACKAGING_CATEGORY, "unit", 2.0);
        let meat = RawMaterial::new(2, "Carne", "CARNE", "kg", 10.0);
        assert!(box_.is_packaging());
        assert!(!meat.is_packaging());
        assert_eq!(RecipeLine::new(1, meat, 3.0).line_cost(), 30.0);
    }
}
