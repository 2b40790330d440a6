//! Output structures for multi-period projections

use super::engine::{ProjectionConfig, ProjectionMode};
use crate::catalog::ProductId;
use crate::costing::CostWarning;
use crate::mix::{MixOrigin, SkippedProduct};
use crate::month::YearMonth;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Where a month's production mix came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthSource {
    Manual,
    Ml,
    /// Manual schedule plus forecasts for unscheduled products
    Hybrid,
    /// Nothing to project: no schedule, or no usable forecast
    NoData,
}

impl MonthSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonthSource::Manual => "manual",
            MonthSource::Ml => "ml",
            MonthSource::Hybrid => "hybrid",
            MonthSource::NoData => "no_data",
        }
    }
}

/// Projected cost of one product in one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedProduct {
    pub product_id: ProductId,
    pub code: String,
    pub name: String,
    pub origin: MixOrigin,
    pub kg: f64,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Recipe cost per kg at current prices
    pub material_base_per_kg: f64,
    pub material_per_kg: f64,
    pub indirect_per_kg: f64,
    pub total_per_kg: f64,
    pub total_cost: f64,

    /// Material cost is an "unknown" zero, not a real cost
    pub uncosted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<CostWarning>>,
}

/// One month of a projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthProjection {
    pub month: YearMonth,
    pub source: MonthSource,
    pub inflation_factor: f64,
    pub inflation_pct: f64,
    pub products: Vec<ProjectedProduct>,
    pub total_kg: f64,
    pub total_cost: f64,
    pub cost_per_kg: f64,
    /// Products itemized without a usable recipe cost
    pub uncosted_count: usize,
    pub sp_fallback: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedProduct>,
}

impl MonthProjection {
    /// A month with nothing produced
    pub fn no_data(month: YearMonth, inflation_factor: f64) -> Self {
        Self {
            month,
            source: MonthSource::NoData,
            inflation_factor,
            inflation_pct: (inflation_factor - 1.0) * 100.0,
            products: Vec::new(),
            total_kg: 0.0,
            total_cost: 0.0,
            cost_per_kg: 0.0,
            uncosted_count: 0,
            sp_fallback: false,
            skipped: Vec::new(),
        }
    }

    /// Recompute the month totals from the product lines
    pub fn finalize(&mut self) {
        self.total_kg = self.products.iter().map(|p| p.kg).sum();
        self.total_cost = self.products.iter().map(|p| p.total_cost).sum();
        self.cost_per_kg = if self.total_kg > 0.0 {
            self.total_cost / self.total_kg
        } else {
            0.0
        };
        self.uncosted_count = self.products.iter().filter(|p| p.uncosted).count();
    }
}

/// Complete projection result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionResult {
    pub config: ProjectionConfig,
    pub months: Vec<MonthProjection>,
}

/// Period-level aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub start: YearMonth,
    pub end: YearMonth,
    pub base_month: YearMonth,
    pub mode: ProjectionMode,
    pub num_months: usize,
    pub total_kg: f64,
    pub total_cost: f64,
    /// Total cost / total kg (0 without production)
    pub cost_per_kg: f64,
    pub cost_per_month_avg: f64,
    pub manual_months: usize,
    pub ml_months: usize,
    pub hybrid_months: usize,
    pub no_data_months: usize,
    pub uncosted_products: usize,
}

/// Flat CSV row: one product per month, or one empty row for a month without production
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    month: String,
    source: &'static str,
    product_id: Option<ProductId>,
    code: &'a str,
    name: &'a str,
    origin: Option<MixOrigin>,
    kg: f64,
    material_per_kg: f64,
    indirect_per_kg: f64,
    total_per_kg: f64,
    total_cost: f64,
    uncosted: bool,
}

impl ProjectionResult {
    pub fn new(config: ProjectionConfig) -> Self {
        Self {
            config,
            months: Vec::new(),
        }
    }

    pub fn add_month(&mut self, month: MonthProjection) {
        self.months.push(month);
    }

    pub fn month(&self, month: YearMonth) -> Option<&MonthProjection> {
        self.months.iter().find(|m| m.month == month)
    }

    pub fn summary(&self) -> PeriodSummary {
        let total_kg: f64 = self.months.iter().map(|m| m.total_kg).sum();
        let total_cost: f64 = self.months.iter().map(|m| m.total_cost).sum();
        let num_months = self.months.len();
        let count = |source: MonthSource| self.months.iter().filter(|m| m.source == source).count();

        PeriodSummary {
            start: self.config.start,
            end: self.config.end,
            base_month: self.config.base_month,
            mode: self.config.mode,
            num_months,
            total_kg,
            total_cost,
            cost_per_kg: if total_kg > 0.0 { total_cost / total_kg } else { 0.0 },
            cost_per_month_avg: if num_months > 0 {
                total_cost / num_months as f64
            } else {
                0.0
            },
            manual_months: count(MonthSource::Manual),
            ml_months: count(MonthSource::Ml),
            hybrid_months: count(MonthSource::Hybrid),
            no_data_months: count(MonthSource::NoData),
            uncosted_products: self.months.iter().map(|m| m.uncosted_count).sum(),
        }
    }

    /// Write the projection as flat CSV
    pub fn write_csv<W: Write>(&self, writer: W) -> csv::Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        for month in &self.months {
            if month.products.is_empty() {
                csv_writer.serialize(CsvRow {
                    month: month.month.to_string(),
                    source: month.source.as_str(),
                    product_id: None,
                    code: "",
                    name: "",
                    origin: None,
                    kg: 0.0,
                    material_per_kg: 0.0,
                    indirect_per_kg: 0.0,
                    total_per_kg: 0.0,
                    total_cost: 0.0,
                    uncosted: false,
                })?;
                continue;
            }
            for product in &month.products {
                csv_writer.serialize(CsvRow {
                    month: month.month.to_string(),
                    source: month.source.as_str(),
                    product_id: Some(product.product_id),
                    code: &product.code,
                    name: &product.name,
                    origin: Some(product.origin),
                    kg: product.kg,
                    material_per_kg: product.material_per_kg,
                    indirect_per_kg: product.indirect_per_kg,
                    total_per_kg: product.total_per_kg,
                    total_cost: product.total_cost,
                    uncosted: product.uncosted,
                })?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }
}
