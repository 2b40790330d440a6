//! Multi-period cost projection
//!
//! For each calendar month of the range the engine inflates the base pool,
//! picks the month's production mix according to the mode, costs every product
//! of the mix and distributes the pool over it.

use super::results::{MonthProjection, MonthSource, ProjectedProduct, ProjectionResult};
use crate::catalog::{ProductId, ScheduledProductionEntry};
use crate::costing::{cost_recipe, AllocationEngine, InflationAccumulator, IndirectCostPool, RecipeCost};
use crate::error::CostingError;
use crate::forecast::Forecaster;
use crate::mix::{HybridMixBuilder, MixOrigin, ProductionMix, SkippedProduct};
use crate::month::YearMonth;
use crate::repository::CostingRepositories;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// How each month's production mix is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionMode {
    /// Manual schedule only
    Manual,
    /// Forecasts for all active products, schedule ignored
    Ml,
    /// Manual schedule when the month has any, forecasts otherwise
    Mixed,
    /// Manual schedule for scheduled products, forecasts for the rest
    Hybrid,
}

impl ProjectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectionMode::Manual => "manual",
            ProjectionMode::Ml => "ml",
            ProjectionMode::Mixed => "mixed",
            ProjectionMode::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for ProjectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manual" => Ok(ProjectionMode::Manual),
            "ml" => Ok(ProjectionMode::Ml),
            "mixed" => Ok(ProjectionMode::Mixed),
            "hybrid" => Ok(ProjectionMode::Hybrid),
            other => Err(format!("Unknown projection mode: {}", other)),
        }
    }
}

/// Configuration for a projection run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionConfig {
    /// First projected month
    pub start: YearMonth,

    /// Last projected month (inclusive)
    pub end: YearMonth,

    /// Month whose indirect costs form the cost basis
    pub base_month: YearMonth,

    pub mode: ProjectionMode,
}

impl ProjectionConfig {
    pub fn new(
        start: YearMonth,
        end: YearMonth,
        base_month: YearMonth,
        mode: ProjectionMode,
    ) -> Result<Self, CostingError> {
        if end < start {
            return Err(CostingError::InvalidRange { start, end });
        }
        Ok(Self {
            start,
            end,
            base_month,
            mode,
        })
    }

    pub fn num_months(&self) -> usize {
        (self.start.months_until(self.end) + 1).max(0) as usize
    }
}

/// Main projection engine
pub struct ProjectionEngine<'a, R: CostingRepositories + ?Sized> {
    repo: &'a R,
    forecaster: &'a dyn Forecaster,
}

impl<'a, R: CostingRepositories + ?Sized> ProjectionEngine<'a, R> {
    pub fn new(repo: &'a R, forecaster: &'a dyn Forecaster) -> Self {
        Self { repo, forecaster }
    }

    /// Project every month of the configured range
    ///
    /// A base month without indirect cost records fails the whole run. Anything
    /// that goes wrong for a single month or product is reported in the result.
    pub fn project(&self, config: &ProjectionConfig) -> Result<ProjectionResult, CostingError> {
        let config = ProjectionConfig::new(config.start, config.end, config.base_month, config.mode)?;
        let pool = IndirectCostPool::from_records(config.base_month, &self.repo.for_base_month(config.base_month))?;

        let mut result = ProjectionResult::new(config);
        let mut recipes: BTreeMap<ProductId, RecipeCost> = BTreeMap::new();

        for month in YearMonth::range_inclusive(config.start, config.end) {
            let row = self.project_month(&config, &pool, month, &mut recipes);
            log::info!(
                "projection.month month={} source={} products={} kg={:.4} cost={:.2} uncosted={} skipped={}",
                row.month,
                row.source.as_str(),
                row.products.len(),
                row.total_kg,
                row.total_cost,
                row.uncosted_count,
                row.skipped.len()
            );
            result.add_month(row);
        }

        let summary = result.summary();
        log::info!(
            "projection.done start={} end={} base_month={} mode={} months={} kg={:.4} cost={:.2} cost_per_kg={:.4}",
            config.start,
            config.end,
            config.base_month,
            config.mode,
            summary.num_months,
            summary.total_kg,
            summary.total_cost,
            summary.cost_per_kg
        );

        Ok(result)
    }

    fn project_month(
        &self,
        config: &ProjectionConfig,
        pool: &IndirectCostPool,
        month: YearMonth,
        recipes: &mut BTreeMap<ProductId, RecipeCost>,
    ) -> MonthProjection {
        let inflation = InflationAccumulator::from_repository(self.repo, config.base_month, month);
        let (mix, source, skipped) = self.mix_for(config.mode, month);

        let mut row = MonthProjection::no_data(month, inflation.factor);
        row.skipped = skipped;
        if mix.is_empty() {
            return row;
        }
        row.source = source;

        let engine = AllocationEngine::new(pool.adjusted(&inflation));
        let distribution = match engine.distribute(&mix) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("projection.month_not_distributed month={} error={}", month, e);
                row.source = MonthSource::NoData;
                return row;
            }
        };
        row.sp_fallback = distribution.sp_fallback;

        for (entry, allocation) in mix.entries.iter().zip(&distribution.allocations) {
            let Some(product) = self.repo.get(entry.product_id) else {
                log::warn!(
                    "projection.product_skipped month={} product_id={} reason=not_found",
                    month,
                    entry.product_id
                );
                row.skipped.push(SkippedProduct {
                    product_id: entry.product_id,
                    reason: "product not found".to_string(),
                });
                continue;
            };

            let recipe = recipes
                .entry(product.id)
                .or_insert_with(|| cost_recipe(&product, &self.repo.lines_for(product.id)));

            let material_base_per_kg = recipe.cost_per_kg();
            let material_per_kg = inflation.apply(material_base_per_kg);
            let total_per_kg = material_per_kg + allocation.indirect_per_kg;

            row.products.push(ProjectedProduct {
                product_id: product.id,
                code: product.code.clone(),
                name: product.name.clone(),
                origin: entry.origin,
                kg: entry.kg,
                confidence: entry.confidence,
                method: entry.method.clone(),
                material_base_per_kg,
                material_per_kg,
                indirect_per_kg: allocation.indirect_per_kg,
                total_per_kg,
                total_cost: total_per_kg * entry.kg,
                uncosted: !recipe.is_costed(),
                warnings: recipe.warnings.clone(),
            });
        }

        row.finalize();
        row
    }

    /// The month's mix, its source tag and any products dropped while building it
    fn mix_for(&self, mode: ProjectionMode, month: YearMonth) -> (ProductionMix, MonthSource, Vec<SkippedProduct>) {
        match mode {
            ProjectionMode::Manual => {
                let schedule = self.repo.for_month(month);
                self.manual_mix(month, &schedule)
            }
            ProjectionMode::Ml => self.forecast_mix(month),
            ProjectionMode::Mixed => {
                let schedule = self.repo.for_month(month);
                if schedule.is_empty() {
                    self.forecast_mix(month)
                } else {
                    self.manual_mix(month, &schedule)
                }
            }
            ProjectionMode::Hybrid => {
                let built = HybridMixBuilder::new(self.forecaster).build_from(self.repo, month);
                let source = match (built.mix.count_origin(MixOrigin::Manual), built.mix.count_origin(MixOrigin::Ml)) {
                    (0, 0) => MonthSource::NoData,
                    (_, 0) => MonthSource::Manual,
                    (0, _) => MonthSource::Ml,
                    _ => MonthSource::Hybrid,
                };
                (built.mix, source, built.skipped)
            }
        }
    }

    fn manual_mix(
        &self,
        month: YearMonth,
        schedule: &[ScheduledProductionEntry],
    ) -> (ProductionMix, MonthSource, Vec<SkippedProduct>) {
        if schedule.is_empty() {
            return (ProductionMix::empty(month), MonthSource::NoData, Vec::new());
        }
        let (mix, skipped) = ProductionMix::from_schedule(month, schedule, self.repo);
        (mix, MonthSource::Manual, skipped)
    }

    fn forecast_mix(&self, month: YearMonth) -> (ProductionMix, MonthSource, Vec<SkippedProduct>) {
        if !self.forecaster.is_trained() {
            log::warn!("projection.forecast_unavailable month={} reason=untrained", month);
            return (ProductionMix::empty(month), MonthSource::NoData, Vec::new());
        }

        let product_ids: Vec<ProductId> = self.repo.active_products().iter().map(|p| p.id).collect();
        match self.forecaster.predict_month(&product_ids, month) {
            Ok(predictions) => {
                let (mix, skipped) = ProductionMix::from_forecasts(month, &predictions, self.repo);
                (mix, MonthSource::Ml, skipped)
            }
            Err(e) => {
                log::warn!("projection.forecast_unavailable month={} error={}", month, e);
                (ProductionMix::empty(month), MonthSource::NoData, Vec::new())
            }
        }
    }
}
