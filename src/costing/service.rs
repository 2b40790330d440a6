//! Product-level costing operations over the repositories
//!
//! Combines the recipe calculator, inflation, the indirect pool and the
//! allocation engine into the lookups a caller actually asks for: the full cost
//! of one product in a production month, the distribution report for a month,
//! and the costing summary of the whole catalog.

use super::allocation::{AllocationBasis, AllocationEngine, Distribution, DriverTotals, ProductAllocation};
use super::inflation::{InflationAccumulator, InflationFactor};
use super::pool::{AdjustedPool, IndirectCostPool, PoolSummary};
use super::recipe::{cost_recipe, CostWarning, RecipeCost};
use crate::catalog::{Product, ProductId};
use crate::error::CostingError;
use crate::forecast::Forecaster;
use crate::mix::{HybridMixBuilder, MixOrigin, ProductionMix, SkippedProduct};
use crate::month::YearMonth;
use crate::repository::CostingRepositories;
use rayon::prelude::*;
use serde::Serialize;

/// Indirect cost detail of a full product costing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndirectDetail {
    pub base_month: YearMonth,
    pub production_month: YearMonth,
    pub inflation_pct: f64,
    pub pool: AdjustedPool,
    pub allocation: ProductAllocation,
    pub totals: DriverTotals,
    pub basis: AllocationBasis,
    pub sp_fallback: bool,
    /// Product's share of month kg, in percent (100 for a synthetic batch)
    pub kg_participation_pct: f64,
    /// Product's share of the SP driver, in percent
    pub minutes_participation_pct: f64,
}

/// Indirect block of a full costing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IndirectOutcome {
    Allocated(IndirectDetail),
    /// No indirect cost records for the base month; indirect cost is not estimated
    MissingCostBasis { base_month: YearMonth },
}

/// Per-kg totals of a full costing
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FullCostSummary {
    /// Recipe cost per kg at current prices
    pub material_base_per_kg: f64,
    /// Recipe cost per kg inflated to the production month
    pub material_per_kg: f64,
    pub indirect_per_kg: f64,
    pub total_per_kg: f64,
    pub inflation_pct: f64,
}

/// Variable plus indirect cost of one product for a production month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullCost {
    pub product: Product,
    pub production_month: YearMonth,
    pub recipe: RecipeCost,
    /// Absent when no base month was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indirect: Option<IndirectOutcome>,
    pub summary: FullCostSummary,
}

/// One product line of a distribution report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionLine {
    pub product_id: ProductId,
    pub code: String,
    pub name: String,
    pub batches: Option<f64>,
    pub origin: MixOrigin,
    pub allocation: ProductAllocation,
}

/// Indirect cost distribution over a month's production
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionReport {
    pub base_month: YearMonth,
    pub production_month: YearMonth,
    pub inflation_pct: f64,
    pub pool: PoolSummary,
    pub adjusted: AdjustedPool,
    pub totals: DriverTotals,
    pub sp_fallback: bool,
    pub lines: Vec<DistributionLine>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedProduct>,
}

impl DistributionReport {
    pub fn total_indirect(&self) -> f64 {
        self.lines.iter().map(|l| l.allocation.indirect_total).sum()
    }
}

/// One row of the catalog costing summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostingSummaryRow {
    pub product_id: ProductId,
    pub code: String,
    pub name: String,
    pub total_variable_cost: f64,
    pub cost_per_kg: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<CostWarning>>,
}

/// Costing lookups backed by a repository bundle
pub struct CostingService<'r, R: CostingRepositories + ?Sized> {
    repo: &'r R,
}

impl<'r, R: CostingRepositories + ?Sized> CostingService<'r, R> {
    pub fn new(repo: &'r R) -> Self {
        Self { repo }
    }

    /// Recipe cost of one product at current material prices
    pub fn recipe_cost(&self, product_id: ProductId) -> Result<RecipeCost, CostingError> {
        let product = self.repo.require(product_id)?;
        Ok(cost_recipe(&product, &self.repo.lines_for(product_id)))
    }

    /// Adjusted pool for (base → production), or `MissingCostBasis`
    pub fn adjusted_pool(
        &self,
        base_month: YearMonth,
        production_month: YearMonth,
    ) -> Result<(IndirectCostPool, InflationFactor, AdjustedPool), CostingError> {
        let pool = IndirectCostPool::from_records(base_month, &self.repo.for_base_month(base_month))?;
        let inflation = InflationAccumulator::from_repository(self.repo, base_month, production_month);
        let adjusted = pool.adjusted(&inflation);
        Ok((pool, inflation, adjusted))
    }

    pub fn pool_summary(&self, base_month: YearMonth) -> Result<PoolSummary, CostingError> {
        IndirectCostPool::from_records(base_month, &self.repo.for_base_month(base_month)).map(|p| p.summary())
    }

    /// Full cost per kg of one product produced in `production_month`
    ///
    /// Without a base month only the variable cost is reported. A base month
    /// without indirect cost records yields the `MissingCostBasis` sentinel
    /// and no indirect cost, while material cost is still inflated.
    pub fn full_cost(
        &self,
        product_id: ProductId,
        base_month: Option<YearMonth>,
        production_month: YearMonth,
    ) -> Result<FullCost, CostingError> {
        let product = self.repo.require(product_id)?;
        let recipe = cost_recipe(&product, &self.repo.lines_for(product_id));
        let material_base_per_kg = recipe.cost_per_kg();

        let Some(base_month) = base_month else {
            return Ok(FullCost {
                product,
                production_month,
                recipe,
                indirect: None,
                summary: FullCostSummary {
                    material_base_per_kg,
                    material_per_kg: material_base_per_kg,
                    indirect_per_kg: 0.0,
                    total_per_kg: material_base_per_kg,
                    inflation_pct: 0.0,
                },
            });
        };

        let inflation = InflationAccumulator::from_repository(self.repo, base_month, production_month);
        let material_per_kg = inflation.apply(material_base_per_kg);

        let records = self.repo.for_base_month(base_month);
        let (indirect, indirect_per_kg) = match IndirectCostPool::from_records(base_month, &records) {
            Ok(pool) => {
                let adjusted = pool.adjusted(&inflation);
                let (mix, _) =
                    ProductionMix::from_schedule(production_month, &self.repo.for_month(production_month), self.repo);
                let single = AllocationEngine::new(adjusted).allocate_single(&product, &mix);
                let alloc = single.allocation;
                let kg_participation_pct = if single.totals.total_kg > 0.0 {
                    alloc.kg / single.totals.total_kg * 100.0
                } else {
                    100.0
                };
                let detail = IndirectDetail {
                    base_month,
                    production_month,
                    inflation_pct: inflation.accumulated_pct(),
                    pool: adjusted,
                    allocation: alloc,
                    totals: single.totals,
                    basis: single.basis,
                    sp_fallback: single.sp_fallback,
                    kg_participation_pct,
                    minutes_participation_pct: alloc.minutes_share * 100.0,
                };
                (IndirectOutcome::Allocated(detail), alloc.indirect_per_kg)
            }
            Err(CostingError::MissingCostBasis { base_month }) => {
                log::warn!(
                    "full_cost.missing_cost_basis product_id={} base_month={} production_month={}",
                    product_id,
                    base_month,
                    production_month
                );
                (IndirectOutcome::MissingCostBasis { base_month }, 0.0)
            }
            Err(e) => return Err(e),
        };

        let total_per_kg = material_per_kg + indirect_per_kg;
        log::info!(
            "full_cost.done product_id={} base_month={} production_month={} inflation_pct={:.2} ind_per_kg={:.4} total_per_kg={:.4}",
            product_id,
            base_month,
            production_month,
            inflation.accumulated_pct(),
            indirect_per_kg,
            total_per_kg
        );

        Ok(FullCost {
            product,
            production_month,
            recipe,
            indirect: Some(indirect),
            summary: FullCostSummary {
                material_base_per_kg,
                material_per_kg,
                indirect_per_kg,
                total_per_kg,
                inflation_pct: inflation.accumulated_pct(),
            },
        })
    }

    /// Distribution of the adjusted pool over the month's manual schedule
    pub fn distribution(
        &self,
        base_month: YearMonth,
        production_month: YearMonth,
    ) -> Result<DistributionReport, CostingError> {
        let (pool, inflation, adjusted) = self.adjusted_pool(base_month, production_month)?;
        let (mix, skipped) =
            ProductionMix::from_schedule(production_month, &self.repo.for_month(production_month), self.repo);
        self.report(pool, inflation, adjusted, mix, skipped)
    }

    /// Distribution over the hybrid mix: schedule plus forecasts for unscheduled products
    pub fn distribution_hybrid(
        &self,
        base_month: YearMonth,
        production_month: YearMonth,
        forecaster: &dyn Forecaster,
    ) -> Result<DistributionReport, CostingError> {
        let (pool, inflation, adjusted) = self.adjusted_pool(base_month, production_month)?;
        let built = HybridMixBuilder::new(forecaster).build_from(self.repo, production_month);
        self.report(pool, inflation, adjusted, built.mix, built.skipped)
    }

    fn report(
        &self,
        pool: IndirectCostPool,
        inflation: InflationFactor,
        adjusted: AdjustedPool,
        mix: ProductionMix,
        skipped: Vec<SkippedProduct>,
    ) -> Result<DistributionReport, CostingError> {
        let Distribution {
            totals,
            sp_fallback,
            allocations,
        } = AllocationEngine::new(adjusted).distribute(&mix)?;

        let lines = mix
            .entries
            .iter()
            .zip(allocations)
            .map(|(entry, allocation)| {
                let (code, name) = self
                    .repo
                    .get(entry.product_id)
                    .map(|p| (p.code, p.name))
                    .unwrap_or_default();
                DistributionLine {
                    product_id: entry.product_id,
                    code,
                    name,
                    batches: entry.batches,
                    origin: entry.origin,
                    allocation,
                }
            })
            .collect::<Vec<_>>();

        log::info!(
            "distribution.done base_month={} production_month={} inflation_pct={:.2} sp_aj={:.2} gif_aj={:.2} dep_aj={:.2} kg_total={:.4} min_total={:.4} items={}",
            pool.base_month,
            mix.month,
            inflation.accumulated_pct(),
            adjusted.sp,
            adjusted.gif,
            adjusted.dep,
            totals.total_kg,
            totals.total_minutes,
            lines.len()
        );

        Ok(DistributionReport {
            base_month: pool.base_month,
            production_month: mix.month,
            inflation_pct: inflation.accumulated_pct(),
            pool: pool.summary(),
            adjusted,
            totals,
            sp_fallback,
            lines,
            skipped,
        })
    }
}

impl<'r, R: CostingRepositories + Sync + ?Sized> CostingService<'r, R> {
    /// Recipe cost of every active product, ordered by id
    pub fn costing_summary(&self) -> Vec<CostingSummaryRow> {
        let products = self.repo.active_products();
        let mut rows: Vec<CostingSummaryRow> = products
            .par_iter()
            .map(|product| {
                let cost = cost_recipe(product, &self.repo.lines_for(product.id));
                CostingSummaryRow {
                    product_id: product.id,
                    code: product.code.clone(),
                    name: product.name.clone(),
                    total_variable_cost: cost.summary.total_variable_cost,
                    cost_per_kg: cost.summary.cost_per_kg,
                    warnings: cost.warnings,
                }
            })
            .collect();
        rows.sort_by_key(|r| r.product_id);
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DistributionType, IndirectCostRecord, InflationRecord, RawMaterial, ScheduledProductionEntry};
    use crate::forecast::StaticForecaster;
    use crate::repository::InMemoryRepository;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    /// 10 kg of material at $1000/kg, batch 10 kg, no waste; GIF $2000 in Jan; 10% in Feb
    fn scenario_repo() -> InMemoryRepository {
        let mut repo = InMemoryRepository::new();
        repo.add_product(Product::new(1, "P1", "Producto", 10.0, 0.0, 0.0)).unwrap();
        repo.add_material(RawMaterial::new(1, "Carne", "CARNE", "kg", 1000.0)).unwrap();
        repo.add_recipe_line(1, 1, 10.0).unwrap();
        repo.add_indirect_cost(IndirectCostRecord::new("Gastos", 2000.0, DistributionType::Gif, ym("2025-01")))
            .unwrap();
        repo.add_inflation(InflationRecord::new(ym("2025-02"), 10.0)).unwrap();
        repo.add_schedule_entry(
            ScheduledProductionEntry::new(1, 1.0, NaiveDate::from_ymd_opt(2025, 2, 15).unwrap()).unwrap(),
        )
        .unwrap();
        repo
    }

    #[test]
    fn test_full_cost_scenario() {
        let repo = scenario_repo();
        let service = CostingService::new(&repo);
        let cost = service.full_cost(1, Some(ym("2025-01")), ym("2025-02")).unwrap();

        assert_relative_eq!(cost.summary.material_base_per_kg, 1000.0);
        assert_relative_eq!(cost.summary.material_per_kg, 1100.0, epsilon = 1e-9);
        assert_relative_eq!(cost.summary.indirect_per_kg, 220.0, epsilon = 1e-9);
        assert_relative_eq!(cost.summary.total_per_kg, 1320.0, epsilon = 1e-9);
        assert_relative_eq!(cost.summary.inflation_pct, 10.0, epsilon = 1e-9);

        match cost.indirect {
            Some(IndirectOutcome::Allocated(detail)) => {
                assert_eq!(detail.basis, AllocationBasis::Mix);
                assert_relative_eq!(detail.kg_participation_pct, 100.0);
            }
            other => panic!("expected allocated indirect block, got {:?}", other),
        }
    }

    #[test]
    fn test_full_cost_without_base_month() {
        let repo = scenario_repo();
        let cost = CostingService::new(&repo).full_cost(1, None, ym("2025-02")).unwrap();
        assert!(cost.indirect.is_none());
        assert_eq!(cost.summary.total_per_kg, 1000.0);
    }

    #[test]
    fn test_full_cost_missing_cost_basis_is_sentinel() {
        let repo = scenario_repo();
        let cost = CostingService::new(&repo)
            .full_cost(1, Some(ym("2024-12")), ym("2025-02"))
            .unwrap();
        assert_eq!(
            cost.indirect,
            Some(IndirectOutcome::MissingCostBasis { base_month: ym("2024-12") })
        );
        assert_eq!(cost.summary.indirect_per_kg, 0.0);
        assert_relative_eq!(cost.summary.total_per_kg, cost.summary.material_per_kg);
    }

    #[test]
    fn test_full_cost_synthetic_batch_when_month_empty() {
        let repo = scenario_repo();
        let cost = CostingService::new(&repo)
            .full_cost(1, Some(ym("2025-01")), ym("2025-03"))
            .unwrap();
        let Some(IndirectOutcome::Allocated(detail)) = cost.indirect else {
            panic!("expected allocation");
        };
        assert_eq!(detail.basis, AllocationBasis::SyntheticBatch);
        // No March inflation record: factor stays at 1.10
        assert_relative_eq!(cost.summary.indirect_per_kg, 220.0, epsilon = 1e-9);
    }

    #[test]
    fn test_full_cost_unknown_product() {
        let repo = scenario_repo();
        let err = CostingService::new(&repo).full_cost(42, None, ym("2025-02")).unwrap_err();
        assert_eq!(err, CostingError::ProductNotFound(42));
    }

    #[test]
    fn test_distribution_errors() {
        let repo = scenario_repo();
        let service = CostingService::new(&repo);

        let report = service.distribution(ym("2025-01"), ym("2025-02")).unwrap();
        assert_eq!(report.lines.len(), 1);
        assert_relative_eq!(report.total_indirect(), 2200.0, epsilon = 1e-9);
        assert_eq!(report.pool.total_gif, 2000.0);

        assert!(matches!(
            service.distribution(ym("2024-06"), ym("2025-02")),
            Err(CostingError::MissingCostBasis { .. })
        ));
        assert!(matches!(
            service.distribution(ym("2025-01"), ym("2025-05")),
            Err(CostingError::NoProduction { .. })
        ));
    }

    #[test]
    fn test_distribution_hybrid_adds_forecast_products() {
        let mut repo = scenario_repo();
        repo.add_product(Product::new(2, "P2", "Otro", 10.0, 0.0, 0.0)).unwrap();
        let forecaster = StaticForecaster::new().with(ym("2025-02"), 2, 30.0, 0.6);

        let report = CostingService::new(&repo)
            .distribution_hybrid(ym("2025-01"), ym("2025-02"), &forecaster)
            .unwrap();
        assert_eq!(report.lines.len(), 2);
        assert_eq!(report.lines[1].origin, MixOrigin::Ml);
        assert_relative_eq!(report.totals.total_kg, 40.0);
        assert_relative_eq!(report.total_indirect(), 2200.0, epsilon = 1e-9);
    }

    #[test]
    fn test_costing_summary_sorted() {
        let mut repo = scenario_repo();
        repo.add_product(Product::new(5, "P5", "Sin receta", 10.0, 0.0, 0.0)).unwrap();
        let rows = CostingService::new(&repo).costing_summary();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].product_id, 1);
        assert_eq!(rows[0].cost_per_kg, 1000.0);
        assert_eq!(rows[1].warnings, Some(vec![CostWarning::NoRecipe]));
    }
}
