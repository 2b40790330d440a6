//! Driver-based distribution of an adjusted indirect cost pool over a production mix
//!
//! SP follows labor minutes, GIF and DEP follow weight. When the mix records no
//! labor minutes at all, SP falls back to the weight share so that every product
//! carries its proportional part instead of one product absorbing the whole pool.

use super::pool::AdjustedPool;
use crate::catalog::{Product, ProductId};
use crate::error::CostingError;
use crate::mix::ProductionMix;
use serde::{Deserialize, Serialize};

/// Mix-wide driver totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverTotals {
    pub total_kg: f64,
    pub total_minutes: f64,
}

impl DriverTotals {
    /// SP is distributed by weight when no minutes are recorded
    pub fn sp_falls_back_to_kg(&self) -> bool {
        self.total_minutes <= 0.0
    }
}

/// One product's share of the pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductAllocation {
    pub product_id: ProductId,
    pub kg: f64,
    pub labor_minutes: f64,
    /// Fraction of mix kg (0-1)
    pub kg_share: f64,
    /// Fraction used for SP (0-1); equals `kg_share` under fallback
    pub minutes_share: f64,
    pub cost_sp: f64,
    pub cost_gif: f64,
    pub cost_dep: f64,
    pub indirect_total: f64,
    pub indirect_per_kg: f64,
}

/// Which mix a single-product allocation was computed against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationBasis {
    /// The month's real production mix
    Mix,
    /// No production that month: the product alone, one batch
    SyntheticBatch,
}

/// Multi-product distribution for one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub totals: DriverTotals,
    pub sp_fallback: bool,
    /// Ordered by product id
    pub allocations: Vec<ProductAllocation>,
}

impl Distribution {
    pub fn get(&self, product_id: ProductId) -> Option<&ProductAllocation> {
        self.allocations.iter().find(|a| a.product_id == product_id)
    }

    pub fn total_sp(&self) -> f64 {
        self.allocations.iter().map(|a| a.cost_sp).sum()
    }

    pub fn total_gif(&self) -> f64 {
        self.allocations.iter().map(|a| a.cost_gif).sum()
    }

    pub fn total_dep(&self) -> f64 {
        self.allocations.iter().map(|a| a.cost_dep).sum()
    }

    pub fn total_indirect(&self) -> f64 {
        self.allocations.iter().map(|a| a.indirect_total).sum()
    }
}

/// Single-product lookup result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SingleAllocation {
    pub allocation: ProductAllocation,
    pub totals: DriverTotals,
    pub basis: AllocationBasis,
    pub sp_fallback: bool,
}

/// Distributes one adjusted pool
#[derive(Debug, Clone, Copy)]
pub struct AllocationEngine {
    pool: AdjustedPool,
}

impl AllocationEngine {
    pub fn new(pool: AdjustedPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &AdjustedPool {
        &self.pool
    }

    pub fn driver_totals(mix: &ProductionMix) -> DriverTotals {
        DriverTotals {
            total_kg: mix.total_kg(),
            total_minutes: mix.total_minutes(),
        }
    }

    /// Share of the pool for `kg`/`minutes` of production against `totals`
    pub fn allocate_entry(
        &self,
        product_id: ProductId,
        kg: f64,
        labor_minutes: f64,
        totals: DriverTotals,
    ) -> ProductAllocation {
        if kg <= 0.0 {
            return ProductAllocation {
                product_id,
                kg: kg.max(0.0),
                labor_minutes,
                ..Default::default()
            };
        }

        let kg_share = if totals.total_kg > 0.0 { kg / totals.total_kg } else { 0.0 };
        let minutes_share = if totals.total_minutes > 0.0 {
            labor_minutes / totals.total_minutes
        } else {
            kg_share
        };

        let cost_sp = self.pool.sp * minutes_share;
        let cost_gif = self.pool.gif * kg_share;
        let cost_dep = self.pool.dep * kg_share;
        let indirect_total = cost_sp + cost_gif + cost_dep;

        ProductAllocation {
            product_id,
            kg,
            labor_minutes,
            kg_share,
            minutes_share,
            cost_sp,
            cost_gif,
            cost_dep,
            indirect_total,
            indirect_per_kg: indirect_total / kg,
        }
    }

    /// Distribute the pool over every product of the mix
    ///
    /// An empty mix is `NoProduction`; no synthetic batch is used here.
    pub fn distribute(&self, mix: &ProductionMix) -> Result<Distribution, CostingError> {
        let totals = Self::driver_totals(mix);
        if mix.is_empty() || totals.total_kg <= 0.0 {
            return Err(CostingError::NoProduction { month: mix.month });
        }

        let sp_fallback = self.log_fallback(mix, totals);
        let allocations = mix
            .entries
            .iter()
            .map(|e| self.allocate_entry(e.product_id, e.kg, e.labor_minutes, totals))
            .collect();

        Ok(Distribution {
            totals,
            sp_fallback,
            allocations,
        })
    }

    /// Allocation for one product looked up in isolation
    ///
    /// Against a mix with production the product gets its real share (zero if
    /// it is not in the mix). With no production at all the product is treated
    /// as 100% of a one-batch mix.
    pub fn allocate_single(&self, product: &Product, mix: &ProductionMix) -> SingleAllocation {
        let mut totals = Self::driver_totals(mix);
        let (kg, minutes, basis) = if totals.total_kg > 0.0 {
            match mix.get(product.id) {
                Some(entry) => (entry.kg, entry.labor_minutes, AllocationBasis::Mix),
                None => (0.0, 0.0, AllocationBasis::Mix),
            }
        } else {
            let kg = product.batch_weight_kg;
            let minutes = product.labor_minutes_for(kg);
            totals = DriverTotals {
                total_kg: kg,
                total_minutes: minutes,
            };
            (kg, minutes, AllocationBasis::SyntheticBatch)
        };

        let sp_fallback = self.log_fallback(mix, totals);
        SingleAllocation {
            allocation: self.allocate_entry(product.id, kg, minutes, totals),
            totals,
            basis,
            sp_fallback,
        }
    }

    fn log_fallback(&self, mix: &ProductionMix, totals: DriverTotals) -> bool {
        let fallback = totals.sp_falls_back_to_kg() && totals.total_kg > 0.0 && self.pool.sp > 0.0;
        if fallback {
            log::info!(
                "allocation.sp_fallback_to_kg month={} total_kg={:.4}",
                mix.month,
                totals.total_kg
            );
        }
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mix::{MixEntry, MixOrigin};
    use crate::month::YearMonth;
    use approx::assert_relative_eq;

    fn pool() -> AdjustedPool {
        AdjustedPool {
            sp: 1000.0,
            gif: 2000.0,
            dep: 500.0,
            factor: 1.0,
        }
    }

    fn mix_of(entries: &[(ProductId, f64, f64)]) -> ProductionMix {
        let mut mix = ProductionMix::empty("2025-02".parse::<YearMonth>().unwrap());
        for &(product_id, kg, labor_minutes) in entries {
            mix.push(MixEntry {
                product_id,
                kg,
                labor_minutes,
                batches: Some(1.0),
                origin: MixOrigin::Manual,
                confidence: 1.0,
                method: None,
            });
        }
        mix
    }

    #[test]
    fn test_conservation_across_mix() {
        let engine = AllocationEngine::new(pool());
        let mix = mix_of(&[(1, 120.0, 300.0), (2, 45.5, 10.0), (3, 300.0, 900.0)]);
        let dist = engine.distribute(&mix).unwrap();

        assert!(!dist.sp_fallback);
        assert_relative_eq!(dist.total_sp(), 1000.0, epsilon = 1e-9);
        assert_relative_eq!(dist.total_gif(), 2000.0, epsilon = 1e-9);
        assert_relative_eq!(dist.total_dep(), 500.0, epsilon = 1e-9);
        assert_relative_eq!(dist.total_indirect(), 3500.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sp_by_minutes_gif_by_kg() {
        let engine = AllocationEngine::new(pool());
        let mix = mix_of(&[(1, 10.0, 300.0), (2, 30.0, 100.0)]);
        let dist = engine.distribute(&mix).unwrap();

        let a = dist.get(1).unwrap();
        assert_relative_eq!(a.kg_share, 0.25);
        assert_relative_eq!(a.minutes_share, 0.75);
        assert_relative_eq!(a.cost_sp, 750.0);
        assert_relative_eq!(a.cost_gif, 500.0);
        assert_relative_eq!(a.cost_dep, 125.0);
        assert_relative_eq!(a.indirect_per_kg, 137.5);
    }

    #[test]
    fn test_sp_fallback_scenario() {
        let engine = AllocationEngine::new(pool());
        let mix = mix_of(&[(1, 10.0, 0.0), (2, 20.0, 0.0)]);
        let dist = engine.distribute(&mix).unwrap();

        assert!(dist.sp_fallback);
        for allocation in &dist.allocations {
            assert_relative_eq!(allocation.indirect_per_kg, 3500.0 / 30.0, epsilon = 1e-9);
            assert_relative_eq!(allocation.minutes_share, allocation.kg_share);
        }
        assert_relative_eq!(dist.total_sp(), 1000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sp_fallback_symmetry_single_vs_distribution() {
        let engine = AllocationEngine::new(pool());
        let mix = mix_of(&[(1, 10.0, 0.0), (2, 20.0, 0.0)]);
        let dist = engine.distribute(&mix).unwrap();

        for (id, batch_weight) in [(1, 10.0), (2, 20.0)] {
            let product = Product::new(id, "P", "P", batch_weight, 0.0, 0.0);
            let single = engine.allocate_single(&product, &mix);
            assert_eq!(single.basis, AllocationBasis::Mix);
            assert_relative_eq!(
                single.allocation.indirect_per_kg,
                dist.get(id).unwrap().indirect_per_kg,
                epsilon = 1e-12
            );
            assert!(single.allocation.cost_sp < 1000.0);
        }
    }

    #[test]
    fn test_empty_mix_uses_synthetic_batch_only_for_single_lookup() {
        let engine = AllocationEngine::new(pool());
        let empty = mix_of(&[]);

        let err = engine.distribute(&empty).unwrap_err();
        assert!(matches!(err, CostingError::NoProduction { .. }));

        let product = Product::new(1, "P", "P", 50.0, 10.0, 2.0);
        let single = engine.allocate_single(&product, &empty);
        assert_eq!(single.basis, AllocationBasis::SyntheticBatch);
        assert_eq!(single.allocation.kg, 50.0);
        assert_eq!(single.allocation.kg_share, 1.0);
        assert_eq!(single.allocation.minutes_share, 1.0);
        assert_relative_eq!(single.allocation.indirect_per_kg, 3500.0 / 50.0);
    }

    #[test]
    fn test_product_absent_from_mix_gets_nothing() {
        let engine = AllocationEngine::new(pool());
        let mix = mix_of(&[(1, 10.0, 5.0)]);
        let product = Product::new(2, "P", "P", 50.0, 0.0, 1.0);
        let single = engine.allocate_single(&product, &mix);
        assert_eq!(single.basis, AllocationBasis::Mix);
        assert_eq!(single.allocation.indirect_per_kg, 0.0);
        assert_eq!(single.allocation.indirect_total, 0.0);
    }
}
