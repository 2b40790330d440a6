//! Costing engine: recipe cost, inflation, indirect pool and allocation

pub mod allocation;
pub mod inflation;
pub mod pool;
pub mod recipe;
mod service;

pub use allocation::{
    AllocationBasis, AllocationEngine, Distribution, DriverTotals, ProductAllocation, SingleAllocation,
};
pub use inflation::{InflationAccumulator, InflationFactor};
pub use pool::{AdjustedPool, IndirectCostPool, PoolSummary};
pub use recipe::{cost_recipe, CategoryTotal, CostSummary, CostWarning, CostedLine, RecipeCost};
pub use service::{
    CostingService, CostingSummaryRow, DistributionLine, DistributionReport, FullCost, FullCostSummary,
    IndirectDetail, IndirectOutcome,
};
