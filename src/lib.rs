//! Product Costing - cost allocation and multi-period projection engine
//!
//! This library provides:
//! - Recipe (direct material) costing with waste and yield
//! - Compounding inflation between a cost base month and a production month
//! - Indirect cost pools distributed by labor minutes and weight
//! - Production mixes from the manual schedule, forecasts, or both
//! - Multi-month cost projections with period aggregation
//! - Bulk raw material price adjustments with batch undo

pub mod catalog;
pub mod costing;
pub mod error;
pub mod forecast;
pub mod mix;
pub mod month;
pub mod pricing;
pub mod projection;
pub mod reports;
pub mod repository;
pub mod scenario;

// Re-export commonly used types
pub use catalog::{LoadedCatalog, Product, RawMaterial, RecipeLine};
pub use costing::{AllocationEngine, CostingService, InflationAccumulator, IndirectCostPool, RecipeCost};
pub use error::CostingError;
pub use forecast::{Forecaster, StaticForecaster, UntrainedForecaster};
pub use mix::{HybridMixBuilder, ProductionMix};
pub use month::YearMonth;
pub use pricing::PriceBook;
pub use projection::{ProjectionConfig, ProjectionEngine, ProjectionMode, ProjectionResult};
pub use repository::InMemoryRepository;
pub use scenario::ScenarioRunner;
