//! Master data structures and CSV loading

mod data;
pub mod loader;

pub use data::{
    DistributionType, IndirectCostRecord, InflationRecord, MaterialId, Product, ProductId,
    RawMaterial, RecipeLine, ScheduledProductionEntry, PACKAGING_CATEGORY,
};
pub use loader::{LoadedCatalog, DEFAULT_DATA_PATH};
