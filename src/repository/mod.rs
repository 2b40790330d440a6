//! Read-side collaborator interfaces consumed by the costing engine
//!
//! The engine never talks to storage directly: every computation is a pure
//! function of what these traits return, so any backing store (in-memory,
//! CSV, a database) can serve it.

mod memory;

pub use memory::InMemoryRepository;

use crate::catalog::{
    IndirectCostRecord, InflationRecord, MaterialId, Product, ProductId, RawMaterial, RecipeLine,
    ScheduledProductionEntry,
};
use crate::error::CostingError;
use crate::month::YearMonth;

/// Product master data
pub trait ProductRepository {
    fn get(&self, id: ProductId) -> Option<Product>;

    /// Active products, ordered by id
    fn active_products(&self) -> Vec<Product>;

    /// Like `get`, but a missing product is an error
    fn require(&self, id: ProductId) -> Result<Product, CostingError> {
        self.get(id).ok_or(CostingError::ProductNotFound(id))
    }
}

impl ProductRepository for [Product] {
    fn get(&self, id: ProductId) -> Option<Product> {
        self.iter().find(|p| p.id == id).cloned()
    }

    fn active_products(&self) -> Vec<Product> {
        let mut active: Vec<Product> = self.iter().filter(|p| p.active).cloned().collect();
        active.sort_by_key(|p| p.id);
        active
    }
}

/// Recipes joined to current raw material costs
pub trait RecipeRepository {
    fn lines_for(&self, product_id: ProductId) -> Vec<RecipeLine>;
}

/// Indirect cost records
pub trait IndirectCostRepository {
    fn for_base_month(&self, month: YearMonth) -> Vec<IndirectCostRecord>;
}

/// Monthly inflation records
pub trait InflationRepository {
    /// Records with `exclusive < month <= inclusive`
    fn between(&self, exclusive: YearMonth, inclusive: YearMonth) -> Vec<InflationRecord>;
}

/// Manually scheduled production
pub trait ScheduleRepository {
    fn for_month(&self, month: YearMonth) -> Vec<ScheduledProductionEntry>;
}

/// Raw material prices, with an all-or-nothing bulk update
pub trait MaterialCatalog {
    /// All raw materials, ordered by id
    fn materials(&self) -> Vec<RawMaterial>;

    /// Apply every `(id, new_unit_cost)` pair or none of them
    fn set_unit_costs(&mut self, updates: &[(MaterialId, f64)]) -> Result<(), CostingError>;
}

/// Everything the costing and projection engines read
pub trait CostingRepositories:
    ProductRepository + RecipeRepository + IndirectCostRepository + InflationRepository + ScheduleRepository
{
}

impl<T> CostingRepositories for T where
    T: ProductRepository
        + RecipeRepository
        + IndirectCostRepository
        + InflationRepository
        + ScheduleRepository
{
}
