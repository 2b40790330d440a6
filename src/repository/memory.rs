//! In-memory repository backing all collaborator traits

use super::{
    IndirectCostRepository, InflationRepository, MaterialCatalog, ProductRepository,
    RecipeRepository, ScheduleRepository,
};
use crate::catalog::{
    IndirectCostRecord, InflationRecord, LoadedCatalog, MaterialId, Product, ProductId,
    RawMaterial, RecipeLine, ScheduledProductionEntry,
};
use crate::error::CostingError;
use crate::month::YearMonth;
use std::collections::BTreeMap;

/// Recipe link stored by id so price changes show up on the next read
#[derive(Debug, Clone, PartialEq)]
struct RecipeLink {
    product_id: ProductId,
    material_id: MaterialId,
    quantity: f64,
}

/// Master data held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    products: BTreeMap<ProductId, Product>,
    materials: BTreeMap<MaterialId, RawMaterial>,
    recipes: Vec<RecipeLink>,
    indirect_costs: Vec<IndirectCostRecord>,
    inflation: BTreeMap<YearMonth, InflationRecord>,
    schedule: Vec<ScheduledProductionEntry>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from loaded CSV data, re-checking every invariant
    pub fn from_loaded(loaded: LoadedCatalog) -> Result<Self, CostingError> {
        let mut repo = Self::new();
        for product in loaded.products {
            repo.add_product(product)?;
        }
        for material in loaded.materials {
            repo.add_material(material)?;
        }
        for (product_id, material_id, quantity) in loaded.recipe_links {
            repo.add_recipe_line(product_id, material_id, quantity)?;
        }
        for record in loaded.indirect_costs {
            repo.add_indirect_cost(record)?;
        }
        for record in loaded.inflation {
            repo.add_inflation(record)?;
        }
        for entry in loaded.schedule {
            repo.add_schedule_entry(entry)?;
        }
        Ok(repo)
    }

    /// Add a product; ids must be unique
    pub fn add_product(&mut self, product: Product) -> Result<(), CostingError> {
        if self.products.contains_key(&product.id) {
            return Err(CostingError::DuplicateRecord(format!("product id {}", product.id)));
        }
        self.upsert_product(product)
    }

    /// Insert or replace a product
    pub fn upsert_product(&mut self, product: Product) -> Result<(), CostingError> {
        product.validate()?;
        self.products.insert(product.id, product);
        Ok(())
    }

    /// Add a raw material; ids must be unique
    pub fn add_material(&mut self, material: RawMaterial) -> Result<(), CostingError> {
        if self.materials.contains_key(&material.id) {
            return Err(CostingError::DuplicateRecord(format!("raw material id {}", material.id)));
        }
        self.upsert_material(material)
    }

    /// Insert or replace a raw material
    pub fn upsert_material(&mut self, material: RawMaterial) -> Result<(), CostingError> {
        if !(material.unit_cost >= 0.0) || !material.unit_cost.is_finite() {
            return Err(CostingError::InvalidQuantity {
                field: format!("unit_cost of material {}", material.id),
                value: material.unit_cost,
            });
        }
        self.materials.insert(material.id, material);
        Ok(())
    }

    pub fn add_recipe_line(
        &mut self,
        product_id: ProductId,
        material_id: MaterialId,
        quantity: f64,
    ) -> Result<(), CostingError> {
        if !self.products.contains_key(&product_id) {
            return Err(CostingError::ProductNotFound(product_id));
        }
        if !self.materials.contains_key(&material_id) {
            return Err(CostingError::MaterialNotFound(material_id));
        }
        if !(quantity > 0.0) {
            return Err(CostingError::InvalidQuantity {
                field: "recipe quantity".to_string(),
                value: quantity,
            });
        }
        self.recipes.push(RecipeLink { product_id, material_id, quantity });
        Ok(())
    }

    /// Add an indirect cost; (account, base month) must be unique
    pub fn add_indirect_cost(&mut self, record: IndirectCostRecord) -> Result<(), CostingError> {
        if !record.amount.is_finite() {
            return Err(CostingError::InvalidQuantity {
                field: format!("amount of indirect cost '{}'", record.account),
                value: record.amount,
            });
        }
        let duplicate = self
            .indirect_costs
            .iter()
            .any(|r| r.account == record.account && r.base_month == record.base_month);
        if duplicate {
            return Err(CostingError::DuplicateRecord(format!(
                "indirect cost account '{}' for {}",
                record.account, record.base_month
            )));
        }
        self.indirect_costs.push(record);
        Ok(())
    }

    /// Add or replace the inflation rate for a month
    pub fn add_inflation(&mut self, record: InflationRecord) -> Result<(), CostingError> {
        if !record.pct.is_finite() {
            return Err(CostingError::InvalidQuantity {
                field: format!("inflation pct for {}", record.month),
                value: record.pct,
            });
        }
        self.inflation.insert(record.month, record);
        Ok(())
    }

    pub fn add_schedule_entry(&mut self, entry: ScheduledProductionEntry) -> Result<(), CostingError> {
        if !self.products.contains_key(&entry.product_id) {
            return Err(CostingError::ProductNotFound(entry.product_id));
        }
        self.schedule.push(entry);
        Ok(())
    }

    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }
}

impl ProductRepository for InMemoryRepository {
    fn get(&self, id: ProductId) -> Option<Product> {
        self.products.get(&id).cloned()
    }

    fn active_products(&self) -> Vec<Product> {
        self.products.values().filter(|p| p.active).cloned().collect()
    }
}

impl RecipeRepository for InMemoryRepository {
    fn lines_for(&self, product_id: ProductId) -> Vec<RecipeLine> {
        self.recipes
            .iter()
            .filter(|link| link.product_id == product_id)
            .filter_map(|link| {
                self.materials
                    .get(&link.material_id)
                    .map(|m| RecipeLine::new(product_id, m.clone(), link.quantity))
            })
            .collect()
    }
}

impl IndirectCostRepository for InMemoryRepository {
    fn for_base_month(&self, month: YearMonth) -> Vec<IndirectCostRecord> {
        self.indirect_costs
            .iter()
            .filter(|r| r.base_month == month)
            .cloned()
            .collect()
    }
}

impl InflationRepository for InMemoryRepository {
    fn between(&self, exclusive: YearMonth, inclusive: YearMonth) -> Vec<InflationRecord> {
        if inclusive <= exclusive {
            return Vec::new();
        }
        self.inflation
            .range(exclusive..=inclusive)
            .filter(|(month, _)| **month > exclusive)
            .map(|(_, record)| *record)
            .collect()
    }
}

impl ScheduleRepository for InMemoryRepository {
    fn for_month(&self, month: YearMonth) -> Vec<ScheduledProductionEntry> {
        self.schedule
            .iter()
            .filter(|e| month.contains(e.date))
            .cloned()
            .collect()
    }
}

impl MaterialCatalog for InMemoryRepository {
    fn materials(&self) -> Vec<RawMaterial> {
        self.materials.values().cloned().collect()
    }

    fn set_unit_costs(&mut self, updates: &[(MaterialId, f64)]) -> Result<(), CostingError> {
        // Validate the whole batch before touching anything
        for (id, cost) in updates {
            if !self.materials.contains_key(id) {
                return Err(CostingError::MaterialNotFound(*id));
            }
            if !(*cost >= 0.0) {
                return Err(CostingError::InvalidQuantity {
                    field: format!("unit_cost of material {}", id),
                    value: *cost,
                });
            }
        }
        for (id, cost) in updates {
            if let Some(material) = self.materials.get_mut(id) {
                material.unit_cost = *cost;
            }
        }
        Ok(())
    }
}
