//! Bulk raw material price adjustments with batch undo
//!
//! Each adjustment is applied to the catalog in one all-or-nothing update and
//! recorded under a fresh batch id. Undo reverts a whole batch by that id.

use crate::catalog::MaterialId;
use crate::error::CostingError;
use crate::repository::MaterialCatalog;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Kind of price history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Adjustment,
    Reversion,
}

/// One recorded price change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceChange {
    pub material_id: MaterialId,
    pub material_name: String,
    pub category: String,
    pub previous: f64,
    pub new: f64,
    pub kind: ChangeKind,
    pub batch_id: Uuid,
    /// Percentage of the adjustment this change belongs to
    pub pct: f64,
    /// Category filter of the adjustment, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_filter: Option<String>,
}

impl PriceChange {
    pub fn difference(&self) -> f64 {
        self.new - self.previous
    }
}

/// Outcome of a bulk adjustment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdjustmentReport {
    pub batch_id: Uuid,
    pub pct: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub changes: Vec<PriceChange>,
}

/// Outcome of undoing a bulk adjustment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UndoReport {
    pub batch_id: Uuid,
    pub original_pct: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub changes: Vec<PriceChange>,
}

/// Price change history for one catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceBook {
    history: Vec<PriceChange>,
    /// Batches already undone, including those with nothing left to revert
    #[serde(default)]
    reverted: HashSet<Uuid>,
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl PriceBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &[PriceChange] {
        &self.history
    }

    /// Raise (or lower) every active material price by `pct` percent
    ///
    /// With a category only that category is adjusted. New prices are rounded
    /// to cents. On any error nothing is changed.
    pub fn apply_bulk_adjustment<C: MaterialCatalog + ?Sized>(
        &mut self,
        catalog: &mut C,
        pct: f64,
        category: Option<&str>,
    ) -> Result<AdjustmentReport, CostingError> {
        if !pct.is_finite() || pct < -100.0 {
            return Err(CostingError::InvalidQuantity {
                field: "adjustment pct".to_string(),
                value: pct,
            });
        }

        let materials = catalog.materials();
        if let Some(category) = category {
            if !materials.iter().any(|m| m.category == category) {
                return Err(CostingError::UnknownCategory(category.to_string()));
            }
        }

        let selected: Vec<_> = materials
            .into_iter()
            .filter(|m| m.active)
            .filter(|m| category.map_or(true, |c| m.category == c))
            .collect();
        if selected.is_empty() {
            return Err(CostingError::NoMaterialsToAdjust);
        }

        let factor = 1.0 + pct / 100.0;
        let batch_id = Uuid::new_v4();
        let category_filter = category.map(str::to_string);

        let changes: Vec<PriceChange> = selected
            .into_iter()
            .map(|m| PriceChange {
                material_id: m.id,
                new: round_cents(m.unit_cost * factor),
                previous: m.unit_cost,
                material_name: m.name,
                category: m.category,
                kind: ChangeKind::Adjustment,
                batch_id,
                pct,
                category_filter: category_filter.clone(),
            })
            .collect();

        let updates: Vec<(MaterialId, f64)> = changes.iter().map(|c| (c.material_id, c.new)).collect();
        catalog.set_unit_costs(&updates)?;
        self.history.extend(changes.iter().cloned());

        log::info!(
            "pricing.bulk_adjust pct={:.2} category={} items={} batch_id={}",
            pct,
            category.unwrap_or("ALL"),
            changes.len(),
            batch_id
        );

        Ok(AdjustmentReport {
            batch_id,
            pct,
            category: category_filter,
            changes,
        })
    }

    /// Revert the most recent adjustment batch that has not been reverted yet
    ///
    /// A batch whose materials were all removed from the catalog is still
    /// marked as undone, so the next call reaches the batch before it.
    pub fn undo_last<C: MaterialCatalog + ?Sized>(&mut self, catalog: &mut C) -> Result<UndoReport, CostingError> {
        let last = self
            .history
            .iter()
            .rev()
            .find(|c| c.kind == ChangeKind::Adjustment && !self.reverted.contains(&c.batch_id))
            .ok_or(CostingError::NothingToUndo)?;
        let batch_id = last.batch_id;
        let original_pct = last.pct;
        let category = last.category_filter.clone();

        let current = catalog.materials();
        let changes: Vec<PriceChange> = self
            .history
            .iter()
            .filter(|c| c.batch_id == batch_id && c.kind == ChangeKind::Adjustment)
            .filter_map(|c| {
                // Materials removed since the adjustment are left alone
                current.iter().find(|m| m.id == c.material_id).map(|m| PriceChange {
                    material_id: c.material_id,
                    material_name: c.material_name.clone(),
                    category: c.category.clone(),
                    previous: m.unit_cost,
                    new: c.previous,
                    kind: ChangeKind::Reversion,
                    batch_id,
                    pct: original_pct,
                    category_filter: category.clone(),
                })
            })
            .collect();

        let updates: Vec<(MaterialId, f64)> = changes.iter().map(|c| (c.material_id, c.new)).collect();
        catalog.set_unit_costs(&updates)?;
        self.history.extend(changes.iter().cloned());
        self.reverted.insert(batch_id);

        log::info!(
            "pricing.undo batch_id={} items={} original_pct={:.2}",
            batch_id,
            changes.len(),
            original_pct
        );

        Ok(UndoReport {
            batch_id,
            original_pct,
            category,
            changes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{RawMaterial, PACKAGING_CATEGORY};
    use crate::repository::InMemoryRepository;

    fn catalog() -> InMemoryRepository {
        let mut repo = InMemoryRepository::new();
        repo.add_material(RawMaterial::new(1, "Carne", "CARNE", "kg", 10.0)).unwrap();
        repo.add_material(RawMaterial::new(2, "Pimienta", "ESPECIAS", "kg", 3.333)).unwrap();
        repo.add_material(RawMaterial::new(3, "Caja", PACKAGING_CATEGORY, "unit", 1.0)).unwrap();
        let mut inactive = RawMaterial::new(4, "Viejo", "CARNE", "kg", 5.0);
        inactive.active = false;
        repo.add_material(inactive).unwrap();
        repo
    }

    fn price(repo: &InMemoryRepository, id: MaterialId) -> f64 {
        repo.materials().into_iter().find(|m| m.id == id).unwrap().unit_cost
    }

    #[test]
    fn test_bulk_adjustment_rounds_and_skips_inactive() {
        let mut repo = catalog();
        let mut book = PriceBook::new();
        let report = book.apply_bulk_adjustment(&mut repo, 10.0, None).unwrap();

        assert_eq!(report.changes.len(), 3);
        assert_eq!(price(&repo, 1), 11.0);
        assert_eq!(price(&repo, 2), 3.67);
        assert_eq!(price(&repo, 4), 5.0);
        assert!(report.changes.iter().all(|c| c.batch_id == report.batch_id));
        assert_eq!(book.history().len(), 3);
    }

    #[test]
    fn test_category_filter_and_errors() {
        let mut repo = catalog();
        let mut book = PriceBook::new();

        let report = book.apply_bulk_adjustment(&mut repo, 5.0, Some("CARNE")).unwrap();
        assert_eq!(report.changes.len(), 1);
        assert_eq!(price(&repo, 2), 3.333);

        assert_eq!(
            book.apply_bulk_adjustment(&mut repo, 5.0, Some("LACTEOS")).unwrap_err(),
            CostingError::UnknownCategory("LACTEOS".to_string())
        );
        assert!(book.apply_bulk_adjustment(&mut repo, f64::NAN, None).is_err());
        assert_eq!(book.history().len(), 1);
    }

    #[test]
    fn test_undo_reverts_whole_batch_once() {
        let mut repo = catalog();
        let mut book = PriceBook::new();
        let first = book.apply_bulk_adjustment(&mut repo, 10.0, None).unwrap();
        let second = book.apply_bulk_adjustment(&mut repo, 50.0, Some("CARNE")).unwrap();
        assert_eq!(price(&repo, 1), 16.5);

        let undo = book.undo_last(&mut repo).unwrap();
        assert_eq!(undo.batch_id, second.batch_id);
        assert_eq!(price(&repo, 1), 11.0);

        let undo = book.undo_last(&mut repo).unwrap();
        assert_eq!(undo.batch_id, first.batch_id);
        assert_eq!(undo.changes.len(), 3);
        assert_eq!(price(&repo, 1), 10.0);
        assert_eq!(price(&repo, 2), 3.333);

        assert_eq!(book.undo_last(&mut repo).unwrap_err(), CostingError::NothingToUndo);
    }

    /// Catalog whose materials can disappear between adjustments
    struct ShrinkingCatalog {
        materials: Vec<RawMaterial>,
    }

    impl MaterialCatalog for ShrinkingCatalog {
        fn materials(&self) -> Vec<RawMaterial> {
            self.materials.clone()
        }

        fn set_unit_costs(&mut self, updates: &[(MaterialId, f64)]) -> Result<(), CostingError> {
            for (id, cost) in updates {
                let material = self
                    .materials
                    .iter_mut()
                    .find(|m| m.id == *id)
                    .ok_or(CostingError::MaterialNotFound(*id))?;
                material.unit_cost = *cost;
            }
            Ok(())
        }
    }

    #[test]
    fn test_undo_moves_past_batch_of_removed_materials() {
        let mut catalog = ShrinkingCatalog {
            materials: vec![
                RawMaterial::new(1, "Carne", "CARNE", "kg", 10.0),
                RawMaterial::new(2, "Pimienta", "ESPECIAS", "kg", 4.0),
            ],
        };
        let mut book = PriceBook::new();
        let first = book.apply_bulk_adjustment(&mut catalog, 10.0, None).unwrap();
        let second = book.apply_bulk_adjustment(&mut catalog, 50.0, Some("ESPECIAS")).unwrap();
        catalog.materials.retain(|m| m.id != 2);

        let undo = book.undo_last(&mut catalog).unwrap();
        assert_eq!(undo.batch_id, second.batch_id);
        assert!(undo.changes.is_empty());

        let undo = book.undo_last(&mut catalog).unwrap();
        assert_eq!(undo.batch_id, first.batch_id);
        assert_eq!(undo.changes.len(), 1);
        assert_eq!(catalog.materials[0].unit_cost, 10.0);

        assert_eq!(book.undo_last(&mut catalog).unwrap_err(), CostingError::NothingToUndo);
    }

    #[test]
    fn test_empty_selection() {
        let mut repo = InMemoryRepository::new();
        let mut inactive = RawMaterial::new(1, "Viejo", "CARNE", "kg", 5.0);
        inactive.active = false;
        repo.add_material(inactive).unwrap();

        let mut book = PriceBook::new();
        assert_eq!(
            book.apply_bulk_adjustment(&mut repo, 5.0, None).unwrap_err(),
            CostingError::NoMaterialsToAdjust
        );
    }
}
