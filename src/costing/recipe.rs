//! Direct material cost of a product recipe, with waste and yield

use crate::catalog::{MaterialId, Product, ProductId, RecipeLine};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One itemized recipe line with its cost for one batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostedLine {
    pub material_id: MaterialId,
    pub name: String,
    pub category: String,
    pub unit: String,
    pub unit_cost: f64,
    pub quantity: f64,
    pub line_cost: f64,
}

/// Quantity and cost of one material category for one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub quantity: f64,
    pub cost: f64,
}

/// Batch cost summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    /// Material cost excluding packaging
    pub raw_material_total: f64,
    pub waste_cost: f64,
    /// Raw material total plus waste
    pub net_material: f64,
    pub packaging_total: f64,
    pub total_variable_cost: f64,
    pub gross_batch_weight: f64,
    pub waste_pct: f64,
    pub yield_pct: f64,
    pub net_batch_weight: f64,
    /// Variable cost per net kg (0 when uncostable, see warnings)
    pub cost_per_kg: f64,
}

/// Why a recipe cost is incomplete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CostWarning {
    /// Waste leaves nothing: yield is 0% or negative
    NonPositiveYield { waste_pct: f64 },
    /// Batch weight is 0 or not set
    UndefinedBatchWeight,
    /// The product has no recipe lines
    NoRecipe,
}

impl fmt::Display for CostWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostWarning::NonPositiveYield { waste_pct } => {
                write!(f, "yield is zero or negative (waste = {}%)", waste_pct)
            }
            CostWarning::UndefinedBatchWeight => f.write_str("batch weight is zero or undefined"),
            CostWarning::NoRecipe => f.write_str("no recipe defined"),
        }
    }
}

/// Full variable costing of one product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeCost {
    pub product_id: ProductId,
    pub lines: Vec<CostedLine>,
    pub category_totals: BTreeMap<String, CategoryTotal>,
    pub summary: CostSummary,
    /// `None` when the cost is complete; never `Some` of an empty list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<CostWarning>>,
}

impl RecipeCost {
    /// True when `cost_per_kg` is a real cost rather than an "uncosted" zero
    pub fn is_costed(&self) -> bool {
        self.warnings.is_none()
    }

    pub fn has_recipe(&self) -> bool {
        !self.lines.is_empty()
    }

    pub fn cost_per_kg(&self) -> f64 {
        self.summary.cost_per_kg
    }
}

/// Cost one batch of `product` from its recipe lines
///
/// Packaging lines are excluded from the waste-adjusted subtotal. A missing
/// recipe or a zero net weight is reported as a warning with `cost_per_kg = 0`.
pub fn cost_recipe(product: &Product, lines: &[RecipeLine]) -> RecipeCost {
    let mut costed = Vec::with_capacity(lines.len());
    let mut category_totals: BTreeMap<String, CategoryTotal> = BTreeMap::new();
    let mut raw_material_total = 0.0;
    let mut packaging_total = 0.0;

    for line in lines {
        let line_cost = line.line_cost();
        let material = &line.material;

        let entry = category_totals.entry(material.category.clone()).or_default();
        entry.quantity += line.quantity;
        entry.cost += line_cost;

        if material.is_packaging() {
            packaging_total += line_cost;
        } else {
            raw_material_total += line_cost;
        }

        costed.push(CostedLine {
            material_id: material.id,
            name: material.name.clone(),
            category: material.category.clone(),
            unit: material.unit.clone(),
            unit_cost: material.unit_cost,
            quantity: line.quantity,
            line_cost,
        });
    }

    let waste_pct = product.waste_pct;
    let waste_cost = if waste_pct > 0.0 {
        raw_material_total * (waste_pct / 100.0)
    } else {
        0.0
    };
    let net_material = raw_material_total + waste_cost;
    let total_variable_cost = net_material + packaging_total;

    let yield_pct = 100.0 - waste_pct;
    let gross_batch_weight = product.batch_weight_kg;
    let net_batch_weight = gross_batch_weight * yield_pct / 100.0;

    let mut warnings = Vec::new();
    let cost_per_kg = if net_batch_weight > 0.0 {
        total_variable_cost / net_batch_weight
    } else {
        if gross_batch_weight > 0.0 {
            warnings.push(CostWarning::NonPositiveYield { waste_pct });
        } else {
            warnings.push(CostWarning::UndefinedBatchWeight);
        }
        0.0
    };

    if lines.is_empty() {
        warnings.push(CostWarning::NoRecipe);
    }

    RecipeCost {
        product_id: product.id,
        lines: costed,
        category_totals,
        summary: CostSummary {
            raw_material_total,
            waste_cost,
            net_material,
            packaging_total,
            total_variable_cost,
            gross_batch_weight,
            waste_pct,
            yield_pct,
            net_batch_weight,
            cost_per_kg,
        },
        warnings: if warnings.is_empty() { None } else { Some(warnings) },
    }
}
