//! Monthly schedule reports: raw material requirements and production summary

use crate::catalog::{MaterialId, ProductId};
use crate::costing::{cost_recipe, RecipeCost};
use crate::mix::SkippedProduct;
use crate::month::YearMonth;
use crate::repository::{ProductRepository, RecipeRepository, ScheduleRepository};
use serde::Serialize;
use std::collections::BTreeMap;

/// Total need of one raw material for a month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialRequirement {
    pub material_id: MaterialId,
    pub name: String,
    pub category: String,
    pub unit: String,
    pub quantity: f64,
    pub cost: f64,
}

/// Raw materials needed by a month's schedule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialRequirements {
    pub month: YearMonth,
    /// Ordered by material id
    pub materials: Vec<MaterialRequirement>,
    pub category_totals: BTreeMap<String, f64>,
    pub total_cost: f64,
    pub total_batches: f64,
    pub total_weight_kg: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedProduct>,
}

/// One product's scheduled production for a month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductMonth {
    pub product_id: ProductId,
    pub code: String,
    pub name: String,
    pub batches: f64,
    pub weight_kg: f64,
    /// Batch variable cost times batches
    pub cost: f64,
}

/// Production and variable cost of a month's schedule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    pub month: YearMonth,
    pub total_batches: f64,
    pub total_weight_kg: f64,
    pub total_cost: f64,
    /// Ordered by product id
    pub products: Vec<ProductMonth>,
    pub category_totals: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedProduct>,
}

/// Raw material needs of everything scheduled in `month`, at current prices
pub fn material_requirements<R>(repo: &R, month: YearMonth) -> MaterialRequirements
where
    R: ProductRepository + RecipeRepository + ScheduleRepository + ?Sized,
{
    let mut report = MaterialRequirements {
        month,
        materials: Vec::new(),
        category_totals: BTreeMap::new(),
        total_cost: 0.0,
        total_batches: 0.0,
        total_weight_kg: 0.0,
        skipped: Vec::new(),
    };
    let mut by_material: BTreeMap<MaterialId, MaterialRequirement> = BTreeMap::new();
    let mut recipes: BTreeMap<ProductId, RecipeCost> = BTreeMap::new();

    for entry in repo.for_month(month) {
        let Some(product) = repo.get(entry.product_id) else {
            report.skipped.push(SkippedProduct {
                product_id: entry.product_id,
                reason: "product not found".to_string(),
            });
            continue;
        };
        report.total_batches += entry.batches;
        report.total_weight_kg += entry.batches * product.batch_weight_kg;

        let recipe = recipes
            .entry(product.id)
            .or_insert_with(|| cost_recipe(&product, &repo.lines_for(product.id)));

        for line in &recipe.lines {
            let cost = line.line_cost * entry.batches;
            let requirement = by_material.entry(line.material_id).or_insert_with(|| MaterialRequirement {
                material_id: line.material_id,
                name: line.name.clone(),
                category: line.category.clone(),
                unit: line.unit.clone(),
                quantity: 0.0,
                cost: 0.0,
            });
            requirement.quantity += line.quantity * entry.batches;
            requirement.cost += cost;

            *report.category_totals.entry(line.category.clone()).or_insert(0.0) += cost;
            report.total_cost += cost;
        }
    }

    report.materials = by_material.into_values().collect();
    log::debug!(
        "reports.requirements month={} materials={} batches={} cost={:.2}",
        month,
        report.materials.len(),
        report.total_batches,
        report.total_cost
    );
    report
}

/// Batches, weight and variable cost per product for `month`
pub fn monthly_summary<R>(repo: &R, month: YearMonth) -> MonthlySummary
where
    R: ProductRepository + RecipeRepository + ScheduleRepository + ?Sized,
{
    let mut summary = MonthlySummary {
        month,
        total_batches: 0.0,
        total_weight_kg: 0.0,
        total_cost: 0.0,
        products: Vec::new(),
        category_totals: BTreeMap::new(),
        skipped: Vec::new(),
    };
    let mut by_product: BTreeMap<ProductId, ProductMonth> = BTreeMap::new();
    let mut recipes: BTreeMap<ProductId, RecipeCost> = BTreeMap::new();

    for entry in repo.for_month(month) {
        let Some(product) = repo.get(entry.product_id) else {
            summary.skipped.push(SkippedProduct {
                product_id: entry.product_id,
                reason: "product not found".to_string(),
            });
            continue;
        };
        let recipe = recipes
            .entry(product.id)
            .or_insert_with(|| cost_recipe(&product, &repo.lines_for(product.id)));

        let weight = entry.batches * product.batch_weight_kg;
        let cost = entry.batches * recipe.summary.total_variable_cost;

        summary.total_batches += entry.batches;
        summary.total_weight_kg += weight;
        summary.total_cost += cost;

        let row = by_product.entry(product.id).or_insert_with(|| ProductMonth {
            product_id: product.id,
            code: product.code.clone(),
            name: product.name.clone(),
            batches: 0.0,
            weight_kg: 0.0,
            cost: 0.0,
        });
        row.batches += entry.batches;
        row.weight_kg += weight;
        row.cost += cost;

        for (category, total) in &recipe.category_totals {
            *summary.category_totals.entry(category.clone()).or_insert(0.0) += total.cost * entry.batches;
        }
    }

    summary.products = by_product.into_values().collect();
    summary
}
