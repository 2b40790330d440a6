//! Manual schedule plus forecasts for everything not scheduled

use super::{MixOrigin, ProductionMix, SkippedProduct};
use crate::catalog::{Product, ProductId, ScheduledProductionEntry};
use crate::forecast::Forecaster;
use crate::month::YearMonth;
use crate::repository::{ProductRepository, ScheduleRepository};
use serde::Serialize;
use std::collections::BTreeSet;

/// Result of building a hybrid mix
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HybridMix {
    pub mix: ProductionMix,
    pub skipped: Vec<SkippedProduct>,
    pub manual_products: usize,
    pub forecast_products: usize,
    /// Set when the forecaster could not answer; the mix then holds manual entries only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast_error: Option<String>,
}

/// Builds a month's mix from scheduled products and forecasts for the rest
pub struct HybridMixBuilder<'a> {
    forecaster: &'a dyn Forecaster,
}

impl<'a> HybridMixBuilder<'a> {
    pub fn new(forecaster: &'a dyn Forecaster) -> Self {
        Self { forecaster }
    }

    /// Partition `products` into scheduled and unscheduled, forecasting the latter
    pub fn build(
        &self,
        month: YearMonth,
        products: &[Product],
        schedule: &[ScheduledProductionEntry],
    ) -> HybridMix {
        let (mut mix, mut skipped) = ProductionMix::from_schedule(month, schedule, products);
        let manual_products = mix.len();

        let scheduled: BTreeSet<ProductId> = mix.entries.iter().map(|e| e.product_id).collect();
        let unscheduled: Vec<ProductId> = products
            .iter()
            .filter(|p| p.active && !scheduled.contains(&p.id))
            .map(|p| p.id)
            .collect();

        let mut forecast_error = None;
        if !unscheduled.is_empty() {
            match self.forecaster.predict_month(&unscheduled, month) {
                Ok(predictions) => {
                    // Only ask about unscheduled products; ignore anything else returned
                    let predictions: Vec<_> = predictions
                        .into_iter()
                        .filter(|p| !scheduled.contains(&p.product_id))
                        .collect();
                    let (forecast_mix, forecast_skipped) =
                        ProductionMix::from_forecasts(month, &predictions, products);
                    for entry in forecast_mix.entries {
                        mix.push(entry);
                    }
                    skipped.extend(forecast_skipped);
                }
                Err(e) => {
                    log::warn!("hybrid_mix.forecast_unavailable month={} error={}", month, e);
                    forecast_error = Some(e.to_string());
                }
            }
        }

        let forecast_products = mix.count_origin(MixOrigin::Ml);
        log::debug!(
            "hybrid_mix.built month={} manual={} ml={} kg={:.4}",
            month,
            manual_products,
            forecast_products,
            mix.total_kg()
        );

        HybridMix {
            mix,
            skipped,
            manual_products,
            forecast_products,
            forecast_error,
        }
    }

    /// Build from a repository: active products and that month's schedule
    ///
    /// Scheduled inactive products still count as manual production.
    pub fn build_from<R>(&self, repo: &R, month: YearMonth) -> HybridMix
    where
        R: ProductRepository + ScheduleRepository + ?Sized,
    {
        let schedule = repo.for_month(month);
        let mut products = repo.active_products();
        for entry in &schedule {
            if !products.iter().any(|p| p.id == entry.product_id) {
                if let Some(product) = repo.get(entry.product_id) {
                    products.push(product);
                }
            }
        }
        self.build(month, &products, &schedule)
    }
}
