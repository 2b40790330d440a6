//! Production mix for one month: the (product, kg, minutes) set indirect costs are spread over

mod hybrid;

pub use hybrid::HybridMixBuilder;

use crate::catalog::{ProductId, ScheduledProductionEntry};
use crate::forecast::ForecastPrediction;
use crate::month::YearMonth;
use crate::repository::ProductRepository;
use serde::{Deserialize, Serialize};

/// Where a mix entry's quantity came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MixOrigin {
    Manual,
    Ml,
}

/// One product's production in a month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixEntry {
    pub product_id: ProductId,
    /// Gross kg produced
    pub kg: f64,
    pub labor_minutes: f64,
    /// Scheduled batches (forecast entries have none)
    pub batches: Option<f64>,
    pub origin: MixOrigin,
    /// 1.0 for manual entries
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

/// A product left out of a mix, with the reason
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedProduct {
    pub product_id: ProductId,
    pub reason: String,
}

/// All production considered together for one month, one entry per product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionMix {
    pub month: YearMonth,
    /// Ordered by product id
    pub entries: Vec<MixEntry>,
}

impl ProductionMix {
    pub fn empty(month: YearMonth) -> Self {
        Self {
            month,
            entries: Vec::new(),
        }
    }

    /// Add an entry, merging it into an existing entry for the same product
    ///
    /// A merged entry keeps the origin of the first entry.
    pub fn push(&mut self, entry: MixEntry) {
        match self.entries.binary_search_by_key(&entry.product_id, |e| e.product_id) {
            Ok(idx) => {
                let existing = &mut self.entries[idx];
                existing.kg += entry.kg;
                existing.labor_minutes += entry.labor_minutes;
                existing.batches = match (existing.batches, entry.batches) {
                    (Some(a), Some(b)) => Some(a + b),
                    (a, b) => a.or(b),
                };
            }
            Err(idx) => self.entries.insert(idx, entry),
        }
    }

    /// Mix from manually scheduled entries, summed per product
    ///
    /// kg = batches × gross batch weight. Entries naming an unknown product
    /// are skipped.
    pub fn from_schedule<P: ProductRepository + ?Sized>(
        month: YearMonth,
        schedule: &[ScheduledProductionEntry],
        products: &P,
    ) -> (Self, Vec<SkippedProduct>) {
        let mut mix = Self::empty(month);
        let mut skipped = Vec::new();

        for entry in schedule {
            let Some(product) = products.get(entry.product_id) else {
                skipped.push(SkippedProduct {
                    product_id: entry.product_id,
                    reason: "product not found".to_string(),
                });
                continue;
            };
            let kg = entry.batches * product.batch_weight_kg;
            mix.push(MixEntry {
                product_id: product.id,
                kg,
                labor_minutes: product.labor_minutes_for(kg),
                batches: Some(entry.batches),
                origin: MixOrigin::Manual,
                confidence: 1.0,
                method: None,
            });
        }

        (mix, skipped)
    }

    /// Mix from forecaster output; only positive predictions are kept
    pub fn from_forecasts<P: ProductRepository + ?Sized>(
        month: YearMonth,
        predictions: &[ForecastPrediction],
        products: &P,
    ) -> (Self, Vec<SkippedProduct>) {
        let mut mix = Self::empty(month);
        let mut skipped = Vec::new();

        for prediction in predictions.iter().filter(|p| p.predicted_kg > 0.0) {
            let Some(product) = products.get(prediction.product_id) else {
                skipped.push(SkippedProduct {
                    product_id: prediction.product_id,
                    reason: "product not found".to_string(),
                });
                continue;
            };
            mix.push(MixEntry {
                product_id: product.id,
                kg: prediction.predicted_kg,
                labor_minutes: product.labor_minutes_for(prediction.predicted_kg),
                batches: None,
                origin: MixOrigin::Ml,
                confidence: prediction.confidence,
                method: Some(prediction.method.clone()),
            });
        }

        (mix, skipped)
    }

    pub fn get(&self, product_id: ProductId) -> Option<&MixEntry> {
        self.entries
            .binary_search_by_key(&product_id, |e| e.product_id)
            .ok()
            .map(|idx| &self.entries[idx])
    }

    pub fn total_kg(&self) -> f64 {
        self.entries.iter().map(|e| e.kg).sum()
    }

    pub fn total_minutes(&self) -> f64 {
        self.entries.iter().map(|e| e.labor_minutes).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn count_origin(&self, origin: MixOrigin) -> usize {
        self.entries.iter().filter(|e| e.origin == origin).count()
    }
}
