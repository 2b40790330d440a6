//! Production forecasting capability
//!
//! The forecasting model itself is opaque to the engine. It is injected as a
//! `Forecaster` wherever a mix needs forecast quantities.

use crate::catalog::ProductId;
use crate::error::CostingError;
use crate::month::YearMonth;
use anyhow::{Context, Result as AnyResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Predicted production for one product and month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPrediction {
    pub product_id: ProductId,
    /// Predicted quantity in kg
    pub predicted_kg: f64,
    /// Model confidence (0-1)
    pub confidence: f64,
    /// Method tag reported by the model
    pub method: String,
}

/// Source of monthly production predictions
pub trait Forecaster {
    /// Whether the model can produce predictions at all
    fn is_trained(&self) -> bool;

    /// Predictions for the given products in a month
    fn predict_month(
        &self,
        product_ids: &[ProductId],
        month: YearMonth,
    ) -> Result<Vec<ForecastPrediction>, CostingError>;
}

/// A forecaster with no model: every request is unavailable
#[derive(Debug, Clone, Copy, Default)]
pub struct UntrainedForecaster;

impl Forecaster for UntrainedForecaster {
    fn is_trained(&self) -> bool {
        false
    }

    fn predict_month(&self, _product_ids: &[ProductId], _month: YearMonth) -> Result<Vec<ForecastPrediction>, CostingError> {
        Err(CostingError::ForecastUnavailable("model not trained".to_string()))
    }
}

/// Forecaster answering from a fixed prediction table
///
/// Products without a row for the requested month are predicted at 0 kg.
#[derive(Debug, Clone, Default)]
pub struct StaticForecaster {
    predictions: BTreeMap<(YearMonth, ProductId), ForecastPrediction>,
}

#[derive(Debug, Deserialize)]
struct ForecastRow {
    month: String,
    product_id: ProductId,
    predicted_kg: f64,
    confidence: f64,
    method: String,
}

impl StaticForecaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a prediction
    pub fn insert(&mut self, month: YearMonth, prediction: ForecastPrediction) {
        self.predictions.insert((month, prediction.product_id), prediction);
    }

    pub fn with(mut self, month: YearMonth, product_id: ProductId, predicted_kg: f64, confidence: f64) -> Self {
        self.insert(
            month,
            ForecastPrediction {
                product_id,
                predicted_kg,
                confidence,
                method: "static".to_string(),
            },
        );
        self
    }

    /// Read a prediction table from any CSV source
    pub fn from_reader<R: Read>(reader: R) -> AnyResult<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut forecaster = Self::new();

        for result in csv_reader.deserialize() {
            let row: ForecastRow = result?;
            let month = YearMonth::parse_field(&row.month, "forecast month")?;
            forecaster.insert(
                month,
                ForecastPrediction {
                    product_id: row.product_id,
                    predicted_kg: row.predicted_kg,
                    confidence: row.confidence.clamp(0.0, 1.0),
                    method: row.method,
                },
            );
        }

        Ok(forecaster)
    }

    /// Load `forecasts.csv` from a data directory
    pub fn from_csv_path(path: &Path) -> AnyResult<Self> {
        let full = path.join("forecasts.csv");
        let file = File::open(&full).with_context(|| format!("opening {}", full.display()))?;
        Self::from_reader(file).with_context(|| format!("reading {}", full.display()))
    }

    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }
}

impl Forecaster for StaticForecaster {
    fn is_trained(&self) -> bool {
        !self.predictions.is_empty()
    }

    fn predict_month(
        &self,
        product_ids: &[ProductId],
        month: YearMonth,
    ) -> Result<Vec<ForecastPrediction>, CostingError> {
        if !self.is_trained() {
            return Err(CostingError::ForecastUnavailable("no predictions loaded".to_string()));
        }

        Ok(product_ids
            .iter()
            .map(|&id| {
                self.predictions.get(&(month, id)).cloned().unwrap_or(ForecastPrediction {
                    product_id: id,
                    predicted_kg: 0.0,
                    confidence: 0.0,
                    method: "no_history".to_string(),
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untrained_forecaster() {
        let f = UntrainedForecaster;
        assert!(!f.is_trained());
        assert!(f.predict_month(&[1], "2025-01".parse().unwrap()).is_err());
    }

    #[test]
    fn test_static_forecaster_defaults_to_zero() {
        let apr: YearMonth = "2025-04".parse().unwrap();
        let f = StaticForecaster::new().with(apr, 1, 500.0, 0.9);

        let preds = f.predict_month(&[1, 2], apr).unwrap();
        assert_eq!(preds.len(), 2);
        assert_eq!(preds[0].predicted_kg, 500.0);
        assert_eq!(preds[1].predicted_kg, 0.0);
        assert_eq!(preds[1].method, "no_history");
    }

    #[test]
    fn test_static_forecaster_from_reader() {
        let csv = "month,product_id,predicted_kg,confidence,method\n\
                   2025-04,1,2150,0.82,seasonal_ratio\n\
                   2025-04,2,760,1.4,seasonal_ratio\n";
        let f = StaticForecaster::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(f.len(), 2);

        let preds = f.predict_month(&[2], "2025-04".parse().unwrap()).unwrap();
        assert_eq!(preds[0].confidence, 1.0);
    }
}
