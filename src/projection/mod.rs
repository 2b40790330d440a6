//! Multi-period projection of production costs

mod engine;
mod results;

pub use engine::{ProjectionConfig, ProjectionEngine, ProjectionMode};
pub use results::{MonthProjection, MonthSource, PeriodSummary, ProjectedProduct, ProjectionResult};
