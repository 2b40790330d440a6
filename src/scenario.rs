//! Scenario runner for comparing projections
//!
//! Holds the master data and forecaster once, then evaluates many projection
//! configurations (different ranges, base months or modes) against them.

use crate::error::CostingError;
use crate::forecast::Forecaster;
use crate::projection::{PeriodSummary, ProjectionConfig, ProjectionEngine, ProjectionResult};
use crate::repository::CostingRepositories;
use rayon::prelude::*;

/// Pre-loaded scenario runner
///
/// # Example
/// ```ignore
/// let runner = ScenarioRunner::new(&repo, &forecaster);
/// let results = runner.run_scenarios(&[manual_cfg, mixed_cfg]);
/// ```
pub struct ScenarioRunner<'a, R: CostingRepositories + ?Sized, F: Forecaster> {
    repo: &'a R,
    forecaster: &'a F,
}

impl<'a, R, F> ScenarioRunner<'a, R, F>
where
    R: CostingRepositories + ?Sized,
    F: Forecaster,
{
    pub fn new(repo: &'a R, forecaster: &'a F) -> Self {
        Self { repo, forecaster }
    }

    /// Run a single projection
    pub fn run(&self, config: &ProjectionConfig) -> Result<ProjectionResult, CostingError> {
        ProjectionEngine::new(self.repo, self.forecaster).project(config)
    }
}

impl<'a, R, F> ScenarioRunner<'a, R, F>
where
    R: CostingRepositories + Sync + ?Sized,
    F: Forecaster + Sync,
{
    /// Run several configurations in parallel; results keep the input order
    pub fn run_scenarios(&self, configs: &[ProjectionConfig]) -> Vec<Result<ProjectionResult, CostingError>> {
        configs.par_iter().map(|config| self.run(config)).collect()
    }

    /// Period summaries of several configurations
    pub fn compare(&self, configs: &[ProjectionConfig]) -> Vec<Result<PeriodSummary, CostingError>> {
        self.run_scenarios(configs)
            .into_iter()
            .map(|r| r.map(|result| result.summary()))
            .collect()
    }
}
