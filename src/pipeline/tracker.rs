//! Stage tracker: merges stage results into a pipeline run's metrics.
//!
//! Ported from the original `tracking.py`'s `StageTracker`. It never flips
//! the run's overall status itself — that remains the orchestrator's job.

use crate::models::{PipelineRun, PipelineRunStatus};
use crate::pipeline::StageResult;
use tracing::{info, warn};

/// Binds a [`PipelineRun`] and records [`StageResult`]s into its metrics.
pub struct StageTracker<'a> {
    run: &'a mut PipelineRun,
}

impl<'a> StageTracker<'a> {
    pub fn new(run: &'a mut PipelineRun) -> Self {
        Self { run }
    }

    /// Merges `result` into `aird_stages[stage_name]` and updates
    /// `aird_stages_completed` (append on success, remove on failure).
    pub fn record_stage_result(&mut self, result: &StageResult) {
        let stage_value = serde_json::to_value(result).unwrap_or(serde_json::Value::Null);
        self.run
            .metrics
            .aird_stages
            .insert(result.stage_name.clone(), stage_value);

        match result.status {
            crate::pipeline::StageStatus::Succeeded => {
                if !self.run.metrics.aird_stages_completed.contains(&result.stage_name) {
                    self.run.metrics.aird_stages_completed.push(result.stage_name.clone());
                }
            }
            crate::pipeline::StageStatus::Failed => {
                self.run.metrics.aird_stages_completed.retain(|name| name != &result.stage_name);
            }
            crate::pipeline::StageStatus::Skipped => {}
        }

        if result.status == crate::pipeline::StageStatus::Failed && self.run.status == PipelineRunStatus::Running {
            warn!(stage = %result.stage_name, "stage failed; pipeline status left to orchestrator");
        }

        info!(stage = %result.stage_name, status = ?result.status, "recorded stage result");
    }

    pub fn get_stage_result(&self, stage_name: &str) -> Option<&serde_json::Value> {
        self.run.metrics.aird_stages.get(stage_name)
    }

    pub fn completed_stages(&self) -> &[String] {
        &self.run.metrics.aird_stages_completed
    }
}
