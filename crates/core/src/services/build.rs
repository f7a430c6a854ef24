use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use crate::db::{BuildRunRecord, ConfigError, DbError, ProjectContext, RunStatus, TargetConfig};
use crate::pipeline::{
    BinarySource, ExtractOutput, GraphReport, PipelineError, TargetPipeline, TaskGraph,
};
use crate::services::extract::ExtractorRegistry;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("failed to record build run: {0}")]
    Db(#[from] DbError),
}

/// Result of building one target.
#[derive(Debug, Clone, Serialize)]
pub struct TargetOutcome {
    pub target: String,
    pub status: RunStatus,
    pub error: Option<String>,
    pub output: Option<ExtractOutput>,
    /// Ledger row id of this run.
    pub run_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildSummary {
    pub outcomes: Vec<TargetOutcome>,
    pub report: GraphReport,
}

impl BuildSummary {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.status == RunStatus::Succeeded)
    }

    pub fn failed(&self) -> impl Iterator<Item = &TargetOutcome> {
        self.outcomes.iter().filter(|o| o.status != RunStatus::Succeeded)
    }
}

/// Coordinator that builds project targets and records every outcome in the ledger.
pub struct BuildRunner<'a> {
    pub ctx: &'a ProjectContext,
    pub registry: Arc<ExtractorRegistry>,
}

impl<'a> BuildRunner<'a> {
    pub fn new(ctx: &'a ProjectContext, registry: Arc<ExtractorRegistry>) -> Self {
        Self { ctx, registry }
    }

    /// Build the named targets (all of them when `targets` is empty).
    ///
    /// A failing target does not stop the others; each outcome is recorded.
    pub fn run(&self, targets: &[String]) -> Result<BuildSummary, BuildError> {
        let selected = self.ctx.config.select_targets(targets)?;
        let options = self.ctx.config.render_options();

        let mut graph = TaskGraph::new();
        let mut pipelines: Vec<(&TargetConfig, TargetPipeline)> = Vec::new();
        for target in selected {
            let pipeline = TargetPipeline::new(
                &target.pipeline_target(&self.ctx.layout),
                target.compiler.build(),
                Arc::clone(&self.registry),
                options.clone(),
            );
            pipeline.add_to(&mut graph)?;
            pipelines.push((target, pipeline));
        }

        let started_at = Utc::now().to_rfc3339();
        let report = graph.run()?;
        let finished_at = Utc::now().to_rfc3339();

        let mut outcomes = Vec::with_capacity(pipelines.len());
        for (target, pipeline) in pipelines {
            let output = pipeline.extract.output().map(|o| (*o).clone());
            let (status, error) = match (&output, pipeline.compile.failure()) {
                (Some(_), _) => (RunStatus::Succeeded, None),
                (None, Some(compile_error)) => (RunStatus::Failed, Some(compile_error)),
                (None, None) => match pipeline.extract.failure() {
                    Some(extract_error) => (RunStatus::Failed, Some(extract_error)),
                    None => (RunStatus::Skipped, None),
                },
            };

            let layout = &self.ctx.layout;
            let record = BuildRunRecord {
                target: target.name.clone(),
                architecture: target.architecture.to_string(),
                processor: output
                    .as_ref()
                    .and_then(|o| o.map.processor.clone())
                    .or_else(|| target.processor.clone()),
                compiler: target.compiler.label().to_string(),
                status,
                error: error.clone(),
                binary_path: pipeline.compile.binary_path().map(|p| layout.relative_string(&p)),
                binary_hash: output.as_ref().map(|o| o.binary_hash.clone()),
                generated_path: output.as_ref().map(|o| layout.relative_string(&o.generated_path)),
                kernel_count: output.as_ref().map_or(0, |o| o.map.len()),
                overload_count: output.as_ref().map_or(0, |o| o.map.overload_count()),
                generated_changed: output.as_ref().is_some_and(|o| o.changed),
                started_at: started_at.clone(),
                finished_at: finished_at.clone(),
            };
            let run_id = self.ctx.db.insert_build_run(&record)?;

            outcomes.push(TargetOutcome {
                target: target.name.clone(),
                status,
                error,
                output,
                run_id,
            });
        }

        Ok(BuildSummary { outcomes, report })
    }
}
