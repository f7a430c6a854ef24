//! Two-stage build pipeline per device target:
//! device compile -> kernel-config extraction (-> host build, external).
//!
//! Stages conform to the small [`Stage`] contract so any scheduler can drive
//! them; [`TaskGraph`] is the in-crate scheduler used by the CLI and tests.

use std::path::PathBuf;

use thiserror::Error;

use crate::binary::BinaryError;
use crate::services::extract::ExtractError;
use crate::side::SideMismatch;

pub mod compiler;
pub mod graph;
pub mod stages;

pub use compiler::{CommandCompiler, CompileError, CompileRequest, DeviceCompiler, PrebuiltObject};
pub use graph::{GraphReport, Stage, StageFailure, StageState, StageStatus, TaskGraph};
pub use stages::{
    BinarySource, ConfigExtractStage, DeviceCompileStage, ExtractOutput, PipelineTarget,
    TargetPipeline,
};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Binary(#[from] BinaryError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("device compile for target '{target}' failed: {source}")]
    Compile {
        target: String,
        #[source]
        source: CompileError,
    },
    #[error("stage '{stage}' cannot run: upstream '{upstream}' has not completed")]
    UpstreamNotReady { stage: String, upstream: String },
    #[error("stage '{stage}' is wired to the wrong side: {source}")]
    SideMismatch {
        stage: String,
        #[source]
        source: SideMismatch,
    },
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("duplicate stage name '{0}'")]
    DuplicateStage(String),
    #[error("stage '{stage}' depends on unknown stage '{dependency}'")]
    UnknownDependency { stage: String, dependency: String },
    #[error("dependency cycle between stages: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),
    #[error("stages '{first}' and '{second}' both write {}", .path.display())]
    OutputConflict { path: PathBuf, first: String, second: String },
}
