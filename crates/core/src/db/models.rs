use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Outcome of one target build, as stored in the ledger.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Config extracted and generated source written (or already current).
    Succeeded,
    /// Device compile or extraction failed.
    Failed,
    /// Never attempted because an upstream stage failed.
    Skipped,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Succeeded => "succeeded",
            RunStatus::Failed => "failed",
            RunStatus::Skipped => "skipped",
        }
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "succeeded" => Ok(RunStatus::Succeeded),
            "failed" => Ok(RunStatus::Failed),
            "skipped" => Ok(RunStatus::Skipped),
            other => Err(format!("unknown run status '{other}'")),
        }
    }
}

/// One row of the build ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildRunRecord {
    pub target: String,
    pub architecture: String,
    pub processor: Option<String>,
    pub compiler: String,
    pub status: RunStatus,
    pub error: Option<String>,
    pub binary_path: Option<String>,
    pub binary_hash: Option<String>,
    pub generated_path: Option<String>,
    pub kernel_count: usize,
    pub overload_count: usize,
    /// Whether the generated file was rewritten by this run.
    pub generated_changed: bool,
    pub started_at: String,
    pub finished_at: String,
}
