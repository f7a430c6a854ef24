use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::binary::Architecture;
use crate::side::CompilationSide;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    Failed { program: String, status: String, stderr: String },
    #[error("compiler reported success but produced no output at {}", .path.display())]
    MissingOutput { path: PathBuf },
    #[error("failed to prepare {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything a device compiler needs for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileRequest {
    pub source: PathBuf,
    pub architecture: Architecture,
    pub processor: Option<String>,
    pub output: PathBuf,
    pub side: CompilationSide,
}

/// Produces a device object from device source. The frontend itself is external.
pub trait DeviceCompiler: Send + Sync {
    fn compile(&self, request: &CompileRequest) -> Result<(), CompileError>;
    fn name(&self) -> &str;
}

/// Shells out to an external compiler.
///
/// Arguments may contain `{source}`, `{output}`, `{arch}`, `{processor}` and
/// `{side}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandCompiler {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandCompiler {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }

    /// clang targeting AMDHSA code objects.
    pub fn amdgpu_clang() -> Self {
        let program = std::env::var("KERNEL_BRIDGE_CLANG").unwrap_or_else(|_| "clang".to_string());
        Self::new(
            program,
            [
                "--target=amdgcn-amd-amdhsa",
                "-mcpu={processor}",
                "-O3",
                "-DKERNEL_BRIDGE_SIDE={side}",
                "-c",
                "{source}",
                "-o",
                "{output}",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        )
    }

    pub fn expand_args(&self, request: &CompileRequest) -> Vec<String> {
        let source = request.source.display().to_string();
        let output = request.output.display().to_string();
        let arch = request.architecture.to_string();
        let processor = request.processor.clone().unwrap_or_default();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{source}", &source)
                    .replace("{output}", &output)
                    .replace("{arch}", &arch)
                    .replace("{processor}", &processor)
                    .replace("{side}", request.side.as_str())
            })
            .collect()
    }
}

impl DeviceCompiler for CommandCompiler {
    fn compile(&self, request: &CompileRequest) -> Result<(), CompileError> {
        ensure_parent(&request.output)?;
        remove_stale(&request.output)?;
        let output = Command::new(&self.program)
            .args(self.expand_args(request))
            .output()
            .map_err(|source| CompileError::Spawn { program: self.program.clone(), source })?;
        if !output.status.success() {
            return Err(CompileError::Failed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if !request.output.is_file() {
            return Err(CompileError::MissingOutput { path: request.output.clone() });
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.program
    }
}

/// Treats the device source as an already-built object and copies it into place.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrebuiltObject;

impl DeviceCompiler for PrebuiltObject {
    fn compile(&self, request: &CompileRequest) -> Result<(), CompileError> {
        if !request.source.is_file() {
            return Err(CompileError::MissingOutput { path: request.source.clone() });
        }
        if request.source == request.output {
            return Ok(());
        }
        ensure_parent(&request.output)?;
        fs::copy(&request.source, &request.output)
            .map_err(|source| CompileError::Io { path: request.output.clone(), source })?;
        Ok(())
    }

    fn name(&self) -> &str {
        "prebuilt"
    }
}

/// Drop an object left by an earlier build so only fresh output counts.
fn remove_stale(path: &Path) -> Result<(), CompileError> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != std::io::ErrorKind::NotFound => {
            Err(CompileError::Io { path: path.to_path_buf(), source: err })
        }
        _ => Ok(()),
    }
}

fn ensure_parent(path: &Path) -> Result<(), CompileError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .map_err(|source| CompileError::Io { path: parent.to_path_buf(), source }),
        _ => Ok(()),
    }
}
