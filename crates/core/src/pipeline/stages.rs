use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::binary::{self, Architecture, BinaryError};
use crate::codegen::{render_with, RenderOptions};
use crate::model::KernelConfigMap;
use crate::pipeline::graph::lock;
use crate::pipeline::{
    CompileRequest, DeviceCompiler, PipelineError, Stage, StageState, StageStatus, TaskGraph,
};
use crate::services::extract::ExtractorRegistry;
use crate::side::CompilationSide;

/// Upstream handle a config-extraction stage reads its binary from.
pub trait BinarySource: Stage {
    /// Device target this binary was built for.
    fn target(&self) -> &str;
    /// Location of the produced binary; `Some` once the stage is `Done`.
    fn binary_path(&self) -> Option<PathBuf>;
}

/// Compiles device source for one target architecture.
pub struct DeviceCompileStage {
    name: String,
    target: String,
    source: PathBuf,
    architecture: Architecture,
    processor: Option<String>,
    output: PathBuf,
    compiler: Arc<dyn DeviceCompiler>,
    state: Mutex<StageState<PathBuf>>,
}

impl DeviceCompileStage {
    pub fn new(
        target: impl Into<String>,
        source: impl Into<PathBuf>,
        architecture: Architecture,
        processor: Option<String>,
        output: impl Into<PathBuf>,
        compiler: Arc<dyn DeviceCompiler>,
    ) -> Self {
        let target = target.into();
        Self {
            name: format!("device-compile:{target}"),
            target,
            source: source.into(),
            architecture,
            processor,
            output: output.into(),
            compiler,
            state: Mutex::new(StageState::Pending),
        }
    }

    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    pub fn processor(&self) -> Option<&str> {
        self.processor.as_deref()
    }

    /// Error message of the last failed run.
    pub fn failure(&self) -> Option<String> {
        match &*lock(&self.state) {
            StageState::Failed(msg) => Some(msg.clone()),
            _ => None,
        }
    }
}

impl Stage for DeviceCompileStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn side(&self) -> CompilationSide {
        CompilationSide::Device
    }

    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    fn outputs(&self) -> Vec<PathBuf> {
        vec![self.output.clone()]
    }

    fn status(&self) -> StageStatus {
        lock(&self.state).status()
    }

    fn run(&self) -> Result<(), PipelineError> {
        *lock(&self.state) = StageState::Running;
        let request = CompileRequest {
            source: self.source.clone(),
            architecture: self.architecture,
            processor: self.processor.clone(),
            output: self.output.clone(),
            side: self.side(),
        };
        let result = self
            .compiler
            .compile(&request)
            .map_err(|source| PipelineError::Compile { target: self.target.clone(), source });
        *lock(&self.state) = match &result {
            Ok(()) => StageState::Done(self.output.clone()),
            Err(err) => StageState::Failed(err.to_string()),
        };
        result
    }
}

impl BinarySource for DeviceCompileStage {
    fn target(&self) -> &str {
        &self.target
    }

    fn binary_path(&self) -> Option<PathBuf> {
        lock(&self.state).done().cloned()
    }
}

/// Result published by a successful [`ConfigExtractStage`].
#[derive(Debug, Clone, Serialize)]
pub struct ExtractOutput {
    pub target: String,
    pub map: KernelConfigMap,
    /// Generated host configuration source.
    pub generated: String,
    pub generated_path: PathBuf,
    pub binary_path: PathBuf,
    /// SHA-256 of the binary the map was extracted from.
    pub binary_hash: String,
    /// False when the generated file already held identical text.
    pub changed: bool,
}

/// Extracts kernel configs from an upstream binary and writes host config source.
pub struct ConfigExtractStage {
    name: String,
    upstream: Arc<dyn BinarySource>,
    registry: Arc<ExtractorRegistry>,
    generated_path: PathBuf,
    options: RenderOptions,
    state: Mutex<StageState<Arc<ExtractOutput>>>,
}

impl ConfigExtractStage {
    pub fn new(
        upstream: Arc<dyn BinarySource>,
        registry: Arc<ExtractorRegistry>,
        generated_path: impl Into<PathBuf>,
        options: RenderOptions,
    ) -> Self {
        Self {
            name: format!("config-extract:{}", upstream.target()),
            upstream,
            registry,
            generated_path: generated_path.into(),
            options,
            state: Mutex::new(StageState::Pending),
        }
    }

    pub fn target(&self) -> &str {
        self.upstream.target()
    }

    pub fn output(&self) -> Option<Arc<ExtractOutput>> {
        lock(&self.state).done().cloned()
    }

    pub fn failure(&self) -> Option<String> {
        match &*lock(&self.state) {
            StageState::Failed(msg) => Some(msg.clone()),
            _ => None,
        }
    }

    fn execute(&self) -> Result<ExtractOutput, PipelineError> {
        self.upstream
            .side()
            .check(CompilationSide::Device)
            .map_err(|source| PipelineError::SideMismatch { stage: self.name.clone(), source })?;
        let not_ready = || PipelineError::UpstreamNotReady {
            stage: self.name.clone(),
            upstream: self.upstream.name().to_string(),
        };
        if self.upstream.status() != StageStatus::Done {
            return Err(not_ready());
        }
        let binary_path = self.upstream.binary_path().ok_or_else(not_ready)?;

        let bytes = fs::read(&binary_path)
            .map_err(|source| BinaryError::Io { path: binary_path.clone(), source })?;
        let binary = binary::parse_binary_named(&bytes, &binary_path.display().to_string())?;
        let map = self.registry.extract(&binary)?;
        let mut options = self.options.clone();
        if options.encoding.is_none() {
            options.encoding =
                self.registry.get(map.architecture).and_then(|e| e.encoding()).map(String::from);
        }
        let generated = render_with(&map, &options);
        let changed = write_if_changed(&self.generated_path, &generated)?;

        Ok(ExtractOutput {
            target: self.target().to_string(),
            map,
            generated,
            generated_path: self.generated_path.clone(),
            binary_path,
            binary_hash: sha256_hex(&bytes),
            changed,
        })
    }
}

impl Stage for ConfigExtractStage {
    fn name(&self) -> &str {
        &self.name
    }

    /// Its product is consumed by the host build.
    fn side(&self) -> CompilationSide {
        CompilationSide::Host
    }

    fn dependencies(&self) -> Vec<String> {
        vec![self.upstream.name().to_string()]
    }

    fn outputs(&self) -> Vec<PathBuf> {
        vec![self.generated_path.clone()]
    }

    fn status(&self) -> StageStatus {
        lock(&self.state).status()
    }

    fn run(&self) -> Result<(), PipelineError> {
        *lock(&self.state) = StageState::Running;
        match self.execute() {
            Ok(output) => {
                *lock(&self.state) = StageState::Done(Arc::new(output));
                Ok(())
            }
            Err(err) => {
                *lock(&self.state) = StageState::Failed(err.to_string());
                Err(err)
            }
        }
    }
}

/// Paths and identity of one device target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineTarget {
    pub name: String,
    pub source: PathBuf,
    pub architecture: Architecture,
    pub processor: Option<String>,
    pub object_path: PathBuf,
    pub generated_path: PathBuf,
}

/// The two chained stages for one target.
pub struct TargetPipeline {
    pub compile: Arc<DeviceCompileStage>,
    pub extract: Arc<ConfigExtractStage>,
}

impl TargetPipeline {
    pub fn new(
        target: &PipelineTarget,
        compiler: Arc<dyn DeviceCompiler>,
        registry: Arc<ExtractorRegistry>,
        options: RenderOptions,
    ) -> Self {
        let compile = Arc::new(DeviceCompileStage::new(
            target.name.clone(),
            target.source.clone(),
            target.architecture,
            target.processor.clone(),
            target.object_path.clone(),
            compiler,
        ));
        let extract = Arc::new(ConfigExtractStage::new(
            compile.clone(),
            registry,
            target.generated_path.clone(),
            options,
        ));
        Self { compile, extract }
    }

    pub fn add_to(&self, graph: &mut TaskGraph) -> Result<(), PipelineError> {
        graph.add(self.compile.clone())?;
        graph.add(self.extract.clone())?;
        Ok(())
    }

    pub fn target(&self) -> &str {
        self.extract.target()
    }
}

/// Write `contents` unless the file already holds exactly that text.
fn write_if_changed(path: &Path, contents: &str) -> Result<bool, PipelineError> {
    if fs::read(path).map(|existing| existing == contents.as_bytes()).unwrap_or(false) {
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|source| PipelineError::Write { path: parent.to_path_buf(), source })?;
    }
    fs::write(path, contents)
        .map_err(|source| PipelineError::Write { path: path.to_path_buf(), source })?;
    Ok(true)
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
