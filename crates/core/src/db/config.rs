use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::binary::Architecture;
use crate::codegen::{RenderOptions, DEFAULT_TYPES_PATH};
use crate::db::ProjectLayout;
use crate::pipeline::{CommandCompiler, DeviceCompiler, PipelineTarget, PrebuiltObject};

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    /// Path to the build ledger file (typically relative to project root).
    pub path: String,
}

impl DbConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("target name must not be empty")]
    EmptyTargetName,
    #[error("target '{0}' is already defined")]
    DuplicateTarget(String),
    #[error("targets '{first}' and '{second}' both generate {}", .path.display())]
    DuplicateGenerated { path: PathBuf, first: String, second: String },
    #[error("targets '{first}' and '{second}' both build into {}", .path.display())]
    DuplicateObject { path: PathBuf, first: String, second: String },
    #[error("unknown target '{0}'")]
    UnknownTarget(String),
}

/// How a target's device object is produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompilerConfig {
    /// clang for AMDHSA code objects (`KERNEL_BRIDGE_CLANG` overrides the binary).
    #[default]
    Clang,
    /// Arbitrary command with `{source}`/`{output}`/`{arch}`/`{processor}`/`{side}` placeholders.
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
    /// `source` is already a device object.
    Prebuilt,
}

impl CompilerConfig {
    pub fn build(&self) -> Arc<dyn DeviceCompiler> {
        match self {
            CompilerConfig::Clang => Arc::new(CommandCompiler::amdgpu_clang()),
            CompilerConfig::Command { program, args } => {
                Arc::new(CommandCompiler::new(program.clone(), args.clone()))
            }
            CompilerConfig::Prebuilt => Arc::new(PrebuiltObject),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            CompilerConfig::Clang => "clang",
            CompilerConfig::Command { program, .. } => program,
            CompilerConfig::Prebuilt => "prebuilt",
        }
    }
}

/// One device target: a source compiled for one architecture/processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub name: String,
    /// Device source (or object, for prebuilt targets), relative to the project root.
    pub source: String,
    pub architecture: Architecture,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processor: Option<String>,
    #[serde(default)]
    pub compiler: CompilerConfig,
    /// Override for the generated source path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated: Option<String>,
}

impl TargetConfig {
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        architecture: Architecture,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            architecture,
            processor: None,
            compiler: CompilerConfig::default(),
            generated: None,
        }
    }

    pub fn with_processor(mut self, processor: Option<String>) -> Self {
        self.processor = processor;
        self
    }

    pub fn with_compiler(mut self, compiler: CompilerConfig) -> Self {
        self.compiler = compiler;
        self
    }

    /// Resolve every path of this target against `layout`.
    pub fn pipeline_target(&self, layout: &ProjectLayout) -> PipelineTarget {
        let generated_path = match &self.generated {
            Some(path) => layout.resolve(path),
            None => layout.generated_source_path(&self.name),
        };
        PipelineTarget {
            name: self.name.clone(),
            source: layout.resolve(&self.source),
            architecture: self.architecture,
            processor: self.processor.clone(),
            object_path: layout.target_object_path(&self.name),
            generated_path,
        }
    }
}

/// Serializable configuration describing a kernel-bridge project.
///
/// This lives at `.kbridge/project.json` in the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Human-friendly project name.
    pub name: String,
    /// Optional description / notes.
    pub description: Option<String>,
    /// Schema/config version. This is about the config format, not the tool version.
    pub config_version: String,
    /// Database configuration (path is typically relative to project root).
    pub db: DbConfig,
    /// Module path the generated source imports descriptor types from.
    #[serde(default = "default_types_path")]
    pub types_path: String,
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

fn default_types_path() -> String {
    DEFAULT_TYPES_PATH.to_string()
}

impl ProjectConfig {
    /// Create a new project configuration using the given name and db path.
    pub fn new(name: impl Into<String>, db_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            config_version: "0.1.0".to_string(),
            db: DbConfig::new(db_path),
            types_path: default_types_path(),
            targets: Vec::new(),
        }
    }

    pub fn target(&self, name: &str) -> Option<&TargetConfig> {
        self.targets.iter().find(|t| t.name == name)
    }

    /// Add a target; rejects duplicate names.
    pub fn add_target(&mut self, target: TargetConfig) -> Result<(), ConfigError> {
        if target.name.trim().is_empty() {
            return Err(ConfigError::EmptyTargetName);
        }
        if self.target(&target.name).is_some() {
            return Err(ConfigError::DuplicateTarget(target.name));
        }
        self.targets.push(target);
        Ok(())
    }

    /// Targets named by `filter`, or all of them.
    pub fn select_targets(&self, filter: &[String]) -> Result<Vec<&TargetConfig>, ConfigError> {
        if filter.is_empty() {
            return Ok(self.targets.iter().collect());
        }
        filter
            .iter()
            .map(|name| self.target(name).ok_or_else(|| ConfigError::UnknownTarget(name.clone())))
            .collect()
    }

    /// Names must be unique and no two targets may share a device object or
    /// a generated file.
    pub fn validate(&self, layout: &ProjectLayout) -> Result<(), ConfigError> {
        let mut objects: HashMap<PathBuf, &str> = HashMap::new();
        let mut generated: HashMap<PathBuf, &str> = HashMap::new();
        let mut names: Vec<&str> = Vec::new();
        for target in &self.targets {
            if target.name.trim().is_empty() {
                return Err(ConfigError::EmptyTargetName);
            }
            if names.contains(&target.name.as_str()) {
                return Err(ConfigError::DuplicateTarget(target.name.clone()));
            }
            names.push(&target.name);

            let resolved = target.pipeline_target(layout);
            if let Some(first) = objects.get(&resolved.object_path) {
                return Err(ConfigError::DuplicateObject {
                    path: resolved.object_path,
                    first: first.to_string(),
                    second: target.name.clone(),
                });
            }
            objects.insert(resolved.object_path, &target.name);

            let path = resolved.generated_path;
            if let Some(first) = generated.get(&path) {
                return Err(ConfigError::DuplicateGenerated {
                    path,
                    first: first.to_string(),
                    second: target.name.clone(),
                });
            }
            generated.insert(path, &target.name);
        }
        Ok(())
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions { types_path: self.types_path.clone(), encoding: None }
    }
}

/// Accepted shapes of a standalone targets file.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TargetsFile {
    List(Vec<TargetConfig>),
    Wrapped { targets: Vec<TargetConfig> },
}

impl TargetsFile {
    pub fn into_targets(self) -> Vec<TargetConfig> {
        match self {
            TargetsFile::List(targets) | TargetsFile::Wrapped { targets } => targets,
        }
    }
}
