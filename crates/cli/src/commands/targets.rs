use std::path::Path;

use anyhow::{anyhow, Result};

use bridge_core::binary::Architecture;
use bridge_core::db::{load_targets_file, CompilerConfig, ProjectContext, TargetConfig};

use crate::canonicalize_or_current;

/// Arguments of `add-target` when the target is described on the command line.
#[derive(Debug, Clone, Default)]
pub struct AddTargetArgs {
    pub name: String,
    pub source: String,
    pub arch: String,
    pub processor: Option<String>,
    /// External compiler program; defaults to clang.
    pub compiler: Option<String>,
    pub compiler_args: Vec<String>,
    /// Treat `source` as an already-built device object.
    pub prebuilt: bool,
    pub generated: Option<String>,
}

impl AddTargetArgs {
    pub fn into_target(self) -> Result<TargetConfig> {
        let architecture: Architecture = self.arch.parse().map_err(|e: String| anyhow!(e))?;
        let compiler = match (self.prebuilt, self.compiler) {
            (true, Some(_)) => {
                return Err(anyhow!("--prebuilt and --compiler are mutually exclusive"))
            }
            (true, None) => CompilerConfig::Prebuilt,
            (false, Some(program)) => CompilerConfig::Command { program, args: self.compiler_args },
            (false, None) => CompilerConfig::Clang,
        };
        let mut target = TargetConfig::new(self.name, self.source, architecture)
            .with_processor(self.processor)
            .with_compiler(compiler);
        target.generated = self.generated;
        Ok(target)
    }
}

/// Register one target in the project config.
pub fn add_target_command(root: &str, args: AddTargetArgs) -> Result<()> {
    let target = args.into_target()?;
    add_targets(root, vec![target])
}

/// Register every target listed in a YAML or JSON file.
pub fn import_targets_command(root: &str, file: &str) -> Result<()> {
    let targets = load_targets_file(Path::new(file))?;
    if targets.is_empty() {
        return Err(anyhow!("No targets found in {}", file));
    }
    add_targets(root, targets)
}

fn add_targets(root: &str, targets: Vec<TargetConfig>) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let mut ctx = ProjectContext::from_root(&root_path)?;

    let mut added = Vec::with_capacity(targets.len());
    for target in targets {
        let generated = target.pipeline_target(&ctx.layout).generated_path;
        added.push((target.name.clone(), ctx.layout.relative_string(&generated)));
        ctx.config.add_target(target)?;
    }
    ctx.save_config()?;

    for (name, generated) in added {
        println!("Added target {} (generates {})", name, generated);
    }
    Ok(())
}
