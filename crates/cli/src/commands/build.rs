use std::sync::Arc;

use anyhow::{anyhow, Result};

use bridge_core::db::{ProjectContext, RunStatus};
use bridge_core::services::build::BuildRunner;
use bridge_core::services::extract::default_extractor_registry;

use crate::canonicalize_or_current;
use crate::commands::print_json;

/// Run the configured device-compile -> config-extract pipelines.
///
/// Fails (non-zero exit) when any selected target did not succeed.
pub fn build_command(root: &str, targets: Vec<String>, verbose: bool, json: bool) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let ctx = ProjectContext::from_root(&root_path)?;
    if ctx.config.targets.is_empty() {
        return Err(anyhow!("No targets configured; add one with `kernel-bridge add-target`"));
    }

    let runner = BuildRunner::new(&ctx, Arc::new(default_extractor_registry()));
    let summary = runner.run(&targets)?;

    if json {
        print_json(&summary)?;
    } else {
        for outcome in &summary.outcomes {
            match (&outcome.status, &outcome.output) {
                (RunStatus::Succeeded, Some(output)) => {
                    println!(
                        "[ok] {}: {} kernels, {} overloads -> {}{}",
                        outcome.target,
                        output.map.len(),
                        output.map.overload_count(),
                        ctx.layout.relative_string(&output.generated_path),
                        if output.changed { "" } else { " (unchanged)" },
                    );
                    if verbose {
                        for line in output.map.diagnostics() {
                            println!("    {}", line);
                        }
                    }
                }
                (status, _) => {
                    println!(
                        "[{}] {}: {}",
                        status.as_str(),
                        outcome.target,
                        outcome.error.as_deref().unwrap_or("upstream stage did not run")
                    );
                }
            }
        }
    }

    let failed = summary.failed().count();
    if failed > 0 {
        return Err(anyhow!("{} of {} targets failed", failed, summary.outcomes.len()));
    }
    Ok(())
}
