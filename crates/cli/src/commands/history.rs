use anyhow::Result;

use bridge_core::db::ProjectContext;

use crate::canonicalize_or_current;
use crate::commands::print_json;

/// Show recorded build runs, newest first.
pub fn history_command(
    root: &str,
    target: Option<String>,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let ctx = ProjectContext::from_root(&root_path)?;
    let mut runs = ctx.db.list_build_runs(target.as_deref())?;
    if let Some(limit) = limit {
        runs.truncate(limit);
    }

    if json {
        return print_json(&runs);
    }

    if runs.is_empty() {
        println!("Build runs: (none)");
        return Ok(());
    }

    println!("Build runs:");
    for run in runs {
        let detail = match &run.error {
            Some(err) => err.clone(),
            None => format!(
                "{} kernels, {} overloads{}",
                run.kernel_count,
                run.overload_count,
                if run.generated_changed { "" } else { ", unchanged" }
            ),
        };
        println!(
            "- {} {} [{}] {} via {}: {}",
            run.finished_at,
            run.target,
            run.status.as_str(),
            run.processor.as_deref().unwrap_or(&run.architecture),
            run.compiler,
            detail
        );
    }
    Ok(())
}
