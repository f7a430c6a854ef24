use std::path::Path;

use anyhow::Result;

use bridge_core::db::{ProjectConfig, ProjectLayout};

/// Load the project config JSON from disk (delegates to core helper).
pub fn load_project_config(layout: &ProjectLayout) -> Result<ProjectConfig> {
    bridge_core::db::load_project_config(layout)
}

/// Helper to print whether a directory exists.
pub fn print_dir_status(label: &str, path: &Path) {
    let exists = path.is_dir();
    println!("- {label}: {} ({})", if exists { "OK" } else { "MISSING" }, path.display());
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
