use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::db::{ProjectConfig, ProjectDb, ProjectLayout, TargetConfig, TargetsFile};

/// Load the project config JSON from disk for a given layout.
pub fn load_project_config(layout: &ProjectLayout) -> Result<ProjectConfig> {
    let config_json = fs::read_to_string(&layout.project_config_path).with_context(|| {
        format!("Failed to read project config at {}", layout.project_config_path.display())
    })?;
    let config: ProjectConfig =
        serde_json::from_str(&config_json).context("Failed to parse project config JSON")?;
    config.validate(layout).context("Invalid project config")?;
    Ok(config)
}

/// Write the project config back as pretty JSON.
pub fn save_project_config(layout: &ProjectLayout, config: &ProjectConfig) -> Result<()> {
    config.validate(layout).context("Refusing to save invalid project config")?;
    fs::create_dir_all(&layout.meta_dir).with_context(|| {
        format!("Failed to create metadata directory {}", layout.meta_dir.display())
    })?;
    let json =
        serde_json::to_string_pretty(config).context("Failed to serialize project config")?;
    fs::write(&layout.project_config_path, json).with_context(|| {
        format!("Failed to write project config to {}", layout.project_config_path.display())
    })?;
    Ok(())
}

/// Resolve the DB path (respecting relative/absolute config) and open a ProjectDb.
pub fn open_project_db(layout: &ProjectLayout) -> Result<(ProjectConfig, PathBuf, ProjectDb)> {
    let config = load_project_config(layout)?;
    let db_path = layout.resolve(&config.db.path);
    let db = ProjectDb::open(&db_path)
        .with_context(|| format!("Failed to open project database at {}", db_path.display()))?;
    Ok((config, db_path, db))
}

/// Load targets from a YAML (`.yaml`/`.yml`) or JSON file.
///
/// The file holds either a list of targets or a map with a `targets` list.
pub fn load_targets_file(path: &Path) -> Result<Vec<TargetConfig>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read targets file {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref(),
        Some("yaml" | "yml")
    );
    let file: TargetsFile = if is_yaml {
        serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse targets YAML {}", path.display()))?
    } else {
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse targets JSON {}", path.display()))?
    };
    Ok(file.into_targets())
}
