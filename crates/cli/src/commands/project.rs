use std::fs;

use anyhow::{Context, Result};
use serde::Serialize;

use bridge_core::db::{
    save_project_config, ProjectConfig, ProjectContext, ProjectDb, ProjectLayout, TargetConfig,
};

use crate::commands::{backend_infos, print_dir_status, print_json};
use crate::{canonicalize_or_current, infer_project_name};

#[derive(Serialize)]
pub struct ProjectInfoSnapshot {
    pub name: String,
    pub description: Option<String>,
    pub root: String,
    pub config_file: String,
    pub config_version: String,
    pub db_path: String,
    pub types_path: String,
    pub available_backends: Vec<String>,
    pub layout: ProjectInfoLayout,
    pub targets: Vec<TargetConfig>,
}

#[derive(Serialize)]
pub struct ProjectInfoLayout {
    pub meta_dir: String,
    pub build_dir: String,
    pub generated_dir: String,
}

/// Initialize a new project at `root`.
pub fn init_project_command(root: &str, name: Option<String>) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let layout = ProjectLayout::new(&root_path);

    // Derive project name if not provided.
    let project_name = match name {
        Some(n) => n,
        None => infer_project_name(&root_path),
    };

    fs::create_dir_all(&layout.meta_dir)
        .with_context(|| format!("Failed to create meta dir: {}", layout.meta_dir.display()))?;
    fs::create_dir_all(&layout.build_dir)
        .with_context(|| format!("Failed to create build dir: {}", layout.build_dir.display()))?;
    fs::create_dir_all(&layout.generated_dir).with_context(|| {
        format!("Failed to create generated dir: {}", layout.generated_dir.display())
    })?;

    let config = ProjectConfig::new(&project_name, layout.db_path_relative_string());
    save_project_config(&layout, &config)?;

    // Create the ledger immediately so follow-on commands can rely on its presence.
    ProjectDb::open(&layout.db_path).with_context(|| {
        format!("Failed to initialize build ledger at {}", layout.db_path.display())
    })?;

    println!("Initialized kernel-bridge project:");
    println!("  Name: {}", project_name);
    println!("  Root: {}", layout.root.display());
    println!("  Config: {}", layout.project_config_path.display());
    println!("  DB path (relative): {}", config.db.path);
    println!("  Build dir: {}", layout.build_dir.display());
    println!("  Generated dir: {}", layout.generated_dir.display());

    Ok(())
}

/// Show basic information about an existing project.
pub fn project_info_command(root: &str, json: bool) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let ctx = ProjectContext::from_root(&root_path)?;
    let layout = &ctx.layout;
    let config = &ctx.config;

    if json {
        let snapshot = ProjectInfoSnapshot {
            name: config.name.clone(),
            description: config.description.clone(),
            root: layout.root.display().to_string(),
            config_file: layout.project_config_path.display().to_string(),
            config_version: config.config_version.clone(),
            db_path: ctx.db_path.display().to_string(),
            types_path: config.types_path.clone(),
            available_backends: backend_infos().into_iter().map(|b| b.name).collect(),
            layout: ProjectInfoLayout {
                meta_dir: layout.meta_dir.display().to_string(),
                build_dir: layout.build_dir.display().to_string(),
                generated_dir: layout.generated_dir.display().to_string(),
            },
            targets: config.targets.clone(),
        };
        return print_json(&snapshot);
    }

    println!("kernel-bridge Project Info");
    println!("==========================");
    println!("Name: {}", config.name);
    if let Some(description) = &config.description {
        println!("Description: {}", description);
    }
    println!("Root: {}", layout.root.display());
    println!("Config file: {}", layout.project_config_path.display());
    println!("Config version: {}", config.config_version);
    println!("DB path (config): {}", config.db.path);
    println!("Descriptor types: {}", config.types_path);
    println!();

    println!("Directories:");
    print_dir_status("Meta dir (.kbridge)", &layout.meta_dir);
    print_dir_status("Build dir", &layout.build_dir);
    print_dir_status("Generated dir", &layout.generated_dir);
    println!();

    if config.targets.is_empty() {
        println!("Targets: (none)");
    } else {
        println!("Targets:");
        for target in &config.targets {
            let last = ctx.db.latest_build_run(&target.name)?;
            println!(
                "- {} [{}{}] {} via {} (last build: {})",
                target.name,
                target.architecture,
                target.processor.as_deref().map(|p| format!(" {p}")).unwrap_or_default(),
                target.source,
                target.compiler.label(),
                last.map(|r| r.status.as_str()).unwrap_or("never"),
            );
        }
    }

    Ok(())
}
