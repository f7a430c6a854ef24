use std::path::{Path, PathBuf};

use crate::codegen::sanitize_identifier;

/// Logical layout of a project on disk.
///
/// This is derived from a chosen root path. It does *not* perform any IO itself.
/// The CLI or other frontends are responsible for actually creating directories
/// and files based on this layout.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    /// Root directory of the project.
    pub root: PathBuf,
    /// Directory for internal metadata (.kbridge).
    pub meta_dir: PathBuf,
    /// Path to the project config file (JSON).
    pub project_config_path: PathBuf,
    /// Path to the build ledger database.
    pub db_path: PathBuf,
    /// Directory for device objects, one subdirectory per target.
    pub build_dir: PathBuf,
    /// Directory for generated host configuration source.
    pub generated_dir: PathBuf,
}

impl ProjectLayout {
    /// Compute the default layout for a project rooted at `root`.
    ///
    /// This does *not* touch the filesystem.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let meta_dir = root.join(".kbridge");
        let project_config_path = meta_dir.join("project.json");
        let db_path = meta_dir.join("builds.db");
        let build_dir = meta_dir.join("build");
        let generated_dir = root.join("generated");

        Self { root, meta_dir, project_config_path, db_path, build_dir, generated_dir }
    }

    /// Compute a database path string suitable for storing in `ProjectConfig`,
    /// typically as a path relative to `root`.
    pub fn db_path_relative_string(&self) -> String {
        self.relative_string(&self.db_path)
    }

    /// `path` relative to the project root when it lives under it.
    pub fn relative_string(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(rel) => rel.to_string_lossy().to_string(),
            Err(_) => path.to_string_lossy().to_string(),
        }
    }

    /// Resolve a config path (relative to root unless absolute).
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Device object produced for `target`.
    pub fn target_object_path(&self, target: &str) -> PathBuf {
        self.build_dir.join(target_dir_name(target)).join("device.o")
    }

    /// Default generated source file for `target`.
    pub fn generated_source_path(&self, target: &str) -> PathBuf {
        self.generated_dir.join(format!("{}_kernels.rs", target_dir_name(target)))
    }
}

/// File-system friendly form of a target name.
fn target_dir_name(target: &str) -> String {
    sanitize_identifier(target).trim_end_matches('_').to_ascii_lowercase()
}
