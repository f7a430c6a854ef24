//! Project layout, configuration and the build-run ledger.
//!
//! - `ProjectLayout`: computed paths for project directories/files.
//! - `ProjectConfig` / `TargetConfig`: serializable project metadata and device targets.
//! - `ProjectDb`: a small SQLite wrapper recording every target build.
//! - `ProjectContext`: layout + config + open DB bundled together.

mod config;
mod context;
mod layout;
mod models;
mod project_db;
mod util;

pub use config::*;
pub use context::*;
pub use layout::*;
pub use models::*;
pub use project_db::*;
pub use util::*;
