//! bridge-core
//!
//! Core library for bridging device kernels into host builds.
//!
//! A device compile emits an object file; this crate reads that object
//! ([`binary`]), recovers per-kernel overload metadata through an
//! architecture-specific extractor ([`services::extract`]), and renders it
//! as host-side Rust configuration source ([`codegen`]). The [`pipeline`]
//! module chains the two compilation sides, and [`db`] keeps the project
//! layout, config and build ledger.
//!
//! Frontends (the `kernel-bridge` CLI) stay thin; all substantive logic
//! lives here so it is testable on its own.

pub mod side;
pub mod binary;
pub mod model;
pub mod services;
pub mod codegen;
pub mod pipeline;
pub mod db;

pub use side::CompilationSide;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
