//! Host/device classification for a split compilation.
//!
//! A compilation unit is built either for the host CPU or for the device
//! accelerator. The side is fixed at build-configuration time (the
//! `device-side` cargo feature) and never changes while compiling.
//!
//! Shared code guards side-specific items with [`require_side!`], which turns a
//! mismatch into a const-evaluation failure, so the wrong side never builds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which half of a split compilation is being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilationSide {
    Host,
    Device,
}

/// Returned by [`CompilationSide::check`] when a stage is wired to the wrong side.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {required} side, but this unit is configured for the {configured} side")]
pub struct SideMismatch {
    pub configured: CompilationSide,
    pub required: CompilationSide,
}

impl CompilationSide {
    /// Side fixed for the current compilation unit by cargo features.
    ///
    /// Capture this once (e.g. when building a pipeline) and pass it along
    /// rather than re-reading it deep inside shared code.
    pub const fn configured() -> Self {
        if cfg!(feature = "device-side") {
            CompilationSide::Device
        } else {
            CompilationSide::Host
        }
    }

    pub const fn is_host(self) -> bool {
        matches!(self, CompilationSide::Host)
    }

    pub const fn is_device(self) -> bool {
        matches!(self, CompilationSide::Device)
    }

    /// Panic if `self` is not `required`.
    ///
    /// Meant for const contexts: evaluated in a `const` item, the panic becomes
    /// a compile error instead of a runtime failure.
    pub const fn assert_side(self, required: CompilationSide) {
        match (self, required) {
            (CompilationSide::Host, CompilationSide::Device) => {
                panic!("device-only code reached while compiling for the host side")
            }
            (CompilationSide::Device, CompilationSide::Host) => {
                panic!("host-only code reached while compiling for the device side")
            }
            _ => {}
        }
    }

    /// Fallible form of [`assert_side`](Self::assert_side) for pipeline wiring.
    pub fn check(self, required: CompilationSide) -> Result<(), SideMismatch> {
        if self == required {
            Ok(())
        } else {
            Err(SideMismatch { configured: self, required })
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CompilationSide::Host => "host",
            CompilationSide::Device => "device",
        }
    }
}

impl fmt::Display for CompilationSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompilationSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "host" => Ok(CompilationSide::Host),
            "device" => Ok(CompilationSide::Device),
            other => Err(format!("unknown compilation side '{other}' (expected host or device)")),
        }
    }
}

/// Fail the build unless `$configured` equals `$required`.
///
/// ```
/// use bridge_core::require_side;
/// use bridge_core::side::CompilationSide;
///
/// const SIDE: CompilationSide = CompilationSide::Host;
/// require_side!(SIDE, CompilationSide::Host);
/// ```
#[macro_export]
macro_rules! require_side {
    ($configured:expr, $required:expr) => {
        const _: () = $crate::side::CompilationSide::assert_side($configured, $required);
    };
}
