use std::collections::HashMap;

use thiserror::Error;

use crate::binary::{Architecture, BinaryObject};
use crate::model::KernelConfigMap;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// No backend is registered for the binary's architecture. This is a
    /// target-selection problem, not a problem with the binary itself.
    #[error("unsupported platform: no kernel extractor for architecture '{architecture}' (supported: {})", .supported.join(", "))]
    UnsupportedPlatform { architecture: Architecture, supported: Vec<String> },
    #[error("malformed kernel metadata in symbol '{symbol}': {reason}")]
    MalformedKernelMetadata { symbol: String, reason: String },
}

impl ExtractError {
    pub fn malformed(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        ExtractError::MalformedKernelMetadata { symbol: symbol.into(), reason: reason.into() }
    }
}

/// Architecture-specific decoder of kernel overload metadata.
///
/// Implementations are pure: they only look at the `BinaryObject` they are given.
pub trait KernelExtractor: Send + Sync {
    fn extract(&self, binary: &BinaryObject) -> Result<KernelConfigMap, ExtractError>;
    fn architecture(&self) -> Architecture;
    fn name(&self) -> &'static str;
    /// Label of the metadata encoding this extractor reads, if it has one.
    fn encoding(&self) -> Option<&'static str> {
        None
    }
}

/// One extractor per architecture; callers dispatch on `BinaryObject::architecture`.
#[derive(Default)]
pub struct ExtractorRegistry {
    extractors: HashMap<Architecture, Box<dyn KernelExtractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self { extractors: HashMap::new() }
    }

    /// Register `extractor` for its architecture, replacing any previous one.
    pub fn register<E: KernelExtractor + 'static>(&mut self, extractor: E) -> &mut Self {
        self.extractors.insert(extractor.architecture(), Box::new(extractor));
        self
    }

    pub fn get(&self, architecture: Architecture) -> Option<&dyn KernelExtractor> {
        self.extractors.get(&architecture).map(|e| &**e)
    }

    /// Sorted architecture names, for error messages and listings.
    pub fn architectures(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.extractors.keys().map(ToString::to_string).collect();
        keys.sort();
        keys
    }

    /// Registered extractors ordered by architecture.
    pub fn extractors(&self) -> Vec<&dyn KernelExtractor> {
        let mut all: Vec<&dyn KernelExtractor> = self.extractors.values().map(|e| &**e).collect();
        all.sort_by_key(|e| e.architecture());
        all
    }

    /// Dispatch `binary` to the backend registered for its architecture.
    pub fn extract(&self, binary: &BinaryObject) -> Result<KernelConfigMap, ExtractError> {
        let extractor =
            self.get(binary.architecture).ok_or_else(|| ExtractError::UnsupportedPlatform {
                architecture: binary.architecture,
                supported: self.architectures(),
            })?;
        extractor.extract(binary)
    }
}

/// Registry populated with every backend compiled into this build.
pub fn default_extractor_registry() -> ExtractorRegistry {
    let mut registry = ExtractorRegistry::new();
    #[cfg(feature = "amdgpu-backend")]
    {
        registry.register(crate::services::backends::AmdgpuExtractor);
    }
    registry
}

/// Extract with the default registry.
pub fn extract_kernels(binary: &BinaryObject) -> Result<KernelConfigMap, ExtractError> {
    default_extractor_registry().extract(binary)
}
