#[cfg(feature = "amdgpu-backend")]
pub mod amdgpu;

#[cfg(feature = "amdgpu-backend")]
pub use amdgpu::AmdgpuExtractor;
