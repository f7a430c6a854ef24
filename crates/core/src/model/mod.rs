//! Kernel configuration model.
//!
//! The extraction side produces owned [`Overload`]s grouped in a
//! [`KernelConfigMap`]. Generated host code holds the `'static` mirror,
//! [`OverloadDescriptor`], which is what host call sites check launches against.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::binary::Architecture;

/// Element type of a kernel parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F16,
    F32,
    F64,
    Bool,
}

impl ScalarType {
    pub const ALL: [ScalarType; 12] = [
        ScalarType::I8,
        ScalarType::I16,
        ScalarType::I32,
        ScalarType::I64,
        ScalarType::U8,
        ScalarType::U16,
        ScalarType::U32,
        ScalarType::U64,
        ScalarType::F16,
        ScalarType::F32,
        ScalarType::F64,
        ScalarType::Bool,
    ];

    /// Short name, as used in signatures and diagnostics.
    pub const fn as_str(self) -> &'static str {
        match self {
            ScalarType::I8 => "i8",
            ScalarType::I16 => "i16",
            ScalarType::I32 => "i32",
            ScalarType::I64 => "i64",
            ScalarType::U8 => "u8",
            ScalarType::U16 => "u16",
            ScalarType::U32 => "u32",
            ScalarType::U64 => "u64",
            ScalarType::F16 => "f16",
            ScalarType::F32 => "f32",
            ScalarType::F64 => "f64",
            ScalarType::Bool => "bool",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == token)
    }

    pub const fn size(self) -> u32 {
        match self {
            ScalarType::I8 | ScalarType::U8 | ScalarType::Bool => 1,
            ScalarType::I16 | ScalarType::U16 | ScalarType::F16 => 2,
            ScalarType::I32 | ScalarType::U32 | ScalarType::F32 => 4,
            ScalarType::I64 | ScalarType::U64 | ScalarType::F64 => 8,
        }
    }

    fn variant_name(self) -> &'static str {
        match self {
            ScalarType::I8 => "I8",
            ScalarType::I16 => "I16",
            ScalarType::I32 => "I32",
            ScalarType::I64 => "I64",
            ScalarType::U8 => "U8",
            ScalarType::U16 => "U16",
            ScalarType::U32 => "U32",
            ScalarType::U64 => "U64",
            ScalarType::F16 => "F16",
            ScalarType::F32 => "F32",
            ScalarType::F64 => "F64",
            ScalarType::Bool => "Bool",
        }
    }
}

/// Memory a pointer parameter refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressSpace {
    /// Device global memory.
    Global,
    /// Workgroup-local (shared) memory.
    Local,
}

/// One kernel parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    Scalar(ScalarType),
    Pointer { space: AddressSpace, elem: ScalarType, mutable: bool },
}

/// Size in bytes of a device pointer in the kernel argument block.
pub const POINTER_SIZE: u32 = 8;

impl ParamType {
    pub const fn size(self) -> u32 {
        match self {
            ParamType::Scalar(s) => s.size(),
            ParamType::Pointer { .. } => POINTER_SIZE,
        }
    }

    /// Natural alignment equals size for every parameter kind we model.
    pub const fn align(self) -> u32 {
        self.size()
    }

    /// Rust expression constructing this value, relative to the model module.
    pub fn initializer(&self) -> String {
        match self {
            ParamType::Scalar(s) => format!("ParamType::Scalar(ScalarType::{})", s.variant_name()),
            ParamType::Pointer { space, elem, mutable } => format!(
                "ParamType::Pointer {{ space: AddressSpace::{}, elem: ScalarType::{}, mutable: {} }}",
                match space {
                    AddressSpace::Global => "Global",
                    AddressSpace::Local => "Local",
                },
                elem.variant_name(),
                mutable
            ),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Scalar(s) => f.write_str(s.as_str()),
            ParamType::Pointer { space, elem, mutable } => {
                let space = match space {
                    AddressSpace::Global => "",
                    AddressSpace::Local => "local ",
                };
                let qual = if *mutable { "mut" } else { "const" };
                write!(f, "*{space}{qual} {}", elem.as_str())
            }
        }
    }
}

/// Size of the packed, naturally aligned argument block for `params`.
pub fn kernarg_block_size(params: &[ParamType]) -> u32 {
    params.iter().fold(0u32, |offset, p| {
        let align = p.align();
        offset.div_ceil(align) * align + p.size()
    })
}

/// Resource bounds recorded by the device compiler for one overload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LaunchAttributes {
    /// Statically allocated workgroup-local memory, in bytes.
    pub group_segment_size: u32,
    /// Per-work-item scratch memory, in bytes.
    pub private_segment_size: u32,
    /// Size of the kernel argument block, in bytes.
    pub kernarg_size: u32,
}

impl LaunchAttributes {
    fn initializer(&self) -> String {
        format!(
            "LaunchAttributes {{ group_segment_size: {}, private_segment_size: {}, kernarg_size: {} }}",
            self.group_segment_size, self.private_segment_size, self.kernarg_size
        )
    }
}

/// One compiled instantiation of a kernel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overload {
    /// Code symbol the instantiation was compiled to.
    pub symbol: String,
    /// Symbol address; the ordering key among overloads of one kernel.
    pub address: u64,
    pub params: Vec<ParamType>,
    pub launch: LaunchAttributes,
}

impl Overload {
    /// Comma-separated parameter list, e.g. `i32, *mut f32`.
    pub fn description(&self) -> String {
        self.params.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    }

    /// Rust source for the equivalent [`OverloadDescriptor`].
    ///
    /// Type names are unqualified; the generated module imports them.
    pub fn static_initializer(&self) -> String {
        let params = self.params.iter().map(ParamType::initializer).collect::<Vec<_>>().join(", ");
        format!(
            "OverloadDescriptor {{ symbol: {:?}, params: &[{}], launch: {} }}",
            self.symbol,
            params,
            self.launch.initializer()
        )
    }
}

/// `'static` overload entry held by generated configuration constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverloadDescriptor {
    pub symbol: &'static str,
    pub params: &'static [ParamType],
    pub launch: LaunchAttributes,
}

impl OverloadDescriptor {
    /// True when `args` matches this overload's parameter list exactly.
    pub fn accepts(&self, args: &[ParamType]) -> bool {
        self.params == args
    }
}

/// Pick the overload of a generated kernel constant whose signature matches `args`.
pub fn select_overload<'a>(
    overloads: &'a [OverloadDescriptor],
    args: &[ParamType],
) -> Option<&'a OverloadDescriptor> {
    overloads.iter().find(|o| o.accepts(args))
}

/// All overloads recovered for one logical kernel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelConfig {
    pub name: String,
    pub overloads: Vec<Overload>,
}

/// Kernel name to ordered overloads, in the order recovered from the binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelConfigMap {
    pub architecture: Architecture,
    /// Accelerator processor the binary targets (e.g. `gfx90a`), if known.
    pub processor: Option<String>,
    kernels: Vec<KernelConfig>,
}

impl KernelConfigMap {
    pub fn new(architecture: Architecture, processor: Option<String>) -> Self {
        Self { architecture, processor, kernels: Vec::new() }
    }

    /// Append `overload` to `kernel`, creating the entry at the end if it is new.
    pub fn insert_overload(&mut self, kernel: &str, overload: Overload) {
        match self.kernels.iter_mut().find(|k| k.name == kernel) {
            Some(entry) => entry.overloads.push(overload),
            None => self
                .kernels
                .push(KernelConfig { name: kernel.to_string(), overloads: vec![overload] }),
        }
    }

    pub fn get(&self, kernel: &str) -> Option<&[Overload]> {
        self.kernels.iter().find(|k| k.name == kernel).map(|k| k.overloads.as_slice())
    }

    pub fn kernels(&self) -> &[KernelConfig] {
        &self.kernels
    }

    pub fn names(&self) -> Vec<&str> {
        self.kernels.iter().map(|k| k.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    pub fn overload_count(&self) -> usize {
        self.kernels.iter().map(|k| k.overloads.len()).sum()
    }

    /// Build-log lines of the form `kernel(i32, i32)`, one per overload.
    pub fn diagnostics(&self) -> Vec<String> {
        self.kernels
            .iter()
            .flat_map(|k| {
                k.overloads.iter().map(move |o| format!("{}({})", k.name, o.description()))
            })
            .collect()
    }
}
