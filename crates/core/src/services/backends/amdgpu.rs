//! AMDGPU (AMDHSA code object) kernel extractor.
//!
//! Encoding `kcfg-v1`: every kernel overload is a code symbol named
//! `<kernel>__<signature>` plus its 64-byte kernel descriptor symbol
//! `<kernel>__<signature>.kd`. The signature is `v` for no parameters or a
//! `_`-joined list of tokens:
//!
//! - scalars: `i8 i16 i32 i64 u8 u16 u32 u64 f16 f32 f64 bool`
//! - pointers: `p<scalar>` (global, mutable), `c<scalar>` (global, const),
//!   `l<scalar>` (workgroup-local)
//!
//! Launch attributes come from the descriptor: `group_segment_fixed_size`
//! at offset 0, `private_segment_fixed_size` at 4 and `kernarg_size` at 8.
//! An optional absolute `__kcfg_encoding_version` symbol pins the version.

use std::collections::HashSet;

use crate::binary::{Architecture, BinaryObject, Symbol, SymbolKind};
use crate::model::{
    kernarg_block_size, AddressSpace, KernelConfigMap, LaunchAttributes, Overload, ParamType,
    ScalarType,
};
use crate::services::extract::{ExtractError, KernelExtractor};

pub const ENCODING_NAME: &str = "kcfg-v1";
pub const ENCODING_VERSION: u64 = 1;
pub const ENCODING_VERSION_SYMBOL: &str = "__kcfg_encoding_version";
pub const DESCRIPTOR_SUFFIX: &str = ".kd";
pub const DESCRIPTOR_SIZE: u64 = 64;
pub const SIGNATURE_SEPARATOR: &str = "__";
pub const EMPTY_SIGNATURE: &str = "v";

/// `EF_AMDGPU_MACH` field of `e_flags`.
const EF_AMDGPU_MACH: u32 = 0xff;

const GROUP_SEGMENT_OFFSET: usize = 0;
const PRIVATE_SEGMENT_OFFSET: usize = 4;
const KERNARG_SIZE_OFFSET: usize = 8;

pub struct AmdgpuExtractor;

impl KernelExtractor for AmdgpuExtractor {
    fn extract(&self, binary: &BinaryObject) -> Result<KernelConfigMap, ExtractError> {
        check_encoding_version(binary)?;

        let mut seen = HashSet::new();
        let mut found: Vec<(String, Option<usize>, Overload)> = Vec::new();
        for sym in &binary.symbols {
            let Some(base) = sym.name.strip_suffix(DESCRIPTOR_SUFFIX) else {
                continue;
            };
            if !seen.insert(sym.name.as_str()) {
                return Err(ExtractError::malformed(&sym.name, "duplicate kernel descriptor"));
            }
            if sym.kind != SymbolKind::Object {
                return Err(ExtractError::malformed(
                    &sym.name,
                    "kernel descriptor must be a data object symbol",
                ));
            }

            let malformed = |reason: String| ExtractError::malformed(&sym.name, reason);
            let (kernel, signature) = split_signature(base).map_err(malformed)?;
            let params = parse_signature(signature).map_err(malformed)?;
            let launch = decode_descriptor(binary, sym, &params)?;
            let code = code_symbol(binary, base)
                .ok_or_else(|| malformed(format!("no code symbol '{base}' for descriptor")))?;

            found.push((
                kernel.to_string(),
                code.section,
                Overload { symbol: base.to_string(), address: code.address, params, launch },
            ));
        }

        found.sort_by(|(_, sec_a, a), (_, sec_b, b)| {
            a.address.cmp(&b.address).then(sec_a.cmp(sec_b)).then_with(|| a.symbol.cmp(&b.symbol))
        });

        let mut map =
            KernelConfigMap::new(Architecture::Amdgpu, Some(processor_name(binary.machine_flags)));
        for (kernel, _, overload) in found {
            map.insert_overload(&kernel, overload);
        }
        Ok(map)
    }

    fn architecture(&self) -> Architecture {
        Architecture::Amdgpu
    }

    fn name(&self) -> &'static str {
        "amdgpu"
    }

    fn encoding(&self) -> Option<&'static str> {
        Some(ENCODING_NAME)
    }
}

fn check_encoding_version(binary: &BinaryObject) -> Result<(), ExtractError> {
    match binary.symbol_named(ENCODING_VERSION_SYMBOL) {
        Some(sym) if sym.address != ENCODING_VERSION => Err(ExtractError::malformed(
            ENCODING_VERSION_SYMBOL,
            format!("unsupported encoding version {} (expected {ENCODING_VERSION})", sym.address),
        )),
        _ => Ok(()),
    }
}

fn code_symbol<'a>(binary: &'a BinaryObject, name: &str) -> Option<&'a Symbol> {
    binary
        .symbols
        .iter()
        .find(|s| s.name == name && s.kind == SymbolKind::Function && s.section.is_some())
}

/// Split `<kernel>__<signature>` at the last separator.
pub fn split_signature(base: &str) -> Result<(&str, &str), String> {
    let (kernel, signature) = base
        .rsplit_once(SIGNATURE_SEPARATOR)
        .ok_or_else(|| format!("missing '{SIGNATURE_SEPARATOR}' signature separator"))?;
    if kernel.is_empty() {
        return Err("empty kernel name".to_string());
    }
    if signature.is_empty() {
        return Err(format!("empty signature (use '{EMPTY_SIGNATURE}' for no parameters)"));
    }
    Ok((kernel, signature))
}

pub fn parse_signature(signature: &str) -> Result<Vec<ParamType>, String> {
    if signature == EMPTY_SIGNATURE {
        return Ok(Vec::new());
    }
    signature
        .split('_')
        .map(|token| parse_param(token).ok_or_else(|| format!("unknown parameter token '{token}'")))
        .collect()
}

fn parse_param(token: &str) -> Option<ParamType> {
    if let Some(scalar) = ScalarType::from_token(token) {
        return Some(ParamType::Scalar(scalar));
    }
    let (space, mutable) = match token.as_bytes().first()? {
        b'p' => (AddressSpace::Global, true),
        b'c' => (AddressSpace::Global, false),
        b'l' => (AddressSpace::Local, true),
        _ => return None,
    };
    let elem = ScalarType::from_token(&token[1..])?;
    Some(ParamType::Pointer { space, elem, mutable })
}

fn decode_descriptor(
    binary: &BinaryObject,
    sym: &Symbol,
    params: &[ParamType],
) -> Result<LaunchAttributes, ExtractError> {
    if sym.size != DESCRIPTOR_SIZE {
        return Err(ExtractError::malformed(
            &sym.name,
            format!("descriptor is {} bytes, expected {DESCRIPTOR_SIZE}", sym.size),
        ));
    }
    let bytes = binary.symbol_bytes(sym).ok_or_else(|| {
        ExtractError::malformed(&sym.name, "descriptor bytes lie outside its section")
    })?;

    let read_u32 = |offset: usize| {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&bytes[offset..offset + 4]);
        if binary.little_endian {
            u32::from_le_bytes(raw)
        } else {
            u32::from_be_bytes(raw)
        }
    };
    let launch = LaunchAttributes {
        group_segment_size: read_u32(GROUP_SEGMENT_OFFSET),
        private_segment_size: read_u32(PRIVATE_SEGMENT_OFFSET),
        kernarg_size: read_u32(KERNARG_SIZE_OFFSET),
    };

    let required = kernarg_block_size(params);
    if launch.kernarg_size < required {
        return Err(ExtractError::malformed(
            &sym.name,
            format!(
                "kernarg_size {} is smaller than the {required} bytes the signature needs",
                launch.kernarg_size
            ),
        ));
    }
    Ok(launch)
}

/// Processor name for the `EF_AMDGPU_MACH` value in `flags`.
pub fn processor_name(flags: u32) -> String {
    let mach = flags & EF_AMDGPU_MACH;
    let known = match mach {
        0x2c => "gfx900",
        0x2f => "gfx906",
        0x30 => "gfx908",
        0x36 => "gfx1030",
        0x3f => "gfx90a",
        0x41 => "gfx1100",
        0x4c => "gfx942",
        _ => return format!("gfx-0x{mach:02x}"),
    };
    known.to_string()
}
