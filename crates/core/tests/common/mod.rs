#![allow(dead_code)]

use std::path::{Path, PathBuf};

use object::write::{Object, Symbol, SymbolSection};
use object::{
    Architecture, BinaryFormat, Endianness, FileFlags, SectionKind, SymbolFlags, SymbolKind,
    SymbolScope,
};

/// `EM_AMDGPU`; the writer has no AMDGPU target, so the header is patched after writing.
pub const EM_AMDGPU: u16 = 224;
pub const GFX90A: u32 = 0x3f;

/// One overload to emit: code symbol plus its `.kd` descriptor.
#[derive(Clone, Debug)]
pub struct KernelSymbol {
    pub symbol: String,
    pub group_segment: u32,
    pub private_segment: u32,
    pub kernarg_size: u32,
    /// Emit the code symbol (false leaves the descriptor dangling).
    pub with_code: bool,
}

impl KernelSymbol {
    pub fn new(symbol: &str, kernarg_size: u32) -> Self {
        Self {
            symbol: symbol.to_string(),
            group_segment: 0,
            private_segment: 0,
            kernarg_size,
            with_code: true,
        }
    }

    pub fn segments(mut self, group: u32, private: u32) -> Self {
        self.group_segment = group;
        self.private_segment = private;
        self
    }

    pub fn without_code(mut self) -> Self {
        self.with_code = false;
        self
    }
}

fn descriptor(k: &KernelSymbol) -> Vec<u8> {
    let mut kd = vec![0u8; 64];
    kd[0..4].copy_from_slice(&k.group_segment.to_le_bytes());
    kd[4..8].copy_from_slice(&k.private_segment.to_le_bytes());
    kd[8..12].copy_from_slice(&k.kernarg_size.to_le_bytes());
    kd
}

fn add_symbol(
    obj: &mut Object<'_>,
    name: &str,
    value: u64,
    size: u64,
    kind: SymbolKind,
    section: SymbolSection,
) {
    obj.add_symbol(Symbol {
        name: name.as_bytes().to_vec(),
        value,
        size,
        kind,
        scope: SymbolScope::Linkage,
        weak: false,
        section,
        flags: SymbolFlags::None,
    });
}

/// Relocatable AMDGPU object; code symbols are laid out in `kernels` order.
pub fn amdgpu_object(
    mach: u32,
    kernels: &[KernelSymbol],
    encoding_version: Option<u64>,
) -> Vec<u8> {
    let mut obj = Object::new(BinaryFormat::Elf, Architecture::X86_64, Endianness::Little);
    obj.flags = FileFlags::Elf { os_abi: 0, abi_version: 0, e_flags: mach };

    let text = obj.add_section(Vec::new(), b".text".to_vec(), SectionKind::Text);
    let rodata = obj.add_section(Vec::new(), b".rodata".to_vec(), SectionKind::ReadOnlyData);

    for kernel in kernels {
        if kernel.with_code {
            // s_endpgm
            let offset = obj.append_section_data(text, &[0x00, 0x00, 0x81, 0xbf], 4);
            let section = SymbolSection::Section(text);
            add_symbol(&mut obj, &kernel.symbol, offset, 4, SymbolKind::Text, section);
        }
        let offset = obj.append_section_data(rodata, &descriptor(kernel), 64);
        add_symbol(
            &mut obj,
            &format!("{}.kd", kernel.symbol),
            offset,
            64,
            SymbolKind::Data,
            SymbolSection::Section(rodata),
        );
    }
    if let Some(version) = encoding_version {
        let name = "__kcfg_encoding_version";
        add_symbol(&mut obj, name, version, 0, SymbolKind::Data, SymbolSection::Absolute);
    }

    let mut bytes = obj.write().unwrap();
    bytes[18..20].copy_from_slice(&EM_AMDGPU.to_le_bytes());
    bytes
}

/// Host x86_64 object with one ordinary function.
pub fn x86_64_object() -> Vec<u8> {
    let mut obj = Object::new(BinaryFormat::Elf, Architecture::X86_64, Endianness::Little);
    let text = obj.add_section(Vec::new(), b".text".to_vec(), SectionKind::Text);
    let offset = obj.append_section_data(text, &[0xc3], 1);
    add_symbol(&mut obj, "host_fn", offset, 1, SymbolKind::Text, SymbolSection::Section(text));
    obj.write().unwrap()
}

pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, bytes).unwrap();
    path
}

/// The two `kernel_add` overloads plus a no-argument kernel.
pub fn sample_kernels() -> Vec<KernelSymbol> {
    vec![
        KernelSymbol::new("kernel_add__i32_i32", 8),
        KernelSymbol::new("kernel_add__f32_f32", 8).segments(256, 16),
        KernelSymbol::new("barrier_only__v", 0),
    ]
}
