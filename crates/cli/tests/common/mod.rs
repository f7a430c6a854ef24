#![allow(dead_code)]

use std::path::{Path, PathBuf};

use object::write::{Object, Symbol, SymbolSection};
use object::{
    Architecture, BinaryFormat, Endianness, FileFlags, SectionKind, SymbolFlags, SymbolKind,
    SymbolScope,
};

const EM_AMDGPU: u16 = 224;
pub const GFX90A: u32 = 0x3f;

fn symbol(name: &str, value: u64, size: u64, kind: SymbolKind, section: SymbolSection) -> Symbol {
    Symbol {
        name: name.as_bytes().to_vec(),
        value,
        size,
        kind,
        scope: SymbolScope::Linkage,
        weak: false,
        section,
        flags: SymbolFlags::None,
    }
}

/// AMDGPU object with `(symbol, kernarg_size)` overloads laid out in order.
pub fn amdgpu_object(kernels: &[(&str, u32)]) -> Vec<u8> {
    let mut obj = Object::new(BinaryFormat::Elf, Architecture::X86_64, Endianness::Little);
    obj.flags = FileFlags::Elf { os_abi: 0, abi_version: 0, e_flags: GFX90A };
    let text = obj.add_section(Vec::new(), b".text".to_vec(), SectionKind::Text);
    let rodata = obj.add_section(Vec::new(), b".rodata".to_vec(), SectionKind::ReadOnlyData);

    for (name, kernarg) in kernels {
        let code = obj.append_section_data(text, &[0x00, 0x00, 0x81, 0xbf], 4);
        obj.add_symbol(symbol(name, code, 4, SymbolKind::Text, SymbolSection::Section(text)));
        let mut kd = vec![0u8; 64];
        kd[8..12].copy_from_slice(&kernarg.to_le_bytes());
        let desc = obj.append_section_data(rodata, &kd, 64);
        obj.add_symbol(symbol(
            &format!("{name}.kd"),
            desc,
            64,
            SymbolKind::Data,
            SymbolSection::Section(rodata),
        ));
    }

    let mut bytes = obj.write().unwrap();
    bytes[18..20].copy_from_slice(&EM_AMDGPU.to_le_bytes());
    bytes
}

pub fn kernel_add_object() -> Vec<u8> {
    amdgpu_object(&[("kernel_add__i32_i32", 8), ("kernel_add__f32_f32", 8)])
}

pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, bytes).unwrap();
    path
}
