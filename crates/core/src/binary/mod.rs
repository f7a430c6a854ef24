//! Object-file reader.
//!
//! Loads a device binary once and materializes everything the kernel
//! extractors need: the target architecture, the section table (with section
//! contents) and the full symbol table. The result is immutable and never
//! touches the source file again.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use goblin::elf::{self, Elf};
use goblin::Object;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Label used for binaries parsed straight from memory.
const IN_MEMORY_ORIGIN: &str = "<memory>";

#[derive(Debug, Error)]
pub enum BinaryError {
    #[error("failed to read binary {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed binary {origin}: {reason}")]
    Malformed { origin: String, reason: String },
}

impl BinaryError {
    fn malformed(origin: &str, reason: impl Into<String>) -> Self {
        BinaryError::Malformed { origin: origin.to_string(), reason: reason.into() }
    }
}

/// CPU architecture declared in the object header (`e_machine`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Architecture {
    Amdgpu,
    Cuda,
    X86_64,
    Aarch64,
    Other(u16),
}

impl Architecture {
    pub fn from_machine(machine: u16) -> Self {
        match machine {
            elf::header::EM_AMDGPU => Architecture::Amdgpu,
            elf::header::EM_CUDA => Architecture::Cuda,
            elf::header::EM_X86_64 => Architecture::X86_64,
            elf::header::EM_AARCH64 => Architecture::Aarch64,
            other => Architecture::Other(other),
        }
    }

    pub fn machine(self) -> u16 {
        match self {
            Architecture::Amdgpu => elf::header::EM_AMDGPU,
            Architecture::Cuda => elf::header::EM_CUDA,
            Architecture::X86_64 => elf::header::EM_X86_64,
            Architecture::Aarch64 => elf::header::EM_AARCH64,
            Architecture::Other(machine) => machine,
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Architecture::Amdgpu => f.write_str("amdgpu"),
            Architecture::Cuda => f.write_str("cuda"),
            Architecture::X86_64 => f.write_str("x86_64"),
            Architecture::Aarch64 => f.write_str("aarch64"),
            Architecture::Other(machine) => write!(f, "machine-{machine}"),
        }
    }
}

impl FromStr for Architecture {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "amdgpu" | "amdgcn" => Ok(Architecture::Amdgpu),
            "cuda" | "nvptx" | "nvptx64" => Ok(Architecture::Cuda),
            "x86_64" | "amd64" => Ok(Architecture::X86_64),
            "aarch64" | "arm64" => Ok(Architecture::Aarch64),
            other => other
                .strip_prefix("machine-")
                .and_then(|n| n.parse::<u16>().ok())
                .map(Architecture::Other)
                .ok_or_else(|| format!("unknown architecture '{s}'")),
        }
    }
}

/// One entry of the section header table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    /// Raw `sh_type`.
    pub kind: u32,
    pub flags: u64,
    pub address: u64,
    pub offset: u64,
    pub size: u64,
    /// Section contents; empty for `SHT_NOBITS`.
    #[serde(skip)]
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Object,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolBinding {
    Local,
    Global,
    Weak,
}

/// One entry of the symbol table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub address: u64,
    pub size: u64,
    pub kind: SymbolKind,
    pub binding: SymbolBinding,
    /// Index into [`BinaryObject::sections`]; `None` for undefined, absolute and common symbols.
    pub section: Option<usize>,
}

/// Fully parsed object file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryObject {
    pub architecture: Architecture,
    /// Raw `e_flags`; accelerator targets encode the processor here.
    pub machine_flags: u32,
    pub little_endian: bool,
    /// `ET_REL` objects carry section-relative symbol values.
    pub relocatable: bool,
    pub sections: Vec<Section>,
    pub symbols: Vec<Symbol>,
}

impl BinaryObject {
    pub fn section(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    /// First symbol called `name`.
    pub fn symbol_named(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.name == name)
    }

    /// Bytes covered by `symbol` inside its section, if they are all present.
    pub fn symbol_bytes(&self, symbol: &Symbol) -> Option<&[u8]> {
        let section = self.section(symbol.section?)?;
        let start = if self.relocatable {
            symbol.address
        } else {
            symbol.address.checked_sub(section.address)?
        };
        let end = start.checked_add(symbol.size)?;
        section.data.get(usize::try_from(start).ok()?..usize::try_from(end).ok()?)
    }
}

/// Read and parse the object file at `path`.
pub fn read_binary(path: &Path) -> Result<BinaryObject, BinaryError> {
    let bytes =
        fs::read(path).map_err(|source| BinaryError::Io { path: path.to_path_buf(), source })?;
    parse_binary_named(&bytes, &path.display().to_string())
}

/// Parse an object file already held in memory.
pub fn parse_binary(bytes: &[u8]) -> Result<BinaryObject, BinaryError> {
    parse_binary_named(bytes, IN_MEMORY_ORIGIN)
}

/// Parse `bytes`, labelling errors with `origin` (usually the file path).
pub fn parse_binary_named(bytes: &[u8], origin: &str) -> Result<BinaryObject, BinaryError> {
    let object = Object::parse(bytes).map_err(|e| BinaryError::malformed(origin, e.to_string()))?;
    match object {
        Object::Elf(elf) => from_elf(&elf, bytes, origin),
        Object::Unknown(magic) => {
            Err(BinaryError::malformed(origin, format!("unrecognized magic 0x{magic:016x}")))
        }
        _ => Err(BinaryError::malformed(origin, "only ELF objects are supported")),
    }
}

fn from_elf(elf: &Elf, bytes: &[u8], origin: &str) -> Result<BinaryObject, BinaryError> {
    let sections = collect_sections(elf, bytes, origin)?;
    let symbols = collect_symbols(elf, sections.len(), origin)?;
    Ok(BinaryObject {
        architecture: Architecture::from_machine(elf.header.e_machine),
        machine_flags: elf.header.e_flags,
        little_endian: elf.little_endian,
        relocatable: elf.header.e_type == elf::header::ET_REL,
        sections,
        symbols,
    })
}

fn collect_sections(elf: &Elf, bytes: &[u8], origin: &str) -> Result<Vec<Section>, BinaryError> {
    let mut sections = Vec::with_capacity(elf.section_headers.len());
    for (index, sh) in elf.section_headers.iter().enumerate() {
        let name = elf.shdr_strtab.get_at(sh.sh_name).unwrap_or("").to_string();
        let data = if sh.sh_type == elf::section_header::SHT_NOBITS || sh.sh_size == 0 {
            Vec::new()
        } else {
            let range = sh
                .sh_offset
                .checked_add(sh.sh_size)
                .filter(|end| *end <= bytes.len() as u64)
                .map(|end| sh.sh_offset as usize..end as usize)
                .ok_or_else(|| {
                    BinaryError::malformed(
                        origin,
                        format!(
                            "section {index} ({name}) spans 0x{:x}+0x{:x}, past end of file (0x{:x} bytes)",
                            sh.sh_offset,
                            sh.sh_size,
                            bytes.len()
                        ),
                    )
                })?;
            bytes[range].to_vec()
        };
        sections.push(Section {
            name,
            kind: sh.sh_type,
            flags: sh.sh_flags,
            address: sh.sh_addr,
            offset: sh.sh_offset,
            size: sh.sh_size,
            data,
        });
    }
    Ok(sections)
}

fn collect_symbols(
    elf: &Elf,
    section_count: usize,
    origin: &str,
) -> Result<Vec<Symbol>, BinaryError> {
    // Stripped shared objects only keep the dynamic table.
    let (table, strtab) = if elf.syms.is_empty() {
        (&elf.dynsyms, &elf.dynstrtab)
    } else {
        (&elf.syms, &elf.strtab)
    };

    let mut symbols = Vec::with_capacity(table.len());
    // Entry 0 is the reserved null symbol.
    for sym in table.iter().skip(1) {
        let name = strtab.get_at(sym.st_name).unwrap_or("").to_string();
        let section = if sym.st_shndx == elf::section_header::SHN_UNDEF as usize
            || sym.st_shndx >= elf::section_header::SHN_LORESERVE as usize
        {
            None
        } else if sym.st_shndx < section_count {
            Some(sym.st_shndx)
        } else {
            return Err(BinaryError::malformed(
                origin,
                format!(
                    "symbol '{name}' references section {} but only {section_count} exist",
                    sym.st_shndx
                ),
            ));
        };
        let kind = match sym.st_type() {
            elf::sym::STT_FUNC => SymbolKind::Function,
            elf::sym::STT_OBJECT => SymbolKind::Object,
            _ => SymbolKind::Other,
        };
        let binding = match sym.st_bind() {
            elf::sym::STB_LOCAL => SymbolBinding::Local,
            elf::sym::STB_WEAK => SymbolBinding::Weak,
            _ => SymbolBinding::Global,
        };
        symbols.push(Symbol {
            name,
            address: sym.st_value,
            size: sym.st_size,
            kind,
            binding,
            section,
        });
    }
    Ok(symbols)
}
