use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use bridge_core::binary::{read_binary, BinaryObject, Section, Symbol};
use bridge_core::codegen::{render_with, RenderOptions, DEFAULT_TYPES_PATH};
use bridge_core::model::KernelConfigMap;
use bridge_core::services::extract::default_extractor_registry;

use crate::commands::print_json;

#[derive(Serialize)]
struct InspectReport<'a> {
    path: String,
    architecture: String,
    machine_flags: u32,
    little_endian: bool,
    relocatable: bool,
    sections: &'a [Section],
    symbols: &'a [Symbol],
}

#[derive(Serialize)]
pub struct ExtractReport {
    pub binary: String,
    pub map: KernelConfigMap,
    pub diagnostics: Vec<String>,
    pub generated: String,
    pub written_to: Option<String>,
}

/// Dump the header, sections and symbols of an object file.
pub fn inspect_command(path: &str, json: bool) -> Result<()> {
    let binary = read_binary(Path::new(path))?;

    if json {
        return print_json(&InspectReport {
            path: path.to_string(),
            architecture: binary.architecture.to_string(),
            machine_flags: binary.machine_flags,
            little_endian: binary.little_endian,
            relocatable: binary.relocatable,
            sections: &binary.sections,
            symbols: &binary.symbols,
        });
    }

    print_binary(path, &binary);
    Ok(())
}

fn print_binary(path: &str, binary: &BinaryObject) {
    println!("Binary: {}", path);
    println!(
        "Architecture: {} (e_flags 0x{:08x}, {}, {})",
        binary.architecture,
        binary.machine_flags,
        if binary.little_endian { "little-endian" } else { "big-endian" },
        if binary.relocatable { "relocatable" } else { "linked" },
    );
    println!("Sections ({}):", binary.sections.len());
    for (index, section) in binary.sections.iter().enumerate() {
        println!(
            "  [{:>2}] {:<24} addr=0x{:08x} size=0x{:x}",
            index, section.name, section.address, section.size
        );
    }
    println!("Symbols ({}):", binary.symbols.len());
    for symbol in &binary.symbols {
        let section = symbol
            .section
            .and_then(|i| binary.section(i))
            .map(|s| s.name.as_str())
            .unwrap_or("-");
        println!(
            "  0x{:08x} {:>6} {:?} {:<10} {}",
            symbol.address, symbol.size, symbol.kind, section, symbol.name
        );
    }
}

/// Extract kernel configs from `path` and render the host configuration source.
///
/// Without `out`, the generated source goes to stdout; `verbose` lists every
/// recovered overload on stderr.
pub fn extract_command(
    path: &str,
    out: Option<String>,
    types_path: Option<String>,
    verbose: bool,
    json: bool,
) -> Result<()> {
    let binary = read_binary(Path::new(path))?;
    let registry = default_extractor_registry();
    let map = registry
        .extract(&binary)
        .with_context(|| format!("Failed to extract kernel configs from {}", path))?;

    let options = RenderOptions {
        types_path: types_path.unwrap_or_else(|| DEFAULT_TYPES_PATH.to_string()),
        encoding: registry.get(binary.architecture).and_then(|e| e.encoding()).map(str::to_string),
    };
    let generated = render_with(&map, &options);

    if let Some(out) = &out {
        let out_path = Path::new(out);
        if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(out_path, &generated)
            .with_context(|| format!("Failed to write generated source to {}", out))?;
    }

    if json {
        return print_json(&ExtractReport {
            binary: path.to_string(),
            diagnostics: map.diagnostics(),
            map,
            generated,
            written_to: out,
        });
    }

    if verbose {
        eprintln!(
            "{}: {} kernels, {} overloads ({})",
            path,
            map.len(),
            map.overload_count(),
            map.processor.as_deref().unwrap_or("unknown processor")
        );
        for line in map.diagnostics() {
            eprintln!("  {}", line);
        }
    }

    match out {
        Some(out) => println!("Wrote {} ({} kernels)", out, map.len()),
        None => print!("{}", generated),
    }
    Ok(())
}
