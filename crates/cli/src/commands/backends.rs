use anyhow::Result;
use serde::Serialize;

use bridge_core::services::extract::default_extractor_registry;

#[derive(Debug, Serialize)]
pub struct BackendInfo {
    pub architecture: String,
    pub name: String,
    pub encoding: Option<String>,
    pub description: String,
}

/// List kernel extractors compiled into this binary.
pub fn list_backends_command(json: bool) -> Result<()> {
    let entries = backend_infos();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("Backends: (none)");
        return Ok(());
    }

    println!("Backends:");
    for entry in entries {
        match &entry.encoding {
            Some(encoding) => println!(
                "- {} ({}, {}): {}",
                entry.name, entry.architecture, encoding, entry.description
            ),
            None => println!("- {} ({}): {}", entry.name, entry.architecture, entry.description),
        }
    }

    Ok(())
}

pub fn backend_infos() -> Vec<BackendInfo> {
    default_extractor_registry()
        .extractors()
        .into_iter()
        .map(|extractor| {
            let description = match extractor.name() {
                "amdgpu" => "AMDHSA code objects (.kd descriptors + mangled overload symbols)"
                    .to_string(),
                other => format!("Extractor '{other}'"),
            };
            BackendInfo {
                architecture: extractor.architecture().to_string(),
                name: extractor.name().to_string(),
                encoding: extractor.encoding().map(str::to_string),
                description,
            }
        })
        .collect()
}
