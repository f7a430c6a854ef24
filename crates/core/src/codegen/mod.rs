//! Rendering of a [`KernelConfigMap`] into host-side Rust configuration source.
//!
//! Identifier policy: kernel names come from user device source, so each is
//! mapped to a Rust identifier by [`sanitize_identifier`]:
//! - characters outside `[A-Za-z0-9_]` become `_`;
//! - an empty name, or one starting with a digit, gets a leading `_`
//!   (so the empty name becomes `__`);
//! - Rust keywords get a trailing `_`;
//! - a name that collides with an earlier constant (or with `SIDE` / `KERNELS`)
//!   gets `_2`, `_3`, ... in map order.
//!
//! The original names are kept verbatim in the `KERNELS` lookup table.

use std::collections::HashSet;
use std::fmt::Write as _;

use crate::model::KernelConfigMap;

/// Name of the generated side constant.
pub const SIDE_CONST: &str = "SIDE";
/// Name of the generated lookup table.
pub const TABLE_CONST: &str = "KERNELS";
/// Default module path providing the descriptor types.
pub const DEFAULT_TYPES_PATH: &str = "bridge_core";

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum", "extern",
    "false", "fn", "for", "gen", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut",
    "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true", "try",
    "type", "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final", "macro",
    "override", "priv", "typeof", "unsized", "virtual", "yield", "union", "_",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Crate (or module) path that exposes `model` and `side`.
    pub types_path: String,
    /// Encoding label written into the header comment.
    pub encoding: Option<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { types_path: DEFAULT_TYPES_PATH.to_string(), encoding: None }
    }
}

/// Render `map` with default options.
pub fn render(map: &KernelConfigMap) -> String {
    render_with(map, &RenderOptions::default())
}

pub fn render_with(map: &KernelConfigMap, options: &RenderOptions) -> String {
    let mut out = String::new();
    let processor = map.processor.as_deref().unwrap_or("unknown");
    out.push_str("// @generated by kernel-bridge. Do not edit.\n");
    let _ = writeln!(out, "// architecture: {}, processor: {}", map.architecture, processor);
    if let Some(encoding) = &options.encoding {
        let _ = writeln!(out, "// encoding: {encoding}");
    }
    let _ = writeln!(out, "// kernels: {}, overloads: {}", map.len(), map.overload_count());
    out.push('\n');

    let types = options.types_path.trim_end_matches("::");
    out.push_str("#[allow(unused_imports)]\n");
    let _ = writeln!(
        out,
        "use {types}::model::{{AddressSpace, LaunchAttributes, OverloadDescriptor, ParamType, ScalarType}};"
    );
    let _ = writeln!(out, "use {types}::side::CompilationSide;");
    out.push('\n');
    let _ = writeln!(out, "pub const {SIDE_CONST}: CompilationSide = CompilationSide::Host;");

    let idents = assign_identifiers(map.names());
    for (kernel, ident) in map.kernels().iter().zip(&idents) {
        out.push('\n');
        let _ = writeln!(out, "/// Overloads of kernel {:?}.", kernel.name);
        out.push_str("#[allow(non_upper_case_globals)]\n");
        let _ = writeln!(out, "pub const {ident}: &[OverloadDescriptor] = &[");
        for overload in &kernel.overloads {
            let _ = writeln!(out, "    {},", overload.static_initializer());
        }
        out.push_str("];\n");
    }

    out.push('\n');
    let _ = writeln!(out, "pub const {TABLE_CONST}: &[(&str, &[OverloadDescriptor])] = &[");
    for (kernel, ident) in map.kernels().iter().zip(&idents) {
        let _ = writeln!(out, "    ({:?}, {ident}),", kernel.name);
    }
    out.push_str("];\n");
    out
}

/// Map one kernel name to a valid, non-keyword Rust identifier.
pub fn sanitize_identifier(name: &str) -> String {
    let mut ident: String =
        name.chars().map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' }).collect();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    if RUST_KEYWORDS.contains(&ident.as_str()) {
        ident.push('_');
    }
    ident
}

/// Sanitize every name and resolve collisions in order.
pub fn assign_identifiers(names: Vec<&str>) -> Vec<String> {
    let mut taken: HashSet<String> =
        [SIDE_CONST, TABLE_CONST].iter().map(|s| s.to_string()).collect();
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let base = sanitize_identifier(name);
        let mut candidate = base.clone();
        let mut n = 2;
        while taken.contains(&candidate) {
            candidate = format!("{base}_{n}");
            n += 1;
        }
        taken.insert(candidate.clone());
        out.push(candidate);
    }
    out
}
