use anyhow::Result;
use clap::{Parser, Subcommand};

use kernel_bridge::commands::{
    add_target_command, build_command, extract_command, history_command, import_targets_command,
    init_project_command, inspect_command, list_backends_command, project_info_command,
    AddTargetArgs,
};

/// Device-kernel to host-config bridge.
///
/// This CLI is a thin wrapper around `bridge-core` (exposed in code as `bridge_core`).
/// All substantive logic lives in the library so it can be tested thoroughly
/// and reused from other frontends.
#[derive(Parser, Debug)]
#[command(
    name = "kernel-bridge",
    version,
    about = "Extract kernel launch configs from device binaries into host source",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a new kernel-bridge project at the given root.
    ///
    /// This will:
    /// - Create a `.kbridge` metadata directory with the build ledger.
    /// - Create the `generated` output directory.
    /// - Write a `.kbridge/project.json` config file.
    InitProject {
        /// Project root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Optional project name. If omitted, the name is derived from the root directory.
        #[arg(long)]
        name: Option<String>,
    },

    /// Show basic information about an existing project.
    ProjectInfo {
        /// Project root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Register a device target (or import a YAML/JSON list with `--from`).
    AddTarget {
        /// Project root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Load targets from a YAML or JSON file instead of the flags below.
        #[arg(long, conflicts_with_all = ["name", "source"])]
        from: Option<String>,

        /// Target name (unique within the project).
        #[arg(long, required_unless_present = "from")]
        name: Option<String>,

        /// Device source (or object with `--prebuilt`), relative to the root.
        #[arg(long, required_unless_present = "from")]
        source: Option<String>,

        /// Device architecture (e.g. amdgpu).
        #[arg(long, default_value = "amdgpu")]
        arch: String,

        /// Accelerator processor (e.g. gfx90a).
        #[arg(long)]
        processor: Option<String>,

        /// External compiler program; defaults to clang for AMDHSA.
        #[arg(long)]
        compiler: Option<String>,

        /// Argument for `--compiler` (repeatable; supports {source}, {output}, {processor}, ...).
        #[arg(long = "compiler-arg", allow_hyphen_values = true)]
        compiler_args: Vec<String>,

        /// Treat the source as an already-built device object.
        #[arg(long, default_value_t = false)]
        prebuilt: bool,

        /// Override the generated source path.
        #[arg(long)]
        generated: Option<String>,
    },

    /// Show header, sections and symbols of an object file.
    Inspect {
        /// Path to the object file.
        path: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Extract kernel configs from a device binary and render host config source.
    Extract {
        /// Path to the device object file.
        path: String,

        /// Write the generated source here instead of stdout.
        #[arg(long)]
        out: Option<String>,

        /// Module path providing the descriptor types.
        #[arg(long)]
        types_path: Option<String>,

        /// List every recovered overload on stderr.
        #[arg(long, short, default_value_t = false)]
        verbose: bool,

        /// Emit JSON (map, diagnostics, generated source).
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Compile device sources and regenerate host config for configured targets.
    Build {
        /// Project root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Restrict the build to these targets (repeatable).
        #[arg(long = "target")]
        targets: Vec<String>,

        /// List every recovered overload.
        #[arg(long, short, default_value_t = false)]
        verbose: bool,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Show recorded build runs, newest first.
    History {
        /// Project root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Only runs of this target.
        #[arg(long)]
        target: Option<String>,

        /// Show at most this many runs.
        #[arg(long)]
        limit: Option<usize>,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List kernel extractors compiled into this binary.
    ListBackends {
        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::InitProject { root, name } => init_project_command(&root, name)?,
        Command::ProjectInfo { root, json } => project_info_command(&root, json)?,
        Command::AddTarget {
            root,
            from,
            name,
            source,
            arch,
            processor,
            compiler,
            compiler_args,
            prebuilt,
            generated,
        } => match from {
            Some(file) => import_targets_command(&root, &file)?,
            None => add_target_command(
                &root,
                AddTargetArgs {
                    name: name.unwrap_or_default(),
                    source: source.unwrap_or_default(),
                    arch,
                    processor,
                    compiler,
                    compiler_args,
                    prebuilt,
                    generated,
                },
            )?,
        },
        Command::Inspect { path, json } => inspect_command(&path, json)?,
        Command::Extract { path, out, types_path, verbose, json } => {
            extract_command(&path, out, types_path, verbose, json)?
        }
        Command::Build { root, targets, verbose, json } => {
            build_command(&root, targets, verbose, json)?
        }
        Command::History { root, target, limit, json } => {
            history_command(&root, target, limit, json)?
        }
        Command::ListBackends { json } => list_backends_command(json)?,
    }

    Ok(())
}
