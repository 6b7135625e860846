//! sbom-merge: CycloneDX SBOM merge tool
//!
//! Combines several CycloneDX documents into one, reconciling component
//! identities, references and dependency graphs, and folds VEX statements
//! into an SBOM.

#![allow(clippy::needless_pass_by_value)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use sbom_merge::{
    cli::{self, MergeRequest, MergeVexRequest},
    config::{file::CONFIG_FILE_NAMES, AppConfig},
    pipeline::exit_codes,
};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Build long version string with format support info
const fn build_long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        "\n\nSupported SBOM Formats:",
        "\n  CycloneDX: 1.2, 1.3, 1.4, 1.5, 1.6 (JSON)",
        "\n\nFeatures:",
        "\n  Identity resolution, reference rewriting, dependency graph union, VEX merge"
    )
}

#[derive(Parser)]
#[command(name = "sbom-merge")]
#[command(author = "Binarly.io")]
#[command(version, long_version = build_long_version())]
#[command(about = "Merge CycloneDX SBOMs into one document", long_about = None)]
#[command(after_help = "EXIT CODES:
    0  Success
    1  Warnings emitted (with --fail-on-warning)
    2  Error occurred

EXAMPLES:
    # Merge two SBOMs, the first one wins field conflicts
    sbom-merge merge app.cdx.json lib.cdx.json -O merged.cdx.json

    # Merge every SBOM in a folder and keep the warnings
    sbom-merge merge --from-folder sboms/ --warnings-file warnings.json

    # Apply VEX statements to an SBOM
    sbom-merge merge-vex app.cdx.json triage-1.vex.json triage-2.vex.json")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

// ============================================================================
// Command argument structs
// ============================================================================

/// Output options shared by the merge commands
#[derive(Parser)]
struct OutputArgs {
    /// Output file path (stdout if not specified)
    #[arg(short = 'O', long)]
    output_file: Option<PathBuf>,

    /// Schema version of the output: highest-common, or e.g. 1.5
    #[arg(long)]
    schema_version: Option<String>,

    /// Write merge warnings to this file as JSON
    #[arg(long)]
    warnings_file: Option<PathBuf>,

    /// Exit with code 1 when the merge emitted warnings
    #[arg(long)]
    fail_on_warning: bool,

    /// Write compact JSON instead of pretty-printed
    #[arg(long)]
    compact: bool,
}

/// Arguments for the `merge` subcommand
#[derive(Parser)]
struct MergeArgs {
    /// Input SBOMs, highest priority first
    files: Vec<PathBuf>,

    /// Also merge the *.cdx.json files and bom.json in this folder, in natural order
    #[arg(long, value_name = "DIR")]
    from_folder: Option<PathBuf>,

    /// Nest components first seen in later inputs under their merged parent
    #[arg(long)]
    hierarchical: bool,

    /// Fail on references that are not declared in their own document
    #[arg(long)]
    strict_refs: bool,

    #[command(flatten)]
    output: OutputArgs,
}

/// Arguments for the `merge-vex` subcommand
#[derive(Parser)]
struct MergeVexArgs {
    /// SBOM receiving the VEX statements
    sbom: PathBuf,

    /// VEX documents, oldest first
    #[arg(required = true)]
    vex: Vec<PathBuf>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge two or more SBOMs into one
    Merge(MergeArgs),

    /// Fold VEX documents into an SBOM's vulnerabilities
    MergeVex(MergeVexArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Generate JSON Schema for the config file format
    ConfigSchema {
        /// Write schema to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show, discover, or initialize configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Sub-subcommands for the `config` command
#[derive(Subcommand)]
enum ConfigAction {
    /// Print current effective configuration (merged from defaults + file)
    Show,
    /// Print config file search paths and discovered config file
    Path,
    /// Generate an example .sbom-merge.yaml in the current directory
    Init,
}

/// Layer CLI flags over the discovered config file.
fn resolve_config(
    cli_config: Option<&std::path::Path>,
    quiet: bool,
    output: OutputArgs,
    hierarchical: bool,
    strict_refs: bool,
) -> AppConfig {
    let mut overrides = AppConfig::builder()
        .hierarchical(hierarchical)
        .strict_references(strict_refs)
        .output_file(output.output_file)
        .warnings_file(output.warnings_file)
        .compact(output.compact)
        .quiet(quiet)
        .fail_on_warning(output.fail_on_warning);
    if let Some(version) = output.schema_version {
        overrides = overrides.target_schema_version(version);
    }

    let (config, loaded_from) =
        AppConfig::from_file_with_overrides(cli_config, &overrides.build());
    if let Some(path) = loaded_from {
        tracing::debug!("Loaded config from {}", path.display());
    }
    config
}

fn exit_with(code: i32) {
    if code != 0 {
        std::process::exit(code);
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:?}");
        std::process::exit(exit_codes::ERROR);
    }
}

/// Dispatch to command handlers
fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Merge(args) => {
            let config = resolve_config(
                cli.config.as_deref(),
                cli.quiet,
                args.output,
                args.hierarchical,
                args.strict_refs,
            );
            let code = cli::run_merge(MergeRequest {
                files: args.files,
                from_folder: args.from_folder,
                config,
            })?;
            exit_with(code);
            Ok(())
        }

        Commands::MergeVex(args) => {
            let config =
                resolve_config(cli.config.as_deref(), cli.quiet, args.output, false, false);
            let code = cli::run_merge_vex(MergeVexRequest {
                sbom: args.sbom,
                vex: args.vex,
                config,
            })?;
            exit_with(code);
            Ok(())
        }

        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "sbom-merge", &mut io::stdout());
            Ok(())
        }

        Commands::ConfigSchema { output } => {
            let schema = sbom_merge::config::generate_json_schema()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &schema)?;
                    eprintln!("Schema written to {}", path.display());
                }
                None => {
                    println!("{schema}");
                }
            }
            Ok(())
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let (config, loaded_from) =
                    sbom_merge::config::load_or_default(cli.config.as_deref());
                if let Some(path) = &loaded_from {
                    eprintln!("# Loaded from: {}", path.display());
                } else {
                    eprintln!("# No config file found; showing defaults");
                }
                let yaml =
                    serde_yaml_ng::to_string(&config).context("failed to serialize config")?;
                print!("{yaml}");
                Ok(())
            }
            ConfigAction::Path => {
                let search_paths: [Option<String>; 3] = [
                    std::env::current_dir()
                        .ok()
                        .map(|p| p.display().to_string()),
                    sbom_merge::config::user_config_dir().map(|p| p.display().to_string()),
                    ::dirs::home_dir().map(|p| p.display().to_string()),
                ];
                eprintln!("Config file search paths (in order):");
                for path in search_paths.into_iter().flatten() {
                    eprintln!("  {path}");
                }
                eprintln!();
                eprintln!("Recognized file names:");
                for name in CONFIG_FILE_NAMES {
                    eprintln!("  {name}");
                }
                eprintln!();
                match sbom_merge::config::discover_config_file(cli.config.as_deref()) {
                    Some(path) => eprintln!("Active config file: {}", path.display()),
                    None => eprintln!("No config file found."),
                }
                Ok(())
            }
            ConfigAction::Init => {
                let target = std::env::current_dir()
                    .context("cannot determine current directory")?
                    .join(".sbom-merge.yaml");
                if target.exists() {
                    anyhow::bail!(
                        "{} already exists. Remove it first to re-initialize.",
                        target.display()
                    );
                }
                let content = sbom_merge::config::generate_example_config();
                std::fs::write(&target, content)
                    .with_context(|| format!("failed to write {}", target.display()))?;
                eprintln!("Created {}", target.display());
                Ok(())
            }
        },
    }
}
