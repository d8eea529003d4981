//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// imgwarm - pre-pull Dockerfile base images into a local cache
///
/// Resolves the FROM images of a multi-stage Dockerfile and stores them in
/// a cache directory so later builds start without touching the registry.
#[derive(Parser, Debug)]
#[command(name = "imgwarm")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "IMGWARM_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch base images into the local cache
    Warm(WarmArgs),

    /// Print the base images a Dockerfile needs
    Resolve(ResolveArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the warm command
#[derive(Parser, Debug)]
pub struct WarmArgs {
    /// Dockerfile whose base images should be warmed
    #[arg(short = 'f', long)]
    pub dockerfile: Option<PathBuf>,

    /// Extra image to warm (repeatable)
    #[arg(short, long = "image")]
    pub images: Vec<String>,

    /// Build argument override (NAME=VALUE, repeatable)
    #[arg(long = "build-arg")]
    pub build_args: Vec<String>,

    /// Cache directory (default: from config)
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Hours after which a cache entry is stale (default: from config)
    #[arg(long = "cache-ttl")]
    pub cache_ttl_hours: Option<u64>,

    /// Platform to fetch when a FROM line names none (os/arch[/variant])
    #[arg(long)]
    pub custom_platform: Option<String>,

    /// Registry to contact over plain HTTP (repeatable)
    #[arg(long = "insecure-registry")]
    pub insecure_registries: Vec<String>,

    /// Accept invalid registry TLS certificates
    #[arg(long)]
    pub skip_tls_verify: bool,

    /// Fetch even when a cache entry exists
    #[arg(long)]
    pub force: bool,

    /// Images warmed concurrently (default: from config)
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

/// Arguments for the resolve command
#[derive(Parser, Debug)]
pub struct ResolveArgs {
    /// Dockerfile to analyze
    #[arg(short = 'f', long, default_value = "Dockerfile")]
    pub dockerfile: PathBuf,

    /// Build argument override (NAME=VALUE, repeatable)
    #[arg(long = "build-arg")]
    pub build_args: Vec<String>,

    /// Platform used for the automatic TARGET*/BUILD* args
    #[arg(long)]
    pub custom_platform: Option<String>,

    /// Output format
    #[arg(long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for the resolve command
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}
