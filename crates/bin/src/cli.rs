//! CLI argument definitions for the Canopy binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Canopy observable data model tool
#[derive(Parser, Debug)]
#[command(name = "canopy")]
#[command(about = "Canopy: Watch everything. Batch anything. Merge all at once.")]
#[command(version)]
pub struct Cli {
    /// Emit JSON instead of human-readable output
    #[arg(long, global = true, env = "CANOPY_JSON")]
    pub json: bool,

    /// JSON config file, e.g. {"eventOptimization": {"enableSingleCallbackCall": true}}
    #[arg(short, long, global = true, env = "CANOPY_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub optimization: OptimizationArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Per-flag overrides of the configured event optimizations
#[derive(clap::Args, Debug, Default)]
pub struct OptimizationArgs {
    /// Only deliver the newest queued event per node
    #[arg(long, global = true)]
    pub suppress_previous: bool,

    /// Call each listener at most once per flush
    #[arg(long, global = true)]
    pub single_callback: bool,

    /// Call at most one listener per hash tag per flush
    #[arg(long, global = true)]
    pub hash_callbacks: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load a document and print it
    Show(ShowArgs),
    /// Merge a patch document into a base document
    Merge(MergeArgs),
    /// Attach a document to a remote url and print changes until Ctrl-C
    Watch(WatchArgs),
}

/// Arguments for the show command
#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// JSON document to load
    pub file: PathBuf,

    /// Include metadata siblings in the output
    #[arg(short, long)]
    pub metadata: bool,
}

/// Arguments for the merge command
#[derive(clap::Args, Debug)]
pub struct MergeArgs {
    /// Base JSON document
    pub base: PathBuf,

    /// Patch JSON document merged into the base
    pub patch: PathBuf,

    /// Keep base entries that the patch does not mention
    #[arg(short, long)]
    pub keep_old: bool,
}

/// Arguments for the watch command
#[derive(clap::Args, Debug)]
pub struct WatchArgs {
    /// Initial JSON document; starts empty when omitted
    pub file: Option<PathBuf>,

    /// Resource to poll
    #[arg(short, long, env = "CANOPY_URL")]
    pub url: String,

    /// Poll interval in milliseconds, -1 to fetch once; 0 is rejected
    #[arg(short, long, default_value_t = 1000, allow_hyphen_values = true)]
    pub refresh_rate: i64,

    /// Name of the remote-backed node under the root
    #[arg(short, long, default_value = "remote")]
    pub name: String,
}
