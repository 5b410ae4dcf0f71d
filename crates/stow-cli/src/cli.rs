use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use stow_store::SnapshotFilter;

#[derive(Parser)]
#[command(
    name = "stow",
    about = "Deduplicating backup repository tools",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Repository directory
    #[arg(short, long, global = true, default_value = ".")]
    pub repo: PathBuf,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create an empty repository
    Init,
    /// List snapshots
    Snapshots(SnapshotsArgs),
    /// Print the packs still referenced by the selected snapshots
    ReferencedPacks(ReferencedPacksArgs),
}

/// Host, tag, and path filters shared by snapshot-selecting commands.
#[derive(Args, Clone, Debug, Default)]
pub struct FilterArgs {
    /// Only snapshots from this host (repeatable)
    #[arg(long = "host")]
    pub hosts: Vec<String>,
    /// Only snapshots carrying all of these comma-separated tags (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Only snapshots including this path (repeatable)
    #[arg(long = "path")]
    pub paths: Vec<String>,
}

impl FilterArgs {
    pub fn into_filter(self, ids: Vec<String>) -> SnapshotFilter {
        SnapshotFilter {
            ids,
            hosts: self.hosts,
            tags: self.tags,
            paths: self.paths,
        }
    }
}

#[derive(Args)]
pub struct SnapshotsArgs {
    #[command(flatten)]
    pub filter: FilterArgs,
}

#[derive(Args)]
pub struct ReferencedPacksArgs {
    /// Snapshot IDs, unique ID prefixes, or "latest". Defaults to all.
    pub snapshots: Vec<String>,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Trees loaded in parallel; overrides the config file
    #[arg(long)]
    pub concurrency: Option<usize>,
}
