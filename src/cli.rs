//! CLI struct definitions for the fleetstore command-line interface.
//!
//! All clap-derived types live here. Dispatch logic lives in `lib.rs`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "fleetstore",
    version = env!("CARGO_PKG_VERSION"),
    about = "Fleet state store: label membership and bounded query results on SQLite"
)]
pub(crate) struct Cli {
    /// Store root directory (holds fleet.db and fleetstore.toml).
    #[clap(long, global = true, default_value = ".")]
    pub root: PathBuf,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Create the store and its schema
    Init,
    /// Host inventory
    Host(HostCli),
    /// Scheduled query definitions
    Query(QueryCli),
    /// Query result ingestion and reads
    Results(ResultsCli),
    /// Label definitions and membership
    Labels(LabelsCli),
}

#[derive(clap::Args, Debug)]
pub(crate) struct HostCli {
    #[clap(subcommand)]
    pub command: HostCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum HostCommand {
    /// Register a host (or refresh its platform details)
    Enroll {
        #[clap(long)]
        hostname: String,
        #[clap(long, default_value = "")]
        platform: String,
        #[clap(long, default_value = "")]
        os_version: String,
    },
    /// Show one host
    Show {
        #[clap(long)]
        id: i64,
    },
    /// Delete a host (memberships are left for `labels cleanup`)
    Delete {
        #[clap(long)]
        id: i64,
    },
}

#[derive(clap::Args, Debug)]
pub(crate) struct QueryCli {
    #[clap(subcommand)]
    pub command: QueryCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum QueryCommand {
    /// Define a scheduled query
    Add {
        #[clap(long)]
        name: String,
        #[clap(long)]
        sql: String,
    },
    /// Delete a query definition (its results are kept)
    Delete {
        #[clap(long)]
        id: i64,
    },
}

#[derive(clap::Args, Debug)]
pub(crate) struct ResultsCli {
    #[clap(subcommand)]
    pub command: ResultsCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum ResultsCommand {
    /// Append result rows from a JSONL file
    Save {
        #[clap(long)]
        file: PathBuf,
    },
    /// Replace each (query, host) pair's rows with those in a JSONL file
    Overwrite {
        #[clap(long)]
        file: PathBuf,
    },
    /// List stored rows for a query (payload rows only) or a (query, host) pair
    Rows {
        #[clap(long)]
        query: i64,
        #[clap(long)]
        host: Option<i64>,
    },
    /// Count payload rows for a query or a (query, host) pair
    Count {
        #[clap(long)]
        query: i64,
        #[clap(long)]
        host: Option<i64>,
    },
}

#[derive(clap::Args, Debug)]
pub(crate) struct LabelsCli {
    #[clap(subcommand)]
    pub command: LabelsCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum LabelsCommand {
    /// Apply label specs from a JSON array file
    Apply {
        #[clap(long)]
        file: PathBuf,
    },
    /// Record one host's label evaluation results from a JSON object file
    /// mapping label id to true, false or null
    Record {
        #[clap(long)]
        host: i64,
        #[clap(long)]
        file: PathBuf,
        /// Evaluation timestamp (epoch seconds); defaults to now.
        #[clap(long)]
        at: Option<i64>,
    },
    /// Labels a host belongs to
    ForHost {
        #[clap(long)]
        host: i64,
    },
    /// Label queries a host must evaluate
    Queries {
        #[clap(long)]
        host: i64,
    },
    /// Hosts in a label
    Hosts {
        #[clap(long)]
        label: i64,
    },
    /// Remove memberships whose label or host no longer exists
    Cleanup,
    /// Export label specs (all, or one by name)
    Specs {
        #[clap(long)]
        name: Option<String>,
    },
}
