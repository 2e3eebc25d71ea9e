//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Incrementally mirror ParlInfo Hansard transcripts.
///
/// Walks the ParlInfo search feeds, resolves each sitting's landing page to its
/// XML transcript, and stores every transcript once under the data directory.
#[derive(Parser, Debug)]
#[command(name = "harvester")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: $XDG_CONFIG_HOME/hansard-harvester/config.toml)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Data directory for crawl state and documents
    #[arg(long, value_name = "PATH", global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Paginate, resolve and fetch new transcripts
    Crawl(CrawlArgs),

    /// List configured query names and expressions
    Queries,

    /// Print the session header of Hansard XML files
    Info {
        /// Hansard XML files
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,
    },

    /// Print lines only in A (as "- ") and lines only in B (as "+ ")
    Setdiff {
        /// First file
        a: PathBuf,
        /// Second file
        b: PathBuf,
    },
}

/// Arguments of `crawl`.
#[derive(Args, Debug, Clone, Default)]
pub struct CrawlArgs {
    /// Queries to crawl (default: all configured queries)
    #[arg(value_name = "QUERY")]
    pub queries: Vec<String>,

    /// Keep paginating past pages with no new results
    #[arg(long)]
    pub full: bool,

    /// First feed page to request
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub offset: u32,

    /// Re-check landing pages previously found without an XML transcript
    #[arg(long)]
    pub retry_unresolved: bool,
}
