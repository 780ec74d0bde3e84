use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "shardcast")]
#[command(author, version, about = "Range-streaming server for chunked transcoding output")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the download server
    Start {
        /// Host to bind to (overrides the config file)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,

        /// Print the effective configuration as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the chunk fetches a Range header resolves to
    Plan {
        /// Total size of the assembled file in bytes
        #[arg(long)]
        size: u64,

        /// Number of chunk identifiers recorded for the job
        #[arg(long)]
        cids: u64,

        /// Chunk size in bytes (defaults to the configured size)
        #[arg(long)]
        chunk_size: Option<u64>,

        /// Range header value, e.g. "bytes=0-99,-500"; whole file if omitted
        #[arg(long)]
        range: Option<String>,
    },

    /// Display version information
    Version,
}
