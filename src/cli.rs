use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::indexer::DEFAULT_MAX_DEPTH;

pub const DEFAULT_MAX_ENTRY_MB: u64 = 512;

#[derive(Debug, Clone, Parser)]
#[command(name = "jar-index")]
#[command(about = "Index Java classes in JAR/WAR files and find which archive contains a class")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, value_name = "FILE", global = true)]
    pub db: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Index every JAR/WAR file under a directory
    Index {
        directory: PathBuf,

        #[arg(long)]
        no_recursive: bool,

        #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,

        #[arg(long, value_name = "MB", default_value_t = DEFAULT_MAX_ENTRY_MB)]
        max_entry_mb: u64,

        #[arg(long, value_name = "DIR")]
        staging_dir: Option<PathBuf>,

        #[arg(long)]
        no_progress: bool,
    },
    /// Interactive class search with autocomplete
    Search,
    /// List the archives containing classes whose name contains PATTERN
    Find {
        pattern: String,

        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// List distinct class names containing PATTERN
    Classes {
        pattern: String,

        #[arg(long, value_name = "N")]
        limit: Option<usize>,
    },
    /// Remove one archive, its classes and its nested archives from the index
    Forget { archive: PathBuf },
    Stats,
    Clear,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}
