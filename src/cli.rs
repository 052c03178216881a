use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hdrscope")]
#[command(author, version, about = "HDR display capabilities and video metadata inspection")]
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
    /// Extract metadata from a video source
    Metadata {
        /// File path, file://, asset://, content:// or http(s):// URL
        #[arg(required = true)]
        source: String,

        /// Request header for network sources, as 'Name: value' (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report HDR and wide color gamut support of the primary display
    Capabilities {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Invoke a method by name and print the JSON response
    Call {
        /// Method name, e.g. getVideoMetadata
        method: String,

        /// JSON argument object
        #[arg(long = "args")]
        arguments: Option<String>,
    },

    /// Serve newline-delimited JSON method calls on stdin/stdout
    Serve,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
