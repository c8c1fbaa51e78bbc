//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// Quay - compose gated C declaration surfaces for binding generators
#[derive(Parser)]
#[command(name = "quay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Path to the library file (defaults to Quay.toml in this or a parent directory)
    #[arg(long, global = true, env = "QUAY_LIBRARY")]
    pub library: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compose the declaration surface
    Compose(ComposeArgs),

    /// Validate the library and trial-compose every configuration
    Check(CheckArgs),

    /// Explain why a fragment is (or is not) part of the surface
    Explain(ExplainArgs),

    /// Show the effective flag set
    Flags(FlagsArgs),

    /// List fragments, rewrites or configurations
    List(ListArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Flag sources shared by the composing commands.
#[derive(Args, Debug, Clone, Default)]
pub struct FlagArgs {
    /// Enable a flag (NAME or NAME=VALUE), may be repeated
    #[arg(short = 'D', long = "flag", value_name = "FLAG")]
    pub flags: Vec<String>,

    /// Take flags from compiler flags (-DNAME, -DNAME=VALUE, -UNAME)
    #[arg(long, env = "QUAY_CFLAGS", allow_hyphen_values = true)]
    pub cflags: Option<String>,

    /// Compose for a named configuration of the library
    #[arg(short, long)]
    pub configuration: Option<String>,
}

#[derive(Args)]
pub struct ComposeArgs {
    #[command(flatten)]
    pub flags: FlagArgs,

    /// Output format (header, json, list)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Write to a file instead of stdout (a directory with --all)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Compose every configuration of the library
    #[arg(long, conflicts_with = "configuration", requires = "output")]
    pub all: bool,

    /// Omit the fingerprint banner from headers
    #[arg(long)]
    pub no_fingerprint: bool,

    /// Number of parallel jobs (with --all)
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Treat warnings as errors
    #[arg(long)]
    pub deny_warnings: bool,
}

#[derive(Args)]
pub struct ExplainArgs {
    /// Fragment to explain
    pub fragment: String,

    #[command(flatten)]
    pub flags: FlagArgs,
}

#[derive(Args)]
pub struct FlagsArgs {
    #[command(flatten)]
    pub flags: FlagArgs,

    /// Evaluate a gate expression against the flags
    #[arg(long, value_name = "GATE")]
    pub eval: Option<String>,
}

#[derive(Args)]
pub struct ListArgs {
    /// List configurations instead of fragments
    #[arg(long, conflicts_with = "rewrites")]
    pub configurations: bool,

    /// List rewrite rules instead of fragments
    #[arg(long)]
    pub rewrites: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
