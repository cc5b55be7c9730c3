// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dockwright")]
#[command(about = "Run the Docker CLI with timeouts, and sweep containers left behind by earlier runs")]
#[command(version)]
pub struct Cli {
    /// Container CLI binary to invoke
    #[arg(long, global = true, env = "DOCKWRIGHT_DOCKER", default_value = "docker")]
    pub docker: String,

    /// Config file (defaults to dockwright.yml in the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Detect the installed container runtime
    Detect,

    /// List managed containers left behind by other sessions
    Orphans,

    /// Stop and remove orphaned managed containers
    Cleanup {
        /// Force removal of running containers
        #[arg(short, long)]
        force: bool,

        /// Remove every managed container, not only orphans
        #[arg(long)]
        all: bool,
    },

    /// Run a raw CLI command and exit with its exit code
    Exec {
        /// Kill the command after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Arguments passed to the CLI, after `--`
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}
