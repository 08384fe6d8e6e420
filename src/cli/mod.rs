// src/cli/mod.rs — CLI definitions

pub mod run;
pub mod scores;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pipefix", version, about = "Iterative repair loop for generated data-science pipelines")]
pub struct Cli {
    /// Path to a pipefix.toml config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Refine the workspace until it produces its metrics artifact.
    Run {
        /// Directory holding the pipeline workspace.
        workspace: PathBuf,

        /// Override the configured maximum loop count.
        #[arg(long)]
        max_loop: Option<usize>,

        /// Ask the oracle for unified diffs instead of full-file rewrites.
        #[arg(long)]
        diff: bool,
    },

    /// Print the scores table of an already-refined workspace.
    Scores {
        /// Directory holding the pipeline workspace.
        workspace: PathBuf,
    },
}
