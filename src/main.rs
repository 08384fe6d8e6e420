// src/main.rs — pipefix entry point

use clap::Parser;

use pipefix::cli::{Cli, Commands};
use pipefix::infra::config::RunnerConfig;
use pipefix::infra::logger;

#[tokio::main]
async fn main() {
    // Respects RUST_LOG when set.
    logger::init_logging("info");

    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = if let Some(ref path) = cli.config {
        RunnerConfig::load_from(path)?
    } else {
        RunnerConfig::load()?
    };

    match cli.command {
        Commands::Run {
            workspace,
            max_loop,
            diff,
        } => {
            if let Some(n) = max_loop {
                config.refine.max_loop = n;
            }
            if diff {
                config.refine.diff_mode = true;
            }
            pipefix::cli::run::run_refinement(&workspace, config).await
        }
        Commands::Scores { workspace } => pipefix::cli::scores::run_scores(&workspace),
    }
}
