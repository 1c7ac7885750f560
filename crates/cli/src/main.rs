// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! evoq - evolution queue CLI

mod commands;
mod completions;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{queue, run, worker};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "evoq",
    version,
    about = "evoq - iterative mutate/evaluate automation for algorithm variants"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, default_value = evoq_core::config::CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the dispatcher until the queue is dry
    Run(run::RunArgs),
    /// Run one worker cycle: claim, mutate, evaluate, persist
    Worker(worker::WorkerArgs),
    /// Queue management
    Queue(queue::QueueArgs),
    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run::run(&cli.config, args).await,
        Commands::Worker(args) => worker::worker(&cli.config, args).await,
        Commands::Queue(args) => queue::queue(&cli.config, args),
        Commands::Completions(args) => {
            completions::generate_completions::<Cli>(args.shell);
            Ok(())
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_env("EVOQ_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
