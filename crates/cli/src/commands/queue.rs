// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `evoq queue` - operator queue management

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use evoq_core::{Config, Job, JobId, JobStatus};
use evoq_storage::JobStore;
use std::path::Path;

#[derive(Args)]
pub struct QueueArgs {
    #[command(subcommand)]
    pub command: QueueCommand,
}

#[derive(Subcommand)]
pub enum QueueCommand {
    /// Create an empty job table
    Init,
    /// List all jobs
    List,
    /// Show queue depth by status
    Status,
    /// Add a pending job
    Add {
        /// Generation-scoped job id (e.g. gen02-007)
        id: String,
        /// Free-text instruction for the mutation agent
        description: String,
        /// Parent job id; omit for a baseline seed job
        #[arg(long)]
        parent: Option<String>,
    },
    /// Requeue jobs left running by a dead process
    Reset,
    /// Requeue a terminal job for another attempt
    Requeue {
        /// Job id to requeue
        id: String,
    },
}

pub fn queue(config_path: &Path, args: QueueArgs) -> Result<()> {
    let config = Config::load(config_path)?;
    let store = JobStore::open(&config.queue.store, config.queue.lock_wait);

    match args.command {
        QueueCommand::Init => {
            store.init()?;
            println!("Initialized job table at {}", store.path().display());
        }

        QueueCommand::List => {
            let jobs = store.list()?;
            if jobs.is_empty() {
                println!("No jobs");
            } else {
                println!(
                    "{:<12} {:<12} {:<36} {:<10} STATUS",
                    "ID", "PARENT", "DESCRIPTION", "PERF"
                );
                for job in jobs {
                    let parent = job
                        .parent
                        .as_ref()
                        .map(|p| p.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    let perf = job
                        .performance
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{:<12} {:<12} {:<36} {:<10} {}",
                        clip(job.id.as_str(), 12),
                        clip(&parent, 12),
                        clip(&job.description, 36),
                        clip(&perf, 10),
                        job.status
                    );
                }
            }
        }

        QueueCommand::Status => {
            let jobs = store.list()?;
            let count = |f: fn(&JobStatus) -> bool| jobs.iter().filter(|j| f(&j.status)).count();
            println!("pending:     {}", count(JobStatus::is_claimable));
            println!(
                "running:     {}",
                count(|s| matches!(s, JobStatus::Running))
            );
            println!(
                "complete:    {}",
                count(|s| matches!(s, JobStatus::Complete))
            );
            println!("failed:      {}", count(|s| matches!(s, JobStatus::Failed)));
            println!(
                "timeout:     {}",
                count(|s| matches!(s, JobStatus::Timeout))
            );
            println!(
                "interrupted: {}",
                count(|s| matches!(s, JobStatus::Interrupted))
            );
        }

        QueueCommand::Add {
            id,
            description,
            parent,
        } => {
            store.init()?;
            let job = Job::pending(&id, parent.map(JobId::new), description);
            store.append(&[job])?;
            println!("Added {}", id);
        }

        QueueCommand::Reset => {
            let requeued = store.reset_stale_running()?;
            println!("Requeued {} stale running jobs", requeued);
        }

        QueueCommand::Requeue { id } => {
            let id = JobId::new(id);
            let job = store.read(&id)?;
            if !job.status.is_terminal() {
                bail!("job {} is {}, not terminal", id, job.status);
            }
            store.update_status(&id, JobStatus::Pending)?;
            println!("Requeued {}", id);
        }
    }

    Ok(())
}

fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let clipped: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", clipped)
    }
}
