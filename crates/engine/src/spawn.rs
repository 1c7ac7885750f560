// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker process spawning
//!
//! The dispatcher supervises workers through these seams so tests can
//! script a pool without real processes. Each real worker runs in its own
//! process group: SIGTERM goes to the worker itself (it resolves the
//! in-flight job to `interrupted`), SIGKILL goes to the whole group.

use crate::worker::WorkerExit;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::{Child, Command};

/// Handle on one spawned worker
#[async_trait]
pub trait WorkerHandle: Send + 'static {
    fn pid(&self) -> Option<u32>;

    /// Non-blocking liveness poll
    fn try_wait(&mut self) -> std::io::Result<Option<WorkerExit>>;

    /// Block until the worker exits
    async fn wait(&mut self) -> std::io::Result<WorkerExit>;

    /// Request graceful termination
    fn terminate(&self);

    /// Force-kill the worker and its descendants
    fn kill(&self);
}

/// Spawns workers for the dispatcher
pub trait WorkerSpawner: Clone + Send + Sync + 'static {
    type Handle: WorkerHandle;

    fn spawn(&self) -> std::io::Result<Self::Handle>;
}

/// Spawns real worker processes (the `evoq worker` subcommand)
#[derive(Clone, Debug)]
pub struct ProcessSpawner {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessSpawner {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Re-invoke the current binary with the given arguments
    pub fn current_exe(args: Vec<String>) -> std::io::Result<Self> {
        Ok(Self {
            program: std::env::current_exe()?,
            args,
        })
    }
}

impl WorkerSpawner for ProcessSpawner {
    type Handle = ProcessWorker;

    fn spawn(&self) -> std::io::Result<ProcessWorker> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .process_group(0)
            .spawn()?;
        Ok(ProcessWorker { child })
    }
}

/// A worker running as a child process
pub struct ProcessWorker {
    child: Child,
}

fn status_exit(status: std::process::ExitStatus) -> WorkerExit {
    // A signal death has no code and classifies as ordinary failure
    status
        .code()
        .map(WorkerExit::from_code)
        .unwrap_or(WorkerExit::Failure)
}

#[async_trait]
impl WorkerHandle for ProcessWorker {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    fn try_wait(&mut self) -> std::io::Result<Option<WorkerExit>> {
        Ok(self.child.try_wait()?.map(status_exit))
    }

    async fn wait(&mut self) -> std::io::Result<WorkerExit> {
        Ok(status_exit(self.child.wait().await?))
    }

    fn terminate(&self) {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = self.child.id() {
            let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
        }
    }

    fn kill(&self) {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = self.child.id() {
            let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
        }
    }
}
