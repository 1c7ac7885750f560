// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-spawning provider adapter
//!
//! Providers are arbitrary command lines run through `sh -c` with
//! `{description}` and `{artifact}` interpolated. Each child gets its own
//! process group so an expired invocation timeout can kill the whole tree.

use crate::traits::{is_quota_signature, AgentOutput, AgentTask, Provider, ProviderError};
use async_trait::async_trait;
use evoq_core::{interpolate, ProviderDef};
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

/// External agent invoked as a shell command
#[derive(Clone, Debug)]
pub struct CommandProvider {
    name: String,
    run: String,
    timeout: Option<Duration>,
}

impl CommandProvider {
    pub fn new(name: impl Into<String>, run: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            run: run.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn from_def(def: &ProviderDef) -> Self {
        Self {
            name: def.name.clone(),
            run: def.run.clone(),
            timeout: def.timeout,
        }
    }
}

#[async_trait]
impl Provider for CommandProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, task: &AgentTask) -> Result<AgentOutput, ProviderError> {
        let mut vars = HashMap::new();
        vars.insert("description".to_string(), task.description.clone());
        if let Some(artifact) = &task.artifact {
            vars.insert("artifact".to_string(), artifact.display().to_string());
        }
        let command = interpolate(&self.run, &vars);

        tracing::debug!(provider = %self.name, kind = %task.kind, %command, "invoking agent");

        let mut child = spawn_in_group(&command).map_err(|source| ProviderError::Spawn {
            name: self.name.clone(),
            source,
        })?;

        let stdout_task = drain(child.stdout.take());
        let stderr_task = drain(child.stderr.take());

        // None means the bounded timeout expired and the group was killed
        let status = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, child.wait()).await {
                Ok(status) => Some(status?),
                Err(_) => {
                    kill_group(&child);
                    let _ = child.wait().await;
                    None
                }
            },
            None => Some(child.wait().await?),
        };

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        if is_quota_signature(&stdout) || is_quota_signature(&stderr) {
            tracing::warn!(provider = %self.name, "quota signature in agent output");
            return Err(ProviderError::Quota {
                name: self.name.clone(),
            });
        }

        match status {
            None => {
                if stdout.trim().is_empty() {
                    Err(ProviderError::TimedOut {
                        name: self.name.clone(),
                    })
                } else {
                    // Slow but complete: the work is usable
                    tracing::warn!(provider = %self.name, "agent timed out after producing output");
                    Ok(AgentOutput {
                        stdout,
                        timed_out: true,
                    })
                }
            }
            Some(status) if !status.success() => Err(ProviderError::Failed {
                name: self.name.clone(),
                code: status.code(),
                stderr: truncate(&stderr),
            }),
            Some(_) if stdout.trim().is_empty() => Err(ProviderError::EmptyOutput {
                name: self.name.clone(),
            }),
            Some(_) => Ok(AgentOutput {
                stdout,
                timed_out: false,
            }),
        }
    }
}

/// Spawn a shell command in its own process group with piped output
pub(crate) fn spawn_in_group(command: &str) -> std::io::Result<Child> {
    Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0)
        .kill_on_drop(true)
        .spawn()
}

/// SIGKILL the child's process group (pgid == pid under process_group(0))
pub(crate) fn kill_group(child: &Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = child.id() {
        let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
    }
}

/// Read a child pipe to completion without blocking the wait
pub(crate) fn drain<R>(pipe: Option<R>) -> tokio::task::JoinHandle<String>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buffer = String::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_string(&mut buffer).await;
        }
        buffer
    })
}

pub(crate) fn truncate(text: &str) -> String {
    const LIMIT: usize = 400;
    if text.len() <= LIMIT {
        text.to_string()
    } else {
        let mut end = LIMIT;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &text[..end])
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
