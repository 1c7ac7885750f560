// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The shared job store
//!
//! Workers coordinate only through this table, so every mutation follows
//! lock-acquire, read, modify, write-to-temp, atomic-rename, lock-release.
//! Reads go lockless: the rename guarantees a reader sees either the old
//! or the new file, never a torn one. Lock acquisition is bounded by a
//! configurable wait and fails loudly rather than deadlocking.

use crate::table::{format_row, parse_row, HEADER};
use evoq_core::{Job, JobId, JobStatus};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const LOCK_POLL: Duration = Duration::from_millis(10);

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("job store not found at {0}")]
    Missing(PathBuf),

    #[error("could not acquire store lock at {path} within {waited:?}")]
    LockTimeout { path: PathBuf, waited: Duration },

    #[error("job not found: {0}")]
    NotFound(JobId),

    #[error("job {id} is not claimable (status {status})")]
    NotClaimable { id: JobId, status: JobStatus },

    #[error("duplicate job id: {0}")]
    DuplicateId(JobId),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Persistent job table with advisory locking
#[derive(Clone, Debug)]
pub struct JobStore {
    path: PathBuf,
    lock_path: PathBuf,
    lock_wait: Duration,
}

/// One line of the table. Malformed rows are preserved verbatim so an
/// unrelated update never destroys operator data.
enum Entry {
    Job(Job),
    Malformed(String),
}

struct Table {
    entries: Vec<Entry>,
}

impl Table {
    fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.entries.iter().filter_map(|e| match e {
            Entry::Job(job) => Some(job),
            Entry::Malformed(_) => None,
        })
    }

    fn jobs_mut(&mut self) -> impl Iterator<Item = &mut Job> {
        self.entries.iter_mut().filter_map(|e| match e {
            Entry::Job(job) => Some(job),
            Entry::Malformed(_) => None,
        })
    }

    fn find_mut(&mut self, id: &JobId) -> Option<&mut Job> {
        self.jobs_mut().find(|j| &j.id == id)
    }
}

impl JobStore {
    /// Open a store handle; no I/O happens until the first operation
    pub fn open(path: impl Into<PathBuf>, lock_wait: Duration) -> Self {
        let path = path.into();
        let lock_path = lock_path_for(&path);
        Self {
            path,
            lock_path,
            lock_wait,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create an empty table (header only) unless one already exists
    pub fn init(&self) -> Result<(), StoreError> {
        if self.path.exists() {
            return Ok(());
        }
        ensure_parent_dir(&self.path)?;
        let _guard = self.lock()?;
        if !self.path.exists() {
            self.persist(&Table { entries: Vec::new() })?;
        }
        Ok(())
    }

    /// Atomically claim the oldest claimable job, marking it running.
    ///
    /// Returns the job's prior status so the caller can distinguish a
    /// fresh attempt from a retry.
    pub fn claim_next(&self) -> Result<Option<(JobId, JobStatus)>, StoreError> {
        let _guard = self.lock()?;
        let mut table = self.load()?;

        let claimed = table.jobs_mut().find(|j| j.status.is_claimable()).map(|job| {
            let prior = job.status;
            job.status = JobStatus::Running;
            (job.id.clone(), prior)
        });

        if let Some((id, prior)) = &claimed {
            self.persist(&table)?;
            tracing::info!(job_id = %id, prior = %prior, "claimed job");
        }
        Ok(claimed)
    }

    /// Claim a specific job by id (explicit worker invocation)
    pub fn claim(&self, id: &JobId) -> Result<(JobId, JobStatus), StoreError> {
        let _guard = self.lock()?;
        let mut table = self.load()?;

        let job = table
            .find_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        if !job.status.is_claimable() {
            return Err(StoreError::NotClaimable {
                id: id.clone(),
                status: job.status,
            });
        }
        let prior = job.status;
        job.status = JobStatus::Running;
        self.persist(&table)?;
        tracing::info!(job_id = %id, prior = %prior, "claimed job");
        Ok((id.clone(), prior))
    }

    /// Read a single job
    pub fn read(&self, id: &JobId) -> Result<Job, StoreError> {
        let table = self.load()?;
        let result = table
            .jobs()
            .find(|j| &j.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()));
        result
    }

    /// Update a job's status
    pub fn update_status(&self, id: &JobId, status: JobStatus) -> Result<(), StoreError> {
        self.resolve(id, status, None)
    }

    /// Update a job's recorded performance
    pub fn update_performance(&self, id: &JobId, value: f64) -> Result<(), StoreError> {
        let _guard = self.lock()?;
        let mut table = self.load()?;
        let job = table
            .find_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        job.performance = Some(value);
        self.persist(&table)?;
        Ok(())
    }

    /// Write a terminal outcome in a single locked pass
    pub fn resolve(
        &self,
        id: &JobId,
        status: JobStatus,
        performance: Option<f64>,
    ) -> Result<(), StoreError> {
        let _guard = self.lock()?;
        let mut table = self.load()?;
        let job = table
            .find_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        job.status = status;
        if performance.is_some() {
            job.performance = performance;
        }
        self.persist(&table)?;
        tracing::info!(job_id = %id, status = %status, "persisted outcome");
        Ok(())
    }

    /// Append new jobs; ids must be unique across the table and the batch
    pub fn append(&self, jobs: &[Job]) -> Result<(), StoreError> {
        let _guard = self.lock()?;
        let mut table = self.load()?;

        let mut seen: Vec<JobId> = table.jobs().map(|j| j.id.clone()).collect();
        for job in jobs {
            if seen.contains(&job.id) {
                return Err(StoreError::DuplicateId(job.id.clone()));
            }
            seen.push(job.id.clone());
        }
        for job in jobs {
            table.entries.push(Entry::Job(job.clone()));
        }
        self.persist(&table)?;
        Ok(())
    }

    /// Number of claimable jobs
    pub fn count_pending(&self) -> Result<usize, StoreError> {
        Ok(self.load()?.jobs().filter(|j| j.status.is_claimable()).count())
    }

    /// All well-formed jobs in table order
    pub fn list(&self) -> Result<Vec<Job>, StoreError> {
        Ok(self.load()?.jobs().cloned().collect())
    }

    /// Requeue jobs left `running` by a dead process.
    ///
    /// A running status with no live owner is stale by definition once
    /// that process has exited, so this is safe to run unconditionally
    /// at boot. Returns the number of requeued jobs.
    pub fn reset_stale_running(&self) -> Result<usize, StoreError> {
        let _guard = self.lock()?;
        let mut table = self.load()?;

        let mut requeued = 0;
        for job in table.jobs_mut() {
            if job.status == JobStatus::Running {
                job.status = JobStatus::Pending;
                requeued += 1;
            }
        }
        if requeued > 0 {
            self.persist(&table)?;
            tracing::warn!(count = requeued, "requeued stale running jobs");
        }
        Ok(requeued)
    }

    fn lock(&self) -> Result<LockGuard, StoreError> {
        ensure_parent_dir(&self.lock_path)?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)?;

        let deadline = Instant::now() + self.lock_wait;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(LockGuard { file }),
                Err(_) if Instant::now() < deadline => std::thread::sleep(LOCK_POLL),
                Err(_) => {
                    return Err(StoreError::LockTimeout {
                        path: self.lock_path.clone(),
                        waited: self.lock_wait,
                    })
                }
            }
        }
    }

    fn load(&self) -> Result<Table, StoreError> {
        if !self.path.exists() {
            return Err(StoreError::Missing(self.path.clone()));
        }
        let text = std::fs::read_to_string(&self.path)?;

        let mut entries = Vec::new();
        let mut seen: Vec<JobId> = Vec::new();
        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            if index == 0 && line.trim() == HEADER {
                continue;
            }
            match parse_row(line) {
                Ok(job) => {
                    if seen.contains(&job.id) {
                        return Err(StoreError::DuplicateId(job.id));
                    }
                    seen.push(job.id.clone());
                    entries.push(Entry::Job(job));
                }
                Err(err) => {
                    tracing::warn!(line = index + 1, error = %err, "skipping malformed row");
                    entries.push(Entry::Malformed(line.to_string()));
                }
            }
        }
        Ok(Table { entries })
    }

    fn persist(&self, table: &Table) -> Result<(), StoreError> {
        let tmp = self
            .path
            .with_extension(format!("tmp.{}", uuid::Uuid::new_v4()));

        let mut file = File::create(&tmp)?;
        writeln!(file, "{}", HEADER)?;
        for entry in &table.entries {
            match entry {
                Entry::Job(job) => writeln!(file, "{}", format_row(job))?,
                Entry::Malformed(line) => writeln!(file, "{}", line)?,
            }
        }
        file.sync_all()?;
        drop(file);

        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Create the containing directory; a bare relative file name has none
fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Sidecar lock file next to the table
fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "store".to_string());
    name.push_str(".lock");
    path.with_file_name(name)
}

struct LockGuard {
    file: File,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
