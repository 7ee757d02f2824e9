//! In-memory registry of live and recently finished jobs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::{Job, JobError, JobResult, JobSummary};

/// One registered job: its record plus the result once it exists.
#[derive(Debug)]
pub struct JobCell {
    job: Mutex<Job>,
    result: Mutex<Option<JobResult>>,
}

impl JobCell {
    pub fn new(job: Job) -> Self {
        Self {
            job: Mutex::new(job),
            result: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Job> {
        self.job.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current record.
    pub fn snapshot(&self) -> Job {
        self.lock().clone()
    }

    /// Applies `f` under the record lock. Keep `f` short and non-blocking.
    pub fn update<R>(&self, f: impl FnOnce(&mut Job) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn result(&self) -> Option<JobResult> {
        self.result
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_result(&self, result: JobResult) {
        *self.result.lock().unwrap_or_else(PoisonError::into_inner) = Some(result);
    }
}

/// Registry of jobs keyed by id.
///
/// Terminal jobs are kept for `retention` after completion so late status
/// and result queries still resolve, then evicted by [`evict_expired`].
///
/// [`evict_expired`]: JobRegistry::evict_expired
#[derive(Debug)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, Arc<JobCell>>>,
    retention: Duration,
}

impl JobRegistry {
    pub fn new(retention: Duration) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            retention,
        }
    }

    pub fn insert(&self, job: Job) -> Arc<JobCell> {
        let id = job.id.clone();
        let cell = Arc::new(JobCell::new(job));
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::clone(&cell));
        cell
    }

    pub fn get(&self, job_id: &str) -> Option<Arc<JobCell>> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(job_id)
            .cloned()
    }

    pub fn snapshot(&self, job_id: &str) -> Result<Job, JobError> {
        self.get(job_id)
            .map(|cell| cell.snapshot())
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))
    }

    /// Newest first.
    pub fn list(&self, limit: usize) -> Vec<JobSummary> {
        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        let mut summaries: Vec<JobSummary> =
            jobs.values().map(|cell| cell.snapshot().summary()).collect();
        drop(jobs);
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summaries.truncate(limit);
        summaries
    }

    /// Number of jobs not yet in a terminal status.
    pub fn active_count(&self) -> usize {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|cell| !cell.snapshot().status.is_terminal())
            .count()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops terminal jobs whose retention window has elapsed. Returns the
    /// evicted ids.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> Vec<String> {
        let retention = chrono::Duration::from_std(self.retention)
            .unwrap_or_else(|_| chrono::Duration::MAX);
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let expired: Vec<String> = jobs
            .iter()
            .filter_map(|(id, cell)| {
                let job = cell.snapshot();
                let completed_at = job.completed_at?;
                let expires_at = completed_at.checked_add_signed(retention)?;
                (job.status.is_terminal() && expires_at <= now).then(|| id.clone())
            })
            .collect();
        for id in &expired {
            jobs.remove(id);
        }
        expired
    }
}
