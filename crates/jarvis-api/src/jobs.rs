//! Detection job registry: at most one running job per user, each with its
//! own cancellation token, plus per-user counts of logs submitted since the
//! last job started.

use std::sync::{Mutex, MutexGuard, PoisonError};

use jarvis_core::CancellationToken;
use rustc_hash::FxHashMap;

#[derive(Debug, Default)]
pub struct JobRegistry {
    running: Mutex<FxHashMap<String, CancellationToken>>,
    pending_logs: Mutex<FxHashMap<String, u32>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job for `user_id`. `None` when one is already running.
    pub fn begin(&self, user_id: &str) -> Option<JobGuard<'_>> {
        let mut running = lock(&self.running);
        if running.contains_key(user_id) {
            return None;
        }
        let token = CancellationToken::new();
        running.insert(user_id.to_string(), token.clone());
        // Entries submitted from here on count towards the next job.
        lock(&self.pending_logs).remove(user_id);
        Some(JobGuard {
            registry: self,
            user_id: user_id.to_string(),
            token,
        })
    }

    /// Cancel the user's running job, if any.
    pub fn cancel(&self, user_id: &str) -> bool {
        match lock(&self.running).get(user_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, user_id: &str) -> bool {
        lock(&self.running).contains_key(user_id)
    }

    pub fn running_count(&self) -> usize {
        lock(&self.running).len()
    }

    /// Count one new log entry; returns the user's pending total.
    pub fn note_log(&self, user_id: &str) -> u32 {
        let mut pending = lock(&self.pending_logs);
        let count = pending.entry(user_id.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn pending_logs(&self, user_id: &str) -> u32 {
        lock(&self.pending_logs).get(user_id).copied().unwrap_or(0)
    }

    pub fn forget(&self, user_id: &str) {
        lock(&self.pending_logs).remove(user_id);
    }
}

/// Unregisters the job when dropped.
#[derive(Debug)]
pub struct JobGuard<'a> {
    registry: &'a JobRegistry,
    user_id: String,
    token: CancellationToken,
}

impl JobGuard<'_> {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

impl Drop for JobGuard<'_> {
    fn drop(&mut self) {
        lock(&self.registry.running).remove(&self.user_id);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_job_per_user() {
        let registry = JobRegistry::new();
        let guard = registry.begin("u1").unwrap();
        assert!(registry.begin("u1").is_none());
        assert!(registry.begin("u2").is_some());
        assert!(registry.is_running("u1"));

        drop(guard);
        assert!(!registry.is_running("u1"));
        assert!(registry.begin("u1").is_some());
    }

    #[test]
    fn cancel_reaches_the_running_token() {
        let registry = JobRegistry::new();
        assert!(!registry.cancel("u1"));
        let guard = registry.begin("u1").unwrap();
        assert!(registry.cancel("u1"));
        assert!(guard.token().is_cancelled());
    }

    #[test]
    fn pending_counts_reset_when_a_job_starts() {
        let registry = JobRegistry::new();
        registry.note_log("u1");
        assert_eq!(registry.note_log("u1"), 2);
        let _guard = registry.begin("u1").unwrap();
        assert_eq!(registry.pending_logs("u1"), 0);
        assert_eq!(registry.note_log("u1"), 1);
    }
}
