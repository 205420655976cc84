//! Cancellation and deadline for one detection job.

use std::time::{Duration, Instant};

use jarvis_core::errors::DetectionError;
use jarvis_core::CancellationToken;

#[derive(Debug, Clone)]
pub struct JobBudget {
    token: CancellationToken,
    started: Instant,
    budget: Duration,
}

impl JobBudget {
    pub fn new(token: CancellationToken, budget: Duration) -> Self {
        Self { token, started: Instant::now(), budget }
    }

    /// No deadline, never cancelled.
    pub fn unbounded() -> Self {
        Self::new(CancellationToken::new(), Duration::MAX)
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Called between units of work. Cancellation wins over the deadline.
    pub fn check(&self) -> Result<(), DetectionError> {
        if self.token.is_cancelled() {
            return Err(DetectionError::Cancelled);
        }
        let elapsed = self.started.elapsed();
        if elapsed > self.budget {
            return Err(DetectionError::Timeout {
                elapsed_ms: elapsed.as_millis() as u64,
                budget_ms: self.budget.as_millis() as u64,
            });
        }
        Ok(())
    }
}
