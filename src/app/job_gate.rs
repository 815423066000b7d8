// Job gate - admission control for render jobs

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{ReelcutError, ReelcutResult};

/// Admits at most `capacity` jobs at once; further jobs are refused, not
/// queued
#[derive(Debug, Clone)]
pub struct JobGate {
    permits: Arc<Semaphore>,
}

/// Held for the lifetime of an admitted job
#[derive(Debug)]
pub struct JobPermit {
    _permit: OwnedSemaphorePermit,
}

impl JobGate {
    pub fn new(capacity: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity.max(1))),
        }
    }

    pub fn try_admit(&self) -> ReelcutResult<JobPermit> {
        Arc::clone(&self.permits)
            .try_acquire_owned()
            .map(|permit| JobPermit { _permit: permit })
            .map_err(|_| ReelcutError::Busy)
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}
