//! Bound on concurrent connections.
//!
//! reqwest caps idle connections but not active ones, so each executor
//! pairs its client with a limiter. Calls past the bound wait for a slot.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{Error, Result};

/// Counting limiter shared by every call of one executor.
#[derive(Debug, Clone)]
pub struct ConnectionLimiter {
    semaphore: Arc<Semaphore>,
    max: usize,
}

/// A held connection slot. Dropping it frees the slot.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: OwnedSemaphorePermit,
}

impl ConnectionLimiter {
    /// Create a limiter with `max` slots.
    pub fn new(max: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max)),
            max,
        }
    }

    /// Wait for a free slot.
    pub async fn acquire(&self) -> Result<ConnectionPermit> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::PoolClosed)?;
        Ok(ConnectionPermit { _permit: permit })
    }

    /// Block the current thread until a slot is free.
    pub fn acquire_blocking(&self) -> Result<ConnectionPermit> {
        futures::executor::block_on(self.acquire())
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Slots currently held.
    pub fn in_use(&self) -> usize {
        self.max - self.available()
    }

    /// Configured bound.
    pub fn max(&self) -> usize {
        self.max
    }
}
