//! Bounded worker pool for catalog construction.
//!
//! Only `capacity` tasks run at once when spawned through the pool; further
//! spawns wait for a permit before they are handed to the runtime.

use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

/// Default number of concurrent catalog constructions.
pub const DEFAULT_CATALOG_WORKERS: usize = 8;

#[derive(Clone, Debug)]
pub struct WorkPool {
    name: String,
    capacity: usize,
    semaphore: Arc<Semaphore>,
    executor: Handle,
}

impl WorkPool {
    /// Create a pool on an existing tokio runtime handle.
    ///
    /// A capacity of zero is raised to one so spawned work always runs.
    pub fn new(name: impl Into<String>, capacity: usize, executor: Handle) -> Self {
        let capacity = capacity.max(1);
        Self {
            name: name.into(),
            capacity,
            semaphore: Arc::new(Semaphore::new(capacity)),
            executor,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of workers not currently in use
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    async fn acquire_permit(&self) -> Result<OwnedSemaphorePermit, AcquireError> {
        self.semaphore.clone().acquire_owned().await
    }

    /// Run `func` on a blocking thread once a worker is free.
    ///
    /// Waits while the pool is at capacity, then returns a [`JoinHandle`]
    /// for the result. The worker is released when `func` returns.
    pub async fn spawn_blocking<F, R>(&self, func: F) -> Result<JoinHandle<R>, AcquireError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let permit = self.acquire_permit().await?;
        tracing::trace!(pool = %self.name, available = self.available(), "spawning task");
        Ok(self.executor.spawn_blocking(move || {
            let ret = func();
            drop(permit);
            ret
        }))
    }
}
