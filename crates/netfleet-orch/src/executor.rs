/*!
 * Bounded concurrent fan-out.
 *
 * This module provides the executor underlying every orchestration
 * fan-out: one unit of work per item, at most a fixed number of units
 * in flight, and a batch that always runs to completion regardless of
 * what individual units do.
 */
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// A bounded concurrent executor
///
/// Runs a caller-supplied unit of work once per item, capped at
/// `max_workers` simultaneously active units. Items are pulled as slots
/// free up; no ordering is guaranteed among them. A unit that panics is
/// logged and contained; it never cancels its siblings or fails the
/// batch.
#[derive(Debug)]
pub struct BoundedExecutor {
    permits: Arc<Semaphore>,
    max_workers: usize,
}

impl BoundedExecutor {
    /// Create a new executor with the given concurrency cap
    ///
    /// A zero cap is a contract violation and is rejected here.
    pub fn new(max_workers: usize) -> Result<Self> {
        if max_workers == 0 {
            return Err(Error::validation("max_workers must be greater than zero"));
        }
        Ok(Self {
            permits: Arc::new(Semaphore::new(max_workers)),
            max_workers,
        })
    }

    /// Get the concurrency cap
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Run one unit of work per item and wait for all of them
    ///
    /// Blocks the caller until every item has been attempted. An empty
    /// item list is a no-op.
    pub async fn run<T, F, Fut>(&self, items: Vec<T>, work: F)
    where
        T: Send + 'static,
        F: Fn(T) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if items.is_empty() {
            return;
        }

        debug!(
            "Fanning out {} units of work ({} at a time)",
            items.len(),
            self.max_workers
        );

        let mut handles = Vec::with_capacity(items.len());
        for item in items {
            let permits = Arc::clone(&self.permits);
            let unit = work(item);
            handles.push(tokio::spawn(async move {
                // The semaphore is never closed, so acquisition only
                // fails if the executor itself is torn down mid-run.
                if let Ok(_permit) = permits.acquire_owned().await {
                    unit.await;
                }
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Fan-out unit aborted: {}", e);
            }
        }
    }
}
