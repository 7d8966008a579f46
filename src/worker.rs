//! Bounded pool for blocking work
//!
//! All filesystem, database and media work runs through here so it never
//! blocks the caller's async context. The pool is a semaphore over
//! `spawn_blocking`: at most `size` jobs run at once, the rest wait for a
//! permit.

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::error::LibraryError;

#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(size.max(1))),
        }
    }

    /// Run a blocking job off the async context and await its result
    pub async fn run<T, F>(&self, job: F) -> Result<T, LibraryError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, LibraryError> + Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| LibraryError::Other("worker pool closed".to_string()))?;

        tokio::task::spawn_blocking(move || {
            let result = job();
            drop(permit);
            result
        })
        .await
        .map_err(|e| LibraryError::Other(format!("worker task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn runs_jobs_and_returns_results() {
        let pool = WorkerPool::new(2);
        let result = pool.run(|| Ok(21 * 2)).await.unwrap();
        assert_eq!(result, 42);
    }

    #[tokio::test]
    async fn propagates_job_errors() {
        let pool = WorkerPool::new(2);
        let result: Result<(), _> = pool
            .run(|| Err(LibraryError::Other("boom".to_string())))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn bounds_concurrent_jobs() {
        let pool = WorkerPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let pool = pool.clone();
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                pool.run(move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(std::time::Duration::from_millis(20));
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
                .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
