use crate::error::DietError;
use log::{debug, info};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::{Arc, Mutex};

/// Worker pool shared by every optimization run of the process.
///
/// The rayon pool is only built on first use and lives until `shutdown`,
/// after which the next `install` builds a fresh one.
pub struct WorkerPool {
    thread_number: usize,
    pool: Mutex<Option<Arc<ThreadPool>>>,
}

impl WorkerPool {
    /// `thread_number` 0 lets rayon pick one worker per core.
    pub fn new(thread_number: usize) -> WorkerPool {
        WorkerPool {
            thread_number,
            pool: Mutex::new(None),
        }
    }

    fn handle(&self) -> Result<Arc<ThreadPool>, DietError> {
        let mut guard = self.pool.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pool) = guard.as_ref() {
            return Ok(Arc::clone(pool));
        }

        let pool = Arc::new(
            ThreadPoolBuilder::new()
                .num_threads(self.thread_number)
                .thread_name(|n| format!("gdiet-worker-{}", n))
                .build()?,
        );
        info!(
            "Worker pool started with {} thread(s)",
            pool.current_num_threads()
        );
        *guard = Some(Arc::clone(&pool));
        Ok(pool)
    }

    /// Run `op` inside the pool so that rayon parallel iterators use its workers.
    pub fn install<OP, R>(&self, op: OP) -> Result<R, DietError>
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        let pool = self.handle()?;
        Ok(pool.install(op))
    }

    pub fn is_started(&self) -> bool {
        self.pool
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    pub fn current_num_threads(&self) -> Result<usize, DietError> {
        Ok(self.handle()?.current_num_threads())
    }

    /// Release the workers. Runs still holding the pool finish first.
    pub fn shutdown(&self) {
        let mut guard = self.pool.lock().unwrap_or_else(|e| e.into_inner());
        if guard.take().is_some() {
            debug!("Worker pool released");
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "WorkerPool {{ thread_number: {}, started: {} }}",
            self.thread_number,
            self.is_started()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn test_lazy_start_and_shutdown() {
        let pool = WorkerPool::new(2);
        assert!(!pool.is_started());

        let sum: u64 = pool.install(|| (0..1000u64).into_par_iter().sum()).unwrap();
        assert_eq!(sum, 499500);
        assert!(pool.is_started());
        assert_eq!(pool.current_num_threads().unwrap(), 2);

        pool.shutdown();
        assert!(!pool.is_started());

        // usable again after shutdown
        let n = pool.install(|| rayon::current_num_threads()).unwrap();
        assert_eq!(n, 2);
    }

    #[test]
    fn test_pool_reused_across_installs() {
        let pool = WorkerPool::new(3);
        let first = pool.handle().unwrap();
        pool.install(|| ()).unwrap();
        let second = pool.handle().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
