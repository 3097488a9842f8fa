//! Parallel task execution
//!
//! Every fan-out in the crate (nested package resolution, installation
//! batches, driver operations over several projects) goes through [`run`].
//! A batch runs under a child of the caller's [`CancellationToken`]; the first
//! failing task cancels it so siblings can stop at their next check, and that
//! first error is what the batch returns.
//!
//! Concurrent batches get one scoped thread per task. Bounded and worker-pool
//! batches run on a `rayon` pool sized to the concurrency limit.

mod mode;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};
use std::thread;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Result, RocketError, task as task_err};

pub use mode::ExecutionMode;

/// Concurrency used when nothing else is configured
pub const DEFAULT_MAX_CONCURRENCY: usize = 5;

/// A unit of work; it should return early once the token is cancelled
pub type Task<'a, T> = Box<dyn FnOnce(&CancellationToken) -> Result<T> + Send + 'a>;

/// Scheduling options for one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub mode: ExecutionMode,
    pub max_concurrency: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Concurrent,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl RunOptions {
    pub fn new(mode: ExecutionMode, max_concurrency: usize) -> Self {
        Self {
            mode,
            max_concurrency,
        }
    }

    pub fn sequential() -> Self {
        Self::new(ExecutionMode::Sequential, 1)
    }

    pub fn validate(&self) -> Result<()> {
        if self.mode.is_limited() && self.max_concurrency == 0 {
            return Err(task_err::invalid_concurrency(
                self.max_concurrency,
                format!("{} mode needs at least one slot", self.mode),
            ));
        }
        Ok(())
    }
}

/// Box a closure into a [`Task`]
pub fn task<'a, T, F>(f: F) -> Task<'a, T>
where
    F: FnOnce(&CancellationToken) -> Result<T> + Send + 'a,
{
    Box::new(f)
}

/// Run `tasks` and return their results in task order
///
/// Fails immediately on an empty batch, an invalid concurrency setting or an
/// already cancelled parent.
pub fn run<'a, T: Send + 'a>(
    parent: &CancellationToken,
    tasks: Vec<Task<'a, T>>,
    options: RunOptions,
) -> Result<Vec<T>> {
    if tasks.is_empty() {
        return Err(RocketError::NoTasks);
    }
    options.validate()?;
    if parent.is_cancelled() {
        return Err(RocketError::Cancelled);
    }

    debug!(mode = %options.mode, tasks = tasks.len(), max = options.max_concurrency, "running batch");

    let batch = Batch::new(parent.child_token(), tasks.len());
    match options.mode {
        ExecutionMode::Sequential => batch.sequential(tasks),
        ExecutionMode::Concurrent => batch.concurrent(tasks),
        ExecutionMode::Bounded => {
            batch.bounded(&thread_pool(options.max_concurrency)?, tasks);
        }
        ExecutionMode::WorkerPool => {
            let workers = options.max_concurrency.min(tasks.len());
            batch.worker_pool(&thread_pool(workers)?, tasks);
        }
    }
    batch.finish(parent)
}

struct Batch<T> {
    token: CancellationToken,
    results: Mutex<Vec<Option<T>>>,
    first_error: Mutex<Option<RocketError>>,
}

impl<T: Send> Batch<T> {
    fn new(token: CancellationToken, len: usize) -> Self {
        Self {
            token,
            results: Mutex::new((0..len).map(|_| None).collect()),
            first_error: Mutex::new(None),
        }
    }

    fn execute(&self, index: usize, task: Task<'_, T>) {
        if self.token.is_cancelled() {
            return;
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| task(&self.token)))
            .unwrap_or_else(|payload| Err(task_err::panicked(panic_message(payload.as_ref()))));

        match outcome {
            Ok(value) => {
                let mut results = self.results.lock().unwrap_or_else(PoisonError::into_inner);
                results[index] = Some(value);
            }
            Err(err) => self.fail(err),
        }
    }

    fn fail(&self, err: RocketError) {
        {
            let mut slot = self
                .first_error
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if slot.is_none() {
                debug!(error = %err, "task failed, cancelling batch");
                *slot = Some(err);
            }
        }
        self.token.cancel();
    }

    fn sequential(&self, tasks: Vec<Task<'_, T>>) {
        for (index, task) in tasks.into_iter().enumerate() {
            if self.token.is_cancelled() {
                break;
            }
            self.execute(index, task);
        }
    }

    fn concurrent(&self, tasks: Vec<Task<'_, T>>) {
        thread::scope(|scope| {
            for (index, task) in tasks.into_iter().enumerate() {
                scope.spawn(move || self.execute(index, task));
            }
        });
    }

    /// One job per task, admitted in order as threads of `pool` free up
    fn bounded(&self, pool: &ThreadPool, tasks: Vec<Task<'_, T>>) {
        pool.scope_fifo(|scope| {
            for (index, task) in tasks.into_iter().enumerate() {
                scope.spawn_fifo(move |_| self.execute(index, task));
            }
        });
    }

    /// The threads of `pool` drain the task list between them
    fn worker_pool(&self, pool: &ThreadPool, tasks: Vec<Task<'_, T>>) {
        pool.install(|| {
            tasks
                .into_par_iter()
                .with_max_len(1)
                .enumerate()
                .for_each(|(index, task)| self.execute(index, task));
        });
    }

    fn finish(self, parent: &CancellationToken) -> Result<Vec<T>> {
        if let Some(err) = self
            .first_error
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
        {
            return Err(err);
        }
        if parent.is_cancelled() {
            return Err(RocketError::Cancelled);
        }

        self.results
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or(RocketError::Cancelled)
    }
}

/// A dedicated pool of `threads` workers for one batch
fn thread_pool(threads: usize) -> Result<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("rocketblend-task-{i}"))
        .build()
        .map_err(|e| task_err::pool_failed(threads, e.to_string()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}
