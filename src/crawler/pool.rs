//! Bounded-concurrency, order-preserving worker pool
//!
//! This module handles:
//! - Running a fallible async function over every input with at most N executors
//! - Writing each output into the slot of its input, whatever the completion order
//! - Non-blocking progress reporting
//! - Fail-fast cancellation with aggregation of every observed failure

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Progress callback receiving `(dispatched, total)`
pub type ProgressFn = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// An input tagged with its position
#[derive(Debug)]
struct Task<I> {
    index: usize,
    input: I,
}

/// An output tagged with the position of its input
#[derive(Debug)]
struct TaskOutput<O> {
    index: usize,
    output: O,
}

/// A single unit of work that failed
#[derive(Debug)]
pub struct WorkerFailure<E> {
    /// 1-based executor number
    pub worker: usize,
    /// Position of the failed input
    pub index: usize,
    pub error: E,
}

impl<E: fmt::Display> fmt::Display for WorkerFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "worker {} error on item {}: {}",
            self.worker, self.index, self.error
        )
    }
}

/// Errors returned by [`WorkerPool::map`]
#[derive(Debug)]
pub enum PoolError<E> {
    /// The pool was asked to run with zero executors
    InvalidConcurrency(usize),

    /// One or more units failed; sorted by input index
    Failed {
        pool: String,
        failures: Vec<WorkerFailure<E>>,
    },

    /// An executor was cancelled by the runtime before finishing
    Aborted { pool: String },
}

impl<E> PoolError<E> {
    /// Failures observed before cancellation took effect
    pub fn failures(&self) -> &[WorkerFailure<E>] {
        match self {
            PoolError::Failed { failures, .. } => failures,
            _ => &[],
        }
    }
}

impl<E: fmt::Display> fmt::Display for PoolError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::InvalidConcurrency(n) => {
                write!(f, "worker pool needs at least one worker, got {}", n)
            }
            PoolError::Failed { pool, failures } => {
                write!(f, "can't {}: ", pool)?;
                for (i, failure) in failures.iter().enumerate() {
                    if i > 0 {
                        f.write_str("\n")?;
                    }
                    write!(f, "{}", failure)?;
                }
                Ok(())
            }
            PoolError::Aborted { pool } => write!(f, "{} worker was aborted", pool),
        }
    }
}

impl<E> std::error::Error for PoolError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.failures()
            .first()
            .map(|failure| &failure.error as &(dyn std::error::Error + 'static))
    }
}

/// Generic bounded-concurrency mapper
///
/// Executors pull index-tagged tasks from a shared queue. Outputs land in a
/// preallocated arena at their input's index, so output order always matches
/// input order. The first failure raises a shared cancellation flag: executors
/// finish the unit they are on but take no new ones.
///
/// # Example
///
/// ```no_run
/// use cianparser::crawler::WorkerPool;
///
/// # async fn example() {
/// let pool = WorkerPool::new(|n: u64| async move { Ok::<_, std::io::Error>(n * 2) }, 4);
/// let doubled = pool.map(vec![1, 2, 3]).await.unwrap();
/// assert_eq!(doubled, vec![2, 4, 6]);
/// # }
/// ```
pub struct WorkerPool<F> {
    worker: Arc<F>,
    max_workers: usize,
    name: String,
    on_progress: Option<ProgressFn>,
}

impl<F> WorkerPool<F> {
    /// Creates a pool running `worker` on at most `max_workers` executors
    pub fn new(worker: F, max_workers: usize) -> Self {
        Self {
            worker: Arc::new(worker),
            max_workers,
            name: "process items".to_string(),
            on_progress: None,
        }
    }

    /// Sets the label used in logs and error messages
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a progress callback, invoked after each dispatch
    pub fn on_progress(mut self, f: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(f));
        self
    }

    /// Applies the worker to every input
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<O>)` - One output per input, in input order
    /// * `Err(PoolError)` - Zero concurrency, or every failure observed before
    ///   cancellation completed. No partial output is returned.
    pub async fn map<I, O, E, Fut>(&self, inputs: Vec<I>) -> Result<Vec<O>, PoolError<E>>
    where
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, E>> + Send + 'static,
        I: Send + 'static,
        O: Send + 'static,
        E: Send + 'static,
    {
        if self.max_workers == 0 {
            return Err(PoolError::InvalidConcurrency(self.max_workers));
        }

        let total = inputs.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let queue: VecDeque<Task<I>> = inputs
            .into_iter()
            .enumerate()
            .map(|(index, input)| Task { index, input })
            .collect();
        let queue = Arc::new(Mutex::new(queue));
        let cancelled = Arc::new(AtomicBool::new(false));
        let dispatched = Arc::new(AtomicUsize::new(0));

        let (progress_tx, reporter) = match &self.on_progress {
            Some(callback) => {
                let (tx, mut rx) = mpsc::unbounded_channel::<(usize, usize)>();
                let callback = Arc::clone(callback);
                let reporter = tokio::spawn(async move {
                    while let Some((current, total)) = rx.recv().await {
                        callback(current, total);
                    }
                });
                (Some(tx), Some(reporter))
            }
            None => (None, None),
        };

        let workers = self.max_workers.min(total);
        tracing::debug!(
            "Starting {} workers to {} ({} items)",
            workers,
            self.name,
            total
        );

        let mut executors = JoinSet::new();
        for id in 1..=workers {
            let worker = Arc::clone(&self.worker);
            let queue = Arc::clone(&queue);
            let cancelled = Arc::clone(&cancelled);
            let dispatched = Arc::clone(&dispatched);
            let progress_tx = progress_tx.clone();

            executors.spawn(async move {
                let mut outputs = Vec::new();
                loop {
                    if cancelled.load(Ordering::Acquire) {
                        break;
                    }

                    let next = queue
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .pop_front();
                    let Some(task) = next else {
                        break;
                    };

                    let current = dispatched.fetch_add(1, Ordering::AcqRel) + 1;
                    if let Some(tx) = &progress_tx {
                        let _ = tx.send((current, total));
                    }

                    match worker(task.input).await {
                        Ok(output) => outputs.push(TaskOutput {
                            index: task.index,
                            output,
                        }),
                        Err(error) => {
                            cancelled.store(true, Ordering::Release);
                            return Err(WorkerFailure {
                                worker: id,
                                index: task.index,
                                error,
                            });
                        }
                    }
                }
                Ok(outputs)
            });
        }
        drop(progress_tx);

        let mut arena: Vec<Option<O>> = std::iter::repeat_with(|| None).take(total).collect();
        let mut failures = Vec::new();
        let mut aborted = false;

        while let Some(joined) = executors.join_next().await {
            match joined {
                Ok(Ok(outputs)) => {
                    for TaskOutput { index, output } in outputs {
                        arena[index] = Some(output);
                    }
                }
                Ok(Err(failure)) => failures.push(failure),
                Err(join_error) => match join_error.try_into_panic() {
                    Ok(payload) => std::panic::resume_unwind(payload),
                    Err(_) => aborted = true,
                },
            }
        }

        if let Some(reporter) = reporter {
            let _ = reporter.await;
        }

        if !failures.is_empty() {
            failures.sort_by_key(|f: &WorkerFailure<E>| f.index);
            tracing::debug!("{} failed with {} errors", self.name, failures.len());
            return Err(PoolError::Failed {
                pool: self.name.clone(),
                failures,
            });
        }

        let outputs: Option<Vec<O>> = arena.into_iter().collect();
        match outputs {
            Some(outputs) if !aborted => Ok(outputs),
            _ => Err(PoolError::Aborted {
                pool: self.name.clone(),
            }),
        }
    }
}
