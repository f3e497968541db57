//! Bounded parallel execution with retry and latency statistics.
//!
//! Tasks run concurrently up to a ceiling; excess tasks queue in priority
//! order and are admitted as in-flight tasks settle. Failures are retried
//! with exponential backoff and reported per task, never thrown mid-batch.

use crate::config::ExecutorConfig;
use crate::errors::{BatchError, TaskFailure};
use ahash::AHashMap;
use anyhow::{Result, anyhow};
use parking_lot::Mutex;
use schemars::JsonSchema;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;

mod stats;

pub use stats::StatsSnapshot;
use stats::StatsInner;

type TaskFuture<T> = Pin<Box<dyn Future<Output = Result<T>> + Send>>;
type TaskFn<T> = Arc<dyn Fn() -> TaskFuture<T> + Send + Sync>;

/// One unit of work. The factory is re-invoked for every retry attempt, so
/// it must be safe to call more than once.
pub struct ParallelTask<T> {
    pub id: String,
    /// Higher priority is scheduled first; ties keep submission order.
    pub priority: i32,
    run: TaskFn<T>,
}

impl<T> ParallelTask<T> {
    pub fn new<F, Fut>(id: impl Into<String>, run: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            id: id.into(),
            priority: 0,
            run: Arc::new(move || Box::pin(run())),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl<T> fmt::Debug for ParallelTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelTask")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Outcome for one input task. Exactly one of `value`/`error` is populated;
/// `duration` spans the first attempt through the final settle, backoff
/// sleeps included.
#[derive(Debug)]
pub struct ParallelResult<T> {
    pub id: String,
    pub value: Option<T>,
    pub error: Option<anyhow::Error>,
    pub success: bool,
    pub duration: Duration,
    pub retries: u32,
}

impl<T> ParallelResult<T> {
    pub fn duration_ms(&self) -> u64 {
        self.duration.as_millis() as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, JsonSchema)]
pub struct BatchProgress {
    pub total: usize,
    /// Settled tasks, failures included.
    pub completed: usize,
    pub failed: usize,
    /// In-flight count at invocation time.
    pub running: usize,
    pub percent_complete: f64,
}

pub struct BoundedParallelExecutor {
    config: ExecutorConfig,
    stats: Mutex<StatsInner>,
}

impl Default for BoundedParallelExecutor {
    fn default() -> Self {
        Self::new(ExecutorConfig::default())
    }
}

impl BoundedParallelExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            config,
            stats: Mutex::new(StatsInner::default()),
        }
    }

    /// Defaults with the `PARALLEL_CONCURRENCY` environment override.
    pub fn from_env() -> Self {
        Self::new(ExecutorConfig::from_env())
    }

    pub fn concurrency(&self) -> usize {
        self.config.concurrency
    }

    /// Run every task to its individual conclusion. Results arrive in
    /// completion order and cover every input id exactly once.
    pub async fn execute_all<T>(&self, tasks: Vec<ParallelTask<T>>) -> Vec<ParallelResult<T>>
    where
        T: Send + 'static,
    {
        self.execute_all_with_progress(tasks, |_| {}).await
    }

    /// `execute_all` with a callback after every task settles.
    pub async fn execute_all_with_progress<T, F>(
        &self,
        mut tasks: Vec<ParallelTask<T>>,
        mut on_progress: F,
    ) -> Vec<ParallelResult<T>>
    where
        T: Send + 'static,
        F: FnMut(BatchProgress),
    {
        if tasks.is_empty() {
            return Vec::new();
        }

        // Stable sort: equal priorities keep their submission order.
        tasks.sort_by(|a, b| b.priority.cmp(&a.priority));

        let total = tasks.len();
        let mut pending = tasks.into_iter();
        let mut in_flight: JoinSet<ParallelResult<T>> = JoinSet::new();
        let mut spawned_ids: AHashMap<tokio::task::Id, String> = AHashMap::new();
        let mut results = Vec::with_capacity(total);
        let mut completed = 0usize;
        let mut failed = 0usize;

        tracing::debug!(
            total,
            concurrency = self.config.concurrency,
            "starting parallel batch"
        );

        loop {
            while in_flight.len() < self.config.concurrency {
                let Some(task) = pending.next() else { break };
                let task_id = task.id.clone();
                let handle = in_flight.spawn(run_task(task, self.config.clone()));
                spawned_ids.insert(handle.id(), task_id);
            }

            let Some(joined) = in_flight.join_next_with_id().await else {
                break;
            };

            let result = match joined {
                Ok((join_id, result)) => {
                    spawned_ids.remove(&join_id);
                    result
                }
                Err(join_error) => {
                    // A panicked task must still yield a result for its id.
                    let id = spawned_ids.remove(&join_error.id()).unwrap_or_default();
                    tracing::error!(task = id.as_str(), "task panicked");
                    ParallelResult {
                        id,
                        value: None,
                        error: Some(anyhow!("task panicked: {join_error}")),
                        success: false,
                        duration: Duration::ZERO,
                        retries: 0,
                    }
                }
            };

            self.stats
                .lock()
                .record(result.success, result.retries, result.duration_ms());

            completed += 1;
            if !result.success {
                failed += 1;
            }
            on_progress(BatchProgress {
                total,
                completed,
                failed,
                running: in_flight.len(),
                percent_complete: completed as f64 / total as f64 * 100.0,
            });
            results.push(result);
        }

        results
    }

    /// Successes only; failed tasks are silently dropped.
    pub async fn execute_all_successful<T>(&self, tasks: Vec<ParallelTask<T>>) -> Vec<T>
    where
        T: Send + 'static,
    {
        self.execute_all(tasks)
            .await
            .into_iter()
            .filter_map(|result| result.value)
            .collect()
    }

    /// Like `execute_all`, but raises one aggregate error naming every failed
    /// task. The aggregate is raised only after the whole batch has settled,
    /// never mid-flight.
    pub async fn execute_all_or_fail<T>(
        &self,
        tasks: Vec<ParallelTask<T>>,
    ) -> Result<Vec<ParallelResult<T>>>
    where
        T: Send + 'static,
    {
        let results = self.execute_all(tasks).await;
        let failures: Vec<TaskFailure> = results
            .iter()
            .filter(|result| !result.success)
            .map(|result| TaskFailure {
                id: result.id.clone(),
                message: result
                    .error
                    .as_ref()
                    .map(|error| error.to_string())
                    .unwrap_or_else(|| "unknown error".to_string()),
            })
            .collect();

        if failures.is_empty() {
            Ok(results)
        } else {
            Err(BatchError { failures }.into())
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.lock().snapshot()
    }

    /// Zero all counters and drop the duration history. In-flight batches
    /// keep recording afterwards.
    pub fn reset_stats(&self) {
        *self.stats.lock() = StatsInner::default();
    }
}

async fn run_task<T>(task: ParallelTask<T>, config: ExecutorConfig) -> ParallelResult<T> {
    let started = Instant::now();
    let mut retries = 0u32;

    loop {
        match (task.run)().await {
            Ok(value) => {
                return ParallelResult {
                    id: task.id.clone(),
                    value: Some(value),
                    error: None,
                    success: true,
                    duration: started.elapsed(),
                    retries,
                };
            }
            Err(error) => {
                if config.retry_on_error && retries < config.max_retries {
                    retries += 1;
                    let delay = config.retry_delay() * 2u32.saturating_pow(retries - 1);
                    tracing::debug!(
                        task = task.id.as_str(),
                        retry = retries,
                        delay_ms = delay.as_millis() as u64,
                        "task failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                } else {
                    return ParallelResult {
                        id: task.id.clone(),
                        value: None,
                        error: Some(error),
                        success: false,
                        duration: started.elapsed(),
                        retries,
                    };
                }
            }
        }
    }
}
