// THEORY:
// `ParallelPipeline` is the service-style runner. Every slide is an independent unit
// of work: a dispatcher hands tasks round-robin to a fixed set of workers, each worker
// runs the CPU-bound analysis on tokio's blocking pool, and the answer comes back on
// a oneshot channel. Dropping the future that waits on a slide cancels it: a worker
// that finds the reply channel closed skips the task.
//
// The only ordering that matters is the report's. Results are awaited through a
// `FuturesOrdered`, so they are observed and appended in submission order no matter
// which worker finishes first.

use crate::error::{ConfigError, InputError};
use crate::pipeline::{
    AnalysisPipeline, BatchInput, BatchOutcome, ItemFailure, ItemOutcome, PipelineConfig,
};
use futures::stream::{FuturesOrdered, StreamExt};
use log::{debug, info};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

struct AnalysisTask {
    input: BatchInput,
    result_sender: oneshot::Sender<ItemOutcome>,
}

fn task_failure(filename: String, reason: impl Into<String>) -> ItemOutcome {
    ItemOutcome::Failed(ItemFailure {
        filename,
        error: InputError::Task(reason.into()),
    })
}

/// Fixed-size pool of analysis workers. Must be created inside a tokio runtime.
pub struct WorkerPool {
    task_sender: mpsc::UnboundedSender<AnalysisTask>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(pipeline: Arc<AnalysisPipeline>, worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<AnalysisTask>();
        let mut workers = Vec::with_capacity(worker_count + 1);

        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..worker_count)
            .map(|_| mpsc::unbounded_channel::<AnalysisTask>())
            .unzip();

        // Dispatcher
        workers.push(tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                if worker_senders[worker_idx].send(task).is_err() {
                    break;
                }
                worker_idx = (worker_idx + 1) % worker_count;
            }
        }));

        for (worker_id, mut worker_receiver) in worker_receivers.into_iter().enumerate() {
            let pipeline = Arc::clone(&pipeline);
            workers.push(tokio::spawn(async move {
                while let Some(task) = worker_receiver.recv().await {
                    let AnalysisTask {
                        input,
                        result_sender,
                    } = task;
                    if result_sender.is_closed() {
                        debug!("worker {worker_id}: {} was cancelled", input.filename);
                        continue;
                    }

                    let filename = input.filename.clone();
                    let pipeline = Arc::clone(&pipeline);
                    let outcome =
                        tokio::task::spawn_blocking(move || pipeline.process_input(&input))
                            .await
                            .unwrap_or_else(|err| task_failure(filename, err.to_string()));
                    let _ = result_sender.send(outcome);
                }
            }));
        }

        Self {
            task_sender,
            workers,
        }
    }

    /// Queues one slide and waits for its outcome.
    pub async fn process(&self, input: BatchInput) -> ItemOutcome {
        let filename = input.filename.clone();
        let (result_sender, result_receiver) = oneshot::channel();
        let task = AnalysisTask {
            input,
            result_sender,
        };

        if self.task_sender.send(task).is_err() {
            return task_failure(filename, "worker pool is shut down");
        }
        result_receiver
            .await
            .unwrap_or_else(|_| task_failure(filename, "worker dropped the task"))
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for worker in &self.workers {
            worker.abort();
        }
    }
}

/// Concurrent batch runner with the same semantics as `AnalysisPipeline::run_batch`.
pub struct ParallelPipeline {
    pipeline: Arc<AnalysisPipeline>,
    worker_pool: WorkerPool,
    worker_count: usize,
}

impl ParallelPipeline {
    /// One worker per logical CPU.
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        Self::with_workers(config, num_cpus::get())
    }

    pub fn with_workers(config: PipelineConfig, worker_count: usize) -> Result<Self, ConfigError> {
        let pipeline = Arc::new(AnalysisPipeline::new(config)?);
        let worker_count = worker_count.max(1);
        let worker_pool = WorkerPool::new(Arc::clone(&pipeline), worker_count);
        Ok(Self {
            pipeline,
            worker_pool,
            worker_count,
        })
    }

    pub fn pipeline(&self) -> &AnalysisPipeline {
        &self.pipeline
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub async fn process_input(&self, input: BatchInput) -> ItemOutcome {
        self.worker_pool.process(input).await
    }

    /// Analyses every input concurrently. `observe` and the report see items in
    /// input order.
    pub async fn run_batch<F>(&self, inputs: Vec<BatchInput>, mut observe: F) -> BatchOutcome
    where
        F: FnMut(&ItemOutcome),
    {
        info!(
            "analysing {} inputs on {} workers",
            inputs.len(),
            self.worker_count
        );
        let mut pending: FuturesOrdered<_> = inputs
            .into_iter()
            .map(|input| self.worker_pool.process(input))
            .collect();

        let mut outcome = BatchOutcome::new(self.pipeline.new_report());
        while let Some(item) = pending.next().await {
            observe(&item);
            outcome.absorb(item);
        }
        info!(
            "batch complete: {} analysed, {} skipped",
            outcome.report.len(),
            outcome.failures.len()
        );
        outcome
    }
}
