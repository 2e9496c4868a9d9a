use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::error::{PgitError, Result};
use crate::scheduler::{Command, CommandResult};
use crate::worker::executor::ProcessRunner;
use crate::worker::output::{announce, OutputHandle, TaskOutput};

/// Counters reported once every worker has stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Commands executed across all workers.
    pub executed: usize,
    /// Most commands that were ever running at the same time.
    pub peak_concurrency: usize,
}

#[derive(Debug, Default)]
struct Gauge {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauge {
    fn enter(&self) -> GaugeGuard<'_> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        GaugeGuard(self)
    }
}

struct GaugeGuard<'a>(&'a Gauge);

impl Drop for GaugeGuard<'_> {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Fixed set of workers sharing one task queue.
///
/// Any idle worker takes the next command; no worker keeps state between
/// commands. A failed command only affects its own result, so the pool
/// always drains the whole queue. Workers stop once the queue is closed and
/// empty.
pub struct WorkerPool {
    handles: Vec<JoinHandle<usize>>,
    gauge: Arc<Gauge>,
}

impl WorkerPool {
    pub fn spawn(
        concurrency: usize,
        runner: ProcessRunner,
        tasks: mpsc::Receiver<Command>,
        results: mpsc::Sender<CommandResult>,
        output: OutputHandle,
    ) -> Self {
        let tasks = Arc::new(Mutex::new(tasks));
        let gauge = Arc::new(Gauge::default());

        let handles = (1..=concurrency)
            .map(|worker_id| {
                let runner = runner.clone();
                let tasks = tasks.clone();
                let results = results.clone();
                let output = output.clone();
                let gauge = gauge.clone();
                tokio::spawn(async move {
                    Self::worker_loop(worker_id, runner, tasks, results, output, gauge).await
                })
            })
            .collect();

        tracing::debug!(concurrency, "Worker pool started");
        Self { handles, gauge }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every worker to stop.
    pub async fn join(self) -> Result<PoolStats> {
        let mut executed = 0;
        for handle in self.handles {
            executed += handle
                .await
                .map_err(|e| PgitError::Internal(format!("worker task failed: {}", e)))?;
        }

        Ok(PoolStats {
            executed,
            peak_concurrency: self.gauge.peak.load(Ordering::SeqCst),
        })
    }

    async fn worker_loop(
        worker_id: usize,
        runner: ProcessRunner,
        tasks: Arc<Mutex<mpsc::Receiver<Command>>>,
        results: mpsc::Sender<CommandResult>,
        output: OutputHandle,
        gauge: Arc<Gauge>,
    ) -> usize {
        tracing::debug!(worker_id, "Worker started");
        let mut executed = 0;

        loop {
            // The lock is only held while waiting for the next command.
            let next = tasks.lock().await.recv().await;
            let Some(command) = next else {
                break;
            };

            let result = {
                let _running = gauge.enter();
                run_task(&runner, command, &output).await
            };
            executed += 1;

            if results.send(result).await.is_err() {
                tracing::warn!(worker_id, "Result queue closed, stopping worker");
                break;
            }
        }

        tracing::debug!(worker_id, executed, "Worker stopped");
        executed
    }
}

/// Run one command and flush its output as labelled blocks.
async fn run_task(runner: &ProcessRunner, command: Command, output: &OutputHandle) -> CommandResult {
    announce(output, &command);

    let mut task_output = TaskOutput::for_command(&command);
    let result = runner.run(&command, &mut task_output).await;
    if let Some(error) = &result.error {
        task_output.push_stderr(&format!("error: {}", error));
    }
    task_output.flush(output);

    result
}
