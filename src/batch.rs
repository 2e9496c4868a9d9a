use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::config::RunConfig;
use crate::error::{PgitError, Result};
use crate::scheduler::{collect, dispatch, BatchSummary, Command};
use crate::worker::{OutputHandle, PoolStats, ProcessRunner, WorkerPool};

/// Runs the configured command in every repository of a batch.
pub struct BatchRunner {
    config: RunConfig,
}

impl BatchRunner {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// One command per repository, in repository order.
    pub fn commands_for(&self, repos: &[PathBuf]) -> Vec<Command> {
        repos
            .iter()
            .map(|repo| self.config.template.for_dir(repo))
            .collect()
    }

    pub async fn run(&self, repos: Vec<PathBuf>, output: OutputHandle) -> Result<BatchSummary> {
        let (summary, _) = self.run_with_stats(repos, output).await?;
        Ok(summary)
    }

    /// Run the batch and also report pool counters.
    ///
    /// 1. Spawns the worker pool, before anything is published
    /// 2. Dispatches every command, then closes the task queue
    /// 3. Collects exactly one result per command
    /// 4. Waits for the dispatcher and every worker to stop
    pub async fn run_with_stats(
        &self,
        repos: Vec<PathBuf>,
        output: OutputHandle,
    ) -> Result<(BatchSummary, PoolStats)> {
        self.config.validate()?;

        let commands = self.commands_for(&repos);
        let expected = commands.len();
        tracing::info!(
            tasks = expected,
            concurrency = self.config.concurrency,
            timeout = ?self.config.timeout,
            "Starting batch"
        );

        let (task_tx, task_rx) = mpsc::channel(self.config.concurrency);
        let (result_tx, mut result_rx) = mpsc::channel(self.config.concurrency);

        let pool = WorkerPool::spawn(
            self.config.concurrency,
            ProcessRunner::new(self.config.timeout),
            task_rx,
            result_tx,
            output,
        );
        let dispatcher = dispatch(commands, task_tx);

        let summary = collect(&mut result_rx, expected).await?;

        let published = dispatcher
            .await
            .map_err(|e| PgitError::Internal(format!("dispatcher task failed: {}", e)))?;
        let stats = pool.join().await?;
        tracing::debug!(
            published,
            executed = stats.executed,
            peak_concurrency = stats.peak_concurrency,
            "Batch drained"
        );

        Ok((summary, stats))
    }
}
