use serde::Serialize;
use tokio::sync::mpsc;

use crate::error::{PgitError, Result};
use crate::scheduler::job::CommandResult;

/// Largest exit status a POSIX host preserves.
const MAX_EXIT_CODE: usize = 255;

/// Aggregated outcome of a batch.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub total: usize,
    pub failures: Vec<CommandResult>,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.total - self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Process exit status: the number of failed commands, capped at 255 so
    /// a large batch can never wrap around to a success status.
    pub fn exit_code(&self) -> i32 {
        self.failures.len().min(MAX_EXIT_CODE) as i32
    }

    pub fn report(&self) -> BatchReport {
        BatchReport {
            total: self.total,
            failed: self.failures.len(),
            failures: self
                .failures
                .iter()
                .map(|result| FailureReport {
                    working_dir: result.command.working_dir.display().to_string(),
                    program: result.command.program.clone(),
                    args: result.command.args.clone(),
                    error: result
                        .error
                        .as_ref()
                        .map(|e| e.to_string())
                        .unwrap_or_default(),
                })
                .collect(),
        }
    }
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.failures.is_empty() {
            return Ok(());
        }
        writeln!(f, "error: {} command(s) failed", self.failures.len())?;
        for result in &self.failures {
            match &result.error {
                Some(error) => writeln!(f, "command failed: {}: {}", result.command, error)?,
                None => writeln!(f, "command failed: {}", result.command)?,
            }
        }
        Ok(())
    }
}

/// Machine-readable form of a [`BatchSummary`].
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub failed: usize,
    pub failures: Vec<FailureReport>,
}

#[derive(Debug, Serialize)]
pub struct FailureReport {
    pub working_dir: String,
    pub program: String,
    pub args: Vec<String>,
    pub error: String,
}

/// Read exactly `expected` results off the result queue.
///
/// Never stops early on a failure. If the queue closes before every result
/// has arrived, a worker died and the batch is reported as incomplete.
pub async fn collect(
    results: &mut mpsc::Receiver<CommandResult>,
    expected: usize,
) -> Result<BatchSummary> {
    let mut summary = BatchSummary {
        total: expected,
        failures: Vec::new(),
    };

    for received in 0..expected {
        let Some(result) = results.recv().await else {
            return Err(PgitError::ResultsMissing { expected, received });
        };

        if result.is_success() {
            tracing::debug!(command = %result.command, elapsed = ?result.elapsed, "Command succeeded");
        } else {
            tracing::debug!(command = %result.command, elapsed = ?result.elapsed, "Command failed");
            summary.failures.push(result);
        }
    }

    tracing::info!(
        total = summary.total,
        failed = summary.failures.len(),
        "Batch finished"
    );
    Ok(summary)
}
