use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PgitError {
    #[error("failed to start {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("exited with non-zero exit code ({status})")]
    NonZeroExit { status: ExitStatus },

    #[error("process timed out after {timeout:?}: {command}")]
    TimedOut { command: String, timeout: Duration },

    #[error("failed to wait for process: {0}")]
    Wait(std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to scan {}: {source}", path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),

    #[error("expected {expected} results but the result queue closed after {received}")]
    ResultsMissing { expected: usize, received: usize },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PgitError {
    /// True when the task was killed for running past its deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, PgitError::TimedOut { .. })
    }
}

pub type Result<T> = std::result::Result<T, PgitError>;
