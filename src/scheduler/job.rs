use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::PgitError;

/// Program and arguments shared by every command in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandTemplate {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Bind the template to one working directory.
    pub fn for_dir(&self, working_dir: impl Into<PathBuf>) -> Command {
        Command {
            working_dir: working_dir.into(),
            program: self.program.clone(),
            args: self.args.clone(),
        }
    }
}

/// A program to run in one directory. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub working_dir: PathBuf,
    pub program: String,
    pub args: Vec<String>,
}

impl Command {
    pub fn new(working_dir: impl Into<PathBuf>, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            working_dir: working_dir.into(),
            program: program.into(),
            args,
        }
    }

    /// Short name used to tag this command's output lines.
    pub fn label(&self) -> String {
        label_for(&self.working_dir)
    }
}

fn label_for(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => path.display().to_string(),
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "'{} {}' in '{}'",
            self.program,
            self.args.join(" "),
            self.working_dir.display()
        )
    }
}

/// Outcome of running one [`Command`]. Exactly one is produced per command.
#[derive(Debug)]
pub struct CommandResult {
    pub command: Command,
    pub error: Option<PgitError>,
    pub elapsed: Duration,
}

impl CommandResult {
    pub fn succeeded(command: Command, elapsed: Duration) -> Self {
        Self {
            command,
            error: None,
            elapsed,
        }
    }

    pub fn failed(command: Command, error: PgitError, elapsed: Duration) -> Self {
        Self {
            command,
            error: Some(error),
            elapsed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
