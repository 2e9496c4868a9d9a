use std::path::PathBuf;
use std::time::Duration;

use crate::error::{PgitError, Result};
use crate::scheduler::CommandTemplate;

pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_PROGRAM: &str = "git";

/// Entry whose presence marks a directory as a repository root.
pub const REPOSITORY_MARKER: &str = ".git";

/// Settings for one batch run.
///
/// Built once from the command line and handed to the batch runner, which
/// passes the relevant pieces down to the worker pool and process runner.
/// Nothing mutates it after construction.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory whose immediate children are scanned for repositories.
    pub root: PathBuf,
    /// Maximum number of commands running at the same time.
    pub concurrency: usize,
    /// Per-command deadline; the process is killed once it elapses.
    pub timeout: Duration,
    /// Program and arguments run in every repository.
    pub template: CommandTemplate,
    /// Directory names to skip, compared case-insensitively.
    pub exclude: Vec<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            template: CommandTemplate::new(DEFAULT_PROGRAM, Vec::new()),
            exclude: Vec::new(),
        }
    }
}

impl RunConfig {
    pub fn new(root: impl Into<PathBuf>, template: CommandTemplate) -> Self {
        Self {
            root: root.into(),
            template,
            ..Default::default()
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_exclude(mut self, exclude: Vec<String>) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn with_template(mut self, template: CommandTemplate) -> Self {
        self.template = template;
        self
    }

    /// Reject settings the worker pool cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(PgitError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(PgitError::InvalidConfig(
                "timeout must be greater than zero".to_string(),
            ));
        }
        if self.template.program.is_empty() {
            return Err(PgitError::InvalidConfig(
                "program must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_config_default() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.root, PathBuf::from("."));
        assert_eq!(cfg.concurrency, 4);
        assert_eq!(cfg.timeout, Duration::from_secs(1800));
        assert_eq!(cfg.template.program, "git");
        assert!(cfg.template.args.is_empty());
        assert!(cfg.exclude.is_empty());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn run_config_new_keeps_defaults() {
        let cfg = RunConfig::new(
            "/src",
            CommandTemplate::new("git", vec!["status".to_string()]),
        );
        assert_eq!(cfg.root, PathBuf::from("/src"));
        assert_eq!(cfg.template.args, vec!["status".to_string()]);
        assert_eq!(cfg.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(cfg.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn run_config_builders() {
        let cfg = RunConfig::default()
            .with_concurrency(8)
            .with_timeout(Duration::from_secs(5))
            .with_exclude(vec!["vendor".to_string()])
            .with_template(CommandTemplate::new("hg", vec!["pull".to_string()]));
        assert_eq!(cfg.concurrency, 8);
        assert_eq!(cfg.timeout, Duration::from_secs(5));
        assert_eq!(cfg.exclude, vec!["vendor".to_string()]);
        assert_eq!(cfg.template.program, "hg");
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let err = RunConfig::default().with_concurrency(0).validate().unwrap_err();
        assert!(matches!(err, PgitError::InvalidConfig(_)));
        assert!(err.to_string().contains("concurrency"));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = RunConfig::default()
            .with_timeout(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn empty_program_is_rejected() {
        let cfg = RunConfig::default().with_template(CommandTemplate::new("", Vec::new()));
        assert!(cfg.validate().is_err());
    }
}
