use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::{RunConfig, DEFAULT_CONCURRENCY, DEFAULT_PROGRAM, DEFAULT_TIMEOUT};
use crate::discovery::parse_exclude_list;
use crate::scheduler::CommandTemplate;

/// Long flags that may also be spelled with a single dash (`-exclude=foo`).
const SINGLE_DASH_LONG_FLAGS: &[&str] = &["exclude", "timeout", "program", "root", "format"];

/// Flags whose value may follow as a separate argument.
const VALUE_FLAGS: &[&str] = &[
    "-n",
    "-C",
    "--exclude",
    "--timeout",
    "--program",
    "--root",
    "--format",
];

#[derive(Parser, Debug)]
#[command(name = "pgit")]
#[command(version)]
#[command(about = "Run a git command in every repository under a directory, concurrently")]
pub struct Args {
    /// Number of commands to run at a time
    #[arg(short = 'n', default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Directories to exclude from the command (comma-separated, case-insensitive)
    #[arg(long, default_value = "")]
    pub exclude: String,

    /// Seconds a command may run before it is killed
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub timeout: u64,

    /// Program to run in each repository
    #[arg(long, default_value = DEFAULT_PROGRAM)]
    pub program: String,

    /// Directory to scan for repositories
    #[arg(short = 'C', long, default_value = ".")]
    pub root: PathBuf,

    /// Format of the final summary
    #[arg(long, default_value = "table")]
    pub format: OutputFormat,

    /// Arguments passed verbatim to the program
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

impl Args {
    /// Parse arguments, accepting single-dash long flags.
    pub fn parse_normalized<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self::parse_from(normalize_args(args))
    }

    pub fn to_config(&self) -> RunConfig {
        RunConfig::new(
            self.root.clone(),
            CommandTemplate::new(self.program.clone(), self.args.clone()),
        )
        .with_concurrency(self.concurrency)
        .with_timeout(Duration::from_secs(self.timeout))
        .with_exclude(parse_exclude_list(&self.exclude))
    }
}

/// Rewrite `-exclude` style flags to `--exclude` so clap accepts them.
///
/// Rewriting stops at `--` or at the first positional argument; everything
/// after that belongs to the program being run and is passed through as is.
pub fn normalize_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut normalized: Vec<String> = args.next().into_iter().collect();
    let mut expect_value = false;
    let mut passthrough = false;

    for arg in args {
        if passthrough || expect_value {
            expect_value = false;
            normalized.push(arg);
            continue;
        }
        if arg == "--" || !arg.starts_with('-') {
            passthrough = true;
            normalized.push(arg);
            continue;
        }

        let arg = single_dash_long(&arg).unwrap_or(arg);
        expect_value = VALUE_FLAGS.contains(&arg.as_str());
        normalized.push(arg);
    }

    normalized
}

fn single_dash_long(arg: &str) -> Option<String> {
    let body = arg.strip_prefix('-')?;
    if body.starts_with('-') {
        return None;
    }
    let name = body.split('=').next().unwrap_or(body);
    SINGLE_DASH_LONG_FLAGS
        .contains(&name)
        .then(|| format!("-{}", arg))
}
