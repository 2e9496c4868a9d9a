use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command as Process};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::PgitError;
use crate::scheduler::{Command, CommandResult};
use crate::worker::output::TaskOutput;

/// How long to keep reading the pipes after the process itself has exited.
/// Whatever still holds them open afterwards is killed with the process group.
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// How the wait on a started process resolved.
#[derive(Debug)]
enum Outcome {
    Exited(ExitStatus),
    TimedOut,
    WaitFailed(std::io::Error),
}

/// Runs one external command with a deadline.
///
/// The process is spawned in the command's working directory with both
/// output streams captured line by line into the task's [`TaskOutput`].
/// Waiting races a timer: if the timer wins the process group is killed,
/// the process is reaped, and the command is reported as timed out
/// regardless of its exit status.
///
/// On unix every command leads its own process group, so children it starts
/// (a shell's pipeline, git's helpers) are killed along with it.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub async fn run(&self, command: &Command, output: &mut TaskOutput) -> CommandResult {
        let started = Instant::now();
        tracing::info!(command = %command, timeout = ?self.timeout, "Executing command");

        let mut process = Process::new(&command.program);
        process
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if !command.working_dir.as_os_str().is_empty() {
            process.current_dir(&command.working_dir);
        }
        #[cfg(unix)]
        process.process_group(0);

        let mut child = match process.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::error!(command = %command, error = %e, "Command failed to start");
                return CommandResult::failed(
                    command.clone(),
                    PgitError::Spawn {
                        command: command.to_string(),
                        source: e,
                    },
                    started.elapsed(),
                );
            }
        };

        // Only valid until the child is reaped.
        let group = child.id();

        let (stdout_tx, mut stdout_lines) = mpsc::unbounded_channel();
        let (stderr_tx, mut stderr_lines) = mpsc::unbounded_channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(pipe) = child.stdout.take() {
            readers.push(tokio::spawn(read_lines(pipe, stdout_tx)));
        }
        if let Some(pipe) = child.stderr.take() {
            readers.push(tokio::spawn(read_lines(pipe, stderr_tx)));
        }

        let outcome = tokio::select! {
            status = child.wait() => match status {
                Ok(status) => Outcome::Exited(status),
                Err(e) => Outcome::WaitFailed(e),
            },
            _ = tokio::time::sleep(self.timeout) => {
                tracing::warn!(command = %command, timeout = ?self.timeout, "Command timed out, killing process group");
                kill(command, &mut child);
                // Kill is asynchronous; reap the child before reporting. Its
                // exit status is irrelevant once the deadline has passed.
                let _ = child.wait().await;
                Outcome::TimedOut
            }
        };

        if !drain(command, &mut readers).await {
            tracing::warn!(
                command = %command,
                grace = ?OUTPUT_DRAIN_GRACE,
                "Output pipe still open after exit, killing remaining processes"
            );
            if let Some(pid) = group {
                if let Err(e) = kill_process_group(pid) {
                    tracing::debug!(command = %command, error = %e, "Process group already gone");
                }
            }
        }

        // Readers are finished or aborted; everything they sent is buffered.
        while let Ok(line) = stdout_lines.try_recv() {
            output.push_stdout(&line);
        }
        while let Ok(line) = stderr_lines.try_recv() {
            output.push_stderr(&line);
        }

        self.process_outcome(command, outcome, started.elapsed())
    }

    fn process_outcome(&self, command: &Command, outcome: Outcome, elapsed: Duration) -> CommandResult {
        match outcome {
            Outcome::Exited(status) if status.success() => {
                tracing::info!(command = %command, elapsed = ?elapsed, "Command completed");
                CommandResult::succeeded(command.clone(), elapsed)
            }
            Outcome::Exited(status) => {
                tracing::info!(
                    command = %command,
                    exit_code = ?status.code(),
                    elapsed = ?elapsed,
                    "Command exited with non-zero status"
                );
                CommandResult::failed(command.clone(), PgitError::NonZeroExit { status }, elapsed)
            }
            Outcome::TimedOut => CommandResult::failed(
                command.clone(),
                PgitError::TimedOut {
                    command: command.to_string(),
                    timeout: self.timeout,
                },
                elapsed,
            ),
            Outcome::WaitFailed(e) => {
                tracing::error!(command = %command, error = %e, "Waiting on command failed");
                CommandResult::failed(command.clone(), PgitError::Wait(e), elapsed)
            }
        }
    }
}

/// Kill the command's whole process group, falling back to the process
/// itself when there is no group to signal.
fn kill(command: &Command, child: &mut Child) {
    if let Some(pid) = child.id() {
        match kill_process_group(pid) {
            Ok(()) => return,
            Err(e) => tracing::debug!(command = %command, error = %e, "Failed to kill process group"),
        }
    }
    if let Err(e) = child.start_kill() {
        tracing::warn!(command = %command, error = %e, "Failed to kill timed out process");
    }
}

#[cfg(unix)]
fn kill_process_group(pid: u32) -> std::io::Result<()> {
    let group = libc::pid_t::try_from(pid)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    // SAFETY: killpg takes plain integers and has no memory effects.
    if unsafe { libc::killpg(group, libc::SIGKILL) } == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "process groups are only available on unix",
    ))
}

/// Read a pipe to EOF, sending each lossily-decoded line as soon as it is
/// complete.
async fn read_lines<R>(pipe: R, lines: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
                let line = line.strip_suffix(b"\r").unwrap_or(line);
                if lines.send(String::from_utf8_lossy(line).into_owned()).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read process output");
                break;
            }
        }
    }
}

/// Wait for the readers to reach EOF. Returns `false` if the grace period
/// ran out first; the readers are aborted in that case.
async fn drain(command: &Command, readers: &mut [JoinHandle<()>]) -> bool {
    let finished = tokio::time::timeout(OUTPUT_DRAIN_GRACE, async {
        for reader in readers.iter_mut() {
            if let Err(e) = reader.await {
                tracing::warn!(command = %command, error = %e, "Output reader task failed");
            }
        }
    })
    .await;

    if finished.is_err() {
        for reader in readers.iter() {
            reader.abort();
        }
        return false;
    }
    true
}
