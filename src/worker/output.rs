//! Interleave-free output for concurrently running commands.
//!
//! Each command collects its output in a [`TaskOutput`] and hands finished
//! blocks to a single [`OutputSink`]. The sink is the only writer of the
//! real stdout/stderr, so two commands can never mix partial lines:
//!
//! ```text
//!   worker 1 ── TaskOutput ──┐
//!   worker 2 ── TaskOutput ──┼──▶ OutputHandle (mpsc) ──▶ sink thread ──▶ stdout / stderr
//!   worker N ── TaskOutput ──┘
//! ```

use std::io::Write;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{PgitError, Result};
use crate::scheduler::Command;

/// Destination stream of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Complete, already-labelled text written to one stream in a single call.
#[derive(Debug)]
pub struct OutputBlock {
    pub stream: Stream,
    pub text: String,
}

/// Cloneable sending side of the sink.
#[derive(Debug, Clone)]
pub struct OutputHandle {
    sender: mpsc::UnboundedSender<OutputBlock>,
}

impl OutputHandle {
    /// Queue a block for the sink. Empty text is skipped.
    pub fn send(&self, stream: Stream, text: String) {
        if text.is_empty() {
            return;
        }
        if self.sender.send(OutputBlock { stream, text }).is_err() {
            tracing::warn!(?stream, "Output sink stopped, dropping output block");
        }
    }
}

/// The single serializing writer.
pub struct OutputSink;

impl OutputSink {
    /// Start the writer on a blocking thread.
    ///
    /// The thread exits once every [`OutputHandle`] has been dropped and the
    /// queue is drained. Its join handle reports the first write error.
    pub fn spawn<O, E>(
        mut stdout: O,
        mut stderr: E,
    ) -> (OutputHandle, JoinHandle<std::io::Result<()>>)
    where
        O: Write + Send + 'static,
        E: Write + Send + 'static,
    {
        let (sender, mut receiver) = mpsc::unbounded_channel::<OutputBlock>();

        let handle = tokio::task::spawn_blocking(move || {
            while let Some(block) = receiver.blocking_recv() {
                let writer: &mut dyn Write = match block.stream {
                    Stream::Stdout => &mut stdout,
                    Stream::Stderr => &mut stderr,
                };
                writer.write_all(block.text.as_bytes())?;
                writer.flush()?;
            }
            Ok(())
        });

        (OutputHandle { sender }, handle)
    }

    /// Sink bound to the process's own stdout and stderr.
    pub fn stdio() -> (OutputHandle, JoinHandle<std::io::Result<()>>) {
        Self::spawn(std::io::stdout(), std::io::stderr())
    }

    /// Wait for the writer started by [`OutputSink::spawn`] to finish.
    ///
    /// Only resolves promptly once every handle has been dropped.
    pub async fn finish(sink: JoinHandle<std::io::Result<()>>) -> Result<()> {
        sink.await
            .map_err(|e| PgitError::Internal(format!("output sink failed: {}", e)))?
            .map_err(PgitError::Output)
    }
}

/// Per-command line buffers, flushed to the sink as whole blocks.
#[derive(Debug)]
pub struct TaskOutput {
    prefix: String,
    stdout: String,
    stderr: String,
}

impl TaskOutput {
    pub fn new(label: &str) -> Self {
        Self {
            prefix: format!("[{}] ", label),
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn for_command(command: &Command) -> Self {
        Self::new(&command.label())
    }

    pub fn push_stdout(&mut self, text: &str) {
        push_labelled(&mut self.stdout, &self.prefix, text);
    }

    pub fn push_stderr(&mut self, text: &str) {
        push_labelled(&mut self.stderr, &self.prefix, text);
    }

    /// Buffered, labelled stdout not yet flushed.
    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty() && self.stderr.is_empty()
    }

    /// Hand both buffers to the sink, stdout first, and clear them.
    pub fn flush(&mut self, output: &OutputHandle) {
        output.send(Stream::Stdout, std::mem::take(&mut self.stdout));
        output.send(Stream::Stderr, std::mem::take(&mut self.stderr));
    }
}

fn push_labelled(buf: &mut String, prefix: &str, text: &str) {
    if text.is_empty() {
        buf.push_str(prefix);
        buf.push('\n');
        return;
    }
    for line in text.lines() {
        buf.push_str(prefix);
        buf.push_str(line);
        buf.push('\n');
    }
}

/// Emit the `--> command` line that marks a command starting.
pub fn announce(output: &OutputHandle, command: &Command) {
    output.send(
        Stream::Stdout,
        format!("[{}] --> {}\n", command.label(), command),
    );
}
