//! Execution side of a batch.
//!
//! - [`ProcessRunner`]: spawns one command, enforces its timeout, captures output
//! - [`output`]: per-command buffers and the single serializing output sink
//! - [`WorkerPool`]: N workers pulling commands from the shared task queue
//!
//! # Execution Flow
//!
//! 1. A worker takes the next [`Command`](crate::scheduler::Command) off the queue
//! 2. Announces it, then [`ProcessRunner::run`] spawns and waits with a deadline
//! 3. Captured lines are labelled and flushed to the sink in whole blocks
//! 4. The [`CommandResult`](crate::scheduler::CommandResult) goes onto the result queue

pub mod executor;
pub mod output;
pub mod pool;

pub use executor::ProcessRunner;
pub use output::{OutputHandle, OutputSink, TaskOutput};
pub use pool::{PoolStats, WorkerPool};
