use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::scheduler::job::Command;

/// Publish every command onto the task queue, then close it.
///
/// The sender is moved into the publishing task and dropped when the last
/// command has been enqueued; that drop is the only exhaustion signal the
/// workers get. Sends block while the queue is full.
///
/// The returned handle yields the number of commands actually published.
pub fn dispatch(commands: Vec<Command>, sender: mpsc::Sender<Command>) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let total = commands.len();
        let mut published = 0;

        for command in commands {
            tracing::debug!(command = %command, "Dispatching command");
            if sender.send(command).await.is_err() {
                tracing::warn!(published, total, "Task queue closed before dispatch finished");
                break;
            }
            published += 1;
        }

        tracing::debug!(published, "All commands dispatched, closing task queue");
        published
    })
}
