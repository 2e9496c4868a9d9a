pub mod collector;
pub mod dispatcher;
pub mod job;

pub use collector::{collect, BatchReport, BatchSummary};
pub use dispatcher::dispatch;
pub use job::{Command, CommandResult, CommandTemplate};
