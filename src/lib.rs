pub mod batch;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod scheduler;
pub mod worker;

pub use batch::BatchRunner;
pub use error::{PgitError, Result};
