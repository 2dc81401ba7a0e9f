//! AICL execution substrate.
//!
//! The pieces the executor and scheduler are built on: the shared data
//! store with per-cell locking, the immutable permission table, task
//! records with a per-interpreter id generator, the append-only execution
//! logger, and a structured-concurrency scope for `RUNCON` fan-out.

mod logger;
mod perms;
mod scope;
mod store;
mod task;

pub use logger::{LogEntry, Logger};
pub use perms::PermissionTable;
pub use scope::{CancelToken, Scope, ScopedJoinHandle, TaskError};
pub use store::{DataCell, DataStore};
pub use task::{TaskId, TaskIdGen, TaskRecord, TaskStatus};
