//! Resume capability for exports
//!
//! Persists `{startdate, enddate, nextdate}` with atomic writes and file locking.

pub mod checkpoint;
pub mod lock;
pub mod store;

pub use checkpoint::Checkpoint;
pub use store::{CheckpointStore, ResumeError, ResumePolicy};
