//! Scheduled catalog syncs.
//!
//! The scheduler wakes on a fixed interval and syncs every enabled, due
//! definition one after another. A cycle can also be triggered on demand, in
//! which case the due check is ignored. Only one cycle runs at a time.

mod runner;
mod types;

pub use runner::{CycleProgressCallback, SyncScheduler};
pub use types::{CycleFailure, CycleProgress, CycleReport, SchedulerError};
