//! Repository layer.

pub mod job;

pub use job::{ClaimOutcome, ClaimedJob, JobStore, MarkOutcome, SqlxJobStore};
