//! Data models

pub mod job;

pub use job::{Job, JobId, JobState};
