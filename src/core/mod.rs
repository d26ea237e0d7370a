//! Core scheduling abstractions: jobs, admission policy, and events.

pub mod error;
pub mod events;
pub mod job;
pub mod scheduler;

pub use error::{AppResult, BuildError, SchedulerError, TransportError};
pub use events::{AuthEvent, EventSink, InMemoryEventSink, SchedulerEvent};
pub use job::{Job, JobHandle, JobId, JobOutcome, JobPriority};
pub use scheduler::{RequestScheduler, SchedulerSnapshot, SchedulerStats, Spawn};
