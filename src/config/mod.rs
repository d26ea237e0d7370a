//! Configuration models and loading.

pub mod scheduler;

pub use scheduler::SchedulerConfig;
