//! Job identity, priority, and the caller-facing completion handle.

use std::fmt;

use futures::channel::oneshot;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::error::TransportError;
use crate::transport::TransportResponse;
use crate::util::clock::now_ms;

/// Terminal outcome of a job: the response of its final transport attempt,
/// or the error that ended it.
pub type JobOutcome = Result<TransportResponse, TransportError>;

/// Unique identifier assigned to a job at admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(Uuid);

impl JobId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scheduling class of a job.
///
/// Primary traffic is interactive work the user is waiting on; secondary
/// traffic is opportunistic and yields to it. There is no numeric priority
/// scale beyond these two classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPriority {
    /// Interactive traffic; preempts running secondary jobs.
    Primary,
    /// Opportunistic traffic; runs only when the scheduler is otherwise idle.
    Secondary,
}

/// Bookkeeping record for one admitted job.
///
/// `started_at_ms` is `Some` exactly while the job holds an active slot;
/// preemption clears it again. `attempts` counts transport attempts started,
/// so a job preempted once completes with `attempts == 2`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Identifier assigned at admission.
    pub id: JobId,
    /// Scheduling class fixed at submission.
    pub priority: JobPriority,
    /// Wall-clock admission time in Unix milliseconds.
    pub submitted_at_ms: u128,
    /// Wall-clock start of the current attempt, when active.
    pub started_at_ms: Option<u128>,
    /// Transport attempts started so far.
    pub attempts: u32,
}

impl Job {
    pub(crate) fn new(priority: JobPriority) -> Self {
        Self {
            id: JobId::new(),
            priority,
            submitted_at_ms: now_ms(),
            started_at_ms: None,
            attempts: 0,
        }
    }

    /// Whether the job currently holds an active slot.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.started_at_ms.is_some()
    }
}

/// Caller-side handle to one submitted job.
///
/// The handle resolves exactly once, with the outcome of the job's final
/// transport attempt. Dropping the handle does not cancel the job; use
/// `RequestScheduler::cancel` for that.
pub struct JobHandle {
    id: JobId,
    priority: JobPriority,
    outcome_rx: oneshot::Receiver<JobOutcome>,
}

impl JobHandle {
    pub(crate) fn new(
        id: JobId,
        priority: JobPriority,
        outcome_rx: oneshot::Receiver<JobOutcome>,
    ) -> Self {
        Self {
            id,
            priority,
            outcome_rx,
        }
    }

    /// Identifier of the submitted job, usable with `cancel`.
    #[must_use]
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Scheduling class the job was submitted with.
    #[must_use]
    pub fn priority(&self) -> JobPriority {
        self.priority
    }

    /// Wait for the job's terminal outcome.
    ///
    /// Resolves to `TransportError::ChannelClosed` when the scheduler was
    /// dropped before delivering one.
    pub async fn outcome(self) -> JobOutcome {
        match self.outcome_rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(TransportError::ChannelClosed),
        }
    }
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_ids_are_unique() {
        let a = JobId::new();
        let b = JobId::new();
        assert_ne!(a, b);
        assert_eq!(a, a);
    }

    #[test]
    fn priority_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&JobPriority::Primary).unwrap(),
            "\"primary\""
        );
        let parsed: JobPriority = serde_json::from_str("\"secondary\"").unwrap();
        assert_eq!(parsed, JobPriority::Secondary);
    }

    #[test]
    fn new_job_is_pending() {
        let job = Job::new(JobPriority::Secondary);
        assert!(!job.is_running());
        assert_eq!(job.attempts, 0);
        assert!(job.submitted_at_ms > 0);
    }

    #[test]
    fn job_round_trips_through_json() {
        let mut job = Job::new(JobPriority::Primary);
        job.started_at_ms = Some(job.submitted_at_ms + 3);
        job.attempts = 2;
        let encoded = serde_json::to_string(&job).unwrap();
        let decoded: Job = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, job);
        assert!(decoded.is_running());
    }
}
