//! Scheduler event journal and the auth side-channel payload.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::job::{JobId, JobPriority};

/// Out-of-band notification that a response was rejected as unauthorized.
///
/// Delivered on the channel registered with
/// `RequestScheduler::with_auth_events`, in addition to the failure the
/// job's own handle receives. Host applications typically react by
/// re-authenticating the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEvent {
    /// Job whose response was rejected.
    pub job: JobId,
    /// Status code that triggered the rejection.
    pub status: u16,
}

/// State transitions observable through an [`EventSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchedulerEvent {
    /// A job passed admission.
    Submitted {
        /// Admitted job.
        job: JobId,
        /// Class it was submitted with.
        priority: JobPriority,
    },
    /// A job entered the active set and a transport attempt began.
    Started {
        /// Job taking the slot.
        job: JobId,
        /// Attempt number, starting at 1.
        attempt: u32,
    },
    /// A job was appended to a pending lane.
    Enqueued {
        /// Waiting job.
        job: JobId,
        /// Lane it joined.
        priority: JobPriority,
    },
    /// An active secondary job was moved back to the pending-secondary tail.
    Preempted {
        /// Evicted job.
        job: JobId,
    },
    /// A pending job was moved into the active set.
    Promoted {
        /// Promoted job.
        job: JobId,
        /// Lane it came from.
        priority: JobPriority,
    },
    /// A job's terminal outcome was delivered.
    Completed {
        /// Finished job.
        job: JobId,
        /// Whether the final attempt succeeded.
        success: bool,
    },
    /// A completion was classified as unauthorized.
    AuthRejected {
        /// Rejected job.
        job: JobId,
        /// Status code as received.
        status: u16,
    },
    /// A job was cancelled by the caller.
    Cancelled {
        /// Cancelled job.
        job: JobId,
    },
}

/// Sink receiving scheduler events as they happen.
///
/// Called with scheduler locks held: implementations must return quickly
/// and must not call back into the scheduler.
pub trait EventSink: Send {
    /// Record one event.
    fn record(&mut self, event: SchedulerEvent);
}

/// Bounded in-memory sink for tests and diagnostics.
///
/// Clones share one buffer, so a caller can keep a handle for inspection
/// while the scheduler owns the boxed sink. Once full, the oldest events
/// are evicted first.
#[derive(Debug, Clone)]
pub struct InMemoryEventSink {
    events: Arc<Mutex<VecDeque<SchedulerEvent>>>,
    max_events: usize,
}

impl InMemoryEventSink {
    /// Create a sink retaining at most `max_events` recent events.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(max_events))),
            max_events,
        }
    }

    /// Snapshot of retained events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<SchedulerEvent> {
        self.events.lock().iter().copied().collect()
    }

    /// Number of retained events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether no events have been retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for InMemoryEventSink {
    fn record(&mut self, event: SchedulerEvent) {
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_retains_in_order() {
        let mut sink = InMemoryEventSink::new(8);
        let a = JobId::new();
        let b = JobId::new();
        sink.record(SchedulerEvent::Submitted {
            job: a,
            priority: JobPriority::Primary,
        });
        sink.record(SchedulerEvent::Started { job: a, attempt: 1 });
        sink.record(SchedulerEvent::Cancelled { job: b });
        let events = sink.events();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], SchedulerEvent::Submitted { job, .. } if job == a));
        assert!(matches!(events[2], SchedulerEvent::Cancelled { job } if job == b));
    }

    #[test]
    fn sink_evicts_oldest_when_full() {
        let mut sink = InMemoryEventSink::new(2);
        let job = JobId::new();
        for attempt in 1..=3 {
            sink.record(SchedulerEvent::Started { job, attempt });
        }
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], SchedulerEvent::Started { attempt: 2, .. }));
        assert!(matches!(events[1], SchedulerEvent::Started { attempt: 3, .. }));
    }

    #[test]
    fn clones_share_the_buffer() {
        let sink = InMemoryEventSink::new(4);
        let mut writer = sink.clone();
        assert!(sink.is_empty());
        writer.record(SchedulerEvent::Cancelled { job: JobId::new() });
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn events_serialize_with_kind_tag() {
        let encoded = serde_json::to_string(&SchedulerEvent::Preempted { job: JobId::new() })
            .unwrap();
        assert!(encoded.contains("\"kind\":\"preempted\""));
    }
}
