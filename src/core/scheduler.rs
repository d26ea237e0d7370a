//! Bounded-concurrency request scheduler with priority preemption.
//!
//! [`RequestScheduler`] admits submitted endpoints into a fixed number of
//! concurrent transport slots and keeps two strict-FIFO pending lanes, one
//! per priority class. The policy, in order:
//!
//! - A primary submission always evicts a running secondary job back to
//!   the pending-secondary tail, even when free slots remain.
//! - A primary job starts while a slot is free, otherwise waits in the
//!   primary lane.
//! - A secondary job starts only when nothing at all is in flight.
//! - Every freed slot promotes the primary lane first; the secondary lane
//!   moves only once the scheduler is otherwise idle.
//!
//! Preemption aborts the in-flight transport attempt and replays the job's
//! prepared request when it is next promoted. The caller's handle resolves
//! exactly once, with the outcome of the final attempt; completion signals
//! are accepted only from the job's current attempt, so signals from jobs
//! no longer in the active set and from attempts overtaken by a restart
//! are dropped alike, which also makes duplicate completions harmless.

use std::collections::{hash_map::Entry, HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;

use futures::channel::{mpsc, oneshot};
use futures::future::{abortable, AbortHandle};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::core::error::{SchedulerError, TransportError};
use crate::core::events::{AuthEvent, EventSink, SchedulerEvent};
use crate::core::job::{Job, JobHandle, JobId, JobOutcome, JobPriority};
use crate::endpoint::{Endpoint, PreparedRequest};
use crate::transport::{HeaderProvider, Transport};
use crate::util::clock::now_ms;

/// Abstraction for handing transport futures to an async runtime.
///
/// Implementations must queue the future and return; polling it inline
/// would re-enter the scheduler while its lock is held.
pub trait Spawn {
    /// Run `fut` to completion in the background.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Monotonic counters describing scheduler activity since construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Jobs accepted by `submit`.
    pub submitted: u64,
    /// Jobs whose final transport attempt succeeded.
    pub completed: u64,
    /// Jobs whose final transport attempt failed.
    pub failed: u64,
    /// Active secondary jobs moved back to pending by a primary submission.
    pub preempted: u64,
    /// Jobs moved from a pending lane into the active set.
    pub promoted: u64,
    /// Jobs cancelled by the caller.
    pub cancelled: u64,
    /// Failures classified as access denied.
    pub auth_failures: u64,
    /// Largest active-set size observed.
    pub peak_active: usize,
}

/// Point-in-time view of the scheduler's lanes.
///
/// Pending lanes are ordered head first; the active set carries no
/// meaningful order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSnapshot {
    /// Jobs currently holding slots, in unspecified order.
    pub active: Vec<Job>,
    /// Jobs waiting in the primary lane.
    pub pending_primary: Vec<Job>,
    /// Jobs waiting in the secondary lane.
    pub pending_secondary: Vec<Job>,
    /// Whether `shutdown` has run.
    pub closed: bool,
    /// Counters at the time of the snapshot.
    pub stats: SchedulerStats,
}

struct ActiveEntry {
    job: Job,
    request: PreparedRequest,
    result_tx: oneshot::Sender<JobOutcome>,
    abort: AbortHandle,
}

struct PendingEntry {
    job: Job,
    request: PreparedRequest,
    result_tx: oneshot::Sender<JobOutcome>,
}

impl ActiveEntry {
    fn into_pending(self) -> PendingEntry {
        PendingEntry {
            job: self.job,
            request: self.request,
            result_tx: self.result_tx,
        }
    }
}

#[derive(Default)]
struct SchedulerState {
    active: HashMap<JobId, ActiveEntry>,
    pending_primary: VecDeque<PendingEntry>,
    pending_secondary: VecDeque<PendingEntry>,
    closed: bool,
    stats: SchedulerStats,
}

fn take_pending(queue: &mut VecDeque<PendingEntry>, id: JobId) -> Option<PendingEntry> {
    let pos = queue.iter().position(|entry| entry.job.id == id)?;
    queue.remove(pos)
}

struct SchedulerShared<T, S> {
    config: SchedulerConfig,
    transport: Arc<T>,
    spawner: S,
    state: Mutex<SchedulerState>,
    headers: Mutex<Option<Arc<dyn HeaderProvider>>>,
    auth_tx: Mutex<Option<mpsc::UnboundedSender<AuthEvent>>>,
    events: Mutex<Option<Box<dyn EventSink>>>,
}

impl<T, S> SchedulerShared<T, S>
where
    T: Transport,
    S: Spawn + Send + Sync + 'static,
{
    fn emit(&self, event: SchedulerEvent) {
        let mut events = self.events.lock();
        if let Some(sink) = events.as_mut() {
            sink.record(event);
        }
    }

    fn notify_auth(&self, event: AuthEvent) {
        let auth_tx = self.auth_tx.lock();
        if let Some(tx) = auth_tx.as_ref() {
            if tx.unbounded_send(event).is_err() {
                debug!(job = %event.job, "auth event receiver dropped");
            }
        }
    }

    /// Move `job` into the active set and launch a transport attempt.
    ///
    /// Called with the state lock held; spawning is synchronous, so the
    /// attempt cannot observe the state mid-update.
    fn start_job(
        self: &Arc<Self>,
        state: &mut SchedulerState,
        mut job: Job,
        request: PreparedRequest,
        result_tx: oneshot::Sender<JobOutcome>,
    ) {
        let id = job.id;
        job.started_at_ms = Some(now_ms());
        job.attempts += 1;
        debug!(job = %id, priority = ?job.priority, attempt = job.attempts, "starting transport attempt");
        self.emit(SchedulerEvent::Started {
            job: id,
            attempt: job.attempts,
        });

        let attempt = job.attempts;
        let transport = Arc::clone(&self.transport);
        let attempt_request = request.clone();
        let (send, abort) = abortable(async move { transport.send(attempt_request).await });
        state.active.insert(
            id,
            ActiveEntry {
                job,
                request,
                result_tx,
                abort,
            },
        );
        state.stats.peak_active = state.stats.peak_active.max(state.active.len());

        let shared = Arc::clone(self);
        self.spawner.spawn(async move {
            match send.await {
                Ok(outcome) => shared.finish_job(id, attempt, outcome),
                // Aborted by preemption, cancellation, or shutdown; whoever
                // aborted it has already rerouted or completed the job.
                Err(_) => debug!(job = %id, attempt, "transport attempt aborted"),
            }
        });
    }

    /// Deliver a terminal outcome and promote the next pending job.
    ///
    /// A signal is accepted only when `id` is active and `attempt` matches
    /// the attempt the active entry is running. Anything else is dropped:
    /// the job was preempted (and possibly restarted since), cancelled,
    /// shut down, or already completed. An attempt that raced past its own
    /// abort must not displace the restart that superseded it.
    fn finish_job(self: &Arc<Self>, id: JobId, attempt: u32, outcome: JobOutcome) {
        let mut state = self.state.lock();
        let entry = match state.active.entry(id) {
            Entry::Occupied(active) if active.get().job.attempts == attempt => active.remove(),
            _ => {
                debug!(job = %id, attempt, "dropping stale completion signal");
                return;
            }
        };
        match &outcome {
            Ok(response) => {
                state.stats.completed += 1;
                debug!(job = %id, status = response.status, "job completed");
            }
            Err(TransportError::AccessDenied { status }) => {
                state.stats.failed += 1;
                state.stats.auth_failures += 1;
                warn!(job = %id, status = *status, "job failed with access denied");
                self.emit(SchedulerEvent::AuthRejected {
                    job: id,
                    status: *status,
                });
                self.notify_auth(AuthEvent {
                    job: id,
                    status: *status,
                });
            }
            Err(error) => {
                state.stats.failed += 1;
                debug!(job = %id, %error, "job failed");
            }
        }
        self.emit(SchedulerEvent::Completed {
            job: id,
            success: outcome.is_ok(),
        });
        if entry.result_tx.send(outcome).is_err() {
            debug!(job = %id, "job handle dropped before outcome delivery");
        }
        self.promote_next(&mut state);
    }

    /// Evict an active secondary job back to the tail of its lane.
    fn preempt(&self, state: &mut SchedulerState, id: JobId) {
        let Some(mut entry) = state.active.remove(&id) else {
            return;
        };
        entry.abort.abort();
        entry.job.started_at_ms = None;
        state.stats.preempted += 1;
        info!(job = %id, attempts = entry.job.attempts, "preempting secondary job for primary traffic");
        self.emit(SchedulerEvent::Preempted { job: id });
        state.pending_secondary.push_back(entry.into_pending());
    }

    /// Fill a freed slot: primary lane first, secondary only when idle.
    ///
    /// The capacity guards make this safe to run after any state change,
    /// including cancellations that freed nothing.
    fn promote_next(self: &Arc<Self>, state: &mut SchedulerState) {
        let next = if !state.pending_primary.is_empty()
            && state.active.len() < self.config.max_active_jobs
        {
            state.pending_primary.pop_front()
        } else if state.active.is_empty() {
            state.pending_secondary.pop_front()
        } else {
            None
        };
        let Some(entry) = next else {
            return;
        };
        let id = entry.job.id;
        let priority = entry.job.priority;
        state.stats.promoted += 1;
        info!(job = %id, ?priority, "promoting pending job");
        self.emit(SchedulerEvent::Promoted { job: id, priority });
        self.start_job(state, entry.job, entry.request, entry.result_tx);
    }
}

/// Priority-aware admission control for client-side requests.
///
/// The scheduler is cheap to share behind an `Arc`; all methods take
/// `&self`. Transport and runtime are injected, so policy behavior is
/// fully testable without touching the network.
pub struct RequestScheduler<T, S>
where
    T: Transport,
    S: Spawn + Send + Sync + 'static,
{
    shared: Arc<SchedulerShared<T, S>>,
}

impl<T, S> RequestScheduler<T, S>
where
    T: Transport,
    S: Spawn + Send + Sync + 'static,
{
    /// Create a scheduler from validated configuration, a transport, and a
    /// spawner.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] when the configuration
    /// fails validation.
    pub fn new(config: SchedulerConfig, transport: T, spawner: S) -> Result<Self, SchedulerError> {
        config
            .validate()
            .map_err(SchedulerError::InvalidConfig)?;
        info!(
            max_active_jobs = config.max_active_jobs,
            request_timeout_secs = config.request_timeout_secs,
            "request scheduler ready"
        );
        Ok(Self {
            shared: Arc::new(SchedulerShared {
                config,
                transport: Arc::new(transport),
                spawner,
                state: Mutex::new(SchedulerState::default()),
                headers: Mutex::new(None),
                auth_tx: Mutex::new(None),
                events: Mutex::new(None),
            }),
        })
    }

    /// Attach a provider of ambient headers, merged last into every
    /// prepared request.
    #[must_use]
    pub fn with_header_provider(self, provider: Arc<dyn HeaderProvider>) -> Self {
        *self.shared.headers.lock() = Some(provider);
        self
    }

    /// Attach the sending half of an auth side channel.
    ///
    /// Access-denied completions are reported here in addition to the
    /// failing job's own handle.
    #[must_use]
    pub fn with_auth_events(self, auth_tx: mpsc::UnboundedSender<AuthEvent>) -> Self {
        *self.shared.auth_tx.lock() = Some(auth_tx);
        self
    }

    /// Attach an event sink observing every scheduling transition.
    #[must_use]
    pub fn with_events(self, sink: Box<dyn EventSink>) -> Self {
        *self.shared.events.lock() = Some(sink);
        self
    }

    /// Submit one request for execution under `priority`.
    ///
    /// Admission is synchronous: when this returns the job is either
    /// active or parked in its lane, and the returned handle will resolve
    /// exactly once with the job's terminal outcome.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Build`] when the endpoint does not
    /// resolve into a valid request (nothing is admitted), and
    /// [`SchedulerError::Closed`] after `shutdown`.
    pub fn submit(
        &self,
        endpoint: &Endpoint,
        priority: JobPriority,
    ) -> Result<JobHandle, SchedulerError> {
        let ambient = self
            .shared
            .headers
            .lock()
            .as_ref()
            .map(|provider| provider.headers())
            .unwrap_or_default();
        let request = endpoint.prepare(&ambient, self.shared.config.request_timeout())?;

        let job = Job::new(priority);
        let id = job.id;
        let (result_tx, result_rx) = oneshot::channel();

        let mut state = self.shared.state.lock();
        if state.closed {
            return Err(SchedulerError::Closed);
        }
        state.stats.submitted += 1;
        self.shared.emit(SchedulerEvent::Submitted { job: id, priority });

        match priority {
            JobPriority::Primary => {
                // Eviction happens regardless of remaining capacity, so a
                // lone secondary job never shares the scheduler with
                // primary traffic.
                let victim = state.active.iter().find_map(|(active_id, entry)| {
                    (entry.job.priority == JobPriority::Secondary).then_some(*active_id)
                });
                if let Some(victim) = victim {
                    self.shared.preempt(&mut state, victim);
                }
                if state.active.len() < self.shared.config.max_active_jobs {
                    self.shared.start_job(&mut state, job, request, result_tx);
                } else {
                    state.pending_primary.push_back(PendingEntry {
                        job,
                        request,
                        result_tx,
                    });
                    debug!(job = %id, depth = state.pending_primary.len(), "primary lane full, queueing");
                    self.shared.emit(SchedulerEvent::Enqueued { job: id, priority });
                }
            }
            JobPriority::Secondary => {
                if state.active.is_empty() {
                    self.shared.start_job(&mut state, job, request, result_tx);
                } else {
                    state.pending_secondary.push_back(PendingEntry {
                        job,
                        request,
                        result_tx,
                    });
                    debug!(job = %id, depth = state.pending_secondary.len(), "scheduler busy, queueing secondary");
                    self.shared.emit(SchedulerEvent::Enqueued { job: id, priority });
                }
            }
        }

        Ok(JobHandle::new(id, priority, result_rx))
    }

    /// Cancel a job in any lane.
    ///
    /// An active job's transport attempt is aborted; a pending job is
    /// removed from its lane without disturbing FIFO order of the rest.
    /// The job's handle resolves with [`TransportError::Cancelled`], and a
    /// freed slot is refilled like any completion. Returns `false` for
    /// unknown or already finished jobs.
    pub fn cancel(&self, id: JobId) -> bool {
        let mut state = self.shared.state.lock();
        let entry = if let Some(active) = state.active.remove(&id) {
            active.abort.abort();
            active.into_pending()
        } else if let Some(pending) = take_pending(&mut state.pending_primary, id) {
            pending
        } else if let Some(pending) = take_pending(&mut state.pending_secondary, id) {
            pending
        } else {
            debug!(job = %id, "cancel for unknown or finished job");
            return false;
        };

        state.stats.cancelled += 1;
        info!(job = %id, "job cancelled");
        self.shared.emit(SchedulerEvent::Cancelled { job: id });
        if entry.result_tx.send(Err(TransportError::Cancelled)).is_err() {
            debug!(job = %id, "job handle dropped before cancellation delivery");
        }
        self.shared.promote_next(&mut state);
        true
    }

    /// Shut the scheduler down.
    ///
    /// Aborts every active attempt, drains both lanes, and resolves every
    /// outstanding handle with [`TransportError::Shutdown`]. Subsequent
    /// submissions fail with [`SchedulerError::Closed`]. Idempotent.
    pub fn shutdown(&self) {
        let mut guard = self.shared.state.lock();
        if guard.closed {
            return;
        }
        guard.closed = true;
        let state = &mut *guard;
        let active: Vec<ActiveEntry> = state.active.drain().map(|(_, entry)| entry).collect();
        let pending: Vec<PendingEntry> = state
            .pending_primary
            .drain(..)
            .chain(state.pending_secondary.drain(..))
            .collect();
        drop(guard);

        info!(
            active = active.len(),
            pending = pending.len(),
            "scheduler shutting down"
        );
        for entry in active {
            entry.abort.abort();
            let _ = entry.result_tx.send(Err(TransportError::Shutdown));
        }
        for entry in pending {
            let _ = entry.result_tx.send(Err(TransportError::Shutdown));
        }
    }

    /// Point-in-time view of all lanes and counters.
    #[must_use]
    pub fn snapshot(&self) -> SchedulerSnapshot {
        let state = self.shared.state.lock();
        SchedulerSnapshot {
            active: state.active.values().map(|entry| entry.job.clone()).collect(),
            pending_primary: state
                .pending_primary
                .iter()
                .map(|entry| entry.job.clone())
                .collect(),
            pending_secondary: state
                .pending_secondary
                .iter()
                .map(|entry| entry.job.clone())
                .collect(),
            closed: state.closed,
            stats: state.stats.clone(),
        }
    }

    /// Counters since construction.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        self.shared.state.lock().stats.clone()
    }

    /// The configuration the scheduler was built with.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }
}
