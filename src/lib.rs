//! # Turnstile
//!
//! Priority-aware admission control and scheduling for client-side HTTP
//! requests.
//!
//! This library sits between an application and its HTTP client. Every
//! request is submitted as a job with one of two priorities; the scheduler
//! bounds how many run at once, parks the rest in strict-FIFO lanes, and
//! applies a simple, predictable policy tuned for interactive apps talking
//! to one backend.
//!
//! ## Core Problem Solved
//!
//! Client apps fire bursts of requests with very different urgency:
//!
//! - **Interactive traffic**: the user is looking at a spinner; these
//!   requests must win every contest for a connection.
//! - **Opportunistic traffic**: prefetches and background refreshes that
//!   should use idle capacity only, and get out of the way instantly.
//! - **Session-wide failures**: one expired token fails many requests at
//!   once; the app needs a single place to hear about it.
//!
//! ## Key Features
//!
//! - **Bounded concurrency**: at most `max_active_jobs` transport attempts
//!   in flight, each under its own timeout.
//! - **Two-class priority with preemption**: a primary submission evicts a
//!   running secondary job, even when free slots remain; the evicted job
//!   re-queues and restarts from scratch later.
//! - **Completion-driven promotion**: every freed slot pulls from the
//!   primary lane first; secondary work runs only when the scheduler is
//!   otherwise idle.
//! - **Exactly-once outcomes**: each submission returns a handle that
//!   resolves once, with the final attempt's response or error.
//! - **Auth side channel**: access-denied completions are additionally
//!   reported on a channel the host app can watch to re-authenticate.
//! - **Injected transport and runtime**: policy is testable without the
//!   network; production uses the reqwest-backed transport on tokio.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use turnstile::config::SchedulerConfig;
//! use turnstile::core::{JobPriority, RequestScheduler};
//! use turnstile::endpoint::{Endpoint, Method};
//! use turnstile::runtime::TokioSpawner;
//! use turnstile::transport::HttpTransport;
//!
//! let scheduler = RequestScheduler::new(
//!     SchedulerConfig::default(),
//!     HttpTransport::new()?,
//!     TokioSpawner::current(),
//! )?;
//!
//! let walls = Endpoint::new(
//!     "https://api.example.com/v1/".parse()?,
//!     Method::Get,
//!     "walls",
//! );
//! let handle = scheduler.submit(&walls, JobPriority::Primary)?;
//! let response = handle.outcome().await?;
//! println!("{} bytes", response.body.len());
//! ```
//!
//! For complete scenarios, see:
//! - `tests/scheduler_policy_test.rs` - admission and promotion policy
//! - `tests/preemption_test.rs` - eviction, cancellation, and shutdown

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions: jobs, admission policy, and events.
pub mod core;
/// Configuration models and loading.
pub mod config;
/// Endpoint descriptions and request preparation.
pub mod endpoint;
/// Runtime adapters bridging the scheduler to an async executor.
pub mod runtime;
/// Transport abstraction and the HTTP implementation.
pub mod transport;
/// Shared utilities.
pub mod util;
