//! Tokio-backed spawner for transport futures.

use std::future::Future;

use crate::core::Spawn;

/// Spawner that runs transport futures on a tokio runtime handle.
#[derive(Debug, Clone)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    /// Wrap an explicit runtime handle.
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Capture the handle of the runtime the caller is running inside.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime, as
    /// `tokio::runtime::Handle::current` does.
    #[must_use]
    pub fn current() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }
}

impl Spawn for TokioSpawner {
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(fut);
    }
}
