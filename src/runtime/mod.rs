//! Runtime adapters bridging the scheduler to an async executor.

#[cfg(feature = "tokio-runtime")]
pub mod tokio_spawner;

#[cfg(feature = "tokio-runtime")]
pub use tokio_spawner::TokioSpawner;
