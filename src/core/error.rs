//! Error types for request building, admission, and transport.

use thiserror::Error;

/// Errors raised while turning an endpoint description into a transport
/// request. Raised synchronously at submission; a job that fails to build
/// is never admitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// The endpoint path could not be joined onto the base URL.
    #[error("invalid path `{path}`: {reason}")]
    InvalidPath {
        /// The offending path as given on the endpoint.
        path: String,
        /// Parser detail explaining the rejection.
        reason: String,
    },
    /// A multipart part was declared without a field name.
    #[error("multipart part without a name")]
    EmptyMultipartName,
}

/// Errors returned synchronously from `submit` and construction.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The endpoint could not be turned into a valid request.
    #[error("request build failed: {0}")]
    Build(#[from] BuildError),
    /// The scheduler configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The scheduler has been shut down and refuses new work.
    #[error("scheduler is closed")]
    Closed,
}

/// Terminal failures delivered through a job's completion channel.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport could not reach the remote host.
    #[error("connect error: {0}")]
    Connect(String),
    /// The attempt exceeded the configured transport timeout.
    #[error("request timed out")]
    Timeout,
    /// The response carried a non-success status outside the auth range.
    #[error("unexpected status {status}")]
    Status {
        /// HTTP status code as received.
        status: u16,
    },
    /// The response indicated the caller is not authorized.
    #[error("access denied (status {status})")]
    AccessDenied {
        /// HTTP status code that triggered the classification.
        status: u16,
    },
    /// The response body could not be read.
    #[error("body read failed: {0}")]
    Body(String),
    /// The job was cancelled before a transport attempt finished.
    #[error("job cancelled")]
    Cancelled,
    /// The scheduler shut down before the job finished.
    #[error("scheduler shut down")]
    Shutdown,
    /// The scheduler was dropped before the outcome could be delivered.
    #[error("outcome channel closed")]
    ChannelClosed,
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_error_display() {
        let err = BuildError::InvalidPath {
            path: "::bad::".to_string(),
            reason: "relative URL with a cannot-be-a-base base".to_string(),
        };
        assert!(err.to_string().contains("::bad::"));
        assert_eq!(
            BuildError::EmptyMultipartName.to_string(),
            "multipart part without a name"
        );
    }

    #[test]
    fn scheduler_error_wraps_build_error() {
        let err: SchedulerError = BuildError::EmptyMultipartName.into();
        assert!(matches!(err, SchedulerError::Build(_)));
        assert!(err.to_string().contains("request build failed"));
    }

    #[test]
    fn transport_error_display() {
        assert_eq!(
            TransportError::Status { status: 503 }.to_string(),
            "unexpected status 503"
        );
        assert_eq!(
            TransportError::AccessDenied { status: 401 }.to_string(),
            "access denied (status 401)"
        );
        assert_eq!(TransportError::Timeout.to_string(), "request timed out");
        assert_eq!(TransportError::Shutdown.to_string(), "scheduler shut down");
    }
}
