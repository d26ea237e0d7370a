//! Transport abstraction: how prepared requests reach the network.
//!
//! The scheduler never talks to the network itself; it hands each attempt
//! to a [`Transport`]. Tests inject controllable fakes, production code
//! uses the reqwest-backed [`HttpTransport`].

use async_trait::async_trait;
use bytes::Bytes;

use crate::core::error::TransportError;
use crate::endpoint::PreparedRequest;

#[cfg(feature = "tokio-runtime")]
pub mod http;

#[cfg(feature = "tokio-runtime")]
pub use http::HttpTransport;

/// Successful response surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code; always in the success range here.
    pub status: u16,
    /// Response headers in arrival order.
    pub headers: Vec<(String, String)>,
    /// Raw response body.
    pub body: Bytes,
}

/// Executes one prepared request per call.
///
/// Implementations classify the result: success statuses become
/// [`TransportResponse`], auth rejections become
/// [`TransportError::AccessDenied`], everything else becomes one of the
/// other [`TransportError`] variants. The scheduler treats any `Err` as a
/// terminal job failure.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Execute the request and return the terminal outcome of this attempt.
    async fn send(&self, request: PreparedRequest) -> Result<TransportResponse, TransportError>;
}

/// Source of ambient headers merged into every prepared request.
///
/// Typically carries session auth tokens, which is why these headers win
/// over endpoint and task headers during preparation. Called once per
/// submission, on the submitting thread.
pub trait HeaderProvider: Send + Sync {
    /// Headers to merge last.
    fn headers(&self) -> Vec<(String, String)>;
}
