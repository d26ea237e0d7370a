//! HTTP transport backed by reqwest.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::core::error::TransportError;
use crate::endpoint::{Method, PreparedRequest, RequestBody};
use crate::transport::{Transport, TransportResponse};

/// Transport that executes prepared requests over HTTP.
///
/// Connection pooling and TLS come from the wrapped [`Client`]; per-request
/// timeouts come from the prepared request, so one client serves schedulers
/// with different configurations.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with a default client.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connect`] when the TLS backend cannot be
    /// initialized.
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .build()
            .map_err(|err| TransportError::Connect(err.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing client, keeping its pool, proxy, and TLS settings.
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn wire_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn classify_send_error(err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Connect(err.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: PreparedRequest) -> Result<TransportResponse, TransportError> {
        let mut builder = self
            .client
            .request(wire_method(request.method), request.url.clone())
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        builder = match request.body {
            RequestBody::None => builder,
            RequestBody::Bytes(bytes) => builder.body(bytes),
            RequestBody::Multipart(parts) => {
                let mut form = reqwest::multipart::Form::new();
                for part in parts {
                    let mut piece = reqwest::multipart::Part::bytes(part.data.to_vec());
                    if let Some(filename) = part.filename {
                        piece = piece.file_name(filename);
                    }
                    if let Some(content_type) = part.content_type {
                        piece = piece.mime_str(&content_type).map_err(|err| {
                            TransportError::Connect(format!("invalid content type: {err}"))
                        })?;
                    }
                    form = form.part(part.name, piece);
                }
                builder.multipart(form)
            }
        };

        let response = builder
            .send()
            .await
            .map_err(|err| classify_send_error(&err))?;
        let status = response.status().as_u16();
        debug!(%status, url = %request.url, "http transport response");

        match status {
            200..=299 => {
                let headers = response
                    .headers()
                    .iter()
                    .filter_map(|(name, value)| {
                        value
                            .to_str()
                            .ok()
                            .map(|text| (name.to_string(), text.to_string()))
                    })
                    .collect();
                let body = response
                    .bytes()
                    .await
                    .map_err(|err| TransportError::Body(err.to_string()))?;
                Ok(TransportResponse {
                    status,
                    headers,
                    body,
                })
            }
            401 => Err(TransportError::AccessDenied { status }),
            _ => Err(TransportError::Status { status }),
        }
    }
}
