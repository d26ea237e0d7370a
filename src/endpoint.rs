//! Endpoint descriptions and request preparation.
//!
//! An [`Endpoint`] says where and how one request goes: base URL, method,
//! relative path, a [`RequestTask`] describing body and query data, and
//! endpoint-level headers. [`Endpoint::prepare`] resolves all of that into
//! a [`PreparedRequest`], the immutable value handed to the transport.
//!
//! Preparation is where merge order is fixed: endpoint headers first, then
//! task-level extras, then ambient headers from the scheduler's header
//! provider. Later writes win, so ambient auth headers always take effect.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use url::Url;

use crate::core::error::BuildError;

/// HTTP method for an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Idempotent read.
    Get,
    /// Create or submit.
    Post,
    /// Replace or update.
    Put,
    /// Remove.
    Delete,
}

impl Method {
    /// Canonical uppercase token for the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One part of a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartPart {
    /// Form field name; must be non-empty.
    pub name: String,
    /// Optional file name hint.
    pub filename: Option<String>,
    /// Optional content type of the part.
    pub content_type: Option<String>,
    /// Raw part payload.
    pub data: Bytes,
}

impl MultipartPart {
    /// Create a bare named part.
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            content_type: None,
            data: data.into(),
        }
    }

    /// Attach a file name hint.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Attach a content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// How a request carries its data.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestTask {
    /// No body and no query parameters.
    #[default]
    Plain,
    /// Optional raw body plus query parameters.
    Data {
        /// Body bytes, if any.
        body: Option<Bytes>,
        /// Query pairs appended to the URL.
        query: Vec<(String, String)>,
    },
    /// Like [`RequestTask::Data`], with additional per-request headers.
    DataAndHeaders {
        /// Body bytes, if any.
        body: Option<Bytes>,
        /// Query pairs appended to the URL.
        query: Vec<(String, String)>,
        /// Headers merged on top of the endpoint's own.
        extra_headers: HashMap<String, String>,
    },
    /// Multipart form upload.
    Multipart {
        /// Parts in submission order.
        parts: Vec<MultipartPart>,
    },
}

/// A logical HTTP endpoint: where and how to make one request.
#[derive(Debug, Clone)]
pub struct Endpoint {
    /// Base URL the path is joined onto.
    pub base_url: Url,
    /// HTTP method.
    pub method: Method,
    /// Path resolved against `base_url` with relative-URL semantics.
    pub path: String,
    /// Body and query description.
    pub task: RequestTask,
    /// Endpoint-level headers, applied before task and ambient headers.
    pub headers: HashMap<String, String>,
}

impl Endpoint {
    /// Describe a plain endpoint with no body, query, or extra headers.
    pub fn new(base_url: Url, method: Method, path: impl Into<String>) -> Self {
        Self {
            base_url,
            method,
            path: path.into(),
            task: RequestTask::Plain,
            headers: HashMap::new(),
        }
    }

    /// Replace the body/query description.
    #[must_use]
    pub fn with_task(mut self, task: RequestTask) -> Self {
        self.task = task;
        self
    }

    /// Add an endpoint-level header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Resolve the endpoint into an immutable transport request.
    ///
    /// `ambient_headers` are merged last and therefore win over endpoint
    /// and task headers. `timeout` bounds each transport attempt made for
    /// the resulting request.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidPath`] when `path` does not resolve
    /// against the base URL, and [`BuildError::EmptyMultipartName`] when a
    /// multipart part has an empty field name.
    pub fn prepare(
        &self,
        ambient_headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<PreparedRequest, BuildError> {
        let url = self
            .base_url
            .join(&self.path)
            .map_err(|err| BuildError::InvalidPath {
                path: self.path.clone(),
                reason: err.to_string(),
            })?;

        let mut headers = self.headers.clone();
        let (query, body) = match &self.task {
            RequestTask::Plain => (Vec::new(), RequestBody::None),
            RequestTask::Data { body, query } => (
                query.clone(),
                body.clone().map_or(RequestBody::None, RequestBody::Bytes),
            ),
            RequestTask::DataAndHeaders {
                body,
                query,
                extra_headers,
            } => {
                headers.extend(
                    extra_headers
                        .iter()
                        .map(|(name, value)| (name.clone(), value.clone())),
                );
                (
                    query.clone(),
                    body.clone().map_or(RequestBody::None, RequestBody::Bytes),
                )
            }
            RequestTask::Multipart { parts } => {
                if parts.iter().any(|part| part.name.is_empty()) {
                    return Err(BuildError::EmptyMultipartName);
                }
                (Vec::new(), RequestBody::Multipart(parts.clone()))
            }
        };
        headers.extend(ambient_headers.iter().cloned());

        Ok(PreparedRequest {
            method: self.method,
            url,
            headers,
            query,
            body,
            timeout,
        })
    }
}

/// Body variant carried by a prepared request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestBody {
    /// No body.
    #[default]
    None,
    /// Raw byte payload.
    Bytes(Bytes),
    /// Multipart form payload.
    Multipart(Vec<MultipartPart>),
}

/// An immutable, cloneable transport request built from an endpoint.
///
/// Cloneability is what lets a preempted job restart from scratch: the
/// scheduler keeps the prepared request and replays it on promotion.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    /// HTTP method.
    pub method: Method,
    /// Fully resolved request URL, before query pairs are appended.
    pub url: Url,
    /// Merged headers; ambient headers have already won any collisions.
    pub headers: HashMap<String, String>,
    /// Query pairs appended to the URL by the transport.
    pub query: Vec<(String, String)>,
    /// Body payload.
    pub body: RequestBody,
    /// Timeout applied to each transport attempt.
    pub timeout: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        "https://api.example.com/v1/".parse().unwrap()
    }

    const TIMEOUT: Duration = Duration::from_secs(30);

    #[test]
    fn prepare_joins_relative_path() {
        let endpoint = Endpoint::new(base(), Method::Get, "walls/42");
        let request = endpoint.prepare(&[], TIMEOUT).unwrap();
        assert_eq!(request.url.as_str(), "https://api.example.com/v1/walls/42");
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.body, RequestBody::None);
        assert_eq!(request.timeout, TIMEOUT);
    }

    #[test]
    fn prepare_honors_absolute_path_semantics() {
        // A leading slash resolves against the host root, as relative URL
        // resolution dictates.
        let endpoint = Endpoint::new(base(), Method::Get, "/health");
        let request = endpoint.prepare(&[], TIMEOUT).unwrap();
        assert_eq!(request.url.as_str(), "https://api.example.com/health");
    }

    #[test]
    fn prepare_rejects_unjoinable_path() {
        let mail: Url = "mailto:ops@example.com".parse().unwrap();
        let endpoint = Endpoint::new(mail, Method::Get, "walls");
        let err = endpoint.prepare(&[], TIMEOUT).unwrap_err();
        assert!(matches!(err, BuildError::InvalidPath { ref path, .. } if path == "walls"));
    }

    #[test]
    fn data_task_carries_body_and_query() {
        let endpoint = Endpoint::new(base(), Method::Post, "walls").with_task(RequestTask::Data {
            body: Some(Bytes::from_static(b"{\"title\":\"mural\"}")),
            query: vec![("draft".to_string(), "true".to_string())],
        });
        let request = endpoint.prepare(&[], TIMEOUT).unwrap();
        assert_eq!(
            request.body,
            RequestBody::Bytes(Bytes::from_static(b"{\"title\":\"mural\"}"))
        );
        assert_eq!(request.query, vec![("draft".to_string(), "true".to_string())]);
    }

    #[test]
    fn header_merge_order_is_endpoint_then_task_then_ambient() {
        let endpoint = Endpoint::new(base(), Method::Get, "me")
            .with_header("x-app", "endpoint")
            .with_header("x-keep", "endpoint")
            .with_task(RequestTask::DataAndHeaders {
                body: None,
                query: Vec::new(),
                extra_headers: HashMap::from([("x-app".to_string(), "task".to_string())]),
            });
        let ambient = vec![("x-app".to_string(), "ambient".to_string())];
        let request = endpoint.prepare(&ambient, TIMEOUT).unwrap();
        assert_eq!(request.headers.get("x-app").map(String::as_str), Some("ambient"));
        assert_eq!(request.headers.get("x-keep").map(String::as_str), Some("endpoint"));
    }

    #[test]
    fn multipart_requires_part_names() {
        let endpoint = Endpoint::new(base(), Method::Post, "photos").with_task(
            RequestTask::Multipart {
                parts: vec![MultipartPart::new("", Bytes::from_static(b"jpeg"))],
            },
        );
        let err = endpoint.prepare(&[], TIMEOUT).unwrap_err();
        assert_eq!(err, BuildError::EmptyMultipartName);
    }

    #[test]
    fn multipart_parts_survive_preparation() {
        let part = MultipartPart::new("photo", Bytes::from_static(b"jpeg"))
            .with_filename("wall.jpg")
            .with_content_type("image/jpeg");
        let endpoint = Endpoint::new(base(), Method::Post, "photos")
            .with_task(RequestTask::Multipart { parts: vec![part.clone()] });
        let request = endpoint.prepare(&[], TIMEOUT).unwrap();
        assert_eq!(request.body, RequestBody::Multipart(vec![part]));
    }

    #[test]
    fn prepared_request_clones_are_independent_values() {
        let endpoint = Endpoint::new(base(), Method::Put, "walls/7");
        let request = endpoint.prepare(&[], TIMEOUT).unwrap();
        let replay = request.clone();
        assert_eq!(replay.url, request.url);
        assert_eq!(replay.method, request.method);
    }

    #[test]
    fn method_tokens_are_uppercase() {
        assert_eq!(Method::Get.as_str(), "GET");
        assert_eq!(Method::Delete.to_string(), "DELETE");
    }
}
