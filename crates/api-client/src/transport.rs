// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP transport seam
//!
//! The credential manager never talks to the network directly. It hands fully
//! prepared [`ApiRequest`]s to an [`HttpTransport`], which either returns a
//! successful [`ApiResponse`] or a [`TransportError`] that tells HTTP-level
//! failures (status and body available) apart from network-level ones.

use std::time::Duration;

use reqwest::{
    Client, Method, StatusCode,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};
use url::Url;

use crate::{config::TransportConfig, error::AuthResult};

/// A fully described outgoing HTTP request
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP verb
    pub method: Method,
    /// Absolute request URL
    pub url: Url,
    /// Request headers
    pub headers: HeaderMap,
    /// Optional JSON body
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    /// Create a request with no headers and no body
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Shorthand for a `GET` request
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Shorthand for a `POST` request with a JSON body
    pub fn post(url: Url, body: serde_json::Value) -> Self {
        Self::new(Method::POST, url).with_body(body)
    }

    /// Attach a JSON body
    #[must_use]
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Set a header, replacing any previous value
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// A successful HTTP response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// Response status
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw response body
    pub body: String,
}

impl ApiResponse {
    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> AuthResult<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Failure reported by a transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum TransportError {
    /// The server answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The request never produced a response
    #[error("network failure: {message}")]
    Network { message: String },

    /// No response arrived within the transport's timeout
    #[error("timed out after {seconds} seconds")]
    Timeout { seconds: u64 },
}

impl TransportError {
    /// Status code of an HTTP-level failure
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Executes a single prepared HTTP request
///
/// Implementations own timeout enforcement and must report every non-2xx
/// response as [`TransportError::Status`].
pub trait HttpTransport: Send + Sync {
    /// Execute the request once
    fn execute(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send;
}

/// Default transport backed by `reqwest`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Build a transport from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be created
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let timeout = config.timeout.value();
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| TransportError::Network {
                message: e.to_string(),
            })?;

        Ok(Self { client, timeout })
    }
}

impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let ApiRequest {
            method,
            url,
            headers,
            body,
        } = request;

        debug!(%method, %url, "sending request");

        let mut builder = self.client.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body.to_string());
        }

        let seconds = self.timeout.as_secs();
        let response = timeout(self.timeout, builder.send())
            .await
            .map_err(|_| TransportError::Timeout { seconds })?
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout { seconds }
                } else {
                    TransportError::Network {
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(|e| TransportError::Network {
            message: e.to_string(),
        })?;

        if status.is_success() {
            Ok(ApiResponse {
                status,
                headers,
                body,
            })
        } else {
            warn!(status = status.as_u16(), "request returned error status");
            Err(TransportError::Status { status, body })
        }
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::CONTENT_TYPE;
    use serde_json::json;

    use super::*;

    fn url() -> Url {
        Url::parse("http://example.com/nft").unwrap()
    }

    #[test]
    fn request_builders() {
        let request = ApiRequest::post(url(), json!({"a": 1}))
            .with_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.body, Some(json!({"a": 1})));
        assert_eq!(request.headers[CONTENT_TYPE], "text/plain");

        let request = ApiRequest::get(url());
        assert_eq!(request.method, Method::GET);
        assert!(request.body.is_none());
        assert!(request.headers.is_empty());
    }

    #[test]
    fn response_json_decoding() {
        let response = ApiResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: r#"{"name":"CoolNFT"}"#.to_string(),
        };
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["name"], "CoolNFT");

        let broken = ApiResponse {
            body: "not json".to_string(),
            ..response
        };
        assert!(broken.json::<serde_json::Value>().is_err());
    }

    #[test]
    fn transport_error_status() {
        let error = TransportError::Status {
            status: StatusCode::UNAUTHORIZED,
            body: String::new(),
        };
        assert_eq!(error.status(), Some(StatusCode::UNAUTHORIZED));

        let error = TransportError::Timeout { seconds: 5 };
        assert!(error.status().is_none());
    }
}
