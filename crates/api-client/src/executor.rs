// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Authenticated request execution
//!
//! [`RequestExecutor`] attaches a bearer token to each request and, when the
//! server rejects it with HTTP 401, forces one token refresh and sends the
//! request again. A request is retried at most once.

use std::sync::Arc;

use reqwest::{
    StatusCode,
    header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue},
};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{
    Authenticator,
    config::{AuthConfig, TransportConfig},
    coordinator::RefreshCoordinator,
    error::{AuthError, AuthResult},
    transport::{ApiRequest, ApiResponse, HttpTransport, ReqwestTransport, TransportError},
};

/// Executor wired to a [`RefreshCoordinator`] sharing its transport
pub type AuthenticatedClient<T = ReqwestTransport> = RequestExecutor<RefreshCoordinator<T>, T>;

/// Sends requests with a bearer token, recovering once from HTTP 401
#[derive(Debug)]
pub struct RequestExecutor<A, T> {
    authenticator: Arc<A>,
    transport: Arc<T>,
    force_refresh_on_failure: bool,
}

impl<A, T> Clone for RequestExecutor<A, T> {
    fn clone(&self) -> Self {
        Self {
            authenticator: Arc::clone(&self.authenticator),
            transport: Arc::clone(&self.transport),
            force_refresh_on_failure: self.force_refresh_on_failure,
        }
    }
}

impl<A: Authenticator, T: HttpTransport> RequestExecutor<A, T> {
    /// Combine an authenticator and a transport
    pub fn new(authenticator: Arc<A>, transport: Arc<T>, force_refresh_on_failure: bool) -> Self {
        Self {
            authenticator,
            transport,
            force_refresh_on_failure,
        }
    }

    /// The authenticator supplying tokens
    pub fn authenticator(&self) -> &A {
        &self.authenticator
    }

    /// Send an authenticated request
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Upstream` for error statuses, `AuthError::Config` when
    /// no credentials are available, and any error from a token refresh
    pub async fn send(&self, request: ApiRequest) -> AuthResult<ApiResponse> {
        self.request(request, false).await
    }

    /// Send an authenticated request and decode the JSON response body
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send), plus `AuthError::InvalidResponse` when the
    /// body does not decode
    pub async fn send_json<R: DeserializeOwned>(&self, request: ApiRequest) -> AuthResult<R> {
        self.send(request).await?.json()
    }

    /// Send an authenticated request
    ///
    /// `retry` marks a request that has already been retried; such a request is
    /// never retried again.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send)
    pub async fn request(&self, request: ApiRequest, retry: bool) -> AuthResult<ApiResponse> {
        let mut retried = retry;
        loop {
            let prepared = self.prepare(request.clone()).await?;
            match self.transport.execute(prepared).await {
                Ok(response) => return Ok(response),
                Err(error) if !retried && self.should_force_refresh(&error) => {
                    warn!(url = %request.url, "request rejected with 401, forcing token refresh");
                    let credentials = self.authenticator.credentials();
                    self.authenticator
                        .refresh(credentials.refresh_token.as_deref())
                        .await?;
                    retried = true;
                }
                Err(error) => return Err(error.into()),
            }
        }
    }

    async fn prepare(&self, mut request: ApiRequest) -> AuthResult<ApiRequest> {
        let authorization = self.authenticator.authorization_header().await?;
        request.headers.insert(AUTHORIZATION, authorization);
        request
            .headers
            .entry(CONTENT_TYPE)
            .or_insert(HeaderValue::from_static("application/json"));

        debug!(method = %request.method, url = %request.url, "prepared authenticated request");
        Ok(request)
    }

    fn should_force_refresh(&self, error: &TransportError) -> bool {
        if !self.force_refresh_on_failure || error.status() != Some(StatusCode::UNAUTHORIZED) {
            return false;
        }
        let credentials = self.authenticator.credentials();
        credentials.access_token.is_some() && credentials.refresh_token.is_some()
    }
}

impl<T: HttpTransport> RequestExecutor<RefreshCoordinator<T>, T> {
    /// Build an executor around a coordinator, sharing its transport
    pub fn from_coordinator(coordinator: RefreshCoordinator<T>) -> Self {
        let transport = coordinator.transport();
        let force_refresh_on_failure = coordinator.config().force_refresh_on_failure;
        Self::new(Arc::new(coordinator), transport, force_refresh_on_failure)
    }

    /// Build an executor and coordinator over `transport`
    pub fn with_transport(config: AuthConfig, transport: T) -> Self {
        Self::from_coordinator(RefreshCoordinator::new(config, Arc::new(transport)))
    }

    /// The coordinator managing this executor's credentials
    pub fn coordinator(&self) -> &RefreshCoordinator<T> {
        &self.authenticator
    }
}

impl RequestExecutor<RefreshCoordinator<ReqwestTransport>, ReqwestTransport> {
    /// Build an executor using the default `reqwest` transport
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Config` if the HTTP client cannot be created
    pub fn from_config(config: AuthConfig, transport: &TransportConfig) -> AuthResult<Self> {
        let transport = ReqwestTransport::new(transport)
            .map_err(|e| AuthError::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_transport(config, transport))
    }
}
