// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Token acquisition, refresh and single-flight coordination
//!
//! [`RefreshCoordinator`] owns a client's [`CredentialStore`]. It decides when
//! the access token is stale, performs the acquisition (`POST
//! auth/api-key/{code}`) and refresh (`POST auth/refresh-token/{token}`) calls,
//! and guarantees at most one such call per [`RefreshKey`] at a time. Callers
//! that ask for a refresh already in flight share its outcome, error included.
//!
//! The coordinator never retries. Recovering from a rejected request is the
//! job of the [`RequestExecutor`](crate::RequestExecutor).

use std::{fmt, sync::Arc};

use chrono::Utc;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde_json::json;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
    Authenticator,
    config::AuthConfig,
    credentials::{CredentialStore, Credentials, TokenResponse},
    error::{AuthError, AuthResult},
    inflight::{InFlightTable, Ticket},
    transport::{ApiRequest, HttpTransport},
};

/// Receives every credential update made by a [`RefreshCoordinator`]
///
/// Observers run synchronously, in registration order, right after the new
/// credentials are stored.
#[cfg_attr(test, mockall::automock)]
pub trait CredentialsObserver: Send + Sync {
    /// Called with the credentials that were just stored
    fn on_tokens(&self, credentials: &Credentials);
}

impl<F> CredentialsObserver for F
where
    F: Fn(&Credentials) + Send + Sync,
{
    fn on_tokens(&self, credentials: &Credentials) {
        self(credentials);
    }
}

/// Identifies a refresh operation for de-duplication
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum RefreshKey {
    /// Exchange this refresh token for new credentials
    RefreshToken(String),
    /// No refresh token is held; acquire with the configured API key
    ApiKey,
}

impl RefreshKey {
    /// Key for a refresh with the given (possibly absent) refresh token
    pub fn for_token(refresh_token: Option<&str>) -> Self {
        match refresh_token {
            Some(token) if !token.is_empty() => Self::RefreshToken(token.to_string()),
            _ => Self::ApiKey,
        }
    }
}

impl fmt::Display for RefreshKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RefreshToken(_) => write!(f, "refresh-token"),
            Self::ApiKey => write!(f, "api-key"),
        }
    }
}

impl fmt::Debug for RefreshKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RefreshToken(_) => f.write_str("RefreshToken(***)"),
            Self::ApiKey => f.write_str("ApiKey"),
        }
    }
}

/// Owns the credentials of one client and keeps them fresh
pub struct RefreshCoordinator<T> {
    config: AuthConfig,
    transport: Arc<T>,
    store: CredentialStore,
    in_flight: InFlightTable<RefreshKey, AuthResult<Credentials>>,
    observers: Vec<Arc<dyn CredentialsObserver>>,
}

impl<T> fmt::Debug for RefreshCoordinator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("config", &self.config)
            .field("credentials", &self.store.get())
            .field("pending_refreshes", &self.in_flight.len())
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl<T: HttpTransport> RefreshCoordinator<T> {
    /// Create a coordinator with empty credentials
    pub fn new(config: AuthConfig, transport: Arc<T>) -> Self {
        Self {
            config,
            transport,
            store: CredentialStore::default(),
            in_flight: InFlightTable::new(),
            observers: Vec::new(),
        }
    }

    /// Start from pre-populated credentials
    #[must_use]
    pub fn with_credentials(self, credentials: Credentials) -> Self {
        self.store.replace(credentials);
        self
    }

    /// Register an observer for credential updates
    #[must_use]
    pub fn with_observer(mut self, observer: impl CredentialsObserver + 'static) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    /// The configuration this coordinator was built with
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(crate) fn transport(&self) -> Arc<T> {
        Arc::clone(&self.transport)
    }

    /// Snapshot of the current credentials
    pub fn credentials(&self) -> Credentials {
        self.store.get()
    }

    /// Replace the current credentials without notifying observers
    pub fn set_credentials(&self, credentials: Credentials) {
        self.store.replace(credentials);
    }

    /// Number of acquire/refresh calls currently in flight
    pub fn pending_refreshes(&self) -> usize {
        self.in_flight.len()
    }

    /// Whether the access token is within the eager refresh threshold of expiry
    ///
    /// Credentials without a recorded expiry are never considered expiring.
    pub fn is_expiring(&self) -> bool {
        self.store
            .get()
            .is_expiring_at(Utc::now(), self.config.eager_refresh_threshold)
    }

    /// Exchange an API key or one-time code for new credentials
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Auth` when the endpoint answers with an error status
    /// and `AuthError::Transport`/`AuthError::Timeout` when it cannot be reached
    pub async fn acquire(&self, code: &str) -> AuthResult<Credentials> {
        let url = self.config.endpoint(&["auth", "api-key", code])?;
        self.call_token_endpoint(url, "acquire").await
    }

    /// Refresh the credentials, sharing any refresh already in flight for the
    /// same key
    ///
    /// With no refresh token this acquires new credentials with the configured
    /// API key.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Config` when neither a refresh token nor an API key
    /// is available, otherwise the error of the acquire/refresh call
    pub async fn refresh(&self, refresh_token: Option<&str>) -> AuthResult<Credentials> {
        let key = RefreshKey::for_token(refresh_token);
        loop {
            match self.in_flight.join(key.clone()) {
                Ticket::Leader(slot) => {
                    let outcome = self.refresh_uncoordinated(&key).await;
                    slot.settle(outcome.clone());
                    return outcome;
                }
                Ticket::Follower(follower) => {
                    debug!(key = %key, "joining in-flight token refresh");
                    if let Some(outcome) = follower.wait().await {
                        return outcome;
                    }
                    warn!(key = %key, "in-flight token refresh was abandoned, starting a new one");
                }
            }
        }
    }

    /// Produce the `Authorization` header value, refreshing first if needed
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Config` when no access token, refresh token or API
    /// key is available, otherwise any error from the refresh
    pub async fn authorization_header(&self) -> AuthResult<HeaderValue> {
        let credentials = self.store.get();
        if credentials.is_empty() && self.config.api_key.is_none() {
            return Err(AuthError::config(
                "no access token, refresh token or API key is set",
            ));
        }

        let expiring =
            credentials.is_expiring_at(Utc::now(), self.config.eager_refresh_threshold);
        let access_token = match credentials.access_token {
            Some(token) if !expiring => token,
            _ => {
                debug!(
                    has_access_token = credentials.access_token.is_some(),
                    expiring, "access token needs refreshing"
                );
                self.refresh(credentials.refresh_token.as_deref())
                    .await?
                    .access_token
                    .ok_or_else(|| AuthError::InvalidResponse {
                        message: "token endpoint returned no access token".to_string(),
                    })?
            }
        };

        HeaderValue::from_str(&format!("Bearer {access_token}")).map_err(|e| {
            AuthError::InvalidResponse {
                message: format!("access token is not a valid header value: {e}"),
            }
        })
    }

    async fn refresh_uncoordinated(&self, key: &RefreshKey) -> AuthResult<Credentials> {
        match key {
            RefreshKey::ApiKey => {
                let api_key = self.config.api_key.as_ref().ok_or_else(|| {
                    AuthError::config("no refresh token is held and no API key is configured")
                })?;
                self.acquire(api_key.expose()).await
            }
            RefreshKey::RefreshToken(token) => {
                let url = self.config.endpoint(&["auth", "refresh-token", token])?;
                self.call_token_endpoint(url, "refresh").await
            }
        }
    }

    async fn call_token_endpoint(&self, url: Url, kind: &'static str) -> AuthResult<Credentials> {
        debug!(kind, "calling token endpoint");

        let request = ApiRequest::post(url, json!({}))
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let response = self.transport.execute(request).await.map_err(|e| {
            error!(kind, error = %e, "token endpoint call failed");
            AuthError::from_token_endpoint(e)
        })?;
        let token: TokenResponse = response.json()?;

        let credentials = Credentials::from_response(token, &self.store.get(), Utc::now());
        self.store.replace(credentials.clone());
        info!(
            kind,
            expires_at = ?credentials.expires_at,
            has_refresh_token = credentials.refresh_token.is_some(),
            "credentials updated"
        );

        for observer in &self.observers {
            observer.on_tokens(&credentials);
        }
        Ok(credentials)
    }
}

impl<T: HttpTransport> Authenticator for RefreshCoordinator<T> {
    fn credentials(&self) -> Credentials {
        self.store.get()
    }

    async fn authorization_header(&self) -> AuthResult<HeaderValue> {
        RefreshCoordinator::authorization_header(self).await
    }

    async fn refresh(&self, refresh_token: Option<&str>) -> AuthResult<Credentials> {
        RefreshCoordinator::refresh(self, refresh_token).await
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use chrono::TimeDelta;
    use reqwest::{Method, StatusCode, header::HeaderMap};

    use super::*;
    use crate::{
        config::ApiKey,
        transport::{ApiResponse, TransportError},
    };

    /// Replays canned responses and records every request it receives
    #[derive(Debug, Default)]
    struct StubTransport {
        requests: Mutex<Vec<ApiRequest>>,
        responses: Mutex<VecDeque<Result<ApiResponse, TransportError>>>,
    }

    impl StubTransport {
        fn replying(responses: Vec<Result<ApiResponse, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                responses: Mutex::new(responses.into()),
            })
        }

        fn requests(&self) -> Vec<ApiRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl HttpTransport for StubTransport {
        async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
            self.requests.lock().unwrap().push(request);
            // Give concurrent callers a chance to pile up behind this call.
            tokio::task::yield_now().await;
            let next = self.responses.lock().unwrap().pop_front();
            next.unwrap_or_else(|| {
                Err(TransportError::Network {
                    message: "no canned response".to_string(),
                })
            })
        }
    }

    fn token(body: serde_json::Value) -> Result<ApiResponse, TransportError> {
        Ok(ApiResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: body.to_string(),
        })
    }

    fn rejected(status: StatusCode) -> Result<ApiResponse, TransportError> {
        Err(TransportError::Status {
            status,
            body: "rejected".to_string(),
        })
    }

    fn config(api_key: Option<&str>) -> AuthConfig {
        let config = AuthConfig::new("http://auth.example.com").unwrap();
        match api_key {
            Some(key) => config.with_api_key(ApiKey::new(key).unwrap()),
            None => config,
        }
    }

    #[tokio::test]
    async fn acquire_stores_and_notifies() {
        let transport = StubTransport::replying(vec![token(json!({
            "accessToken": "abc123",
            "refreshToken": "rf1",
            "expiresIn": 3600
        }))]);
        let mut observer = MockCredentialsObserver::new();
        observer
            .expect_on_tokens()
            .withf(|credentials| credentials.access_token.as_deref() == Some("abc123"))
            .times(1)
            .return_const(());

        let coordinator =
            RefreshCoordinator::new(config(None), Arc::clone(&transport)).with_observer(observer);
        let credentials = coordinator.acquire("SOME_CODE").await.unwrap();

        assert_eq!(credentials.refresh_token.as_deref(), Some("rf1"));
        assert_eq!(coordinator.credentials(), credentials);

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[0].url.path(), "/auth/api-key/SOME_CODE");
        assert_eq!(requests[0].body, Some(json!({})));
    }

    #[tokio::test]
    async fn acquire_failure_is_auth_error() {
        let transport = StubTransport::replying(vec![rejected(StatusCode::FORBIDDEN)]);
        let coordinator = RefreshCoordinator::new(config(None), transport);

        let error = coordinator.acquire("bad").await.unwrap_err();
        assert_eq!(error.status(), Some(StatusCode::FORBIDDEN));
        assert!(matches!(error, AuthError::Auth { .. }));
        assert!(coordinator.credentials().is_empty());
    }

    #[tokio::test]
    async fn refresh_without_token_or_api_key_is_config_error() {
        let transport = StubTransport::replying(vec![]);
        let coordinator = RefreshCoordinator::new(config(None), Arc::clone(&transport));

        let error = coordinator.refresh(None).await.unwrap_err();
        assert!(matches!(error, AuthError::Config { .. }));
        assert!(transport.requests().is_empty());
        assert_eq!(coordinator.pending_refreshes(), 0);
    }

    #[tokio::test]
    async fn refresh_without_token_acquires_with_api_key() {
        let transport =
            StubTransport::replying(vec![token(json!({"accessToken": "abc123", "expiresIn": 60}))]);
        let coordinator = RefreshCoordinator::new(config(Some("SOME_CODE")), Arc::clone(&transport));

        coordinator.refresh(None).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url.path(), "/auth/api-key/SOME_CODE");
    }

    #[tokio::test]
    async fn concurrent_refreshes_share_one_call() {
        let transport = StubTransport::replying(vec![token(json!({
            "accessToken": "fresh",
            "expiresIn": 3600
        }))]);
        let coordinator = RefreshCoordinator::new(config(None), Arc::clone(&transport))
            .with_credentials(Credentials::with_access_token("stale").refresh_token("rf1"));

        let (a, b, c) = tokio::join!(
            coordinator.refresh(Some("rf1")),
            coordinator.refresh(Some("rf1")),
            coordinator.refresh(Some("rf1")),
        );

        assert_eq!(transport.requests().len(), 1);
        let a = a.unwrap();
        assert_eq!(a.access_token.as_deref(), Some("fresh"));
        assert_eq!(a.refresh_token.as_deref(), Some("rf1"));
        assert_eq!(b.unwrap(), a);
        assert_eq!(c.unwrap(), a);
        assert_eq!(coordinator.pending_refreshes(), 0);
    }

    #[tokio::test]
    async fn concurrent_refreshes_share_failure_then_release_key() {
        let transport = StubTransport::replying(vec![
            rejected(StatusCode::UNAUTHORIZED),
            token(json!({"accessToken": "second"})),
        ]);
        let coordinator = RefreshCoordinator::new(config(None), Arc::clone(&transport));

        let (a, b) = tokio::join!(
            coordinator.refresh(Some("rf1")),
            coordinator.refresh(Some("rf1")),
        );
        assert_eq!(transport.requests().len(), 1);
        assert!(matches!(a, Err(AuthError::Auth { .. })));
        assert_eq!(a, b);

        let retried = coordinator.refresh(Some("rf1")).await.unwrap();
        assert_eq!(retried.access_token.as_deref(), Some("second"));
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn distinct_keys_do_not_share() {
        let transport = StubTransport::replying(vec![
            token(json!({"accessToken": "one"})),
            token(json!({"accessToken": "two"})),
        ]);
        let coordinator = RefreshCoordinator::new(config(None), Arc::clone(&transport));

        let (a, b) = tokio::join!(
            coordinator.refresh(Some("rf1")),
            coordinator.refresh(Some("rf2")),
        );

        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn authorization_header_requires_some_credential() {
        let transport = StubTransport::replying(vec![]);
        let coordinator = RefreshCoordinator::new(config(None), transport);

        let error = coordinator.authorization_header().await.unwrap_err();
        assert!(matches!(error, AuthError::Config { .. }));
    }

    #[tokio::test]
    async fn authorization_header_uses_fresh_token_without_calls() {
        let transport = StubTransport::replying(vec![]);
        let coordinator = RefreshCoordinator::new(config(None), Arc::clone(&transport))
            .with_credentials(
                Credentials::with_access_token("abc123")
                    .expires_at(Utc::now() + TimeDelta::hours(1)),
            );

        let header = coordinator.authorization_header().await.unwrap();
        assert_eq!(header, "Bearer abc123");
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn authorization_header_refreshes_expired_token() {
        let transport =
            StubTransport::replying(vec![token(json!({"accessToken": "new", "expiresIn": 3600}))]);
        let coordinator = RefreshCoordinator::new(config(None), Arc::clone(&transport))
            .with_credentials(
                Credentials::with_access_token("old")
                    .refresh_token("rf1")
                    .expires_at(Utc::now() - TimeDelta::seconds(1000)),
            );

        let header = coordinator.authorization_header().await.unwrap();
        assert_eq!(header, "Bearer new");
        assert_eq!(transport.requests()[0].url.path(), "/auth/refresh-token/rf1");
    }

    #[test]
    fn expiry_threshold() {
        let transport = StubTransport::replying(vec![]);
        let coordinator = RefreshCoordinator::new(
            config(None).with_eager_refresh_threshold(Duration::from_secs(5)),
            transport,
        );

        coordinator.set_credentials(
            Credentials::with_access_token("a").expires_at(Utc::now() + TimeDelta::seconds(3)),
        );
        assert!(coordinator.is_expiring());

        coordinator.set_credentials(
            Credentials::with_access_token("a").expires_at(Utc::now() + TimeDelta::seconds(10)),
        );
        assert!(!coordinator.is_expiring());

        coordinator.set_credentials(Credentials::with_access_token("a"));
        assert!(!coordinator.is_expiring());
    }

    #[tokio::test]
    async fn closure_observers_run_in_order() {
        let transport = StubTransport::replying(vec![token(json!({"accessToken": "abc123"}))]);
        let order = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::new(AtomicUsize::new(0));

        let first = Arc::clone(&order);
        let second = Arc::clone(&order);
        let counter = Arc::clone(&seen);
        let coordinator = RefreshCoordinator::new(config(None), transport)
            .with_observer(move |_: &Credentials| first.lock().unwrap().push("first"))
            .with_observer(move |credentials: &Credentials| {
                assert_eq!(credentials.access_token.as_deref(), Some("abc123"));
                counter.fetch_add(1, Ordering::SeqCst);
                second.lock().unwrap().push("second");
            });

        coordinator.acquire("code").await.unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn refresh_key_hides_token() {
        let key = RefreshKey::for_token(Some("secret"));
        assert_eq!(key, RefreshKey::RefreshToken("secret".to_string()));
        assert_eq!(key.to_string(), "refresh-token");
        assert!(!format!("{key:?}").contains("secret"));

        assert_eq!(RefreshKey::for_token(None), RefreshKey::ApiKey);
        assert_eq!(RefreshKey::for_token(Some("")), RefreshKey::ApiKey);
    }
}
