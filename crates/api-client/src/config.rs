// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Authentication and transport configuration
//!
//! Both configurations are immutable once a client is built. Values are
//! validated on construction so a client never starts with an empty API key, a
//! non-HTTP base URL or an unbounded request timeout.

use std::{fmt, time::Duration};

use anyhow::{Result, ensure};
use url::Url;

use crate::error::{AuthError, AuthResult};

/// Default margin before expiry at which a token is refreshed
pub const DEFAULT_EAGER_REFRESH_THRESHOLD: Duration = Duration::from_secs(300);

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const MAX_TIMEOUT_SECONDS: u64 = 300;
const DEFAULT_USER_AGENT: &str = concat!("nft-sdk/", env!("CARGO_PKG_VERSION"));

/// An API key (or one-time code) exchanged for bearer tokens
///
/// Never empty. `Debug` and `Display` redact the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(Box<str>);

impl ApiKey {
    /// Wrap a key, rejecting empty or whitespace-only input
    pub fn new(key: impl Into<String>) -> AuthResult<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(AuthError::config("API key cannot be empty"));
        }
        Ok(Self(key.into_boxed_str()))
    }

    /// The raw key, for building the acquisition URL
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Configuration for the credential manager
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Key used to acquire tokens when no refresh token is available
    pub api_key: Option<ApiKey>,
    /// Root URL of the API; token endpoints live under `auth/`
    pub base_url: Url,
    /// Tokens expiring within this margin are refreshed before use
    pub eager_refresh_threshold: Duration,
    /// Refresh and retry once when an authenticated request gets HTTP 401
    pub force_refresh_on_failure: bool,
}

impl AuthConfig {
    /// Create a configuration for `base_url` with default refresh behaviour
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Config` unless the base URL is an absolute `http`
    /// or `https` URL
    pub fn new(base_url: &str) -> AuthResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AuthError::config(format!("invalid base URL '{base_url}': {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(AuthError::config(format!(
                "base URL must be an http(s) URL, got '{base_url}'"
            )));
        }

        Ok(Self {
            api_key: None,
            base_url,
            eager_refresh_threshold: DEFAULT_EAGER_REFRESH_THRESHOLD,
            force_refresh_on_failure: true,
        })
    }

    /// Set the API key
    #[must_use]
    pub fn with_api_key(mut self, api_key: ApiKey) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// Set the eager refresh threshold
    #[must_use]
    pub fn with_eager_refresh_threshold(mut self, threshold: Duration) -> Self {
        self.eager_refresh_threshold = threshold;
        self
    }

    /// Enable or disable the forced refresh on HTTP 401
    #[must_use]
    pub fn with_force_refresh_on_failure(mut self, enabled: bool) -> Self {
        self.force_refresh_on_failure = enabled;
        self
    }

    /// Build an endpoint URL by appending path segments to the base URL
    ///
    /// Segments are percent-encoded, so tokens and codes can be embedded safely.
    pub fn endpoint(&self, segments: &[&str]) -> AuthResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| AuthError::config(format!("base URL '{}' cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// A validated request timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutSeconds(Duration);

impl TimeoutSeconds {
    /// Create a timeout between 1 and 300 seconds
    ///
    /// # Errors
    ///
    /// Returns an error if the value is 0 or greater than 300
    pub fn new(seconds: u64) -> Result<Self> {
        ensure!(seconds != 0, "timeout must be greater than 0");
        ensure!(
            seconds <= MAX_TIMEOUT_SECONDS,
            "timeout cannot exceed {MAX_TIMEOUT_SECONDS}"
        );
        Ok(Self(Duration::from_secs(seconds)))
    }

    /// The timeout as a duration
    pub fn value(&self) -> Duration {
        self.0
    }
}

impl Default for TimeoutSeconds {
    fn default() -> Self {
        Self(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS))
    }
}

/// Configuration for [`ReqwestTransport`](crate::ReqwestTransport)
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Per-request timeout
    pub timeout: TimeoutSeconds,
    /// `User-Agent` header sent with every request
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: TimeoutSeconds::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_validation() {
        assert!(ApiKey::new("").is_err());
        assert!(ApiKey::new(" \t ").is_err());

        let key = ApiKey::new("SOME_CODE").unwrap();
        assert_eq!(key.expose(), "SOME_CODE");
        assert_eq!(format!("{key:?}"), "ApiKey(***)");
        assert_eq!(key.to_string(), "***");
    }

    #[test]
    fn auth_config_defaults() {
        let config = AuthConfig::new("https://api.example.com").unwrap();
        assert!(config.api_key.is_none());
        assert_eq!(config.eager_refresh_threshold, Duration::from_secs(300));
        assert!(config.force_refresh_on_failure);
    }

    #[test]
    fn auth_config_rejects_bad_urls() {
        assert!(AuthConfig::new("not a url").is_err());
        assert!(AuthConfig::new("ftp://example.com").is_err());
        assert!(AuthConfig::new("mailto:someone@example.com").is_err());
    }

    #[test]
    fn endpoint_appends_encoded_segments() {
        let config = AuthConfig::new("https://api.example.com/v1/").unwrap();
        let url = config.endpoint(&["auth", "refresh-token", "a/b c"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/v1/auth/refresh-token/a%2Fb%20c"
        );

        let config = AuthConfig::new("https://api.example.com").unwrap();
        let url = config.endpoint(&["auth", "api-key", "SOME_CODE"]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/auth/api-key/SOME_CODE");
    }

    #[test]
    fn timeout_validation() {
        assert!(TimeoutSeconds::new(0).is_err());
        assert!(TimeoutSeconds::new(301).is_err());
        assert_eq!(
            TimeoutSeconds::new(300).unwrap().value(),
            Duration::from_secs(300)
        );
        assert_eq!(TimeoutSeconds::default().value(), Duration::from_secs(30));
    }
}
