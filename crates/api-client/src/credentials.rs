// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Credentials and the in-memory credential store

use std::{
    fmt,
    sync::{PoisonError, RwLock},
    time::Duration,
};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Bearer credentials held by a client
///
/// `expires_at` is always an absolute instant. Token values are redacted in
/// `Debug` output.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Short-lived bearer token
    pub access_token: Option<String>,
    /// Longer-lived token exchanged for a new access token
    pub refresh_token: Option<String>,
    /// When the access token stops being valid
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credentials {
    /// Credentials with an access token and no refresh token or expiry
    pub fn with_access_token(access_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            ..Self::default()
        }
    }

    /// Set the refresh token
    #[must_use]
    pub fn refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Set the absolute expiry
    #[must_use]
    pub fn expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Whether no token of any kind is held
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }

    /// Whether the access token expires within `threshold` of `now`
    ///
    /// A missing expiry is treated as never expiring.
    pub fn is_expiring_at(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        let Some(expires_at) = self.expires_at else {
            return false;
        };
        let threshold = TimeDelta::from_std(threshold).unwrap_or(TimeDelta::MAX);
        now.checked_add_signed(threshold)
            .is_none_or(|deadline| deadline >= expires_at)
    }

    /// Build replacement credentials from a token endpoint response
    ///
    /// The relative `expiresIn` is anchored at `now`. A refresh token missing
    /// from the response is carried over from `previous`.
    pub fn from_response(
        response: TokenResponse,
        previous: &Credentials,
        now: DateTime<Utc>,
    ) -> Self {
        let refresh_token = response
            .refresh_token
            .filter(|token| !token.is_empty())
            .or_else(|| previous.refresh_token.clone());
        let expires_at = response
            .expires_in
            .and_then(lifetime)
            .and_then(|lifetime| now.checked_add_signed(lifetime));

        Self {
            access_token: Some(response.access_token),
            refresh_token,
            expires_at,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "***"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Lifetime of `seconds`, which may be fractional
///
/// A negative value is an already expired token. `None` when the lifetime
/// does not fit a `TimeDelta`.
fn lifetime(seconds: f64) -> Option<TimeDelta> {
    let lifetime = Duration::try_from_secs_f64(seconds.max(0.0)).ok()?;
    TimeDelta::from_std(lifetime).ok()
}

/// Body returned by the token acquisition and refresh endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    /// New access token
    pub access_token: String,
    /// New refresh token, when the server rotates it
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds from now
    #[serde(default)]
    pub expires_in: Option<f64>,
}

/// Holds the current credentials for one client
///
/// Reads return a snapshot; writes replace the whole value.
#[derive(Debug, Default)]
pub struct CredentialStore {
    current: RwLock<Credentials>,
}

impl CredentialStore {
    /// Create a store holding `credentials`
    pub fn new(credentials: Credentials) -> Self {
        Self {
            current: RwLock::new(credentials),
        }
    }

    /// Snapshot of the current credentials
    pub fn get(&self) -> Credentials {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the current credentials
    pub fn replace(&self, credentials: Credentials) {
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = credentials;
    }
}
