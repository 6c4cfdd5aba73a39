// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for credential management and authenticated requests
//!
//! Every variant carries plain data (status codes, bodies, messages) so an error
//! can be cloned and handed to each caller that joined the same in-flight
//! token refresh.

use reqwest::StatusCode;
use thiserror::Error;

use crate::transport::TransportError;

/// Result type alias for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors surfaced by the credential manager and the request executor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum AuthError {
    /// Nothing to authenticate with, or the client was built with invalid settings
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The token acquisition or refresh endpoint rejected the call
    #[error("Authentication failed: {status} - {body}")]
    Auth { status: StatusCode, body: String },

    /// Network-level failure with no HTTP response
    #[error("HTTP request failed: {message}")]
    Transport { message: String },

    /// The transport gave up waiting for a response
    #[error("Request timeout after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// An authenticated request came back with an error status
    #[error("Upstream error: {status} - {body}")]
    Upstream { status: StatusCode, body: String },

    /// A successful response body could not be decoded
    #[error("Invalid response format: {message}")]
    InvalidResponse { message: String },
}

impl AuthError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// HTTP status attached to this error, if the server answered at all
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Auth { status, .. } | Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Response body attached to this error, if the server answered at all
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Auth { body, .. } | Self::Upstream { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Whether this error stems from an HTTP 401 response
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// Map a transport failure from a token endpoint call
    pub(crate) fn from_token_endpoint(error: TransportError) -> Self {
        match error {
            TransportError::Status { status, body } => Self::Auth { status, body },
            other => other.into(),
        }
    }
}

impl From<TransportError> for AuthError {
    fn from(value: TransportError) -> Self {
        match value {
            TransportError::Status { status, body } => Self::Upstream { status, body },
            TransportError::Network { message } => Self::Transport { message },
            TransportError::Timeout { seconds } => Self::Timeout { seconds },
        }
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidResponse {
            message: value.to_string(),
        }
    }
}
