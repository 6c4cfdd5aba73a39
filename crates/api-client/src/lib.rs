// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Bearer-token credential management for the NFT protocol API
//!
//! This crate keeps a client's access token valid and attaches it to outgoing
//! requests. It is transport-agnostic: anything implementing [`HttpTransport`]
//! can carry the requests, with [`ReqwestTransport`] as the default.
//!
//! # Core Abstractions
//!
//! - **[`CredentialStore`]**: Holds the current access token, refresh token and absolute expiry
//! - **[`RefreshCoordinator`]**: Acquires and refreshes tokens, one call per key at a time
//! - **[`RequestExecutor`]**: Sends authenticated requests, recovering once from HTTP 401
//! - **[`Authenticator`] Trait**: The seam between the executor and whatever supplies tokens
//!
//! # Key Features
//!
//! - **Eager Refresh**: Tokens within the configured threshold of expiry are refreshed before use
//! - **Single-Flight Refresh**: Concurrent refreshes for the same token share one network call
//! - **Bounded Retry**: A request rejected with 401 is retried at most once after a forced refresh
//! - **Redaction**: Token values never appear in `Debug` output or logs

use reqwest::header::HeaderValue;

pub mod config;
pub mod coordinator;
pub mod credentials;
pub mod error;
pub mod executor;
pub mod inflight;
pub mod transport;

pub use config::*;
pub use coordinator::*;
pub use credentials::*;
pub use error::*;
pub use executor::*;
pub use transport::*;

/// Supplies bearer tokens to a [`RequestExecutor`]
///
/// [`RefreshCoordinator`] is the production implementation.
pub trait Authenticator: Send + Sync {
    /// Snapshot of the current credentials
    fn credentials(&self) -> Credentials;

    /// Produce the `Authorization` header value, refreshing first if needed
    ///
    /// # Errors
    ///
    /// Returns an error if no usable token can be obtained
    fn authorization_header(&self) -> impl Future<Output = AuthResult<HeaderValue>> + Send;

    /// Refresh the credentials with the given refresh token, or acquire new
    /// ones when it is absent
    ///
    /// # Errors
    ///
    /// Returns an error if the acquire or refresh call fails
    fn refresh(
        &self,
        refresh_token: Option<&str>,
    ) -> impl Future<Output = AuthResult<Credentials>> + Send;
}
