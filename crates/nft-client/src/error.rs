// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Errors returned by the NFT API facade

use api_client::AuthError;
use reqwest::StatusCode;
use thiserror::Error;

use crate::chain::{ChainParseError, ChainType};

/// Result type alias for facade operations
pub type NftClientResult<T> = Result<T, NftClientError>;

/// Errors surfaced by [`NftApiClient`](crate::NftApiClient) and [`ChainClients`](crate::ChainClients)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum NftClientError {
    /// Authentication, transport or upstream failure, or an undecodable body
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A request URL could not be built
    #[error("Invalid URL: {message}")]
    InvalidUrl { message: String },

    /// A request was rejected before being sent
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// No client was registered for the chain
    #[error("No client registered for chain {chain}")]
    ChainNotRegistered { chain: ChainType },

    /// A chain identifier could not be parsed
    #[error(transparent)]
    Chain(#[from] ChainParseError),
}

impl NftClientError {
    /// HTTP status of an upstream or token endpoint failure
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Auth(error) => error.status(),
            _ => None,
        }
    }
}
