// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Typed client for the NFT metadata protocol API
//!
//! This crate exposes the API's NFT, collection, provider and metadata-update
//! endpoints as typed async methods. Authentication is delegated to
//! [`api_client`], which keeps bearer tokens fresh and retries a request once
//! after a 401.
//!
//! # Architecture
//!
//! - **Facade**: [`client::NftApiClient`] - one client per chain, typed requests and responses
//! - **Registry**: [`registry::ChainClients`] - explicit per-chain client lookup
//! - **Settings**: [`settings::ClientSettings`] - layered file and environment configuration
//! - **Query Building**: [`query::QueryParams`] - deterministic, order-preserving query strings
//!
//! # Features
//!
//! - **Per-Chain Isolation**: Each chain has its own base URL and credentials
//! - **Signed Metadata Updates**: [`types::MetadataUpdate::signing_digest`] yields the digest a wallet signs
//! - **Pagination**: Offset/limit pages with `{ items, total }` responses

pub mod chain;
pub mod client;
pub mod error;
pub mod query;
pub mod registry;
pub mod settings;
pub mod types;

pub use chain::*;
pub use client::*;
pub use error::*;
pub use query::QueryParams;
pub use registry::*;
pub use settings::ClientSettings;
pub use types::*;
