// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Per-chain client registry
//!
//! Each chain gets its own [`NftApiClient`] with independent credentials. The
//! registry is built once and passed to whoever needs chain access.

use std::collections::BTreeMap;

use api_client::{HttpTransport, ReqwestTransport};
use tracing::{debug, info};

use crate::{
    chain::ChainType,
    client::NftApiClient,
    error::{NftClientError, NftClientResult},
};

/// Registry of API clients keyed by chain
#[derive(Debug)]
pub struct ChainClients<T = ReqwestTransport> {
    clients: BTreeMap<ChainType, NftApiClient<T>>,
}

impl<T> Default for ChainClients<T> {
    fn default() -> Self {
        Self {
            clients: BTreeMap::new(),
        }
    }
}

impl<T: HttpTransport> ChainClients<T> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client for its chain, returning the client it replaces
    pub fn insert(&mut self, client: NftApiClient<T>) -> Option<NftApiClient<T>> {
        let chain = client.chain();
        let previous = self.clients.insert(chain, client);
        if previous.is_some() {
            info!(%chain, "replaced registered client");
        } else {
            debug!(%chain, "registered client");
        }
        previous
    }

    /// Client for `chain`
    ///
    /// # Errors
    ///
    /// Returns `NftClientError::ChainNotRegistered` if no client serves the chain
    pub fn get(&self, chain: ChainType) -> NftClientResult<&NftApiClient<T>> {
        self.clients
            .get(&chain)
            .ok_or(NftClientError::ChainNotRegistered { chain })
    }

    /// Whether a client serves `chain`
    pub fn contains(&self, chain: ChainType) -> bool {
        self.clients.contains_key(&chain)
    }

    /// Registered chains, in chain order
    pub fn chains(&self) -> impl Iterator<Item = ChainType> + '_ {
        self.clients.keys().copied()
    }

    /// Registered clients, in chain order
    pub fn iter(&self) -> impl Iterator<Item = &NftApiClient<T>> {
        self.clients.values()
    }

    /// Number of registered chains
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether no chain is registered
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
