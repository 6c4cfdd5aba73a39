// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Typed facade over the authenticated executor for one chain

use alloy_primitives::Address;
use api_client::{
    ApiRequest, AuthConfig, AuthenticatedClient, HttpTransport, RefreshCoordinator,
    ReqwestTransport, TransportConfig,
};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::{
    chain::ChainType,
    error::{NftClientError, NftClientResult},
    query::QueryParams,
    types::{
        Collection, CollectionFilter, MetadataUpdateReceipt, NftDetail, NftFilter, Page,
        Paginated, Provider, SignedMetadataUpdate,
    },
};

/// NFT protocol API client for a single chain
///
/// Paths are resolved against the chain's base URL, which also hosts the
/// token endpoints. Every call goes through the executor, so tokens are
/// refreshed as needed and a 401 is retried once.
#[derive(Debug, Clone)]
pub struct NftApiClient<T = ReqwestTransport> {
    chain: ChainType,
    executor: AuthenticatedClient<T>,
}

impl NftApiClient<ReqwestTransport> {
    /// Create a client using the default `reqwest` transport
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created
    pub fn new(
        chain: ChainType,
        auth: AuthConfig,
        transport: &TransportConfig,
    ) -> NftClientResult<Self> {
        let executor = AuthenticatedClient::from_config(auth, transport)?;
        Ok(Self::with_executor(chain, executor))
    }
}

impl<T: HttpTransport> NftApiClient<T> {
    /// Wrap an existing executor
    pub fn with_executor(chain: ChainType, executor: AuthenticatedClient<T>) -> Self {
        Self { chain, executor }
    }

    /// Chain this client talks to
    pub fn chain(&self) -> ChainType {
        self.chain
    }

    /// Base URL requests are resolved against
    pub fn base_url(&self) -> &Url {
        &self.coordinator().config().base_url
    }

    /// Credential coordinator, for acquiring tokens or pre-populating credentials
    pub fn coordinator(&self) -> &RefreshCoordinator<T> {
        self.executor.coordinator()
    }

    /// Fetch one NFT with its metadata
    pub async fn get_nft(&self, contract: Address, token_id: &str) -> NftClientResult<NftDetail> {
        let contract = contract.to_string();
        let url = self.url(&["nft", &contract, token_id], None)?;
        self.get(url).await
    }

    /// List NFTs matching `filter`
    pub async fn list_nfts(
        &self,
        filter: &NftFilter,
        page: Page,
    ) -> NftClientResult<Paginated<NftDetail>> {
        let mut query = QueryParams::new();
        filter.write_query(&mut query);
        page.write_query(&mut query);
        let url = self.url(&["nfts"], Some(&query))?;
        self.get(url).await
    }

    /// Fetch one collection
    pub async fn get_collection(&self, contract: Address) -> NftClientResult<Collection> {
        let contract = contract.to_string();
        let url = self.url(&["collection", &contract], None)?;
        self.get(url).await
    }

    /// List collections matching `filter`
    pub async fn list_collections(
        &self,
        filter: &CollectionFilter,
        page: Page,
    ) -> NftClientResult<Paginated<Collection>> {
        let mut query = QueryParams::new();
        filter.write_query(&mut query);
        page.write_query(&mut query);
        let url = self.url(&["collections"], Some(&query))?;
        self.get(url).await
    }

    /// List registered metadata providers
    pub async fn get_providers(&self, page: Page) -> NftClientResult<Paginated<Provider>> {
        let mut query = QueryParams::new();
        page.write_query(&mut query);
        let url = self.url(&["providers"], Some(&query))?;
        self.get(url).await
    }

    /// Fetch one metadata provider
    pub async fn get_provider(&self, address: Address) -> NftClientResult<Provider> {
        let address = address.to_string();
        let url = self.url(&["provider", &address], None)?;
        self.get(url).await
    }

    /// Submit a signed metadata update
    ///
    /// # Errors
    ///
    /// Returns `NftClientError::InvalidRequest` without sending anything when
    /// the update targets another chain or its digest no longer matches
    pub async fn update_metadata(
        &self,
        signed: &SignedMetadataUpdate,
    ) -> NftClientResult<MetadataUpdateReceipt> {
        if signed.update.chain_id != self.chain {
            return Err(NftClientError::InvalidRequest {
                message: format!(
                    "update targets {} but this client serves {}",
                    signed.update.chain_id, self.chain
                ),
            });
        }
        if !signed.is_consistent() {
            return Err(NftClientError::InvalidRequest {
                message: "digest does not match the signed update".to_string(),
            });
        }

        let url = self.url(&["metadata", "update"], None)?;
        let body = serde_json::to_value(signed).map_err(|e| NftClientError::InvalidRequest {
            message: e.to_string(),
        })?;
        debug!(chain = %self.chain, %url, "submitting metadata update");
        let receipt: MetadataUpdateReceipt =
            self.executor.send_json(ApiRequest::post(url, body)).await?;
        debug!(id = %receipt.id, status = ?receipt.status, "metadata update accepted");
        Ok(receipt)
    }

    /// Fetch the state of a submitted metadata update
    pub async fn get_metadata_update(&self, id: &str) -> NftClientResult<MetadataUpdateReceipt> {
        let url = self.url(&["metadata", "update", id], None)?;
        self.get(url).await
    }

    fn url(&self, segments: &[&str], query: Option<&QueryParams>) -> NftClientResult<Url> {
        let mut url = self.base_url().clone();
        url.path_segments_mut()
            .map_err(|()| NftClientError::InvalidUrl {
                message: format!("'{}' cannot be a base URL", self.base_url()),
            })?
            .pop_if_empty()
            .extend(segments);
        if let Some(query) = query {
            query.apply(&mut url);
        }
        Ok(url)
    }

    async fn get<R: DeserializeOwned>(&self, url: Url) -> NftClientResult<R> {
        debug!(chain = %self.chain, %url, "fetching");
        Ok(self.executor.send_json(ApiRequest::get(url)).await?)
    }
}
