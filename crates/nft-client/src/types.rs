// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Request and response types for the NFT protocol API

use alloy_primitives::{Address, B256, Bytes, U256, keccak256};
use serde::{Deserialize, Serialize};

use crate::{chain::ChainType, query::QueryParams};

const DEFAULT_PAGE_LIMIT: u64 = 20;

/// Offset/limit pagination for list endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Number of items to skip
    pub offset: u64,
    /// Maximum number of items to return
    pub limit: u64,
}

impl Page {
    /// Page starting at `offset` with up to `limit` items
    pub const fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    /// The page following this one
    #[must_use]
    pub const fn next(self) -> Self {
        Self {
            offset: self.offset.saturating_add(self.limit),
            limit: self.limit,
        }
    }

    pub(crate) fn write_query(self, params: &mut QueryParams) {
        params.push("offset", self.offset).push("limit", self.limit);
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_LIMIT)
    }
}

/// One page of a list endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginated<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Total number of matching items across all pages
    pub total: u64,
}

impl<T> Paginated<T> {
    /// Whether items remain after `page`
    pub fn has_more(&self, page: Page) -> bool {
        let seen = u64::try_from(self.items.len()).unwrap_or(u64::MAX);
        page.offset.saturating_add(seen) < self.total
    }
}

/// Token standard of a contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractType {
    /// ERC-721 non-fungible token
    #[serde(rename = "ERC721")]
    Erc721,
    /// ERC-1155 multi-token
    #[serde(rename = "ERC1155")]
    Erc1155,
}

impl ContractType {
    /// Wire name of the standard
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Erc721 => "ERC721",
            Self::Erc1155 => "ERC1155",
        }
    }
}

/// An NFT and its resolved metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftDetail {
    /// Contract the token belongs to
    pub contract_address: Address,
    /// Token ID as a decimal string
    pub token_id: String,
    /// Chain the token lives on
    #[serde(default)]
    pub chain_id: Option<ChainType>,
    /// Current owner
    #[serde(default)]
    pub owner: Option<Address>,
    /// Token name from metadata
    #[serde(default)]
    pub name: Option<String>,
    /// Token description from metadata
    #[serde(default)]
    pub description: Option<String>,
    /// Image URI from metadata
    #[serde(default)]
    pub image: Option<String>,
    /// URI the metadata was resolved from
    #[serde(default)]
    pub token_uri: Option<String>,
    /// Raw metadata document
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// An NFT collection (one contract)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    /// Collection contract
    pub contract_address: Address,
    /// Chain the contract lives on
    #[serde(default)]
    pub chain_id: Option<ChainType>,
    /// Collection name
    #[serde(default)]
    pub name: Option<String>,
    /// Collection symbol
    #[serde(default)]
    pub symbol: Option<String>,
    /// Token standard
    #[serde(default)]
    pub contract_type: Option<ContractType>,
    /// Number of minted tokens
    #[serde(default)]
    pub total_supply: Option<u64>,
}

/// A metadata provider registered with the protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    /// Provider account
    pub address: Address,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Provider endpoint
    #[serde(default)]
    pub url: Option<String>,
    /// Whether the provider currently serves updates
    #[serde(default)]
    pub active: bool,
}

/// Filter for [`list_nfts`](crate::NftApiClient::list_nfts)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NftFilter {
    /// Only tokens held by this account
    pub owner: Option<Address>,
    /// Only tokens of this contract
    pub contract: Option<Address>,
    /// Free-text search over names and descriptions
    pub search: Option<String>,
    /// Match on metadata attributes, sent JSON-encoded
    pub attributes: Option<serde_json::Value>,
}

impl NftFilter {
    pub(crate) fn write_query(&self, params: &mut QueryParams) {
        params
            .push("owner", self.owner.map(|owner| owner.to_string()))
            .push("contract", self.contract.map(|contract| contract.to_string()))
            .push("search", self.search.clone())
            .push("attributes", self.attributes.clone());
    }
}

/// Filter for [`list_collections`](crate::NftApiClient::list_collections)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionFilter {
    /// Free-text search over collection names
    pub search: Option<String>,
    /// Only collections of these token standards, sent JSON-encoded
    pub contract_types: Vec<ContractType>,
}

impl CollectionFilter {
    pub(crate) fn write_query(&self, params: &mut QueryParams) {
        params.push("search", self.search.clone());
        if !self.contract_types.is_empty() {
            let types: Vec<&str> = self.contract_types.iter().map(|kind| kind.as_str()).collect();
            params.push("contractTypes", types);
        }
    }
}

/// A request to point a token at new metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataUpdate {
    /// Chain the token lives on
    pub chain_id: ChainType,
    /// Token contract
    pub contract_address: Address,
    /// Token to update
    pub token_id: U256,
    /// New metadata location
    pub metadata_uri: String,
    /// Replay protection, unique per signer
    pub nonce: u64,
}

impl MetadataUpdate {
    /// Digest a wallet signs to authorize this update
    ///
    /// `keccak256(chain_id_be8 || contract || token_id_be32 || keccak256(metadata_uri) || nonce_be8)`
    pub fn signing_digest(&self) -> B256 {
        let mut preimage = Vec::with_capacity(8 + 20 + 32 + 32 + 8);
        preimage.extend_from_slice(&self.chain_id.id().to_be_bytes());
        preimage.extend_from_slice(self.contract_address.as_slice());
        preimage.extend_from_slice(&self.token_id.to_be_bytes::<32>());
        preimage.extend_from_slice(keccak256(self.metadata_uri.as_bytes()).as_slice());
        preimage.extend_from_slice(&self.nonce.to_be_bytes());
        keccak256(preimage)
    }

    /// Attach the signer and the signature over [`signing_digest`](Self::signing_digest)
    pub fn signed(self, signer: Address, signature: Bytes) -> SignedMetadataUpdate {
        SignedMetadataUpdate {
            digest: self.signing_digest(),
            update: self,
            signer,
            signature,
        }
    }
}

/// A metadata update ready for submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedMetadataUpdate {
    /// The update being authorized
    #[serde(flatten)]
    pub update: MetadataUpdate,
    /// Account that signed the digest
    pub signer: Address,
    /// Signature over `digest`
    pub signature: Bytes,
    /// Digest of `update` at signing time
    pub digest: B256,
}

impl SignedMetadataUpdate {
    /// Whether `digest` still matches the update it claims to cover
    pub fn is_consistent(&self) -> bool {
        self.digest == self.update.signing_digest()
    }
}

/// Processing state of a submitted metadata update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataUpdateStatus {
    /// Accepted, not yet submitted on-chain
    Pending,
    /// Transaction broadcast
    Submitted,
    /// Transaction included
    Confirmed,
    /// Rejected or reverted
    Failed,
}

/// Server acknowledgement of a metadata update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataUpdateReceipt {
    /// Identifier for [`get_metadata_update`](crate::NftApiClient::get_metadata_update)
    pub id: String,
    /// Current state
    pub status: MetadataUpdateStatus,
    /// On-chain transaction, once submitted
    #[serde(default)]
    pub tx_hash: Option<B256>,
    /// Failure reason, when failed
    #[serde(default)]
    pub error: Option<String>,
}
