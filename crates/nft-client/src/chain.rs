// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Supported chains and their API hosts
//!
//! Each chain is served under its own path below the API root
//! (`{root}/{slug}`), with its own token endpoints and credentials.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use url::Url;

use crate::error::{NftClientError, NftClientResult};

/// Chains the NFT protocol API serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChainType {
    /// Ethereum Mainnet - Chain ID: 1
    Ethereum,
    /// Polygon - Chain ID: 137
    Polygon,
    /// Base - Chain ID: 8453
    Base,
    /// Avalanche - Chain ID: 43114
    Avalanche,
    /// Arbitrum - Chain ID: 42161
    Arbitrum,
}

impl ChainType {
    /// Returns the numeric chain ID
    pub const fn id(self) -> u64 {
        match self {
            Self::Ethereum => 1,
            Self::Polygon => 137,
            Self::Base => 8453,
            Self::Avalanche => 43114,
            Self::Arbitrum => 42161,
        }
    }

    /// Returns the human-readable name of the chain
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ethereum => "Ethereum",
            Self::Polygon => "Polygon",
            Self::Base => "Base",
            Self::Avalanche => "Avalanche",
            Self::Arbitrum => "Arbitrum",
        }
    }

    /// Path segment of this chain below the API root
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Ethereum => "ethereum",
            Self::Polygon => "polygon",
            Self::Base => "base",
            Self::Avalanche => "avalanche",
            Self::Arbitrum => "arbitrum",
        }
    }

    /// Returns all supported chains
    pub const fn all() -> &'static [Self] {
        &[
            Self::Ethereum,
            Self::Polygon,
            Self::Base,
            Self::Avalanche,
            Self::Arbitrum,
        ]
    }

    /// Base URL of this chain's API below `root`
    ///
    /// # Errors
    ///
    /// Returns `NftClientError::InvalidUrl` if `root` cannot carry a path
    pub fn base_url(self, root: &Url) -> NftClientResult<Url> {
        let mut url = root.clone();
        url.path_segments_mut()
            .map_err(|()| NftClientError::InvalidUrl {
                message: format!("'{root}' cannot be a base URL"),
            })?
            .pop_if_empty()
            .push(self.slug());
        Ok(url)
    }
}

impl fmt::Display for ChainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ChainType {
    type Err = ChainParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(id) = s.parse::<u64>() {
            return Self::try_from(id);
        }

        match s.to_uppercase().as_str() {
            "ETHEREUM" | "ETH" | "MAINNET" => Ok(Self::Ethereum),
            "POLYGON" | "MATIC" => Ok(Self::Polygon),
            "BASE" => Ok(Self::Base),
            "AVALANCHE" | "AVAX" => Ok(Self::Avalanche),
            "ARBITRUM" | "ARB" => Ok(Self::Arbitrum),
            _ => Err(ChainParseError::InvalidName(s.to_string())),
        }
    }
}

impl TryFrom<u64> for ChainType {
    type Error = ChainParseError;

    fn try_from(id: u64) -> Result<Self, Self::Error> {
        Self::all()
            .iter()
            .copied()
            .find(|chain| chain.id() == id)
            .ok_or(ChainParseError::InvalidId(id))
    }
}

impl Serialize for ChainType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.id().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ChainType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ChainTypeVisitor;

        impl serde::de::Visitor<'_> for ChainTypeVisitor {
            type Value = ChainType;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(
                    formatter,
                    "a chain ID (1, 137, 8453, 43114, 42161) or name (Ethereum, Polygon, Base, Avalanche, Arbitrum)"
                )
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                ChainType::try_from(value).map_err(|_| {
                    E::invalid_value(serde::de::Unexpected::Unsigned(value), &self)
                })
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                u64::try_from(value)
                    .ok()
                    .and_then(|id| ChainType::try_from(id).ok())
                    .ok_or_else(|| E::invalid_value(serde::de::Unexpected::Signed(value), &self))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                ChainType::from_str(value)
                    .map_err(|_| E::invalid_value(serde::de::Unexpected::Str(value), &self))
            }
        }

        deserializer.deserialize_any(ChainTypeVisitor)
    }
}

/// Error type for chain parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainParseError {
    /// Unknown numeric chain ID
    #[error(
        "unsupported chain ID: {0}. Supported chain IDs are: 1 (Ethereum), 137 (Polygon), 8453 (Base), 43114 (Avalanche), 42161 (Arbitrum)"
    )]
    InvalidId(u64),
    /// Unknown chain name
    #[error(
        "unsupported chain name: {0}. Supported chain names are: Ethereum, Polygon, Base, Avalanche, Arbitrum"
    )]
    InvalidName(String),
}
