// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Layered client settings
//!
//! Settings are read with the `config` crate, later sources overriding earlier
//! ones:
//! 1. Built-in defaults
//! 2. `nft-client.json`
//! 3. `nft-client.{environment}.json`, where the environment comes from
//!    `ENVIRONMENT` (default `development`)
//! 4. Environment variables prefixed `NFT_API_`, e.g. `NFT_API_API_KEY` or
//!    `NFT_API_CHAINS=ethereum,polygon`

use std::time::Duration;

use anyhow::{Context, Result, ensure};
use api_client::{ApiKey, AuthConfig, TimeoutSeconds, TransportConfig};
use config::{
    Config, ConfigBuilder, ConfigError, Environment as ConfigEnv, File, FileFormat,
    builder::DefaultState,
};
use serde::Deserialize;
use serde_with::{DurationSeconds, serde_as};
use tracing::info;
use url::Url;

use crate::{chain::ChainType, client::NftApiClient, registry::ChainClients};

/// Everything needed to build a [`ChainClients`] registry
#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSettings {
    /// API root; each chain is served at `{api_root}/{slug}`
    pub api_root: Url,
    /// Key exchanged for tokens on first use
    #[serde(default)]
    pub api_key: Option<String>,
    /// Chains to build clients for
    pub chains: Vec<ChainType>,
    /// Refresh tokens this long before they expire
    #[serde_as(as = "DurationSeconds<u64>")]
    pub eager_refresh_threshold: Duration,
    /// Refresh and retry once when a request gets HTTP 401
    pub force_refresh_on_failure: bool,
    /// Per-request timeout in seconds (1-300)
    pub timeout_seconds: u64,
    /// Override for the `User-Agent` header
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl ClientSettings {
    /// Load settings from files and the environment
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a source cannot be read or the merged settings
    /// do not deserialize
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        Self::defaults()?
            .add_source(File::with_name("nft-client.json").required(false))
            .add_source(
                File::with_name(&format!("nft-client.{}.json", environment.to_lowercase()))
                    .required(false),
            )
            .add_source(
                ConfigEnv::with_prefix("NFT_API")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("chains")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Load settings from a JSON document layered over the defaults
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the document is malformed or incomplete
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(File::from_str(json, FileFormat::Json))
            .build()?
            .try_deserialize()
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("chains", vec!["ethereum"])?
            .set_default("eager_refresh_threshold", 300)?
            .set_default("force_refresh_on_failure", true)?
            .set_default("timeout_seconds", 30)
    }

    /// Build one client per configured chain
    ///
    /// # Errors
    ///
    /// Returns an error if no chain is configured, the timeout is out of
    /// range, the API key is blank, or a client cannot be created
    pub fn into_clients(self) -> Result<ChainClients> {
        ensure!(!self.chains.is_empty(), "at least one chain must be configured");
        let timeout = TimeoutSeconds::new(self.timeout_seconds).context("invalid timeout_seconds")?;
        let transport = TransportConfig {
            timeout,
            user_agent: self
                .user_agent
                .unwrap_or_else(|| TransportConfig::default().user_agent),
        };
        let api_key = self
            .api_key
            .map(ApiKey::new)
            .transpose()
            .context("invalid api_key")?;

        let mut clients = ChainClients::new();
        for chain in self.chains {
            let base_url = chain.base_url(&self.api_root)?;
            let mut auth = AuthConfig::new(base_url.as_str())?
                .with_eager_refresh_threshold(self.eager_refresh_threshold)
                .with_force_refresh_on_failure(self.force_refresh_on_failure);
            if let Some(api_key) = &api_key {
                auth = auth.with_api_key(api_key.clone());
            }
            clients.insert(
                NftApiClient::new(chain, auth, &transport)
                    .with_context(|| format!("failed to build client for {chain}"))?,
            );
        }

        info!(chains = clients.len(), root = %self.api_root, "built chain clients");
        Ok(clients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let settings = ClientSettings::from_json(r#"{"api_root": "https://api.example.com"}"#).unwrap();

        assert_eq!(settings.chains, vec![ChainType::Ethereum]);
        assert_eq!(settings.eager_refresh_threshold, Duration::from_secs(300));
        assert!(settings.force_refresh_on_failure);
        assert_eq!(settings.timeout_seconds, 30);
        assert!(settings.api_key.is_none());
    }

    #[test]
    fn chains_accept_names_and_ids() {
        let settings = ClientSettings::from_json(
            r#"{
                "api_root": "https://api.example.com",
                "api_key": "SOME_CODE",
                "chains": ["polygon", 8453],
                "eager_refresh_threshold": 5,
                "force_refresh_on_failure": false
            }"#,
        )
        .unwrap();

        assert_eq!(settings.chains, vec![ChainType::Polygon, ChainType::Base]);
        assert_eq!(settings.eager_refresh_threshold, Duration::from_secs(5));
        assert!(!settings.force_refresh_on_failure);
    }

    #[test]
    fn api_root_is_required() {
        assert!(ClientSettings::from_json("{}").is_err());
        assert!(ClientSettings::from_json(r#"{"api_root": "not a url"}"#).is_err());
    }

    #[test]
    fn into_clients_builds_one_client_per_chain() {
        let clients = ClientSettings::from_json(
            r#"{
                "api_root": "https://api.example.com/v2",
                "api_key": "SOME_CODE",
                "chains": ["ethereum", "arbitrum"],
                "eager_refresh_threshold": 60
            }"#,
        )
        .unwrap()
        .into_clients()
        .unwrap();

        assert_eq!(clients.len(), 2);
        let arbitrum = clients.get(ChainType::Arbitrum).unwrap();
        assert_eq!(arbitrum.base_url().as_str(), "https://api.example.com/v2/arbitrum");

        let config = arbitrum.coordinator().config();
        assert_eq!(config.api_key.as_ref().map(ApiKey::expose), Some("SOME_CODE"));
        assert_eq!(config.eager_refresh_threshold, Duration::from_secs(60));
        assert!(config.force_refresh_on_failure);
    }

    #[test]
    fn into_clients_validates() {
        let mut no_chains =
            ClientSettings::from_json(r#"{"api_root": "https://api.example.com"}"#).unwrap();
        no_chains.chains.clear();
        assert!(no_chains.into_clients().is_err());

        let bad_timeout = ClientSettings::from_json(
            r#"{"api_root": "https://api.example.com", "timeout_seconds": 0}"#,
        )
        .unwrap();
        assert!(bad_timeout.into_clients().is_err());

        let blank_key = ClientSettings::from_json(
            r#"{"api_root": "https://api.example.com", "api_key": "  "}"#,
        )
        .unwrap();
        assert!(blank_key.into_clients().is_err());
    }
}
