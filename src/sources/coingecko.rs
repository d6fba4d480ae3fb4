//! CoinGecko token source.
//!
//! CoinGecko keys its per-chain token lists by platform slug, not chain
//! id, so the adapter first resolves the slug through the
//! `asset_platforms` directory. The directory is fetched once per run;
//! if that fetch fails, every chain reports the source as unavailable.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::warn;

use crate::config::CoingeckoConfig;
use crate::error::{Error, Result};
use crate::sources::{http_client, mapping_from_tokens, Throttle, TokenMapping, TokenSource};

#[derive(Debug, Deserialize)]
struct AssetPlatform {
    id: Option<String>,
    chain_identifier: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TokenListBody {
    tokens: Vec<Value>,
}

pub struct CoingeckoSource {
    client: reqwest::Client,
    config: CoingeckoConfig,
    throttle: Throttle,
    platforms: OnceCell<Option<Vec<AssetPlatform>>>,
}

impl CoingeckoSource {
    pub fn new(config: CoingeckoConfig) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            throttle: Throttle::new(config.min_interval_ms),
            config,
            platforms: OnceCell::new(),
        })
    }

    /// Platform directory, fetched once. A failed fetch is remembered as
    /// `None` so later chains do not retry a dead endpoint.
    async fn platforms(&self) -> &Option<Vec<AssetPlatform>> {
        self.platforms
            .get_or_init(|| async {
                let url = format!("{}/asset_platforms", self.config.api_url);
                match fetch_platforms(&self.client, &url).await {
                    Ok(platforms) => Some(platforms),
                    Err(e) => {
                        warn!(error = %e, "asset platform directory unavailable");
                        None
                    }
                }
            })
            .await
    }
}

async fn fetch_platforms(client: &reqwest::Client, url: &str) -> Result<Vec<AssetPlatform>> {
    let platforms = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(platforms)
}

fn platform_for_chain(platforms: &[AssetPlatform], chain_id: u64) -> Option<&str> {
    platforms
        .iter()
        .find(|platform| platform.chain_identifier == Some(chain_id as i64))
        .and_then(|platform| platform.id.as_deref())
}

#[async_trait]
impl TokenSource for CoingeckoSource {
    fn name(&self) -> &'static str {
        "coingecko"
    }

    async fn tokens_for_chain(&self, chain_id: u64) -> Result<Option<TokenMapping>> {
        let Some(platforms) = self.platforms().await.as_ref() else {
            return Err(Error::Source(
                "coingecko asset platform directory unavailable".to_string(),
            ));
        };
        let Some(platform_id) = platform_for_chain(platforms, chain_id) else {
            return Ok(None);
        };

        self.throttle.wait().await;
        let url = format!("{}/{platform_id}/all.json", self.config.tokens_host);
        let body: TokenListBody = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(Some(mapping_from_tokens(body.tokens)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn platform_directory() -> Vec<AssetPlatform> {
        serde_json::from_value(json!([
            { "id": "ethereum", "chain_identifier": 1, "name": "Ethereum" },
            { "id": "polygon-pos", "chain_identifier": 137 },
            { "id": "solana", "chain_identifier": null },
        ]))
        .unwrap()
    }

    #[test]
    fn resolves_platform_slug_by_chain_id() {
        let platforms = platform_directory();
        assert_eq!(platform_for_chain(&platforms, 1), Some("ethereum"));
        assert_eq!(platform_for_chain(&platforms, 137), Some("polygon-pos"));
        assert_eq!(platform_for_chain(&platforms, 999), None);
    }

    #[test]
    fn mapping_keys_are_checksummed_and_invalid_addresses_dropped() {
        let tokens = vec![
            json!({
                "address": "0xdac17f958d2ee523a2206206994597c13d831ec7",
                "symbol": "USDT",
                "decimals": 6
            }),
            json!({ "address": "So11111111111111111111111111111111111111112", "symbol": "SOL" }),
            json!({ "symbol": "NOADDR" }),
        ];
        let mapping = mapping_from_tokens(tokens);
        assert_eq!(mapping.len(), 1);
        assert!(mapping.contains_key("0xdAC17F958D2ee523a2206206994597C13D831ec7"));
    }
}
