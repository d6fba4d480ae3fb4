//! Alchemy spam contract source.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AlchemyConfig;
use crate::error::{Error, Result};
use crate::registry::is_address;
use crate::sources::http_client;

/// One Alchemy NFT API network and the chain it maps to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlchemyNetwork {
    pub chain_id: u64,
    /// Host prefix, e.g. `eth-mainnet` or `polygon-mainnet`.
    pub network: String,
}

pub struct AlchemySource {
    client: reqwest::Client,
    config: AlchemyConfig,
}

impl AlchemySource {
    pub fn new(config: AlchemyConfig) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            config,
        })
    }

    pub fn networks(&self) -> &[AlchemyNetwork] {
        &self.config.networks
    }

    /// Fail when no API key is configured. Callers check this before
    /// their first fetch so a misconfigured run aborts up front instead
    /// of failing once per network.
    pub fn require_api_key(&self) -> Result<()> {
        if self.config.api_key.is_empty() {
            return Err(Error::Config(
                "alchemy api key is not set; pass --alchemy-api-key or set ALCHEMY_API_KEY".to_string(),
            ));
        }
        Ok(())
    }

    /// Spam contract addresses flagged for one network. Entries that are
    /// not addresses are dropped.
    pub async fn fetch_spam_contracts(&self, network: &AlchemyNetwork) -> Result<Vec<String>> {
        self.require_api_key()?;

        let url = spam_endpoint(&network.network, &self.config.api_key);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Source(format!(
                "alchemy returned {status} for {}: {body}",
                network.network
            )));
        }

        let body: SpamBody = response.json().await?;
        let total = body.contract_addresses.len();
        let addresses: Vec<String> = body
            .contract_addresses
            .into_iter()
            .filter(|a| is_address(a))
            .collect();
        if addresses.len() < total {
            debug!(network = %network.network, dropped = total - addresses.len(), "dropped malformed spam entries");
        }
        Ok(addresses)
    }
}

#[derive(Debug, Deserialize)]
struct SpamBody {
    #[serde(rename = "contractAddresses")]
    contract_addresses: Vec<String>,
}

fn spam_endpoint(network: &str, api_key: &str) -> String {
    format!("https://{network}.g.alchemy.com/nft/v3/{api_key}/getSpamContracts")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_embeds_network_and_key() {
        assert_eq!(
            spam_endpoint("eth-mainnet", "demo-key"),
            "https://eth-mainnet.g.alchemy.com/nft/v3/demo-key/getSpamContracts"
        );
    }

    #[test]
    fn spam_body_parses_contract_addresses() {
        let body: SpamBody = serde_json::from_str(
            r#"{ "contractAddresses": ["0x000386e3f7559d9b6a2f5c46b4ad1a9587d59dc3", "junk"] }"#,
        )
        .unwrap();
        assert_eq!(body.contract_addresses.len(), 2);
        let valid: Vec<_> = body
            .contract_addresses
            .iter()
            .filter(|a| is_address(a))
            .collect();
        assert_eq!(valid.len(), 1);
    }

    #[tokio::test]
    async fn missing_api_key_is_a_config_error() {
        let source = AlchemySource::new(AlchemyConfig {
            api_key: String::new(),
            ..AlchemyConfig::default()
        })
        .unwrap();
        let network = AlchemyNetwork {
            chain_id: 1,
            network: "eth-mainnet".to_string(),
        };
        assert!(matches!(
            source.fetch_spam_contracts(&network).await,
            Err(Error::Config(_))
        ));
    }
}
