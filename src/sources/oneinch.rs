//! 1inch token source.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::OneInchConfig;
use crate::error::{Error, Result};
use crate::sources::{http_client, mapping_from_tokens, Throttle, TokenMapping, TokenSource};

pub struct OneInchSource {
    client: reqwest::Client,
    config: OneInchConfig,
    throttle: Throttle,
}

impl OneInchSource {
    pub fn new(config: OneInchConfig) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            throttle: Throttle::new(config.min_interval_ms),
            config,
        })
    }
}

/// The API answers chains it does not index with an error body naming an
/// invalid chain id. That is coverage information, not a failure.
fn is_unsupported_chain(body: &str) -> bool {
    body.contains("invalid chain id")
}

#[async_trait]
impl TokenSource for OneInchSource {
    fn name(&self) -> &'static str {
        "1inch"
    }

    async fn tokens_for_chain(&self, chain_id: u64) -> Result<Option<TokenMapping>> {
        self.throttle.wait().await;
        let url = format!("{}/{chain_id}", self.config.api_url);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if is_unsupported_chain(&body) {
                return Ok(None);
            }
            return Err(Error::Source(format!(
                "1inch returned {status} for chain {chain_id}: {body}"
            )));
        }

        let tokens: BTreeMap<String, Value> = response.json().await?;
        Ok(Some(mapping_from_tokens(tokens.into_values())))
    }
}
