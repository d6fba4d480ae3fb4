//! ScamSniffer blocklist source.

use serde::Deserialize;

use crate::config::ScamSnifferConfig;
use crate::error::{Error, Result};
use crate::sources::http_client;

pub struct ScamSnifferSource {
    client: reqwest::Client,
    config: ScamSnifferConfig,
}

impl ScamSnifferSource {
    pub fn new(config: ScamSnifferConfig) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            config,
        })
    }

    /// Bucket the blocklist entries are filed under.
    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    /// Flagged identifiers. The blocklist mixes contract addresses and
    /// domains; both come back as given and are normalized on write.
    pub async fn fetch_blocklist(&self) -> Result<Vec<String>> {
        if self.config.api_key.is_empty() {
            return Err(Error::Config(
                "scamsniffer api key is not set; pass --scamsniffer-api-key or set SCAMSNIFFER_API_KEY"
                    .to_string(),
            ));
        }

        let response = self
            .client
            .get(&self.config.api_url)
            .header("x-api-key", &self.config.api_key)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Source(format!(
                "scamsniffer returned {status}: {body}"
            )));
        }

        let Blocklist(identifiers) = response.json().await?;
        Ok(identifiers)
    }
}

#[derive(Debug, Deserialize)]
struct Blocklist(Vec<String>);
