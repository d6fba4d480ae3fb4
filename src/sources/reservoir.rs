//! Reservoir NFT collection source.
//!
//! Walks the collections index in descending all-time volume order and
//! turns each collection into a token record keyed by its primary
//! contract. Paging stops once the tail of a page drops under the
//! volume floor, so the sweep only ever sees the head of the index.

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::ReservoirConfig;
use crate::error::Result;
use crate::registry::{is_address, normalize_identifier};
use crate::sources::{http_client, Throttle, TokenMapping};

#[derive(Debug, Deserialize)]
struct CollectionsPage {
    collections: Vec<Collection>,
    continuation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Collection {
    #[serde(rename = "primaryContract")]
    primary_contract: Option<String>,
    name: Option<String>,
    image: Option<String>,
    volume: Option<VolumeWindows>,
}

#[derive(Debug, Deserialize)]
struct VolumeWindows {
    #[serde(rename = "allTime")]
    all_time: Option<f64>,
}

pub struct ReservoirSource {
    client: reqwest::Client,
    config: ReservoirConfig,
    throttle: Throttle,
}

impl ReservoirSource {
    pub fn new(config: ReservoirConfig) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            throttle: Throttle::new(config.page_delay_ms),
            config,
        })
    }

    /// Chain the collections are filed under. Reservoir's index is
    /// mainnet only.
    pub fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    /// Fetch every collection above the volume floor. When the same
    /// contract shows up on a later page, the earlier entry wins since
    /// pages arrive in descending volume order.
    pub async fn fetch_collections(&self) -> Result<TokenMapping> {
        let mut accumulated = TokenMapping::new();
        let mut url = self.config.api_url.clone();

        loop {
            self.throttle.wait().await;
            debug!(%url, "fetching collections page");
            let page: CollectionsPage = self
                .client
                .get(&url)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            let mut tail_volume = None;
            for collection in &page.collections {
                tail_volume = collection.volume.as_ref().and_then(|v| v.all_time);
                if let Some((identifier, record)) = record_for(collection, self.config.volume_floor)
                {
                    accumulated.entry(identifier).or_insert(record);
                }
            }

            if !keep_paging(page.continuation.as_deref(), tail_volume, self.config.volume_floor) {
                break;
            }
            let continuation = page.continuation.unwrap_or_default();
            url = format!("{}&continuation={continuation}", self.config.api_url);
        }

        Ok(accumulated)
    }
}

/// A collection must carry a contract, a name, and an image, and sit at
/// or above the volume floor. Collections without volume data are kept;
/// the index occasionally omits the field for entries that clearly
/// belong. The literal name `Slokh` marks broken index entries.
fn record_for(collection: &Collection, volume_floor: f64) -> Option<(String, serde_json::Value)> {
    let volume = collection.volume.as_ref().and_then(|v| v.all_time);
    if volume.map_or(false, |v| v < volume_floor) {
        return None;
    }
    let contract = collection.primary_contract.as_deref()?;
    let name = collection.name.as_deref()?;
    let image = collection.image.as_deref()?;
    if contract.is_empty() || name.is_empty() || image.is_empty() {
        return None;
    }
    if name == "Slokh" {
        return None;
    }
    if !is_address(contract) {
        return None;
    }

    let record = json!({ "symbol": name, "logoURI": image });
    Some((normalize_identifier(contract), record))
}

fn keep_paging(continuation: Option<&str>, tail_volume: Option<f64>, floor: f64) -> bool {
    continuation.is_some() && tail_volume.map_or(false, |v| v > floor)
}
