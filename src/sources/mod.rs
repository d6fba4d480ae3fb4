//! Upstream source adapters.
//!
//! Each adapter wraps one external feed and exposes it in a shape the
//! pipelines can consume. Token feeds implement [`TokenSource`] so the
//! merge engine can layer them without knowing who they are; the spender
//! and spam feeds have their own entry points since their shapes differ.

mod alchemy;
mod coingecko;
mod contracts;
mod deployments;
mod oneinch;
mod reservoir;
mod scamsniffer;
mod tokenlists;

pub use alchemy::{AlchemyNetwork, AlchemySource};
pub use coingecko::CoingeckoSource;
pub use contracts::ContractsCheckout;
pub use deployments::{DeploymentsCheckout, RouterDeployment};
pub use oneinch::OneInchSource;
pub use reservoir::ReservoirSource;
pub use scamsniffer::ScamSnifferSource;
pub use tokenlists::{default_token_lists, TokenListAggregate, TokenListRef};

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::error::Result;

/// Raw records from one source for one chain, keyed by the identifier
/// exactly as the source spelled it. Kept as loose JSON until the merged
/// record is sanitized on write.
pub type TokenMapping = BTreeMap<String, Value>;

/// A feed of token metadata, queried one chain at a time.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Short name used in logs when this source fails or is skipped.
    fn name(&self) -> &'static str;

    /// Records for `chain_id`, or `None` when the source does not cover
    /// that chain. Errors are per-chain; the caller decides whether to
    /// drop the source or the chain.
    async fn tokens_for_chain(&self, chain_id: u64) -> Result<Option<TokenMapping>>;
}

/// Spaces out requests to one upstream host.
pub(crate) struct Throttle {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl Throttle {
    pub(crate) fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Sleep until the interval since the previous call has elapsed.
    pub(crate) async fn wait(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                debug!(?wait_time, "throttling upstream request");
                tokio::time::sleep(wait_time).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Index raw token objects by their checksummed address, dropping any
/// entry whose address field is missing or malformed.
pub(crate) fn mapping_from_tokens(tokens: impl IntoIterator<Item = Value>) -> TokenMapping {
    let mut mapping = TokenMapping::new();
    for token in tokens {
        let Some(address) = token.get("address").and_then(Value::as_str) else {
            continue;
        };
        if !crate::registry::is_address(address) {
            continue;
        }
        mapping.insert(crate::registry::normalize_identifier(address), token);
    }
    mapping
}

/// Shared client settings for all upstream calls.
pub(crate) fn http_client() -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("chainbook/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(30))
        .build()?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn throttle_enforces_minimum_spacing() {
        let throttle = Throttle::new(50);
        let start = Instant::now();
        throttle.wait().await;
        throttle.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn first_wait_does_not_sleep() {
        let throttle = Throttle::new(1_000);
        let start = Instant::now();
        throttle.wait().await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
