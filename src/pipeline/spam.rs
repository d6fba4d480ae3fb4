//! Spam contract marking pipeline.

use tracing::{info, warn};

use crate::config::ChainbookConfig;
use crate::error::{Error, Result};
use crate::registry::{DataStore, Partition, Tier, TokenRecord};
use crate::sources::{AlchemyNetwork, AlchemySource};

/// Mark Alchemy-flagged spam contracts in the generated token tier.
///
/// Each flagged address is written as a whole record holding only the
/// spam marker, replacing any richer record a token feed wrote for the
/// same address. Run this after the token refresh, not before.
///
/// A missing API key is a configuration error and aborts before the
/// first network; a per-network fetch failure degrades to a warning so
/// one dead host does not hide the others.
pub async fn update_spam_tokens(config: &ChainbookConfig, store: &DataStore) -> Result<usize> {
    info!("Updating spam tokens");
    let source = AlchemySource::new(config.sources.alchemy.clone())?;
    source.require_api_key()?;

    let mut written = 0;
    for network in source.networks() {
        match mark_network(store, &source, network).await {
            Ok(count) => {
                info!(network = %network.network, count, "marked spam contracts");
                written += count;
            }
            Err(e @ Error::Config(_)) => return Err(e),
            Err(e) => {
                warn!(network = %network.network, error = %e, "skipping spam network");
            }
        }
    }
    Ok(written)
}

async fn mark_network(
    store: &DataStore,
    source: &AlchemySource,
    network: &AlchemyNetwork,
) -> Result<usize> {
    let addresses = source.fetch_spam_contracts(network).await?;
    write_spam_markers(store, network.chain_id, &addresses).await
}

async fn write_spam_markers(
    store: &DataStore,
    chain_id: u64,
    addresses: &[String],
) -> Result<usize> {
    let partition = Partition::Chain(chain_id);
    let record = TokenRecord {
        is_spam: Some(true),
        ..TokenRecord::default()
    };

    let mut written = 0;
    for address in addresses {
        match store
            .write_token(Tier::Generated, &partition, address, &record)
            .await
        {
            Ok(_) => written += 1,
            Err(e) => {
                warn!(chain_id, address = %address, error = %e, "failed to write spam marker");
            }
        }
    }
    Ok(written)
}
