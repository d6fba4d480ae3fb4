//! NFT collection refresh pipeline.

use tracing::{info, warn};

use crate::config::ChainbookConfig;
use crate::error::Result;
use crate::registry::{DataStore, EntityKind, Partition, Tier};
use crate::sources::{ReservoirSource, TokenMapping};

/// Refresh NFT collection records from the Reservoir index. Unlike the
/// token feeds, a failed fetch here aborts the run: the index is a
/// single source and a partial sweep would silently shrink coverage.
pub async fn update_nft_tokens(config: &ChainbookConfig, store: &DataStore) -> Result<usize> {
    info!("Updating NFT collections");
    let source = ReservoirSource::new(config.sources.reservoir.clone())?;

    let mapping = source.fetch_collections().await?;
    write_collections(store, source.chain_id(), &mapping).await
}

async fn write_collections(
    store: &DataStore,
    chain_id: u64,
    mapping: &TokenMapping,
) -> Result<usize> {
    let partition = Partition::Chain(chain_id);
    let total = mapping.len();

    let mut written = 0;
    for (identifier, record) in mapping {
        match store
            .write(Tier::Generated, EntityKind::Tokens, &partition, identifier, record)
            .await
        {
            Ok(_) => written += 1,
            Err(e) => {
                warn!(identifier = %identifier, error = %e, "failed to write collection record");
            }
        }
    }
    info!("wrote {written} of {total} NFT collections");
    Ok(written)
}
