//! ERC-20 token refresh pipeline.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::config::ChainbookConfig;
use crate::error::Result;
use crate::pipeline::chain_label;
use crate::pipeline::merge::{passes_display_gate, MergeEngine};
use crate::registry::{DataStore, EntityKind, Partition, Tier};
use crate::sources::{CoingeckoSource, OneInchSource, TokenListAggregate};

/// Refresh the generated token tier from every configured token feed.
/// Chains run concurrently, bounded by `chain_concurrency`; one chain's
/// failures never block another.
pub async fn update_erc20_tokens(config: &ChainbookConfig, store: &DataStore) -> Result<usize> {
    let engine = build_engine(config)?;
    update_with_engine(config, store, &engine).await
}

/// Sources in ascending precedence: CoinGecko wins conflicts, then
/// 1inch, then the token list aggregate.
fn build_engine(config: &ChainbookConfig) -> Result<MergeEngine> {
    Ok(MergeEngine::new(vec![
        Arc::new(TokenListAggregate::new(config.sources.token_lists.clone())?),
        Arc::new(OneInchSource::new(config.sources.oneinch.clone())?),
        Arc::new(CoingeckoSource::new(config.sources.coingecko.clone())?),
    ]))
}

async fn update_with_engine(
    config: &ChainbookConfig,
    store: &DataStore,
    engine: &MergeEngine,
) -> Result<usize> {
    info!("Updating ERC-20 tokens");

    let written: usize = stream::iter(config.chain_ids())
        .map(|chain_id| async move { process_chain(config, store, engine, chain_id).await })
        .buffer_unordered(config.sources.chain_concurrency)
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .sum();

    info!(written, "ERC-20 token refresh finished");
    Ok(written)
}

async fn process_chain(
    config: &ChainbookConfig,
    store: &DataStore,
    engine: &MergeEngine,
    chain_id: u64,
) -> usize {
    let label = chain_label(config, chain_id);
    let Some(mapping) = engine.merge_chain(chain_id).await else {
        info!("{label}: no token data found");
        return 0;
    };

    let partition = Partition::Chain(chain_id);
    let total = mapping.len();
    let mut written = 0;
    for (identifier, record) in &mapping {
        if !passes_display_gate(identifier, record) {
            continue;
        }
        match store
            .write(Tier::Generated, EntityKind::Tokens, &partition, identifier, record)
            .await
        {
            Ok(_) => written += 1,
            Err(e) => {
                warn!(chain_id, identifier = %identifier, error = %e, "failed to write token record");
            }
        }
    }
    info!("{label}: wrote {written} of {total} tokens");
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainEntry;
    use crate::sources::{TokenMapping, TokenSource};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    struct FixedSource(Vec<(u64, &'static str, Value)>);

    #[async_trait]
    impl TokenSource for FixedSource {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn tokens_for_chain(&self, chain_id: u64) -> Result<Option<TokenMapping>> {
            let mapping: TokenMapping = self
                .0
                .iter()
                .filter(|(c, _, _)| *c == chain_id)
                .map(|(_, k, v)| (k.to_string(), v.clone()))
                .collect();
            if mapping.is_empty() {
                Ok(None)
            } else {
                Ok(Some(mapping))
            }
        }
    }

    fn test_config(ids: &[u64]) -> ChainbookConfig {
        let mut config = ChainbookConfig::default();
        config.chains = ids
            .iter()
            .map(|id| ChainEntry {
                id: *id,
                name: format!("Chain {id}"),
                slug: None,
            })
            .collect();
        config
    }

    const GNO: &str = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";

    #[tokio::test]
    async fn writes_displayable_records_and_gates_the_rest() {
        let dir = TempDir::new().unwrap();
        let store = DataStore::new(dir.path());
        let config = test_config(&[1, 137]);
        let engine = MergeEngine::new(vec![Arc::new(FixedSource(vec![
            (
                1,
                GNO,
                json!({ "symbol": "GNO", "logoURI": "https://x/gno.png", "decimals": 18 }),
            ),
            (
                1,
                "0x0000000000000000000000000000000000000000",
                json!({ "symbol": "ZERO", "logoURI": "https://x/zero.png" }),
            ),
            (
                137,
                "0x1111111111111111111111111111111111111111",
                json!({ "symbol": "NOLOGO" }),
            ),
        ]))]);

        let written = update_with_engine(&config, &store, &engine).await.unwrap();
        assert_eq!(written, 1);

        let stored = store
            .read(Tier::Generated, EntityKind::Tokens, &Partition::Chain(1), GNO)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored["symbol"], "GNO");
        assert_eq!(stored["decimals"], 18);

        let zero = store
            .read(
                Tier::Generated,
                EntityKind::Tokens,
                &Partition::Chain(1),
                "0x0000000000000000000000000000000000000000",
            )
            .await
            .unwrap();
        assert!(zero.is_none());

        let nologo = store
            .read(
                Tier::Generated,
                EntityKind::Tokens,
                &Partition::Chain(137),
                "0x1111111111111111111111111111111111111111",
            )
            .await
            .unwrap();
        assert!(nologo.is_none());
    }

    #[tokio::test]
    async fn records_are_sanitized_on_the_way_to_disk() {
        let dir = TempDir::new().unwrap();
        let store = DataStore::new(dir.path());
        let config = test_config(&[1]);
        let engine = MergeEngine::new(vec![Arc::new(FixedSource(vec![(
            1,
            GNO,
            json!({
                "symbol": "GNO",
                "logoURI": "https://assets.example.org/images/1/thumb/gno.png?w=500",
                "decimals": 18,
                "coingeckoId": "gnosis"
            }),
        )]))]);

        update_with_engine(&config, &store, &engine).await.unwrap();
        let stored = store
            .read(Tier::Generated, EntityKind::Tokens, &Partition::Chain(1), GNO)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            stored["logoURI"],
            "https://assets.example.org/images/1/small/gno.png?w=32"
        );
        assert!(stored.get("coingeckoId").is_none());
    }
}
