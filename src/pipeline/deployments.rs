//! Uniswap router deployment import pipeline.

use std::path::Path;

use tracing::info;

use crate::config::ChainbookConfig;
use crate::error::{Error, Result};
use crate::registry::{DataStore, Partition, RiskFactor, SpenderRecord, Tier};
use crate::sources::DeploymentsCheckout;

/// Import router spenders from a local checkout of the
/// Uniswap/universal-router repository. Unknown chain slugs and unknown
/// contract keys abort the import: writing a router under a guessed
/// chain or label would be worse than writing nothing.
pub async fn import_router_deployments(
    config: &ChainbookConfig,
    store: &DataStore,
    checkout_path: &Path,
) -> Result<usize> {
    info!(path = %checkout_path.display(), "Importing Uniswap router spenders");
    let checkout = DeploymentsCheckout::new(checkout_path);
    let deployments = checkout.read_deployments()?;

    let mut written = 0;
    for deployment in &deployments {
        let Some(chain) = config.chain_by_slug(&deployment.slug) else {
            return Err(Error::Config(format!(
                "unknown chain slug: {}",
                deployment.slug
            )));
        };
        let partition = Partition::Chain(chain.id);

        for (key, address) in &deployment.contracts {
            let Some(record) = spender_for_key(key)? else {
                continue;
            };
            store
                .write_spender(Tier::Generated, &partition, address, &record)
                .await?;
            written += 1;
        }
    }
    info!(written, "router spender import finished");
    Ok(written)
}

/// Known universal router contract keys. The v1 generation is labelled
/// deprecated; a key this table does not recognize is new upstream and
/// needs classifying by hand before the import will accept it.
fn spender_for_key(key: &str) -> Result<Option<SpenderRecord>> {
    fn record(name: &str, label: &str, deprecated: bool) -> Option<SpenderRecord> {
        let risk_factors = deprecated.then(|| vec![RiskFactor::new("deprecated", "whois")]);
        Some(SpenderRecord {
            name: Some(name.to_string()),
            label: Some(label.to_string()),
            risk_factors,
        })
    }

    Ok(match key {
        "UniversalRouterV1" => record("Uniswap (old)", "Uniswap: Universal Router v1", true),
        "UniversalRouterV1_1" => record("Uniswap (old)", "Uniswap: Universal Router v1.1", true),
        "UniversalRouterV1_2" => record("Uniswap", "Uniswap: Universal Router v1.2", false),
        "UniversalRouterV1_3" => record("Uniswap", "Uniswap: Universal Router v1.3", false),
        "UniversalRouterV1_2_V2Support" => record(
            "Uniswap",
            "Uniswap: Universal Router v1.2 (Uniswap v2 Support)",
            false,
        ),
        "UniversalRouterV1_2_NoV2Support" => record(
            "Uniswap",
            "Uniswap: Universal Router v1.2 (no Uniswap v2 support)",
            false,
        ),
        "UniversalRouterV2" => record("Uniswap", "Uniswap: Universal Router v2", false),
        "UniversalRouterV2_NoV2V3Support" => record(
            "Uniswap",
            "Uniswap: Universal Router v2 (no Uniswap v2/v3 support)",
            false,
        ),
        "UnsupportedProtocol" => None,
        _ => {
            return Err(Error::Config(format!(
                "unknown router contract key: {key}"
            )))
        }
    })
}
