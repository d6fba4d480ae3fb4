//! Universal spender fan-out pipeline.
//!
//! Some contracts are deployed at the same address on every chain.
//! Rather than waiting for each chain's sources to pick them up, they
//! are written to every configured chain from a table: a built-in one
//! for well-known infrastructure, plus any flagged delegates from the
//! config.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::config::ChainbookConfig;
use crate::error::Result;
use crate::registry::{DataStore, Partition, RiskFactor, SpenderRecord, Tier};

/// Spender records keyed by address, all destined for every chain.
pub type UniversalTable = BTreeMap<String, SpenderRecord>;

/// Contracts known to live at the same address everywhere.
pub fn builtin_universal_spenders() -> UniversalTable {
    let mut table = UniversalTable::new();
    table.insert(
        "0x000000000022D473030F116dDEE9F6B43aC78BA3".to_string(),
        SpenderRecord {
            name: Some("Permit2".to_string()),
            label: Some("Permit2".to_string()),
            risk_factors: None,
        },
    );
    table
}

/// Delegates declared in config, each carrying its manual risk factors.
fn flagged_delegate_table(config: &ChainbookConfig) -> UniversalTable {
    let mut table = UniversalTable::new();
    for delegate in &config.universal.flagged_delegates {
        let risk_factors = if delegate.risk_factors.is_empty() {
            None
        } else {
            Some(
                delegate
                    .risk_factors
                    .iter()
                    .map(|kind| RiskFactor::new(kind.clone(), "manual"))
                    .collect(),
            )
        };
        table.insert(
            delegate.address.clone(),
            SpenderRecord {
                name: Some(delegate.name.clone()),
                label: Some(delegate.label.clone()),
                risk_factors,
            },
        );
    }
    table
}

/// Combine tables left to right; a later table's record replaces an
/// earlier one at the same address.
pub fn merge_tables(tables: Vec<UniversalTable>) -> UniversalTable {
    let mut merged = UniversalTable::new();
    for table in tables {
        merged.extend(table);
    }
    merged
}

/// Write every universal spender to every configured chain.
pub async fn update_universal_spenders(
    config: &ChainbookConfig,
    store: &DataStore,
) -> Result<usize> {
    info!("Updating universal spenders");
    let table = merge_tables(vec![
        builtin_universal_spenders(),
        flagged_delegate_table(config),
    ]);
    fanout(store, &table, &config.chain_ids()).await
}

async fn fanout(store: &DataStore, table: &UniversalTable, chain_ids: &[u64]) -> Result<usize> {
    let mut written = 0;
    for chain_id in chain_ids {
        let partition = Partition::Chain(*chain_id);
        for (identifier, record) in table {
            match store
                .write_spender(Tier::Generated, &partition, identifier, record)
                .await
            {
                Ok(_) => written += 1,
                Err(e) => {
                    warn!(chain_id, identifier = %identifier, error = %e, "failed to write universal spender");
                }
            }
        }
    }
    info!(written, "universal spender fan-out finished");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlaggedDelegate;
    use crate::registry::EntityKind;
    use tempfile::TempDir;

    const PERMIT2: &str = "0x000000000022D473030F116dDEE9F6B43aC78BA3";

    #[tokio::test]
    async fn fans_the_table_out_to_every_chain() {
        let dir = TempDir::new().unwrap();
        let store = DataStore::new(dir.path());
        let table = builtin_universal_spenders();

        let written = fanout(&store, &table, &[1, 137, 42161]).await.unwrap();
        assert_eq!(written, 3);

        for chain_id in [1u64, 137, 42161] {
            let record = store
                .read(
                    Tier::Generated,
                    EntityKind::Spenders,
                    &Partition::Chain(chain_id),
                    PERMIT2,
                )
                .await
                .unwrap()
                .unwrap();
            assert_eq!(record["name"], "Permit2");
            assert_eq!(record["label"], "Permit2");
        }
    }

    #[test]
    fn config_delegates_join_and_override_the_builtin_table() {
        let mut config = ChainbookConfig::default();
        config.universal.flagged_delegates = vec![
            FlaggedDelegate {
                address: "0x00000000000000447e69651d841bD8D104Bed493".to_string(),
                name: "Drainer Delegate".to_string(),
                label: "Flagged delegate contract".to_string(),
                risk_factors: vec!["blocklist".to_string()],
            },
            FlaggedDelegate {
                address: PERMIT2.to_string(),
                name: "Permit2 (override)".to_string(),
                label: "Permit2".to_string(),
                risk_factors: vec![],
            },
        ];

        let table = merge_tables(vec![
            builtin_universal_spenders(),
            flagged_delegate_table(&config),
        ]);
        assert_eq!(table.len(), 2);
        assert_eq!(table[PERMIT2].name.as_deref(), Some("Permit2 (override)"));

        let delegate = &table["0x00000000000000447e69651d841bD8D104Bed493"];
        let factors = delegate.risk_factors.as_ref().unwrap();
        assert_eq!(factors.len(), 1);
        assert_eq!(factors[0].kind, "blocklist");
        assert_eq!(factors[0].source, "manual");
    }
}
