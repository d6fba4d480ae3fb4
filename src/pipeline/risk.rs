//! Spender risk factor refresh pipeline.

use tracing::{info, warn};

use crate::config::ChainbookConfig;
use crate::error::Result;
use crate::registry::{DataStore, Partition, RiskFactor, SpenderRecord, Tier};
use crate::sources::ScamSnifferSource;

/// Refresh blocklist-derived risk factors. Entries land in a named
/// bucket rather than a chain partition because the blocklist mixes
/// addresses and domains and is not chain-specific.
pub async fn update_risk_factors(config: &ChainbookConfig, store: &DataStore) -> Result<usize> {
    info!("Updating spender risk factors");
    let source = ScamSnifferSource::new(config.sources.scamsniffer.clone())?;
    let identifiers = source.fetch_blocklist().await?;
    write_blocklist(store, source.bucket(), &identifiers).await
}

async fn write_blocklist(
    store: &DataStore,
    bucket: &str,
    identifiers: &[String],
) -> Result<usize> {
    let partition = Partition::Bucket(bucket.to_string());
    let record = SpenderRecord {
        name: None,
        label: None,
        risk_factors: Some(vec![RiskFactor::new("blocklist", bucket)]),
    };

    let mut written = 0;
    for identifier in identifiers {
        match store
            .write_spender(Tier::Generated, &partition, identifier, &record)
            .await
        {
            Ok(_) => written += 1,
            Err(e) => {
                warn!(identifier = %identifier, error = %e, "failed to write blocklist record");
            }
        }
    }
    info!(written, bucket, "blocklist records written");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::EntityKind;
    use tempfile::TempDir;

    #[tokio::test]
    async fn blocklist_entries_land_in_the_bucket_normalized() {
        let dir = TempDir::new().unwrap();
        let store = DataStore::new(dir.path());
        let identifiers = vec![
            "0x00000000000c2e074ec69a0dfb2997ba6c7d2e1e".to_string(),
            "Drain-Wallet.Example".to_string(),
        ];

        let written = write_blocklist(&store, "scamsniffer", &identifiers)
            .await
            .unwrap();
        assert_eq!(written, 2);

        let bucket = Partition::Bucket("scamsniffer".to_string());
        let address_record = store
            .read(
                Tier::Generated,
                EntityKind::Spenders,
                &bucket,
                "0x00000000000C2E074eC69A0dFb2997BA6C7d2e1e",
            )
            .await
            .unwrap()
            .unwrap();
        let factors = address_record["riskFactors"].as_array().unwrap();
        assert_eq!(factors.len(), 1);
        assert_eq!(factors[0]["type"], "blocklist");
        assert_eq!(factors[0]["source"], "scamsniffer");
        assert!(address_record.get("name").is_none());

        // Domains are lowercased, not checksummed.
        let domain_path = store.path_for(
            Tier::Generated,
            EntityKind::Spenders,
            &bucket,
            "Drain-Wallet.Example",
        );
        assert!(domain_path.ends_with("drain-wallet.example.json"));
        assert!(domain_path.exists());
    }
}
