//! Diff sync of the generated tier to the remote object store.
//!
//! Each record compares its canonical bytes against the remote copy and
//! uploads only on mismatch, so an unchanged registry costs one `get` per
//! record and zero writes.

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::registry::sanitize::canonical_bytes;
use crate::registry::store::record_key;
use crate::registry::{DataStore, EntityKind, RetryPolicy, StoredEntry, Tier};
use crate::remote::RemoteStore;

/// Tally of one sync run.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Records found in the generated tier
    pub scanned: usize,
    /// Records whose remote copy was missing or stale
    pub uploaded: usize,
    /// Records already current on the remote
    pub skipped: usize,
    /// Records that could not be synced, as (key, reason)
    pub failed: Vec<(String, String)>,
}

enum Outcome {
    Uploaded,
    Skipped,
}

/// Push every generated record of `kind` whose canonical bytes differ from
/// the remote copy. Entries sync concurrently up to `concurrency`; a failed
/// entry lands in the report instead of aborting the run.
pub async fn sync_kind(
    store: &DataStore,
    remote: &dyn RemoteStore,
    kind: EntityKind,
    concurrency: usize,
    retry: &RetryPolicy,
) -> Result<SyncReport> {
    let entries = store.walk(Tier::Generated, kind);
    info!(kind = %kind, count = entries.len(), "syncing generated records");

    let results: Vec<(String, Result<Outcome>)> = stream::iter(entries)
        .map(|entry| async move {
            let key = record_key(Tier::Generated, kind, &entry.partition, &entry.identifier);
            let outcome = sync_entry(store, remote, kind, &entry, &key, retry).await;
            (key, outcome)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut report = SyncReport {
        scanned: results.len(),
        ..SyncReport::default()
    };
    for (key, outcome) in results {
        match outcome {
            Ok(Outcome::Uploaded) => report.uploaded += 1,
            Ok(Outcome::Skipped) => report.skipped += 1,
            Err(e) => {
                warn!(key = %key, error = %e, "failed to sync record");
                report.failed.push((key, e.to_string()));
            }
        }
    }

    info!(
        kind = %kind,
        uploaded = report.uploaded,
        skipped = report.skipped,
        failed = report.failed.len(),
        "sync finished"
    );
    Ok(report)
}

/// The local record re-sanitizes before comparison, so files written by
/// older sanitizer revisions still diff against what we would upload today.
async fn sync_entry(
    store: &DataStore,
    remote: &dyn RemoteStore,
    kind: EntityKind,
    entry: &StoredEntry,
    key: &str,
    retry: &RetryPolicy,
) -> Result<Outcome> {
    let record = store.read_path(&entry.path).await?;
    let bytes = canonical_bytes(kind, &record)?;

    let existing = remote.get(key).await?;
    if existing.as_deref() == Some(bytes.as_slice()) {
        return Ok(Outcome::Skipped);
    }

    put_with_retry(remote, key, &bytes, retry).await?;
    Ok(Outcome::Uploaded)
}

async fn put_with_retry(
    remote: &dyn RemoteStore,
    key: &str,
    bytes: &[u8],
    retry: &RetryPolicy,
) -> Result<()> {
    let mut attempt = 1;
    loop {
        match remote.put(key, bytes, "application/json").await {
            Ok(()) => return Ok(()),
            Err(Error::Transient(reason)) if attempt < retry.max_attempts => {
                let delay = retry.delay_for(attempt);
                warn!(
                    key = %key,
                    attempt,
                    error = %reason,
                    delay_ms = delay.as_millis() as u64,
                    "transient upload failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Partition;
    use crate::remote::MemoryRemote;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    const DAI: &str = "0x6B175474E89094C44Da98b954EedeAC495271d0F";
    const GNO: &str = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    async fn seeded_store(dir: &TempDir) -> DataStore {
        let store = DataStore::new(dir.path());
        store
            .write(
                Tier::Generated,
                EntityKind::Tokens,
                &Partition::Chain(1),
                DAI,
                &json!({ "symbol": "DAI", "decimals": 18, "logoURI": "https://x/dai.png" }),
            )
            .await
            .unwrap();
        store
            .write(
                Tier::Generated,
                EntityKind::Tokens,
                &Partition::Chain(100),
                GNO,
                &json!({ "symbol": "GNO", "decimals": 18, "logoURI": "https://x/gno.png" }),
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn first_sync_uploads_everything() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir).await;
        let remote = MemoryRemote::new();

        let report = sync_kind(&store, &remote, EntityKind::Tokens, 4, &fast_retry())
            .await
            .unwrap();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.uploaded, 2);
        assert_eq!(report.skipped, 0);
        assert!(report.failed.is_empty());

        let key = format!("generated/tokens/1/{}.json", DAI);
        let record = store
            .read(Tier::Generated, EntityKind::Tokens, &Partition::Chain(1), DAI)
            .await
            .unwrap()
            .unwrap();
        let expected = canonical_bytes(EntityKind::Tokens, &record).unwrap();
        assert_eq!(remote.object(&key).await, Some(expected));
        assert_eq!(
            remote.content_type(&key).await,
            Some("application/json".to_string())
        );
    }

    #[tokio::test]
    async fn unchanged_records_are_skipped() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir).await;
        let remote = MemoryRemote::new();

        sync_kind(&store, &remote, EntityKind::Tokens, 4, &fast_retry())
            .await
            .unwrap();
        let puts_after_first = remote.put_calls();

        let report = sync_kind(&store, &remote, EntityKind::Tokens, 4, &fast_retry())
            .await
            .unwrap();
        assert_eq!(report.uploaded, 0);
        assert_eq!(report.skipped, 2);
        assert_eq!(remote.put_calls(), puts_after_first);
    }

    #[tokio::test]
    async fn changed_record_uploads_again() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir).await;
        let remote = MemoryRemote::new();

        sync_kind(&store, &remote, EntityKind::Tokens, 4, &fast_retry())
            .await
            .unwrap();
        store
            .write(
                Tier::Generated,
                EntityKind::Tokens,
                &Partition::Chain(1),
                DAI,
                &json!({ "symbol": "DAI", "decimals": 18, "logoURI": "https://x/dai-v2.png" }),
            )
            .await
            .unwrap();

        let report = sync_kind(&store, &remote, EntityKind::Tokens, 4, &fast_retry())
            .await
            .unwrap();
        assert_eq!(report.uploaded, 1);
        assert_eq!(report.skipped, 1);

        let key = format!("generated/tokens/1/{}.json", DAI);
        let bytes = remote.object(&key).await.unwrap();
        let uploaded: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(uploaded["logoURI"], "https://x/dai-v2.png");
    }

    #[tokio::test]
    async fn transient_put_failure_is_retried() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir).await;
        let remote = MemoryRemote::new();

        remote.fail_next_puts(1);
        let report = sync_kind(&store, &remote, EntityKind::Tokens, 1, &fast_retry())
            .await
            .unwrap();
        assert_eq!(report.uploaded, 2);
        assert!(report.failed.is_empty());
        assert_eq!(remote.put_calls(), 3);
        assert_eq!(remote.len().await, 2);
    }

    #[tokio::test]
    async fn exhausted_retries_fail_one_entry_not_the_run() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir).await;
        let remote = MemoryRemote::new();

        // Enough induced failures to exhaust one entry's attempts, with
        // concurrency 1 so they all hit the first entry walked.
        remote.fail_next_puts(3);
        let report = sync_kind(&store, &remote, EntityKind::Tokens, 1, &fast_retry())
            .await
            .unwrap();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.uploaded, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(remote.len().await, 1);
    }
}
