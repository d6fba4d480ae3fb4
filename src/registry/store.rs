//! Path-addressed record store
//!
//! Records live at `<root>/<tier>/<kind>/<partition>/<identifier>.json`,
//! one JSON object per file, with the identifier normalized before it ever
//! touches a path. A write fully replaces the previous file; there is no
//! field-level merge, so a writer must supply every field it wants kept.
//!
//! The store takes no locks. Two concurrent writers to the same coordinate
//! race and the last completed write wins; pipeline runs are expected to
//! own disjoint write sets, and concurrent runs over the same entity kind
//! are out of contract.

use crate::error::{Error, Result};
use crate::registry::address::normalize_identifier;
use crate::registry::record::{EntityKind, Partition, SpenderRecord, Tier, TokenRecord};
use crate::registry::sanitize;
use rand::Rng;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

/// Bounded retry schedule for transient I/O failures: exponential backoff
/// from `base_delay`, capped at `max_delay`, with up to 25% added jitter.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts before giving up (the first try included)
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound for any single delay, before jitter
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay to sleep before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        let base = self.base_delay.saturating_mul(factor).min(self.max_delay);
        let jitter = base.mul_f64(rand::thread_rng().gen_range(0.0..0.25));
        base + jitter
    }
}

/// One record file discovered by a store walk.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    /// Partition directory the file sits in
    pub partition: Partition,
    /// Identifier as spelled by the file stem (not necessarily normalized)
    pub identifier: String,
    /// Path to the record file
    pub path: PathBuf,
}

/// File-per-record store rooted at a data directory.
#[derive(Debug, Clone)]
pub struct DataStore {
    root: PathBuf,
    retry: RetryPolicy,
}

impl DataStore {
    /// Store rooted at `root` with the default retry schedule.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_retry(root, RetryPolicy::default())
    }

    /// Store rooted at `root` with an explicit retry schedule.
    pub fn with_retry(root: impl Into<PathBuf>, retry: RetryPolicy) -> Self {
        Self {
            root: root.into(),
            retry,
        }
    }

    /// Root data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// On-disk path for a coordinate, with the identifier normalized.
    pub fn path_for(
        &self,
        tier: Tier,
        kind: EntityKind,
        partition: &Partition,
        identifier: &str,
    ) -> PathBuf {
        self.partition_dir(tier, kind, partition)
            .join(format!("{}.json", normalize_identifier(identifier)))
    }

    fn partition_dir(&self, tier: Tier, kind: EntityKind, partition: &Partition) -> PathBuf {
        self.root
            .join(tier.dir_name())
            .join(kind.dir_name())
            .join(partition.dir_name())
    }

    /// Read the record at a coordinate. A missing file is a normal outcome
    /// and reads as `None`; a file that exists but does not parse is an
    /// error.
    pub async fn read(
        &self,
        tier: Tier,
        kind: EntityKind,
        partition: &Partition,
        identifier: &str,
    ) -> Result<Option<Value>> {
        let path = self.path_for(tier, kind, partition, identifier);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Read a record file by its actual path, as returned by [`walk`].
    ///
    /// Walk results may predate the current normalization rules, so this
    /// must not re-derive the file name from the identifier.
    ///
    /// [`walk`]: DataStore::walk
    pub async fn read_path(&self, path: &Path) -> Result<Value> {
        let bytes = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Sanitize and write a record at a coordinate, replacing whatever was
    /// there. The partition directory is created if absent. Transient I/O
    /// failures are retried per the store's [`RetryPolicy`]; exhausting the
    /// budget yields [`Error::Transient`].
    pub async fn write(
        &self,
        tier: Tier,
        kind: EntityKind,
        partition: &Partition,
        identifier: &str,
        record: &Value,
    ) -> Result<PathBuf> {
        let bytes = sanitize::canonical_bytes(kind, record)?;
        let dir = self.partition_dir(tier, kind, partition);
        let path = dir.join(format!("{}.json", normalize_identifier(identifier)));

        let mut attempt = 1;
        loop {
            match write_file(&dir, &path, &bytes).await {
                Ok(()) => return Ok(path),
                Err(err) if attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        "Write attempt {}/{} for {} failed: {}; retrying in {:?}",
                        attempt,
                        self.retry.max_attempts,
                        path.display(),
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    return Err(Error::Transient(format!(
                        "giving up writing {} after {} attempts: {}",
                        path.display(),
                        attempt,
                        err
                    )))
                }
            }
        }
    }

    /// Write a token record.
    pub async fn write_token(
        &self,
        tier: Tier,
        partition: &Partition,
        identifier: &str,
        token: &TokenRecord,
    ) -> Result<PathBuf> {
        self.write(
            tier,
            EntityKind::Tokens,
            partition,
            identifier,
            &serde_json::to_value(token)?,
        )
        .await
    }

    /// Write a spender record.
    pub async fn write_spender(
        &self,
        tier: Tier,
        partition: &Partition,
        identifier: &str,
        spender: &SpenderRecord,
    ) -> Result<PathBuf> {
        self.write(
            tier,
            EntityKind::Spenders,
            partition,
            identifier,
            &serde_json::to_value(spender)?,
        )
        .await
    }

    /// Enumerate every record file in a tier and kind, in a stable order.
    /// Unreadable directory entries are logged and skipped.
    pub fn walk(&self, tier: Tier, kind: EntityKind) -> Vec<StoredEntry> {
        let base = self.root.join(tier.dir_name()).join(kind.dir_name());
        if !base.is_dir() {
            return Vec::new();
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(&base)
            .min_depth(2)
            .max_depth(2)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!("Skipping unreadable store entry: {}", err);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let identifier = match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) => stem.to_string(),
                None => continue,
            };
            let partition = match path.parent().and_then(|p| p.file_name()).and_then(|n| n.to_str())
            {
                Some(name) => Partition::from_dir_name(name),
                None => continue,
            };
            entries.push(StoredEntry {
                partition,
                identifier,
                path: path.to_path_buf(),
            });
        }
        entries
    }
}

/// Relative key for a coordinate, shared by the on-disk layout and the
/// remote object layout. Always uses forward slashes.
pub fn record_key(tier: Tier, kind: EntityKind, partition: &Partition, identifier: &str) -> String {
    format!(
        "{}/{}/{}/{}.json",
        tier.dir_name(),
        kind.dir_name(),
        partition.dir_name(),
        normalize_identifier(identifier)
    )
}

async fn write_file(dir: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(path, bytes).await
}
