//! Remote object store backends.
//!
//! The sync pipeline talks to the remote through [`RemoteStore`] so that
//! tests can swap the S3 backend for an in-memory one.

mod memory;
mod s3;

pub use memory::MemoryRemote;
pub use s3::S3Remote;

use async_trait::async_trait;

use crate::error::Result;

/// Minimal object-store surface used by the sync pipeline.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch the object at `key`, or `None` when the remote has no
    /// readable object there. Backends fold access-denied responses into
    /// `None` as well, so a sync against a misconfigured prefix degrades
    /// to re-uploading rather than aborting.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Upload `bytes` to `key` with the given content type, replacing any
    /// existing object.
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<()>;
}
