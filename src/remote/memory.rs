//! In-memory remote store used by tests and dry runs.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::remote::RemoteStore;

struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

/// Remote store that keeps objects in a map.
///
/// Tracks how many `put` calls were made and can be told to fail the
/// next few of them, which is enough to exercise the sync pipeline's
/// skip and retry behavior without a bucket.
#[derive(Default)]
pub struct MemoryRemote {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    put_calls: AtomicUsize,
    induced_put_failures: AtomicUsize,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes currently stored under `key`.
    pub async fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().await.get(key).map(|o| o.bytes.clone())
    }

    /// Content type recorded for `key`.
    pub async fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .await
            .get(key)
            .map(|o| o.content_type.clone())
    }

    /// Number of objects currently stored.
    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    /// Total `put` calls seen, including failed ones.
    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    /// Make the next `count` puts fail with a transient error.
    pub fn fail_next_puts(&self, count: usize) {
        self.induced_put_failures.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.objects.lock().await.get(key).map(|o| o.bytes.clone()))
    }

    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        let induced = self
            .induced_put_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if induced.is_ok() {
            return Err(Error::Transient(format!("induced put failure for {key}")));
        }
        self.objects.lock().await.insert(
            key.to_string(),
            StoredObject {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}
