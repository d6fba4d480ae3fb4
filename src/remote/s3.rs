//! S3-compatible remote backend.

use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::Client;
use async_trait::async_trait;
use tracing::debug;

use crate::config::RemoteConfig;
use crate::error::{Error, Result};
use crate::remote::RemoteStore;

/// Remote store backed by an S3-compatible bucket.
///
/// Credentials come from the default provider chain (environment,
/// profile, instance metadata). Region and endpoint can be overridden in
/// the config, which is how non-AWS hosts such as R2 are addressed.
pub struct S3Remote {
    client: Client,
    bucket: String,
}

impl S3Remote {
    /// Build a client from the shared AWS config plus any overrides.
    pub async fn connect(config: &RemoteConfig) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;
        let client = Client::new(&shared);
        debug!(bucket = %config.bucket, "connected to remote bucket");
        Ok(Self {
            client,
            bucket: config.bucket.clone(),
        })
    }
}

#[async_trait]
impl RemoteStore for S3Remote {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;
        match response {
            Ok(output) => {
                let body = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| Error::Remote(format!("reading body for {key}: {e}")))?;
                Ok(Some(body.into_bytes().to_vec()))
            }
            Err(err) => {
                if err
                    .as_service_error()
                    .map(GetObjectError::is_no_such_key)
                    .unwrap_or(false)
                {
                    return Ok(None);
                }
                let message = DisplayErrorContext(&err).to_string();
                if reads_as_absent(&message) {
                    return Ok(None);
                }
                Err(classify_remote_error(&format!("fetching {key}: {message}")))
            }
        }
    }

    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(bytes.to_vec().into())
            .send()
            .await
            .map_err(|err| {
                classify_remote_error(&format!("uploading {key}: {}", DisplayErrorContext(&err)))
            })?;
        Ok(())
    }
}

/// Responses that mean "no readable object here". Missing keys and
/// denied reads both land in this bucket so the caller re-uploads
/// instead of failing the sweep.
fn reads_as_absent(message: &str) -> bool {
    ["NoSuchKey", "NotFound", "status: 404", "AccessDenied", "status: 403"]
        .iter()
        .any(|needle| message.contains(needle))
}

/// Split remote failures into ones worth retrying and ones that are not.
/// Auth problems will not heal on a second attempt; everything else is
/// assumed to be network weather.
fn classify_remote_error(message: &str) -> Error {
    let lower = message.to_ascii_lowercase();
    let auth_failure = ["credential", "accessdenied", "access denied", "signature", "unauthorized", "forbidden"]
        .iter()
        .any(|needle| lower.contains(needle));
    if auth_failure {
        Error::Remote(message.to_string())
    } else {
        Error::Transient(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_denied_objects_read_as_absent() {
        assert!(reads_as_absent("service error: NoSuchKey: the key does not exist"));
        assert!(reads_as_absent("unhandled error (status: 404)"));
        assert!(reads_as_absent("service error: AccessDenied: access denied"));
        assert!(!reads_as_absent("dispatch failure: connection reset by peer"));
    }

    #[test]
    fn auth_failures_are_not_retryable() {
        assert!(matches!(
            classify_remote_error("uploading x: InvalidAccessKeyId: credential invalid"),
            Error::Remote(_)
        ));
        assert!(matches!(
            classify_remote_error("uploading x: SignatureDoesNotMatch"),
            Error::Remote(_)
        ));
    }

    #[test]
    fn network_failures_are_transient() {
        assert!(matches!(
            classify_remote_error("uploading x: dispatch failure: timeout"),
            Error::Transient(_)
        ));
        assert!(matches!(
            classify_remote_error("fetching y: connection reset by peer"),
            Error::Transient(_)
        ));
    }
}
