// Object storage for archived filing documents.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use s3::creds::Credentials;
use s3::bucket_ops::BucketConfiguration;
use s3::{Bucket, Region};
use tracing::{debug, info};

use crate::error::{ArchiveError, Result};

/// Key/value object store. Keys are `/`-separated relative paths.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `body` under `key`, replacing any existing object.
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<()>;
}

/// Stores objects as files under `root/bucket/key`.
pub struct LocalBlobStore {
    bucket_dir: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, bucket: &str) -> Self {
        Self {
            bucket_dir: root.into().join(bucket),
        }
    }

    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if key.is_empty() || !safe {
            return Err(ArchiveError::Upload {
                key: key.to_string(),
                message: "key must be a relative path without '..'".to_string(),
            });
        }
        Ok(self.bucket_dir.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, key: &str, body: Bytes, _content_type: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let upload_err = |e: std::io::Error| ArchiveError::Upload {
            key: key.to_string(),
            message: e.to_string(),
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(upload_err)?;
        }

        // Write to a sibling temp file and rename so readers never see a partial object.
        let tmp = path.with_extension("partial");
        tokio::fs::write(&tmp, &body).await.map_err(upload_err)?;
        tokio::fs::rename(&tmp, &path).await.map_err(upload_err)?;

        debug!(path = %path.display(), bytes = body.len(), "Wrote blob to disk");
        Ok(())
    }
}

/// Region name sent to MinIO, which ignores it but requires one for signing.
const S3_REGION: &str = "us-east-1";

/// Normalize a configured endpoint. MinIO is usually given as `host:port`,
/// which means plain HTTP.
pub fn endpoint_url(endpoint: &str) -> String {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

/// Bucket creation succeeded, or the bucket was already there.
fn bucket_ready(status: u16) -> bool {
    (200..300).contains(&status) || status == 409
}

/// Objects in one bucket on MinIO or another S3-compatible service, using
/// path-style addressing and SigV4-signed requests.
pub struct S3BlobStore {
    bucket: Box<Bucket>,
    region: Region,
    credentials: Credentials,
    endpoint: String,
}

impl S3BlobStore {
    pub fn new(endpoint: &str, bucket: &str, access_key: &str, secret_key: &str) -> Result<Self> {
        let endpoint = endpoint_url(endpoint);
        let region = Region::Custom {
            region: S3_REGION.to_string(),
            endpoint: endpoint.clone(),
        };
        let credentials = Credentials::new(Some(access_key), Some(secret_key), None, None, None)
            .map_err(|e| ArchiveError::Storage(format!("invalid S3 credentials: {e}")))?;
        let handle = Bucket::new(bucket, region.clone(), credentials.clone())
            .map_err(|e| ArchiveError::Storage(format!("bucket {bucket}: {e}")))?
            .with_path_style();

        Ok(Self {
            bucket: handle,
            region,
            credentials,
            endpoint,
        })
    }

    pub fn bucket_name(&self) -> String {
        self.bucket.name()
    }

    pub fn object_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint,
            self.bucket.name(),
            key.trim_start_matches('/')
        )
    }

    /// Create the bucket if it does not exist yet.
    pub async fn ensure_bucket(&self) -> Result<()> {
        let name = self.bucket.name();
        let response = Bucket::create_with_path_style(
            &name,
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await
        .map_err(|e| ArchiveError::Storage(format!("creating bucket {name}: {e}")))?;

        if !bucket_ready(response.response_code) {
            return Err(ArchiveError::Storage(format!(
                "creating bucket {name}: status {}: {}",
                response.response_code, response.response_text
            )));
        }
        info!(bucket = name.as_str(), endpoint = self.endpoint.as_str(), "Blob bucket ready");
        Ok(())
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<()> {
        if key.trim_start_matches('/').is_empty() {
            return Err(ArchiveError::Upload {
                key: key.to_string(),
                message: "empty object key".to_string(),
            });
        }

        let response = self
            .bucket
            .put_object_with_content_type(key, &body, content_type)
            .await
            .map_err(|e| ArchiveError::Upload {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(ArchiveError::Upload {
                key: key.to_string(),
                message: format!(
                    "status {status}: {}",
                    String::from_utf8_lossy(response.as_slice())
                ),
            });
        }

        debug!(url = %self.object_url(key), bytes = body.len(), "Uploaded blob");
        Ok(())
    }
}
