// Checksum archiver: download a filing's primary document, hash it while
// buffering, then write it to blob storage under an accession-derived key.

use std::sync::Arc;

use bytes::BytesMut;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::blob::BlobStore;
use crate::error::Result;
use crate::source::DocumentSource;

/// Archived documents are always stored as HTML.
pub const DOCUMENT_CONTENT_TYPE: &str = "text/html";

/// Upper bound on the buffer reserved up front from an advertised length.
const MAX_PREALLOCATION: u64 = 64 * 1024 * 1024;

/// Initial buffer capacity for a body with the given length hint.
fn initial_capacity(hint: Option<u64>) -> usize {
    hint.map_or(0, |len| len.min(MAX_PREALLOCATION) as usize)
}

/// Blob key for a filing's primary document.
pub fn archive_key(accession: &str) -> String {
    format!("raw/{accession}.html")
}

/// Outcome of a successful archive call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedDocument {
    pub accession: String,
    pub source_url: String,
    pub key: String,
    /// Lowercase hex SHA-256 of the stored bytes.
    pub sha256: String,
    pub size: usize,
}

pub struct Archiver {
    source: Arc<dyn DocumentSource>,
    blobs: Arc<dyn BlobStore>,
}

impl Archiver {
    pub fn new(source: Arc<dyn DocumentSource>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { source, blobs }
    }

    /// Archive the primary document of `accession`.
    ///
    /// The whole body is hashed and buffered before anything is written, so a
    /// download that fails partway leaves blob storage untouched.
    pub async fn archive(&self, cik: &str, accession: &str) -> Result<ArchivedDocument> {
        let source_url = self.source.primary_document_url(cik, accession).await?;
        info!(accession, url = %source_url, "Downloading primary document");

        let mut body = self.source.open(&source_url).await?;
        let mut hasher = Sha256::new();
        let mut buffer = BytesMut::with_capacity(initial_capacity(body.size_hint()));
        while let Some(chunk) = body.next_chunk().await? {
            hasher.update(&chunk);
            buffer.extend_from_slice(&chunk);
        }

        let sha256 = hex::encode(hasher.finalize());
        let size = buffer.len();
        let key = archive_key(accession);

        self.blobs
            .put(&key, buffer.freeze(), DOCUMENT_CONTENT_TYPE)
            .await?;

        info!(accession, key = %key, sha256 = %sha256, bytes = size, "Archived document");

        Ok(ArchivedDocument {
            accession: accession.to_string(),
            source_url,
            key,
            sha256,
            size,
        })
    }
}
