// Where the archiver reads filing documents from.
//
// EdgarClient is the production source. Tests substitute an in-memory
// source that can fail partway through a download.

use async_trait::async_trait;
use bytes::Bytes;
use edgar_client::{DocumentBody, EdgarClient};

use crate::error::Result;

/// Body of a document, read chunk by chunk.
#[async_trait]
pub trait DocumentChunks: Send {
    /// Next chunk, or `None` once the body is complete.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>>;

    /// Advertised body length, if the source knows it. Only a hint.
    fn size_hint(&self) -> Option<u64> {
        None
    }
}

#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// URL of the filing's primary HTML document.
    async fn primary_document_url(&self, cik: &str, accession: &str) -> Result<String>;

    /// Begin downloading a document.
    async fn open(&self, url: &str) -> Result<Box<dyn DocumentChunks>>;
}

#[async_trait]
impl DocumentChunks for DocumentBody {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        Ok(DocumentBody::next_chunk(self).await?)
    }

    fn size_hint(&self) -> Option<u64> {
        self.content_length()
    }
}

#[async_trait]
impl DocumentSource for EdgarClient {
    async fn primary_document_url(&self, cik: &str, accession: &str) -> Result<String> {
        Ok(EdgarClient::primary_document_url(self, cik, accession).await?)
    }

    async fn open(&self, url: &str) -> Result<Box<dyn DocumentChunks>> {
        let body = self.open_document(url).await?;
        Ok(Box::new(body))
    }
}
