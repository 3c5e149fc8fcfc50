//! Archiver behaviour against an in-memory document source.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};

use filings_archive::{
    ArchiveError, Archiver, BlobStore, DocumentChunks, DocumentSource, LocalBlobStore,
};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

struct FakeBody {
    chunks: Vec<Bytes>,
    fail_at: Option<usize>,
    position: usize,
    advertised: Option<u64>,
}

#[async_trait]
impl DocumentChunks for FakeBody {
    async fn next_chunk(&mut self) -> filings_archive::Result<Option<Bytes>> {
        if self.fail_at == Some(self.position) {
            return Err(ArchiveError::Fetch("connection reset".into()));
        }
        let chunk = self.chunks.get(self.position).cloned();
        self.position += 1;
        Ok(chunk)
    }

    fn size_hint(&self) -> Option<u64> {
        self.advertised
    }
}

#[derive(Default)]
struct FakeSource {
    documents: HashMap<String, (String, Vec<Bytes>)>,
    fail_at: Option<usize>,
    advertised: Option<u64>,
}

impl FakeSource {
    fn on_document(mut self, accession: &str, url: &str, chunks: &[&'static [u8]]) -> Self {
        self.documents.insert(
            accession.to_string(),
            (
                url.to_string(),
                chunks.iter().map(|c| Bytes::from_static(c)).collect(),
            ),
        );
        self
    }

    fn failing_at(mut self, chunk: usize) -> Self {
        self.fail_at = Some(chunk);
        self
    }

    fn advertising(mut self, length: u64) -> Self {
        self.advertised = Some(length);
        self
    }
}

#[async_trait]
impl DocumentSource for FakeSource {
    async fn primary_document_url(
        &self,
        _cik: &str,
        accession: &str,
    ) -> filings_archive::Result<String> {
        self.documents
            .get(accession)
            .map(|(url, _)| url.clone())
            .ok_or_else(|| ArchiveError::NoDocumentFound(accession.to_string()))
    }

    async fn open(&self, url: &str) -> filings_archive::Result<Box<dyn DocumentChunks>> {
        let chunks = self
            .documents
            .values()
            .find(|(u, _)| u == url)
            .map(|(_, chunks)| chunks.clone())
            .ok_or_else(|| ArchiveError::Fetch(format!("no document at {url}")))?;
        Ok(Box::new(FakeBody {
            chunks,
            fail_at: self.fail_at,
            position: 0,
            advertised: self.advertised,
        }))
    }
}

#[derive(Default)]
struct RecordingBlobs {
    puts: Mutex<Vec<(String, Bytes, String)>>,
}

#[async_trait]
impl BlobStore for RecordingBlobs {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> filings_archive::Result<()> {
        self.puts
            .lock()
            .unwrap()
            .push((key.to_string(), body, content_type.to_string()));
        Ok(())
    }
}

const URL: &str = "https://archives.example/Archives/edgar/data/320193/0001B/doc.htm";

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn digest_covers_all_chunks() {
    let source = FakeSource::default().on_document("0001-B", URL, &[b"<html>", b"body", b"</html>"]);
    let blobs = Arc::new(RecordingBlobs::default());
    let archiver = Archiver::new(Arc::new(source), blobs.clone());

    let doc = archiver.archive("0000320193", "0001-B").await.unwrap();

    let expected = hex::encode(Sha256::digest(b"<html>body</html>"));
    assert_eq!(doc.sha256, expected);
    assert_eq!(doc.sha256.len(), 64);
    assert_eq!(doc.size, 17);
    assert_eq!(doc.key, "raw/0001-B.html");
    assert_eq!(doc.source_url, URL);

    let puts = blobs.puts.lock().unwrap();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].0, "raw/0001-B.html");
    assert_eq!(&puts[0].1[..], b"<html>body</html>");
    assert_eq!(puts[0].2, "text/html");
}

#[tokio::test]
async fn failed_download_writes_nothing() {
    let source = FakeSource::default()
        .on_document("0001-B", URL, &[b"<html>", b"body", b"</html>"])
        .failing_at(2);
    let blobs = Arc::new(RecordingBlobs::default());
    let archiver = Archiver::new(Arc::new(source), blobs.clone());

    let err = archiver.archive("0000320193", "0001-B").await.unwrap_err();

    assert!(matches!(err, ArchiveError::Fetch(_)));
    assert!(blobs.puts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_document_is_reported() {
    let blobs = Arc::new(RecordingBlobs::default());
    let archiver = Archiver::new(Arc::new(FakeSource::default()), blobs.clone());

    let err = archiver.archive("0000320193", "0001-Z").await.unwrap_err();

    assert!(matches!(err, ArchiveError::NoDocumentFound(ref a) if a == "0001-Z"));
    assert!(blobs.puts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn archives_to_local_store() {
    let dir = tempfile::tempdir().unwrap();
    let source = FakeSource::default().on_document("0001-B", URL, &[b"filing"]);
    let archiver = Archiver::new(
        Arc::new(source),
        Arc::new(LocalBlobStore::new(dir.path(), "filings")),
    );

    let doc = archiver.archive("0000320193", "0001-B").await.unwrap();

    let stored = std::fs::read(dir.path().join("filings/raw/0001-B.html")).unwrap();
    assert_eq!(stored, b"filing");
    assert_eq!(doc.sha256, hex::encode(Sha256::digest(b"filing")));
}

#[tokio::test]
async fn empty_document_still_archives() {
    let source = FakeSource::default().on_document("0001-B", URL, &[]);
    let blobs = Arc::new(RecordingBlobs::default());
    let archiver = Archiver::new(Arc::new(source), blobs.clone());

    let doc = archiver.archive("0000320193", "0001-B").await.unwrap();

    // SHA-256 of the empty string.
    assert_eq!(
        doc.sha256,
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
    assert_eq!(doc.size, 0);
    assert_eq!(blobs.puts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn advertised_length_does_not_change_stored_bytes() {
    for advertised in [2, u64::MAX] {
        let source = FakeSource::default()
            .on_document("0001-B", URL, &[b"<html>", b"</html>"])
            .advertising(advertised);
        let blobs = Arc::new(RecordingBlobs::default());
        let archiver = Archiver::new(Arc::new(source), blobs.clone());

        let doc = archiver.archive("0000320193", "0001-B").await.unwrap();

        assert_eq!(doc.size, 13);
        let puts = blobs.puts.lock().unwrap();
        assert_eq!(puts[0].1, Bytes::from_static(b"<html></html>"));
    }
}
