pub mod archiver;
pub mod blob;
pub mod error;
pub mod source;

pub use archiver::{archive_key, ArchivedDocument, Archiver, DOCUMENT_CONTENT_TYPE};
pub use blob::{endpoint_url, BlobStore, LocalBlobStore, S3BlobStore};
pub use error::{ArchiveError, Result};
pub use source::{DocumentChunks, DocumentSource};
