use filings_common::FilingError;

/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Rate limited while fetching {0}")]
    RateLimited(String),

    #[error("No HTML document in manifest for accession {0}")]
    NoDocumentFound(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Upload failed for key {key}: {message}")]
    Upload { key: String, message: String },

    #[error("Blob storage error: {0}")]
    Storage(String),
}

impl From<edgar_client::EdgarError> for ArchiveError {
    fn from(err: edgar_client::EdgarError) -> Self {
        match err {
            edgar_client::EdgarError::NoDocumentFound { accession } => {
                ArchiveError::NoDocumentFound(accession)
            }
            edgar_client::EdgarError::RateLimited => {
                ArchiveError::RateLimited("filing document".to_string())
            }
            other => ArchiveError::Fetch(other.to_string()),
        }
    }
}

impl From<ArchiveError> for FilingError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::NoDocumentFound(accession) => FilingError::NoDocumentFound { accession },
            ArchiveError::RateLimited(_) => FilingError::RateLimited,
            other => FilingError::Fetch(other.to_string()),
        }
    }
}
