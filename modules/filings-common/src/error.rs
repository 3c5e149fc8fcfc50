use thiserror::Error;

pub type Result<T> = std::result::Result<T, FilingError>;

/// Failures of one pipeline stage. None of these stop the poller.
#[derive(Error, Debug)]
pub enum FilingError {
    #[error("Upstream rate limit hit")]
    RateLimited,

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("No HTML document found for accession {accession}")]
    NoDocumentFound { accession: String },

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),
}

impl FilingError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited)
    }
}
