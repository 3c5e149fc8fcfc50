use thiserror::Error;

pub type Result<T> = std::result::Result<T, EdgarError>;

#[derive(Debug, Error)]
pub enum EdgarError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited by EDGAR (HTTP 429)")]
    RateLimited,

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No HTML document in manifest for accession {accession}")]
    NoDocumentFound { accession: String },
}

impl From<reqwest::Error> for EdgarError {
    fn from(err: reqwest::Error) -> Self {
        EdgarError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for EdgarError {
    fn from(err: serde_json::Error) -> Self {
        EdgarError::Parse(err.to_string())
    }
}
