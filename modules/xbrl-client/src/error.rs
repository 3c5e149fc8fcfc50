use thiserror::Error;

pub type Result<T> = std::result::Result<T, XbrlError>;

#[derive(Debug, Error)]
pub enum XbrlError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for XbrlError {
    fn from(err: reqwest::Error) -> Self {
        XbrlError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for XbrlError {
    fn from(err: serde_json::Error) -> Self {
        XbrlError::Parse(err.to_string())
    }
}
