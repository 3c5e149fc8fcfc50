pub mod error;
pub mod types;

pub use error::{EdgarError, Result};
pub use types::{FilingEntry, Manifest, ManifestItem, Submissions};

use std::time::Duration;

use bytes::Bytes;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

const DATA_BASE_URL: &str = "https://data.sec.gov";
const ARCHIVES_BASE_URL: &str = "https://www.sec.gov";

/// Timeout for index and manifest requests.
const INDEX_TIMEOUT: Duration = Duration::from_secs(30);
/// Primary documents can run to tens of megabytes.
const DOCUMENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Zero-pad a CIK to the 10-digit form used by the submissions API.
pub fn pad_cik(cik: &str) -> String {
    format!("{:0>10}", cik.trim())
}

/// CIK without leading zeros, as used in archive paths.
pub fn cik_path_segment(cik: &str) -> String {
    let trimmed = cik.trim().trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

pub struct EdgarClient {
    client: reqwest::Client,
    data_base_url: String,
    archives_base_url: String,
}

impl EdgarClient {
    /// EDGAR requires a descriptive User-Agent (name and contact email).
    pub fn new(user_agent: &str) -> Result<Self> {
        Self::with_base_urls(user_agent, DATA_BASE_URL, ARCHIVES_BASE_URL)
    }

    pub fn with_base_urls(
        user_agent: &str,
        data_base_url: &str,
        archives_base_url: &str,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(INDEX_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            data_base_url: data_base_url.trim_end_matches('/').to_string(),
            archives_base_url: archives_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn submissions_url(&self, cik: &str) -> String {
        format!("{}/submissions/CIK{}.json", self.data_base_url, pad_cik(cik))
    }

    /// Folder holding every component file of one filing.
    pub fn filing_base_url(&self, cik: &str, accession: &str) -> String {
        format!(
            "{}/Archives/edgar/data/{}/{}",
            self.archives_base_url,
            cik_path_segment(cik),
            accession.replace('-', "")
        )
    }

    /// Recent filings for an entity, newest first.
    pub async fn submissions(&self, cik: &str) -> Result<Submissions> {
        let url = self.submissions_url(cik);
        tracing::debug!(url = %url, "Fetching submissions index");
        self.get_json(&url).await
    }

    /// Directory listing for one filing.
    pub async fn manifest(&self, cik: &str, accession: &str) -> Result<Manifest> {
        let url = format!("{}/index.json", self.filing_base_url(cik, accession));
        tracing::debug!(url = %url, accession, "Fetching filing manifest");
        self.get_json(&url).await
    }

    /// Resolve the URL of the filing's primary HTML document.
    pub async fn primary_document_url(&self, cik: &str, accession: &str) -> Result<String> {
        let manifest = self.manifest(cik, accession).await?;
        let name = manifest
            .primary_document()
            .ok_or_else(|| EdgarError::NoDocumentFound {
                accession: accession.to_string(),
            })?;
        Ok(format!("{}/{}", self.filing_base_url(cik, accession), name))
    }

    /// Start downloading a document. The body is read chunk by chunk from
    /// the returned handle.
    pub async fn open_document(&self, url: &str) -> Result<DocumentBody> {
        let resp = self
            .client
            .get(url)
            .timeout(DOCUMENT_TIMEOUT)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        Ok(DocumentBody { resp })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let resp = self.client.get(url).send().await?;
        let resp = check_status(resp).await?;
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Streaming body of a document download.
pub struct DocumentBody {
    resp: reqwest::Response,
}

impl DocumentBody {
    pub fn content_length(&self) -> Option<u64> {
        self.resp.content_length()
    }

    /// Next chunk of the body, `None` once the body is exhausted.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        Ok(self.resp.chunk().await?)
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(EdgarError::RateLimited);
    }
    if !status.is_success() {
        let message = resp.text().await.unwrap_or_default();
        return Err(EdgarError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(resp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_cik_to_ten_digits() {
        assert_eq!(pad_cik("320193"), "0000320193");
        assert_eq!(pad_cik("0000320193"), "0000320193");
    }

    #[test]
    fn archive_path_strips_leading_zeros() {
        assert_eq!(cik_path_segment("0000320193"), "320193");
        assert_eq!(cik_path_segment("0000000000"), "0");
    }

    #[test]
    fn builds_filing_urls() {
        let client = EdgarClient::with_base_urls(
            "test agent test@example.com",
            "https://data.example/",
            "https://archives.example",
        )
        .unwrap();

        assert_eq!(
            client.submissions_url("320193"),
            "https://data.example/submissions/CIK0000320193.json"
        );
        assert_eq!(
            client.filing_base_url("0000320193", "0000320193-24-000081"),
            "https://archives.example/Archives/edgar/data/320193/000032019324000081"
        );
    }
}
