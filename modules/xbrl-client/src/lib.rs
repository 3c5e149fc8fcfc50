pub mod error;

pub use error::{Result, XbrlError};

use std::time::Duration;

/// Conversions of large filings are slow on the service side.
const CONVERSION_TIMEOUT: Duration = Duration::from_secs(120);

pub struct XbrlClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl XbrlClient {
    pub fn with_base_url(base_url: &str, token: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(CONVERSION_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Convert the inline-XBRL document at `htm_url` into nested JSON.
    ///
    /// The shape of the result is owned by the service; callers get the raw
    /// `serde_json::Value` and are expected to walk it defensively.
    pub async fn xbrl_to_json(&self, htm_url: &str) -> Result<serde_json::Value> {
        let endpoint = format!("{}/xbrl-to-json", self.base_url);
        tracing::debug!(htm_url, "Requesting XBRL conversion");

        let resp = self
            .client
            .get(&endpoint)
            .query(&[("htm-url", htm_url), ("token", self.token.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(XbrlError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = resp.text().await?;
        let value: serde_json::Value = serde_json::from_str(&body)?;
        unwrap_encoded(value)
    }
}

/// The service sometimes returns the document as a JSON-encoded string.
fn unwrap_encoded(value: serde_json::Value) -> Result<serde_json::Value> {
    match value {
        serde_json::Value::String(inner) => Ok(serde_json::from_str(&inner)?),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_passes_through() {
        let value = json!({ "IncomeStatement": {} });
        assert_eq!(unwrap_encoded(value.clone()).unwrap(), value);
    }

    #[test]
    fn string_encoded_document_is_decoded() {
        let value = json!("{\"BalanceSheets\": {\"Assets\": []}}");
        assert_eq!(
            unwrap_encoded(value).unwrap(),
            json!({ "BalanceSheets": { "Assets": [] } })
        );
    }

    #[test]
    fn garbage_string_is_parse_error() {
        let err = unwrap_encoded(json!("not json")).unwrap_err();
        assert!(matches!(err, XbrlError::Parse(_)));
    }
}
