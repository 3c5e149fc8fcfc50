use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

const DEFAULT_POLL_INTERVAL_SECS: u64 = 600;
const DEFAULT_RATE_LIMIT_COOLDOWN_SECS: u64 = 60;
const DEFAULT_ALLOWED_FORMS: &str = "10-Q,10-K";
const DEFAULT_XBRL_API_URL: &str = "https://api.sec-api.io";
const DEFAULT_BLOB_ROOT: &str = "./data";
const DEFAULT_BLOB_BUCKET: &str = "filings";

/// Where archived documents go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobBackend {
    /// Directory tree under `root/bucket`.
    Local { root: PathBuf },
    /// MinIO or another S3-compatible service.
    S3 {
        endpoint: String,
        access_key: String,
        secret_key: String,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Zero-padded 10-digit CIK of the tracked entity.
    pub cik: String,
    pub user_agent: String,
    pub database_url: String,
    pub sec_api_key: String,
    pub xbrl_api_url: String,
    pub poll_interval: Duration,
    pub rate_limit_cooldown: Duration,
    pub allowed_forms: BTreeSet<String>,
    pub blob_backend: BlobBackend,
    pub blob_bucket: String,
}

impl Config {
    /// Load configuration from the environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. `from_env` uses the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{key} environment variable is required"))
        };
        let secs = |key: &str, default: u64| -> Result<Duration> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .with_context(|| format!("{key} must be a whole number of seconds")),
                None => Ok(Duration::from_secs(default)),
            }
        };

        let raw_cik = required("CIK")?;
        let cik = validated_cik(&raw_cik)?;

        let allowed_forms = parse_forms(
            &lookup("ALLOWED_FORMS").unwrap_or_else(|| DEFAULT_ALLOWED_FORMS.to_string()),
        );
        if allowed_forms.is_empty() {
            bail!("ALLOWED_FORMS must name at least one form type");
        }

        let blob_backend = match lookup("BLOB_BACKEND").as_deref().map(str::trim) {
            None | Some("") | Some("local") => BlobBackend::Local {
                root: PathBuf::from(
                    lookup("BLOB_ROOT").unwrap_or_else(|| DEFAULT_BLOB_ROOT.to_string()),
                ),
            },
            Some("s3") => BlobBackend::S3 {
                endpoint: required("MINIO_ENDPOINT")?,
                access_key: required("MINIO_ACCESS_KEY")?,
                secret_key: required("MINIO_SECRET_KEY")?,
            },
            Some(other) => bail!("BLOB_BACKEND must be 'local' or 's3', got '{other}'"),
        };

        // MINIO_BUCKET names the bucket for the s3 backend; BLOB_BUCKET covers both.
        let bucket_keys: &[&str] = match blob_backend {
            BlobBackend::S3 { .. } => &["MINIO_BUCKET", "BLOB_BUCKET"],
            BlobBackend::Local { .. } => &["BLOB_BUCKET"],
        };
        let blob_bucket = bucket_keys
            .iter()
            .find_map(|key| lookup(key).filter(|v| !v.trim().is_empty()))
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| DEFAULT_BLOB_BUCKET.to_string());

        Ok(Self {
            cik,
            user_agent: required("USER_AGENT")?,
            database_url: required("DATABASE_URL")?,
            sec_api_key: required("SEC_API_KEY")?,
            xbrl_api_url: lookup("XBRL_API_URL")
                .unwrap_or_else(|| DEFAULT_XBRL_API_URL.to_string()),
            poll_interval: secs("POLL_INTERVAL", DEFAULT_POLL_INTERVAL_SECS)?,
            rate_limit_cooldown: secs("RATE_LIMIT_COOLDOWN", DEFAULT_RATE_LIMIT_COOLDOWN_SECS)?,
            allowed_forms,
            blob_backend,
            blob_bucket,
        })
    }

    /// Log config values with secrets truncated.
    pub fn log_redacted(&self) {
        fn preview(val: &str) -> String {
            let n = val.chars().take(4).map(char::len_utf8).sum::<usize>();
            format!("{}...({} chars)", &val[..n], val.len())
        }

        tracing::info!("Config loaded:");
        tracing::info!("  CIK: {}", self.cik);
        tracing::info!("  USER_AGENT: {}", self.user_agent);
        tracing::info!("  DATABASE_URL: {}", preview(&self.database_url));
        tracing::info!("  SEC_API_KEY: {}", preview(&self.sec_api_key));
        tracing::info!("  XBRL_API_URL: {}", self.xbrl_api_url);
        tracing::info!("  POLL_INTERVAL: {}s", self.poll_interval.as_secs());
        tracing::info!("  RATE_LIMIT_COOLDOWN: {}s", self.rate_limit_cooldown.as_secs());
        tracing::info!("  ALLOWED_FORMS: {:?}", self.allowed_forms);
        match &self.blob_backend {
            BlobBackend::Local { root } => {
                tracing::info!("  BLOB_BACKEND: local ({})", root.display())
            }
            BlobBackend::S3 {
                endpoint,
                access_key,
                secret_key,
            } => {
                tracing::info!("  BLOB_BACKEND: s3 ({endpoint})");
                tracing::info!("  MINIO_ACCESS_KEY: {}", preview(access_key));
                tracing::info!("  MINIO_SECRET_KEY: {}", preview(secret_key));
            }
        }
        tracing::info!("  BLOB_BUCKET: {}", self.blob_bucket);
    }
}

fn validated_cik(raw: &str) -> Result<String> {
    let digits = raw.trim();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) || digits.len() > 10 {
        bail!("CIK must be up to 10 digits, got '{raw}'");
    }
    Ok(edgar_client::pad_cik(digits))
}

fn parse_forms(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("CIK", "320193"),
        ("USER_AGENT", "Jane Doe jane@example.com"),
        ("DATABASE_URL", "postgres://localhost/filings"),
        ("SEC_API_KEY", "abc123"),
    ];

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup_from(REQUIRED)).unwrap();

        assert_eq!(config.cik, "0000320193");
        assert_eq!(config.poll_interval, Duration::from_secs(600));
        assert_eq!(config.rate_limit_cooldown, Duration::from_secs(60));
        assert!(config.allowed_forms.contains("10-Q"));
        assert!(config.allowed_forms.contains("10-K"));
        assert_eq!(config.allowed_forms.len(), 2);
        assert_eq!(
            config.blob_backend,
            BlobBackend::Local {
                root: PathBuf::from("./data")
            }
        );
        assert_eq!(config.blob_bucket, "filings");
    }

    #[test]
    fn missing_required_key_errors() {
        let err = Config::from_lookup(lookup_from(&REQUIRED[1..])).unwrap_err();
        assert!(err.to_string().contains("CIK"));
    }

    #[test]
    fn rejects_non_numeric_cik() {
        let mut pairs = REQUIRED.to_vec();
        pairs[0] = ("CIK", "AAPL");
        assert!(Config::from_lookup(lookup_from(&pairs)).is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend_from_slice(&[
            ("POLL_INTERVAL", "30"),
            ("RATE_LIMIT_COOLDOWN", "120"),
            ("ALLOWED_FORMS", " 10-K , 20-F,"),
            ("BLOB_BUCKET", "archive"),
        ]);
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();

        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.rate_limit_cooldown, Duration::from_secs(120));
        assert_eq!(
            config.allowed_forms.iter().cloned().collect::<Vec<_>>(),
            vec!["10-K".to_string(), "20-F".to_string()]
        );
        assert_eq!(config.blob_bucket, "archive");
    }

    #[test]
    fn s3_backend_reads_minio_settings() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend_from_slice(&[
            ("BLOB_BACKEND", "s3"),
            ("MINIO_ENDPOINT", "minio:9000"),
            ("MINIO_ACCESS_KEY", "minioadmin"),
            ("MINIO_SECRET_KEY", "miniosecret"),
            ("MINIO_BUCKET", "sec-filings"),
            ("BLOB_BUCKET", "ignored"),
        ]);
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();

        assert_eq!(
            config.blob_backend,
            BlobBackend::S3 {
                endpoint: "minio:9000".into(),
                access_key: "minioadmin".into(),
                secret_key: "miniosecret".into(),
            }
        );
        assert_eq!(config.blob_bucket, "sec-filings");
    }

    #[test]
    fn s3_bucket_defaults_to_filings() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend_from_slice(&[
            ("BLOB_BACKEND", "s3"),
            ("MINIO_ENDPOINT", "minio:9000"),
            ("MINIO_ACCESS_KEY", "minioadmin"),
            ("MINIO_SECRET_KEY", "miniosecret"),
        ]);
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.blob_bucket, "filings");
    }

    #[test]
    fn s3_backend_requires_credentials() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend_from_slice(&[("BLOB_BACKEND", "s3"), ("MINIO_ENDPOINT", "minio:9000")]);
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(err.to_string().contains("MINIO_ACCESS_KEY"));
    }

    #[test]
    fn unknown_backend_errors() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("BLOB_BACKEND", "http"));
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(err.to_string().contains("'local' or 's3'"));
    }

    #[test]
    fn cik_is_padded_once_validated() {
        let mut pairs = REQUIRED.to_vec();
        pairs[0] = ("CIK", " 0000320193 ");
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.cik, "0000320193");

        pairs[0] = ("CIK", "12345678901");
        assert!(Config::from_lookup(lookup_from(&pairs)).is_err());
    }

    #[test]
    fn bad_interval_errors() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("POLL_INTERVAL", "ten minutes"));
        assert!(Config::from_lookup(lookup_from(&pairs)).is_err());
    }
}
