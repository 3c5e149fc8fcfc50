// Trait seams between the poller and each pipeline stage.
//
// The poller only ever sees FilingError. Each production implementation maps
// its own client error into that taxonomy here, so tests can swap in the
// mocks from `testing` without any network or database.

use async_trait::async_trait;

use edgar_client::{EdgarClient, EdgarError, FilingEntry};
use filings_archive::{ArchivedDocument, Archiver};
use filings_common::{Filing, FilingError, MetricSet, RawFactMap, Result};

use crate::extractor::FactExtractor;

// ---------------------------------------------------------------------------
// FilingIndex
// ---------------------------------------------------------------------------

#[async_trait]
pub trait FilingIndex: Send + Sync {
    /// Recent filings for a CIK, in upstream (newest-first) order.
    async fn recent_filings(&self, cik: &str) -> Result<Vec<FilingEntry>>;
}

#[async_trait]
impl FilingIndex for EdgarClient {
    async fn recent_filings(&self, cik: &str) -> Result<Vec<FilingEntry>> {
        let submissions = self.submissions(cik).await.map_err(edgar_error)?;
        Ok(submissions.entries())
    }
}

fn edgar_error(err: EdgarError) -> FilingError {
    match err {
        EdgarError::RateLimited => FilingError::RateLimited,
        EdgarError::NoDocumentFound { accession } => FilingError::NoDocumentFound { accession },
        other => FilingError::Fetch(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// DocumentArchiver
// ---------------------------------------------------------------------------

#[async_trait]
pub trait DocumentArchiver: Send + Sync {
    async fn archive(&self, cik: &str, accession: &str) -> Result<ArchivedDocument>;
}

#[async_trait]
impl DocumentArchiver for Archiver {
    async fn archive(&self, cik: &str, accession: &str) -> Result<ArchivedDocument> {
        Ok(Archiver::archive(self, cik, accession).await?)
    }
}

// ---------------------------------------------------------------------------
// FactSource
// ---------------------------------------------------------------------------

#[async_trait]
pub trait FactSource: Send + Sync {
    /// Value for each requested tag. Tags that can't be found map to `None`.
    async fn extract(&self, cik: &str, accession: &str, tags: &[String]) -> Result<RawFactMap>;
}

#[async_trait]
impl FactSource for FactExtractor {
    async fn extract(&self, cik: &str, accession: &str, tags: &[String]) -> Result<RawFactMap> {
        FactExtractor::extract(self, cik, accession, tags).await
    }
}

// ---------------------------------------------------------------------------
// FilingStore
// ---------------------------------------------------------------------------

/// Idempotent writes for filings and their metrics. Each call is one transaction.
#[async_trait]
pub trait FilingStore: Send + Sync {
    /// Insert the filing, or update only the digest of an existing accession.
    /// Returns the filing id either way.
    async fn store_filing(&self, filing: &Filing) -> Result<i64>;

    /// Overwrite the wide snapshot, then upsert a point per non-null metric.
    async fn store_metrics(&self, filing_id: i64, metrics: &MetricSet) -> Result<()>;
}
