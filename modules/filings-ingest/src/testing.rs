// Test mocks for the ingest pipeline.
//
// One mock per trait seam the poller calls through:
// - MockIndex (FilingIndex): scripted index responses, swappable mid-test
// - MockArchiver (DocumentArchiver): per-accession digests and failures
// - MockExtractor (FactSource): per-accession raw facts, failures and 429s
// - MockStore (FilingStore): in-memory tables with the same upsert rules as Postgres
//
// Every mock records the calls it receives.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use edgar_client::FilingEntry;
use filings_archive::{archive_key, ArchivedDocument};
use filings_common::{CanonicalMetric, Filing, FilingError, MetricSet, RawFactMap, Result};

use crate::traits::{DocumentArchiver, FactSource, FilingIndex, FilingStore};

/// Digest the archiver reports when none was registered for an accession.
pub const DEFAULT_SHA256: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

// ---------------------------------------------------------------------------
// MockIndex
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum IndexResponse {
    Entries(Vec<FilingEntry>),
    RateLimited,
    Failure(String),
}

pub struct MockIndex {
    response: Mutex<IndexResponse>,
    calls: Mutex<Vec<String>>,
}

impl MockIndex {
    /// Index returning `(accession, form)` pairs in the given order.
    pub fn new(entries: &[(&str, &str)]) -> Self {
        Self::with_response(IndexResponse::Entries(to_entries(entries)))
    }

    pub fn rate_limited() -> Self {
        Self::with_response(IndexResponse::RateLimited)
    }

    pub fn failing(message: &str) -> Self {
        Self::with_response(IndexResponse::Failure(message.to_string()))
    }

    fn with_response(response: IndexResponse) -> Self {
        Self {
            response: Mutex::new(response),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_entries(&self, entries: &[(&str, &str)]) {
        *self.response.lock().unwrap() = IndexResponse::Entries(to_entries(entries));
    }

    pub fn set_rate_limited(&self) {
        *self.response.lock().unwrap() = IndexResponse::RateLimited;
    }

    /// CIKs the index was queried for, one per call.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

fn to_entries(entries: &[(&str, &str)]) -> Vec<FilingEntry> {
    entries
        .iter()
        .map(|(accession, form)| FilingEntry::new(*accession, *form))
        .collect()
}

#[async_trait]
impl FilingIndex for MockIndex {
    async fn recent_filings(&self, cik: &str) -> Result<Vec<FilingEntry>> {
        self.calls.lock().unwrap().push(cik.to_string());
        match self.response.lock().unwrap().clone() {
            IndexResponse::Entries(entries) => Ok(entries),
            IndexResponse::RateLimited => Err(FilingError::RateLimited),
            IndexResponse::Failure(message) => Err(FilingError::Fetch(message)),
        }
    }
}

// ---------------------------------------------------------------------------
// MockArchiver
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockArchiver {
    digests: HashMap<String, String>,
    failures: HashMap<String, fn(&str) -> FilingError>,
    calls: Mutex<Vec<String>>,
}

impl MockArchiver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_digest(mut self, accession: &str, sha256: &str) -> Self {
        self.digests.insert(accession.to_string(), sha256.to_string());
        self
    }

    pub fn failing_on(mut self, accession: &str) -> Self {
        self.failures.insert(accession.to_string(), |accession| {
            FilingError::NoDocumentFound {
                accession: accession.to_string(),
            }
        });
        self
    }

    pub fn rate_limited_on(mut self, accession: &str) -> Self {
        self.failures
            .insert(accession.to_string(), |_| FilingError::RateLimited);
        self
    }

    /// Accessions passed to `archive`, in call order.
    pub fn archived(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentArchiver for MockArchiver {
    async fn archive(&self, _cik: &str, accession: &str) -> Result<ArchivedDocument> {
        self.calls.lock().unwrap().push(accession.to_string());
        if let Some(failure) = self.failures.get(accession) {
            return Err(failure(accession));
        }
        let sha256 = self
            .digests
            .get(accession)
            .cloned()
            .unwrap_or_else(|| DEFAULT_SHA256.to_string());
        Ok(ArchivedDocument {
            accession: accession.to_string(),
            source_url: format!("https://archives.test/{accession}/doc.htm"),
            key: archive_key(accession),
            sha256,
            size: 0,
        })
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// Returns registered facts for an accession. Requested tags with no
/// registered fact come back as `None`, like the real extractor.
#[derive(Default)]
pub struct MockExtractor {
    facts: HashMap<String, HashMap<String, f64>>,
    failures: HashSet<String>,
    rate_limited: HashSet<String>,
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_filing(mut self, accession: &str, facts: &[(&str, f64)]) -> Self {
        self.facts.insert(
            accession.to_string(),
            facts.iter().map(|(tag, v)| (tag.to_string(), *v)).collect(),
        );
        self
    }

    pub fn failing_on(mut self, accession: &str) -> Self {
        self.failures.insert(accession.to_string());
        self
    }

    /// EDGAR answers 429 while resolving this filing's document.
    pub fn rate_limited_on(mut self, accession: &str) -> Self {
        self.rate_limited.insert(accession.to_string());
        self
    }

    /// `(accession, requested tags)` per call.
    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FactSource for MockExtractor {
    async fn extract(&self, _cik: &str, accession: &str, tags: &[String]) -> Result<RawFactMap> {
        self.calls
            .lock()
            .unwrap()
            .push((accession.to_string(), tags.to_vec()));
        if self.rate_limited.contains(accession) {
            return Err(FilingError::RateLimited);
        }
        if self.failures.contains(accession) {
            return Err(FilingError::Extraction(format!(
                "conversion failed for {accession}"
            )));
        }
        let known = self.facts.get(accession);
        Ok(tags
            .iter()
            .map(|tag| (tag.clone(), known.and_then(|f| f.get(tag).copied())))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// MockStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StoreTables {
    filings: Vec<(i64, Filing)>,
    snapshots: HashMap<i64, MetricSet>,
    points: HashMap<(i64, CanonicalMetric), f64>,
}

/// In-memory `FilingStore` with upsert-by-accession and upsert-by-(filing, metric).
#[derive(Default)]
pub struct MockStore {
    tables: Mutex<StoreTables>,
    fail_filings: bool,
    fail_metrics: bool,
    metric_calls: Mutex<Vec<i64>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_filings(mut self) -> Self {
        self.fail_filings = true;
        self
    }

    pub fn failing_metrics(mut self) -> Self {
        self.fail_metrics = true;
        self
    }

    pub fn filings(&self) -> Vec<Filing> {
        self.tables
            .lock()
            .unwrap()
            .filings
            .iter()
            .map(|(_, f)| f.clone())
            .collect()
    }

    pub fn filing_id(&self, accession: &str) -> Option<i64> {
        self.tables
            .lock()
            .unwrap()
            .filings
            .iter()
            .find(|(_, f)| f.accession == accession)
            .map(|(id, _)| *id)
    }

    pub fn snapshot(&self, filing_id: i64) -> Option<MetricSet> {
        self.tables.lock().unwrap().snapshots.get(&filing_id).copied()
    }

    pub fn point(&self, filing_id: i64, metric: CanonicalMetric) -> Option<f64> {
        self.tables
            .lock()
            .unwrap()
            .points
            .get(&(filing_id, metric))
            .copied()
    }

    pub fn point_count(&self) -> usize {
        self.tables.lock().unwrap().points.len()
    }

    /// Filing ids passed to `store_metrics`, in call order.
    pub fn metric_calls(&self) -> Vec<i64> {
        self.metric_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FilingStore for MockStore {
    async fn store_filing(&self, filing: &Filing) -> Result<i64> {
        if self.fail_filings {
            return Err(FilingError::Persistence(sqlx::Error::PoolTimedOut));
        }
        let mut tables = self.tables.lock().unwrap();
        if let Some((id, existing)) = tables
            .filings
            .iter_mut()
            .find(|(_, f)| f.accession == filing.accession)
        {
            existing.sha256 = filing.sha256.clone();
            return Ok(*id);
        }
        let id = tables.filings.len() as i64 + 1;
        tables.filings.push((id, filing.clone()));
        Ok(id)
    }

    async fn store_metrics(&self, filing_id: i64, metrics: &MetricSet) -> Result<()> {
        self.metric_calls.lock().unwrap().push(filing_id);
        if self.fail_metrics {
            return Err(FilingError::Persistence(sqlx::Error::PoolTimedOut));
        }
        let mut tables = self.tables.lock().unwrap();
        tables.snapshots.insert(filing_id, *metrics);
        for (metric, value) in metrics.present() {
            tables.points.insert((filing_id, metric), value);
        }
        Ok(())
    }
}
