// Poller: the only caller of the pipeline stages.
//
// One filing-index request per tick. At most one new filing is processed per
// tick, start to finish, before the loop sleeps. An accession is marked seen
// before any stage runs, so a failed filing is not retried in this process.

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};
use typed_builder::TypedBuilder;

use edgar_client::FilingEntry;
use filings_common::{Config, Filing, FilingError};

use crate::normalizer::{normalize, AliasTable};
use crate::seen::{InMemorySeenSet, SeenSet};
use crate::traits::{DocumentArchiver, FactSource, FilingIndex, FilingStore};

/// Poller settings, taken from [`Config`].
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub cik: String,
    pub allowed_forms: BTreeSet<String>,
    pub poll_interval: Duration,
    pub rate_limit_cooldown: Duration,
}

impl PollerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cik: config.cik.clone(),
            allowed_forms: config.allowed_forms.clone(),
            poll_interval: config.poll_interval,
            rate_limit_cooldown: config.rate_limit_cooldown,
        }
    }
}

/// Stage collaborators. Production wiring lives in `main.rs`; tests use the
/// mocks in `testing`.
#[derive(Clone, TypedBuilder)]
pub struct PollerDeps {
    pub index: Arc<dyn FilingIndex>,
    pub archiver: Arc<dyn DocumentArchiver>,
    pub extractor: Arc<dyn FactSource>,
    pub store: Arc<dyn FilingStore>,
    #[builder(default = InMemorySeenSet::shared())]
    pub seen: Arc<dyn SeenSet>,
    #[builder(default)]
    pub aliases: AliasTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Archive,
    Extract,
    StoreFiling,
    StoreMetrics,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Archive => "archive",
            Stage::Extract => "extract",
            Stage::StoreFiling => "store_filing",
            Stage::StoreMetrics => "store_metrics",
        };
        f.write_str(name)
    }
}

/// What one tick did, and so how long the loop should wait.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The filing index answered 429. Nothing was advanced.
    RateLimited,
    /// The filing index request or its parse failed.
    PollFailed,
    /// No unseen, allow-listed filing.
    Idle,
    Processed {
        accession: String,
        filing_id: i64,
        sha256: String,
        metrics: usize,
    },
    Failed {
        accession: String,
        stage: Stage,
        rate_limited: bool,
    },
}

impl TickOutcome {
    pub fn sleep_for(&self, config: &PollerConfig) -> Duration {
        match self {
            TickOutcome::RateLimited
            | TickOutcome::Failed {
                rate_limited: true, ..
            } => config.rate_limit_cooldown,
            _ => config.poll_interval,
        }
    }
}

/// Counters over the life of the poller.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PollStats {
    pub polls: u64,
    pub rate_limited: u64,
    pub poll_failures: u64,
    pub idle: u64,
    pub processed: u64,
    pub failed: u64,
}

impl fmt::Display for PollStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "polls={} rate_limited={} poll_failures={} idle={} processed={} failed={}",
            self.polls,
            self.rate_limited,
            self.poll_failures,
            self.idle,
            self.processed,
            self.failed,
        )
    }
}

/// First entry, in upstream order, that is unseen and has an allowed form.
pub fn select_candidate<'a>(
    entries: &'a [FilingEntry],
    seen: &dyn SeenSet,
    allowed_forms: &BTreeSet<String>,
) -> Option<&'a FilingEntry> {
    entries
        .iter()
        .find(|e| !seen.contains(&e.accession) && allowed_forms.contains(&e.form))
}

struct Processed {
    filing_id: i64,
    sha256: String,
    metrics: usize,
}

pub struct Poller {
    config: PollerConfig,
    deps: PollerDeps,
    tags: Vec<String>,
    stats: PollStats,
}

impl Poller {
    pub fn new(config: PollerConfig, deps: PollerDeps) -> Self {
        let tags = deps.aliases.requested_tags();
        Self {
            config,
            deps,
            tags,
            stats: PollStats::default(),
        }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    pub fn stats(&self) -> &PollStats {
        &self.stats
    }

    /// One iteration: poll the index, then process at most one new filing.
    pub async fn tick(&mut self) -> TickOutcome {
        self.stats.polls += 1;

        let entries = match self.deps.index.recent_filings(&self.config.cik).await {
            Ok(entries) => entries,
            Err(e) if e.is_rate_limited() => {
                self.stats.rate_limited += 1;
                warn!(
                    cik = self.config.cik.as_str(),
                    cooldown_secs = self.config.rate_limit_cooldown.as_secs(),
                    "Filing index rate limited, cooling down"
                );
                return TickOutcome::RateLimited;
            }
            Err(e) => {
                self.stats.poll_failures += 1;
                error!(cik = self.config.cik.as_str(), error = %e, "Filing index request failed");
                return TickOutcome::PollFailed;
            }
        };

        let candidate = match select_candidate(
            &entries,
            self.deps.seen.as_ref(),
            &self.config.allowed_forms,
        ) {
            Some(entry) => entry.clone(),
            None => {
                self.stats.idle += 1;
                debug!(entries = entries.len(), "No new filings");
                return TickOutcome::Idle;
            }
        };

        self.deps.seen.insert(&candidate.accession);
        info!(
            accession = candidate.accession.as_str(),
            form = candidate.form.as_str(),
            "Processing new filing"
        );

        match self.process(&candidate).await {
            Ok(done) => {
                self.stats.processed += 1;
                info!(
                    accession = candidate.accession.as_str(),
                    filing_id = done.filing_id,
                    sha256 = done.sha256.as_str(),
                    metrics = done.metrics,
                    "Filing ingested"
                );
                TickOutcome::Processed {
                    accession: candidate.accession,
                    filing_id: done.filing_id,
                    sha256: done.sha256,
                    metrics: done.metrics,
                }
            }
            Err((stage, e)) => {
                self.stats.failed += 1;
                let rate_limited = e.is_rate_limited();
                if rate_limited {
                    warn!(
                        accession = candidate.accession.as_str(),
                        stage = %stage,
                        "Rate limited during filing processing"
                    );
                } else {
                    error!(
                        accession = candidate.accession.as_str(),
                        stage = %stage,
                        error = %e,
                        "Filing processing failed"
                    );
                }
                TickOutcome::Failed {
                    accession: candidate.accession,
                    stage,
                    rate_limited,
                }
            }
        }
    }

    /// Archive, extract, normalize, persist. Each stage runs only if the
    /// previous one succeeded.
    async fn process(&self, entry: &FilingEntry) -> Result<Processed, (Stage, FilingError)> {
        let cik = self.config.cik.as_str();
        let accession = entry.accession.as_str();

        let archived = self
            .deps
            .archiver
            .archive(cik, accession)
            .await
            .map_err(|e| (Stage::Archive, e))?;

        let raw = self
            .deps
            .extractor
            .extract(cik, accession, &self.tags)
            .await
            .map_err(|e| (Stage::Extract, e))?;

        let metrics = normalize(&raw, &self.deps.aliases);

        let filing = Filing {
            cik: cik.to_string(),
            accession: accession.to_string(),
            form: entry.form.clone(),
            sha256: archived.sha256,
        };
        let filing_id = self
            .deps
            .store
            .store_filing(&filing)
            .await
            .map_err(|e| (Stage::StoreFiling, e))?;

        self.deps
            .store
            .store_metrics(filing_id, &metrics)
            .await
            .map_err(|e| (Stage::StoreMetrics, e))?;

        Ok(Processed {
            filing_id,
            sha256: filing.sha256,
            metrics: metrics.present_count(),
        })
    }

    /// Poll forever.
    pub async fn run(&mut self) {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Poll until `shutdown` resolves. Shutdown is only observed between
    /// ticks; a tick in progress always runs to completion.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(
            cik = self.config.cik.as_str(),
            interval_secs = self.config.poll_interval.as_secs(),
            "Poller started"
        );

        loop {
            let outcome = self.tick().await;
            let pause = outcome.sleep_for(&self.config);
            info!(stats = %self.stats, sleep_secs = pause.as_secs(), "Tick complete");

            tokio::select! {
                _ = &mut shutdown => {
                    info!(stats = %self.stats, "Shutdown requested, poller stopping");
                    break;
                }
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }
}
