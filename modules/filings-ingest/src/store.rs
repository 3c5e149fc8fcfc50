// Postgres persistence for filings, the wide metric snapshot, and the tall
// metric series.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};

use filings_common::{CanonicalMetric, Filing, FilingError, MetricSet, Result};

use crate::traits::FilingStore;

#[derive(Clone)]
pub struct PgFilingStore {
    pool: PgPool,
}

impl PgFilingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the embedded migrations in `migrations/`.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| FilingError::Persistence(e.into()))?;
        info!("Database migrations applied");
        Ok(())
    }
}

#[async_trait]
impl FilingStore for PgFilingStore {
    async fn store_filing(&self, filing: &Filing) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        // cik and form are fixed at first insert; a re-ingest only refreshes the digest.
        let filing_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO filings (cik, accession, form, sha256)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (accession) DO UPDATE SET sha256 = EXCLUDED.sha256
            RETURNING filing_id
            "#,
        )
        .bind(&filing.cik)
        .bind(&filing.accession)
        .bind(&filing.form)
        .bind(&filing.sha256)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(accession = filing.accession.as_str(), filing_id, "Stored filing");
        Ok(filing_id)
    }

    async fn store_metrics(&self, filing_id: i64, metrics: &MetricSet) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let mut wide = snapshot_upsert(filing_id, metrics);
        wide.build().execute(&mut *tx).await?;

        let points: Vec<(CanonicalMetric, f64)> = metrics.present().collect();
        let point_count = points.len();
        if !points.is_empty() {
            let captured_at = Utc::now();
            let mut tall = QueryBuilder::<Postgres>::new(
                "INSERT INTO metric_points (filing_id, metric_name, metric_value, captured_at) ",
            );
            tall.push_values(points, |mut row, (metric, value)| {
                row.push_bind(filing_id)
                    .push_bind(metric.as_str())
                    .push_bind(value)
                    .push_bind(captured_at);
            });
            tall.push(
                " ON CONFLICT (filing_id, metric_name) DO UPDATE \
                 SET metric_value = EXCLUDED.metric_value, captured_at = EXCLUDED.captured_at",
            );
            tall.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        debug!(filing_id, points = point_count, "Stored metrics");
        Ok(())
    }
}

/// `INSERT ... ON CONFLICT DO UPDATE` for the wide row, one column per metric.
/// Null metrics overwrite whatever was there before.
fn snapshot_upsert(filing_id: i64, metrics: &MetricSet) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new("INSERT INTO filing_metrics (filing_id");
    for metric in CanonicalMetric::ALL {
        qb.push(", ").push(metric.as_str());
    }
    qb.push(") VALUES (").push_bind(filing_id);
    for (_, value) in metrics.iter() {
        qb.push(", ").push_bind(value);
    }
    qb.push(") ON CONFLICT (filing_id) DO UPDATE SET ");
    for metric in CanonicalMetric::ALL {
        qb.push(format!("{0} = EXCLUDED.{0}, ", metric.as_str()));
    }
    qb.push("updated_at = now()");
    qb
}
