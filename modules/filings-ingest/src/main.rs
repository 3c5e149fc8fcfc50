use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use edgar_client::EdgarClient;
use filings_archive::{Archiver, BlobStore, LocalBlobStore, S3BlobStore};
use filings_common::{BlobBackend, Config};
use filings_ingest::{FactExtractor, PgFilingStore, Poller, PollerConfig, PollerDeps};
use xbrl_client::XbrlClient;

#[derive(Parser)]
#[command(
    name = "filings-ingest",
    about = "Poll EDGAR for new filings, archive them, and store their financial metrics"
)]
struct Cli {
    /// Run a single poll and exit.
    #[arg(long)]
    once: bool,

    /// Apply database migrations and exit.
    #[arg(long)]
    migrate_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    info!("Filing ingestion starting...");

    let config = Config::from_env()?;
    config.log_redacted();

    let store = PgFilingStore::connect(&config.database_url).await?;
    store.migrate().await?;
    if cli.migrate_only {
        return Ok(());
    }

    let edgar = Arc::new(EdgarClient::new(&config.user_agent)?);

    let blobs: Arc<dyn BlobStore> = match &config.blob_backend {
        BlobBackend::Local { root } => {
            info!(root = %root.display(), bucket = config.blob_bucket.as_str(), "Using local blob store");
            Arc::new(LocalBlobStore::new(root.clone(), &config.blob_bucket))
        }
        BlobBackend::S3 {
            endpoint,
            access_key,
            secret_key,
        } => {
            info!(endpoint = endpoint.as_str(), bucket = config.blob_bucket.as_str(), "Using S3 blob store");
            let store = S3BlobStore::new(endpoint, &config.blob_bucket, access_key, secret_key)?;
            store.ensure_bucket().await?;
            Arc::new(store)
        }
    };

    let archiver = Archiver::new(edgar.clone(), blobs);
    let xbrl = XbrlClient::with_base_url(&config.xbrl_api_url, &config.sec_api_key)?;
    let extractor = FactExtractor::new(edgar.clone(), xbrl);

    let deps = PollerDeps::builder()
        .index(edgar)
        .archiver(Arc::new(archiver))
        .extractor(Arc::new(extractor))
        .store(Arc::new(store))
        .build();
    let mut poller = Poller::new(PollerConfig::from_config(&config), deps);

    if cli.once {
        let outcome = poller.tick().await;
        info!(?outcome, stats = %poller.stats(), "Single poll complete");
        return Ok(());
    }

    poller.run_until(shutdown_signal()).await;
    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("filings=info".parse()?)
        .add_directive("edgar_client=info".parse()?)
        .add_directive("xbrl_client=info".parse()?);

    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C; running until killed");
        std::future::pending::<()>().await;
    }
}
