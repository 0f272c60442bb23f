use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use catalog_watcher::browser::{BrowserDriver, ChromeSession, FingerprintRotation};
use catalog_watcher::config::LoggingConfig;
use catalog_watcher::pipeline::run_date;
use catalog_watcher::plugins::NotificationDispatcher;
use catalog_watcher::store::{MemoryStore, SnapshotStore, SqliteStore};
use catalog_watcher::{AppConfig, Pipeline};

#[derive(Parser, Debug)]
#[command(name = "catalog-watcher", version, about = "Watches a shop catalog for price drops, restocks and releases")]
struct Cli {
    /// Directory holding default.toml and environment overrides
    #[arg(long, default_value = "config")]
    config_dir: PathBuf,

    /// Use an in-memory store and only log notifications
    #[arg(long)]
    dry_run: bool,

    /// Catalog URL to watch instead of the configured ones (repeatable)
    #[arg(long = "catalog-url")]
    catalog_urls: Vec<String>,
}

fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.filter))?;
    let registry = tracing_subscriber::registry().with(filter).with(fmt::layer());

    match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "catalog-watcher.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Ok(Some(guard))
        }
        None => {
            registry.init();
            Ok(None)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = AppConfig::load(&cli.config_dir)
        .with_context(|| format!("Failed to load configuration from {}", cli.config_dir.display()))?;
    if !cli.catalog_urls.is_empty() {
        config.catalog.urls = cli.catalog_urls.clone();
        config.validate()?;
    }

    let _log_guard = init_logging(&config.logging)?;
    info!(catalogs = config.catalog.urls.len(), dry_run = cli.dry_run, "Starting Catalog Watcher...");

    let store: Arc<dyn SnapshotStore> = if cli.dry_run {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(
            SqliteStore::connect(&config.store)
                .await
                .context("Failed to connect to snapshot store")?,
        )
    };

    let dispatcher = if cli.dry_run {
        NotificationDispatcher::new()
    } else {
        NotificationDispatcher::from_config(&config.notifications)
    };
    info!(channels = ?dispatcher.list_notifier_types(), "Notification channels ready");

    let mut fingerprints = FingerprintRotation::new(
        config.browser.user_agents.clone(),
        config.browser.viewport_width,
        config.browser.viewport_height,
    );
    let mut session = ChromeSession::launch(config.browser.clone(), &fingerprints.next_profile())
        .context("Failed to launch browser session")?;

    let mut pipeline =
        Pipeline::from_config(&config, fingerprints, store.clone(), Arc::new(dispatcher));
    let today = run_date(chrono::Utc::now());
    let report = pipeline.run(&mut session, today).await;

    if let Err(e) = session.close().await {
        warn!(error = %e, "Failed to close browser session");
    }
    if let Err(e) = store.close().await {
        warn!(error = %e, "Failed to close snapshot store");
    }

    info!(
        run_id = %report.run_id,
        discovered = report.discovered,
        succeeded = report.succeeded,
        skipped = report.skipped,
        notifications_delivered = report.notifications_delivered,
        notifications_failed = report.notifications_failed,
        summary_sent = report.summary_sent,
        "Run complete"
    );

    Ok(())
}
