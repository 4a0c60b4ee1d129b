use anyhow::{Context, Result};
use dotenv::dotenv;
use pickem_rust_core::db::health::{check_pool_health, log_pool_stats};
use pickem_rust_core::db::{create_pool_with_retry, PgStore, MIGRATOR};
use pickem_rust_core::ingest::Ingestor;
use pickem_rust_core::providers::EspnScheduleFeed;
use std::sync::Arc;
use sync_service::config::Config;
use sync_service::scheduler::SyncScheduler;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    info!("Starting Pick'em Sync Service...");

    // Config
    let config = Config::from_env()?;
    info!(
        "League {} ({}), feed {}",
        config.league.league_code, config.timezone, config.espn_base_url
    );

    // Database
    let pool = create_pool_with_retry(&config.database_url, &config.db_pool, 5).await?;
    check_pool_health(&pool).await?;
    MIGRATOR
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    log_pool_stats(&pool);
    let store = Arc::new(PgStore::new(pool));

    // Feed
    let feed = Arc::new(EspnScheduleFeed::for_league(
        config.league,
        Some(config.espn_base_url.as_str()),
        config.espn_timeout,
    )?);

    let ingestor = Ingestor::new(feed, store.clone(), config.timezone);
    let scheduler = SyncScheduler::new(ingestor, store, config.sync_lookback_days);
    scheduler.run(config.sync_interval).await;

    info!("Sync service stopped");
    Ok(())
}
