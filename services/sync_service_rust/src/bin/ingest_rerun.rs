//! Re-ingest specific dates once and print the batch results.
//!
//! ```text
//! ingest_rerun --date 2025-04-30 --date 2025-05-01
//! ingest_rerun --from 2025-04-19 --to 2025-04-30
//! ingest_rerun --from 2025-04-19 --to 2025-04-20 --dry-run
//! ```

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Duration, NaiveDate};
use clap::Parser;
use dotenv::dotenv;
use pickem_rust_core::db::{create_pool, MemoryStore, PgStore, Store, MIGRATOR};
use pickem_rust_core::ingest::Ingestor;
use pickem_rust_core::providers::EspnScheduleFeed;
use std::sync::Arc;
use sync_service::config::Config;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Longest range accepted in one run
const MAX_RANGE_DAYS: i64 = 120;

#[derive(Parser)]
#[command(name = "ingest_rerun")]
#[command(about = "Re-run feed ingestion for explicit dates", long_about = None)]
struct Cli {
    /// Date to ingest (YYYY-MM-DD); repeatable
    #[arg(long = "date", value_name = "DATE")]
    dates: Vec<NaiveDate>,

    /// First date of an inclusive range
    #[arg(long, requires = "to")]
    from: Option<NaiveDate>,

    /// Last date of an inclusive range
    #[arg(long, requires = "from")]
    to: Option<NaiveDate>,

    /// Ingest into an in-memory store instead of the database
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    fn requested_dates(&self) -> Result<Vec<NaiveDate>> {
        let mut dates = self.dates.clone();
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if to < from {
                bail!("--to {} is before --from {}", to, from);
            }
            let span = (to - from).num_days();
            if span >= MAX_RANGE_DAYS {
                bail!("range of {} days exceeds {} days", span + 1, MAX_RANGE_DAYS);
            }
            dates.extend((0..=span).map(|offset| from + Duration::days(offset)));
        }
        dates.sort();
        dates.dedup();
        if dates.is_empty() {
            return Err(anyhow!("pass at least one --date or a --from/--to range"));
        }
        Ok(dates)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let dates = cli.requested_dates()?;
    let config = Config::from_env()?;

    let store: Arc<dyn Store> = if cli.dry_run {
        info!("Dry run: writing to an in-memory store");
        Arc::new(MemoryStore::new())
    } else {
        let pool = create_pool(&config.database_url, &config.db_pool).await?;
        MIGRATOR
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;
        Arc::new(PgStore::new(pool))
    };

    let feed = Arc::new(EspnScheduleFeed::for_league(
        config.league,
        Some(config.espn_base_url.as_str()),
        config.espn_timeout,
    )?);
    let ingestor = Ingestor::new(feed, store, config.timezone);

    let mut aborted = 0;
    for date in dates {
        match ingestor.ingest_date(date).await {
            Ok(batch) => println!("{}", serde_json::to_string(&batch)?),
            Err(e) => {
                error!("Ingestion for {} aborted: {}", date, e);
                aborted += 1;
            }
        }
    }

    if aborted > 0 {
        bail!("{} date(s) could not be ingested", aborted);
    }
    Ok(())
}
