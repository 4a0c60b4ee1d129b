//! Periodic ingestion cycle.
//!
//! Each cycle re-ingests today, a few trailing days (late stat corrections,
//! games finishing after midnight) and every date that still has a live game.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use pickem_rust_core::db::Store;
use pickem_rust_core::ingest::{BatchResult, Ingestor};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Dates to ingest this cycle, ascending and without duplicates.
pub fn dates_to_sync(today: NaiveDate, lookback_days: u32, live_dates: &[NaiveDate]) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = (0..=i64::from(lookback_days))
        .map(|back| today - Duration::days(back))
        .chain(live_dates.iter().copied())
        .collect();
    dates.sort();
    dates.dedup();
    dates
}

#[derive(Debug, Default)]
pub struct CycleSummary {
    pub dates: Vec<NaiveDate>,
    pub batches: Vec<BatchResult>,
    /// Dates whose schedule could not be fetched
    pub unavailable: Vec<NaiveDate>,
}

impl CycleSummary {
    pub fn processed(&self) -> usize {
        self.batches.iter().map(|b| b.processed).sum()
    }

    pub fn failed(&self) -> usize {
        self.batches.iter().map(|b| b.failed).sum()
    }
}

pub struct SyncScheduler {
    ingestor: Ingestor,
    store: Arc<dyn Store>,
    tz: Tz,
    lookback_days: u32,
}

impl SyncScheduler {
    pub fn new(ingestor: Ingestor, store: Arc<dyn Store>, lookback_days: u32) -> Self {
        let tz = ingestor.timezone();
        Self {
            ingestor,
            store,
            tz,
            lookback_days,
        }
    }

    pub async fn run_cycle(&self, now: DateTime<Utc>) -> CycleSummary {
        let today = now.with_timezone(&self.tz).date_naive();
        let live = match self.store.live_game_dates().await {
            Ok(dates) => dates,
            Err(e) => {
                warn!("Could not load live game dates: {}", e);
                Vec::new()
            }
        };

        let mut summary = CycleSummary {
            dates: dates_to_sync(today, self.lookback_days, &live),
            ..Default::default()
        };
        for date in summary.dates.clone() {
            match self.ingestor.ingest_date(date).await {
                Ok(batch) => summary.batches.push(batch),
                Err(e) => {
                    error!("Sync for {} aborted: {}", date, e);
                    summary.unavailable.push(date);
                }
            }
        }

        info!(
            "Sync cycle done: {} dates, {} events processed, {} failed, {} dates unavailable",
            summary.dates.len(),
            summary.processed(),
            summary.failed(),
            summary.unavailable.len()
        );
        summary
    }

    /// Run cycles every `interval` until Ctrl-C. A cycle in flight finishes
    /// before shutdown.
    pub async fn run(&self, interval: std::time::Duration) {
        info!("Sync loop started (interval: {}s)", interval.as_secs());
        loop {
            self.run_cycle(Utc::now()).await;

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                res = tokio::signal::ctrl_c() => {
                    match res {
                        Ok(()) => info!("Received shutdown signal"),
                        Err(err) => error!("Unable to listen for shutdown signal: {}", err),
                    }
                    break;
                }
            }
        }
    }
}
