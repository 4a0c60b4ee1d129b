//! Database connection health checks.

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::debug;

/// Check if database pool is healthy
pub async fn check_pool_health(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .context("Database health check failed")?;
    Ok(())
}

/// Get database pool statistics
pub fn pool_stats(pool: &PgPool) -> PoolStats {
    PoolStats {
        size: pool.size(),
        idle: pool.num_idle(),
    }
}

/// Log current pool usage at debug level.
pub fn log_pool_stats(pool: &PgPool) {
    let stats = pool_stats(pool);
    debug!(
        "Database pool: size={}, idle={}, active={}",
        stats.size,
        stats.idle,
        stats.active()
    );
}

/// Database pool statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Total number of connections in the pool
    pub size: u32,
    /// Number of idle connections
    pub idle: usize,
}

impl PoolStats {
    pub fn active(&self) -> u32 {
        self.size.saturating_sub(self.idle as u32)
    }
}
