use anyhow::{anyhow, Context, Result};
use chrono_tz::Tz;
use pickem_rust_core::db::DbPoolConfig;
use pickem_rust_core::league_config::{get_league_config, supported_leagues, LeagueConfig};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,

    pub league: &'static LeagueConfig,
    /// Time zone that defines a game's calendar date
    pub timezone: Tz,

    pub espn_base_url: String,
    pub espn_timeout: Duration,

    pub sync_interval: Duration,
    pub sync_lookback_days: u32,

    pub db_pool: DbPoolConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::from_vars(|key| env::var(key).ok())?;
        config.db_pool = DbPoolConfig::from_env_with_defaults(DbPoolConfig::ingestion());
        Ok(config)
    }

    /// Build from an arbitrary variable source. Pool settings keep their
    /// ingestion defaults here; `from_env` applies the `DB_*` overrides.
    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = get("DATABASE_URL").context("DATABASE_URL must be set")?;

        let league_code = get("LEAGUE").unwrap_or_else(|| "nba".to_string());
        let league = get_league_config(&league_code).ok_or_else(|| {
            anyhow!(
                "Unsupported LEAGUE: {} (expected one of {})",
                league_code,
                supported_leagues().join(", ")
            )
        })?;

        let timezone = match get("LEAGUE_TIMEZONE") {
            Some(raw) => Tz::from_str(raw.trim()).map_err(|_| {
                anyhow!(
                    "Invalid LEAGUE_TIMEZONE: {} (expected IANA tz like America/New_York)",
                    raw
                )
            })?,
            None => league.home_timezone,
        };

        let espn_base_url = get("ESPN_BASE_URL")
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| league.espn_base_url());

        let espn_timeout = Duration::from_secs(parse_u64(&get, "ESPN_TIMEOUT_SECS", 10)?);
        let sync_interval = Duration::from_secs(parse_u64(&get, "SYNC_INTERVAL_SECS", 300)?);
        let sync_lookback_days = parse_u64(&get, "SYNC_LOOKBACK_DAYS", 1)? as u32;

        Ok(Self {
            database_url,
            league,
            timezone,
            espn_base_url,
            espn_timeout,
            sync_interval,
            sync_lookback_days,
            db_pool: DbPoolConfig::ingestion(),
        })
    }
}

fn parse_u64(get: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<u64> {
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("Invalid {key}: {raw} (expected integer)")),
        None => Ok(default),
    }
}
