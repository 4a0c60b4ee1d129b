//! League configuration for supported leagues.
//!
//! This module provides:
//! - Static configuration for every league the feed can be synced for
//! - The ESPN sport/league path segments used by the feed client
//! - The league's home time zone, used to derive civil game dates

use chrono_tz::Tz;

/// Configuration for a single league.
#[derive(Debug, Clone)]
pub struct LeagueConfig {
    /// League code (e.g., "nba", "nhl")
    pub league_code: &'static str,
    /// ESPN sport path segment
    pub espn_sport: &'static str,
    /// ESPN league path segment
    pub espn_league: &'static str,
    /// Time zone that defines a game's calendar date
    pub home_timezone: Tz,
}

/// Static configuration for all supported leagues.
pub static LEAGUE_CONFIGS: &[LeagueConfig] = &[
    LeagueConfig {
        league_code: "nba",
        espn_sport: "basketball",
        espn_league: "nba",
        home_timezone: chrono_tz::America::New_York,
    },
    LeagueConfig {
        league_code: "wnba",
        espn_sport: "basketball",
        espn_league: "wnba",
        home_timezone: chrono_tz::America::New_York,
    },
    LeagueConfig {
        league_code: "ncaab",
        espn_sport: "basketball",
        espn_league: "mens-college-basketball",
        home_timezone: chrono_tz::America::New_York,
    },
];

/// Look up a league by its code (case-insensitive).
pub fn get_league_config(code: &str) -> Option<&'static LeagueConfig> {
    let code = code.trim().to_lowercase();
    LEAGUE_CONFIGS.iter().find(|c| c.league_code == code)
}

/// All supported league codes.
pub fn supported_leagues() -> Vec<&'static str> {
    LEAGUE_CONFIGS.iter().map(|c| c.league_code).collect()
}

impl LeagueConfig {
    /// Default ESPN site API base URL for this league.
    pub fn espn_base_url(&self) -> String {
        format!(
            "https://site.api.espn.com/apis/site/v2/sports/{}/{}",
            self.espn_sport, self.espn_league
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_league_config() {
        let nba = get_league_config("NBA").unwrap();
        assert_eq!(nba.espn_sport, "basketball");
        assert_eq!(nba.home_timezone, chrono_tz::America::New_York);
        assert!(get_league_config("curling").is_none());
    }

    #[test]
    fn test_espn_base_url() {
        let nba = get_league_config("nba").unwrap();
        assert_eq!(
            nba.espn_base_url(),
            "https://site.api.espn.com/apis/site/v2/sports/basketball/nba"
        );
    }

    #[test]
    fn test_supported_leagues() {
        let leagues = supported_leagues();
        assert!(leagues.contains(&"nba"));
        assert_eq!(leagues.len(), LEAGUE_CONFIGS.len());
    }
}
