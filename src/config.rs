use std::env;
use std::time::Duration;

use crate::forecast::{Forecaster, MIN_MATCHES_FOR_CALC};
use crate::form::{
    DEFAULT_BASE_WEIGHT, DEFAULT_HISTORY_LEN, DEFAULT_RECENT_MATCHES, DEFAULT_RECENT_WEIGHT,
    WeightingPolicy,
};

pub const DEFAULT_BASE_URL: &str = "https://api.football-data.org";

#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub retries: u32,
    pub backoff: Duration,
    pub cache_ttl: Duration,
    pub history_window_days: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub forecaster: Forecaster,
    pub fetch_parallelism: usize,
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key).and_then(|val| {
                let val = val.trim().to_string();
                if val.is_empty() { None } else { Some(val) }
            })
        };
        let num = |key: &str, default: u64, lo: u64, hi: u64| {
            get(key)
                .and_then(|val| val.parse::<u64>().ok())
                .unwrap_or(default)
                .clamp(lo, hi)
        };
        let weight = |key: &str, default: f64| {
            get(key)
                .and_then(|val| val.parse::<f64>().ok())
                .filter(|w| w.is_finite() && *w >= 0.0)
                .unwrap_or(default)
        };

        let history_len = num("HISTORY_LEN", DEFAULT_HISTORY_LEN as u64, 1, 50) as usize;
        let weighting = WeightingPolicy {
            history_len,
            recent_matches: num(
                "RECENT_MATCHES",
                DEFAULT_RECENT_MATCHES as u64,
                0,
                history_len as u64,
            ) as usize,
            recent_weight: weight("RECENT_WEIGHT", DEFAULT_RECENT_WEIGHT),
            base_weight: weight("BASE_WEIGHT", DEFAULT_BASE_WEIGHT),
        };
        // Only `history_len` matches are fetched per team, so a higher
        // threshold could never be met.
        let min_matches = num(
            "MIN_MATCHES_FOR_CALC",
            MIN_MATCHES_FOR_CALC as u64,
            1,
            history_len as u64,
        ) as usize;

        Self {
            api: ApiConfig {
                base_url: get("FOOTBALL_DATA_BASE_URL")
                    .map(|url| url.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                api_key: get("FOOTBALL_DATA_API_KEY"),
                timeout: Duration::from_secs(num("API_TIMEOUT_SECS", 15, 5, 120)),
                retries: num("API_RETRIES", 3, 0, 10) as u32,
                backoff: Duration::from_millis(num("API_BACKOFF_MS", 300, 0, 10_000)),
                cache_ttl: Duration::from_secs(num("CACHE_TTL_SECS", 3600, 0, 7 * 24 * 3600)),
                history_window_days: num("HISTORY_WINDOW_DAYS", 365, 30, 730) as i64,
            },
            forecaster: Forecaster::new(weighting, min_matches),
            fetch_parallelism: num("FETCH_PARALLELISM", 4, 1, 16) as usize,
            logging: LoggingConfig {
                level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
                format: get("LOG_FORMAT").unwrap_or_else(|| "pretty".to_string()),
            },
        }
    }
}
