use std::{env, time::Duration};

use super::env::{
    ApiConfig, AppConfig, CacheConfig, ConfigError, DirectoryConfig, GuardConfig, LoggingConfig,
    RetryPolicy, SchedulerConfig, TrustConfig,
};

const DEFAULT_API_URL: &str = "https://phishguardai-nnez.onrender.com/api/scan";

/// Upper bound for the guard's marker windows.
const MAX_GUARD_WINDOW_MS: u64 = 60 * 60 * 1000;

pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_env()
}

impl AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = RetryPolicy::default();
        let attempt_timeouts = parse_millis_list("SCAN_ATTEMPT_TIMEOUTS_MS")?
            .unwrap_or(defaults.attempt_timeouts);
        if attempt_timeouts.is_empty() {
            return Err(ConfigError::Empty("SCAN_ATTEMPT_TIMEOUTS_MS"));
        }
        let retry_delays =
            parse_millis_list("SCAN_RETRY_DELAYS_MS")?.unwrap_or(defaults.retry_delays);

        let api = ApiConfig {
            endpoint: env::var("PHISHGUARD_API_URL")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            retry: RetryPolicy {
                attempt_timeouts,
                retry_delays,
            },
        };

        let cache_defaults = CacheConfig::default();
        let capacity = parse_num::<usize>("CACHE_CAPACITY")?.unwrap_or(cache_defaults.capacity);
        if capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "CACHE_CAPACITY",
                value: "0".to_string(),
            });
        }
        let cache = CacheConfig {
            ttl: parse_num::<u64>("CACHE_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(cache_defaults.ttl),
            capacity,
        };

        let guard_defaults = GuardConfig::default();
        let guard = GuardConfig {
            in_flight_hold: parse_num::<u64>("INFLIGHT_HOLD_MS")?
                .map(|ms| guard_window("INFLIGHT_HOLD_MS", ms))
                .transpose()?
                .unwrap_or(guard_defaults.in_flight_hold),
            blocked_marker_ttl: parse_num::<u64>("BLOCKED_MARKER_MS")?
                .map(|ms| guard_window("BLOCKED_MARKER_MS", ms))
                .transpose()?
                .unwrap_or(guard_defaults.blocked_marker_ttl),
            safe_url: env::var("SAFE_URL")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(guard_defaults.safe_url),
        };

        let trust = TrustConfig {
            extra_domains: env::var("TRUSTED_DOMAINS_EXTRA")
                .map(|value| split_list(&value, ','))
                .unwrap_or_default(),
        };

        let directories = DirectoryConfig {
            logs_dir: env::var("LOGS_DIR").unwrap_or_else(|_| "logs".to_string()),
            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            db_filename: env::var("DB_FILENAME").unwrap_or_else(|_| "state.db".to_string()),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            stderr: parse_num::<bool>("LOG_STDERR")?.unwrap_or(true),
        };

        let timezone =
            env::var("PHISHGUARD_TIMEZONE").unwrap_or_else(|_| "Asia/Kolkata".to_string());

        let scheduler = SchedulerConfig {
            housekeeping_cron: env::var("HOUSEKEEPING_CRON")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "0 * * * * *".to_string()),
        };

        Ok(Self {
            api,
            cache,
            guard,
            trust,
            directories,
            logging,
            timezone,
            scheduler,
        })
    }
}

fn parse_num<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
        _ => Ok(None),
    }
}

fn guard_window(key: &'static str, ms: u64) -> Result<Duration, ConfigError> {
    if ms > MAX_GUARD_WINDOW_MS {
        return Err(ConfigError::Invalid {
            key,
            value: ms.to_string(),
        });
    }
    Ok(Duration::from_millis(ms))
}

fn parse_millis_list(key: &'static str) -> Result<Option<Vec<Duration>>, ConfigError> {
    let Ok(value) = env::var(key) else {
        return Ok(None);
    };
    parse_durations(&value)
        .map(Some)
        .ok_or(ConfigError::Invalid { key, value })
}

fn parse_durations(value: &str) -> Option<Vec<Duration>> {
    split_list(value, ',')
        .iter()
        .map(|part| part.parse::<u64>().ok().map(Duration::from_millis))
        .collect()
}

fn split_list(value: &str, sep: char) -> Vec<String> {
    value
        .split(sep)
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}
