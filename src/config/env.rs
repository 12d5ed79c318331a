use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub guard: GuardConfig,
    pub trust: TrustConfig,
    pub directories: DirectoryConfig,
    pub logging: LoggingConfig,
    pub timezone: String,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub endpoint: String,
    pub retry: RetryPolicy,
}

/// Attempt `i` runs with `attempt_timeouts[i]`; `retry_delays[i]` is waited
/// after a failed attempt `i` when another attempt follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempt_timeouts: Vec<Duration>,
    pub retry_delays: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempt_timeouts: vec![
                Duration::from_secs(15),
                Duration::from_secs(20),
                Duration::from_secs(25),
            ],
            retry_delays: vec![Duration::from_secs(1), Duration::from_secs(2)],
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(15 * 60),
            capacity: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// How long a finished transaction keeps its (tab, url) key reserved.
    pub in_flight_hold: Duration,
    /// How long a tab stays exempt after being redirected to the block page.
    pub blocked_marker_ttl: Duration,
    pub safe_url: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            in_flight_hold: Duration::from_millis(5_000),
            blocked_marker_ttl: Duration::from_millis(4_000),
            safe_url: "https://www.google.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrustConfig {
    pub extra_domains: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub logs_dir: String,
    pub data_dir: String,
    pub db_filename: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub stderr: bool,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub housekeeping_cron: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("{0} must not be empty")]
    Empty(&'static str),
}
