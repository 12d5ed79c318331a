use std::sync::Arc;

use tokio::time::{sleep, timeout};
use url::Url;

use crate::{config::RetryPolicy, domain::ScanResult};

use super::{
    api::{ClassificationApi, ScanError},
    cache::ResultCache,
};

const INTERNAL_SCHEMES: &[&str] = &["chrome", "chrome-extension", "moz-extension", "about", "file"];

/// Resolves a classification for a URL. Every path yields a result; failures
/// come back as [`ScanResult::unavailable`].
pub struct ScanClient {
    api: Arc<dyn ClassificationApi>,
    cache: Arc<ResultCache>,
    retry: RetryPolicy,
}

impl ScanClient {
    pub fn new(api: Arc<dyn ClassificationApi>, cache: Arc<ResultCache>, retry: RetryPolicy) -> Self {
        Self { api, cache, retry }
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        tracing::info!(target: "scan", "result cache cleared");
    }

    pub async fn scan(&self, url: &str) -> ScanResult {
        if is_internal_url(url) {
            return ScanResult::skipped(url);
        }

        if let Some(hit) = self.cache.get(url) {
            tracing::debug!(target: "scan", url, "cache hit");
            return hit;
        }

        let attempts = self.retry.attempt_timeouts.len();
        for (index, budget) in self.retry.attempt_timeouts.iter().copied().enumerate() {
            let attempt = index + 1;
            tracing::debug!(target: "scan", url, attempt, "scanning");

            let outcome = match timeout(budget, self.api.classify(url)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(ScanError::Timeout(budget)),
            };

            match outcome {
                Ok(result) => {
                    self.cache.put(url, result.clone());
                    return result;
                }
                Err(err) => {
                    tracing::warn!(target: "scan", url, attempt, error = %err, "scan attempt failed");
                }
            }

            if attempt < attempts {
                if let Some(delay) = self.retry.retry_delays.get(index) {
                    sleep(*delay).await;
                }
            }
        }

        tracing::error!(target: "scan", url, attempts, "all scan attempts failed");
        ScanResult::unavailable(url)
    }
}

/// Browser-internal pages cannot be fetched by the backend. Unparseable URLs
/// are not considered internal.
pub fn is_internal_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|url| INTERNAL_SCHEMES.contains(&url.scheme()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::future::BoxFuture;
    use parking_lot::Mutex;
    use tokio::time::Instant;

    use super::*;
    use crate::{
        config::CacheConfig,
        domain::{Classification, RiskLevel},
    };

    enum Behaviour {
        Respond(Classification),
        FailFast,
        Hang,
    }

    struct StubApi {
        behaviour: Behaviour,
        calls: Mutex<Vec<Instant>>,
    }

    impl StubApi {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().len()
        }
    }

    impl ClassificationApi for StubApi {
        fn classify<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<ScanResult, ScanError>> {
            self.calls.lock().push(Instant::now());
            Box::pin(async move {
                match self.behaviour {
                    Behaviour::Respond(classification) => Ok(ScanResult {
                        url: url.to_string(),
                        classification,
                        confidence: 88.0,
                        risk_level: RiskLevel::High,
                        modules: None,
                        skipped: false,
                        error: false,
                    }),
                    Behaviour::FailFast => Err(ScanError::Decode("boom".into())),
                    Behaviour::Hang => futures::future::pending().await,
                }
            })
        }
    }

    fn client(api: Arc<StubApi>) -> ScanClient {
        ScanClient::new(
            api,
            Arc::new(ResultCache::new(&CacheConfig::default())),
            RetryPolicy::default(),
        )
    }

    #[tokio::test]
    async fn internal_schemes_are_skipped_without_network() {
        let api = StubApi::new(Behaviour::Respond(Classification::Phishing));
        let client = client(api.clone());

        for url in [
            "chrome://settings",
            "chrome-extension://abcdef/blocked.html",
            "about:blank",
            "file:///home/user/index.html",
        ] {
            let result = client.scan(url).await;
            assert!(result.skipped, "{url}");
            assert_eq!(result.confidence, 0.0);
            assert_eq!(result.classification, Classification::Legitimate);
        }
        assert_eq!(api.call_count(), 0);
    }

    #[test]
    fn unparseable_urls_are_not_internal() {
        assert!(!is_internal_url("not a url"));
        assert!(!is_internal_url("https://example.com"));
        assert!(is_internal_url("about:blank"));
    }

    #[tokio::test(start_paused = true)]
    async fn second_scan_within_ttl_is_served_from_cache() {
        let api = StubApi::new(Behaviour::Respond(Classification::Legitimate));
        let client = client(api.clone());

        let first = client.scan("https://shop.test/").await;
        let second = client.scan("https://shop.test/").await;
        assert_eq!(first, second);
        assert_eq!(api.call_count(), 1);

        tokio::time::advance(Duration::from_secs(15 * 60 + 1)).await;
        client.scan("https://shop.test/").await;
        assert_eq!(api.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_backend_uses_escalating_budgets_then_fails_open() {
        let api = StubApi::new(Behaviour::Hang);
        let client = client(api.clone());
        let start = Instant::now();

        let result = client.scan("https://slow.test/").await;

        assert_eq!(result.classification, Classification::Error);
        assert_eq!(result.risk_level, RiskLevel::Unknown);
        assert!(result.error);
        assert_eq!(result.confidence, 0.0);

        let offsets: Vec<u64> = api
            .calls
            .lock()
            .iter()
            .map(|at| at.duration_since(start).as_secs())
            .collect();
        assert_eq!(offsets, vec![0, 16, 38]);
        assert_eq!(start.elapsed().as_secs(), 63);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_backend_retries_three_times_and_is_not_cached() {
        let api = StubApi::new(Behaviour::FailFast);
        let client = client(api.clone());
        let start = Instant::now();

        let result = client.scan("https://down.test/").await;
        assert!(result.error);
        assert_eq!(api.call_count(), 3);
        assert_eq!(start.elapsed().as_secs(), 3);

        client.scan("https://down.test/").await;
        assert_eq!(api.call_count(), 6);
    }

    #[tokio::test]
    async fn clear_cache_forces_a_new_request() {
        let api = StubApi::new(Behaviour::Respond(Classification::Phishing));
        let client = client(api.clone());

        client.scan("https://bad.test/").await;
        client.clear_cache();
        client.scan("https://bad.test/").await;
        assert_eq!(api.call_count(), 2);
    }
}
