use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use thiserror::Error;

use crate::{config::ApiConfig, domain::ScanResult};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("classification API returned HTTP {0}")]
    Status(StatusCode),
    #[error("malformed classification response: {0}")]
    Decode(String),
}

/// One request/response cycle against the classification backend.
pub trait ClassificationApi: Send + Sync {
    fn classify<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<ScanResult, ScanError>>;
}

#[derive(Debug, Serialize)]
struct ScanRequest<'a> {
    url: &'a str,
}

#[derive(Clone)]
pub struct HttpClassificationApi {
    http: Client,
    endpoint: String,
}

impl HttpClassificationApi {
    pub fn new(http: Client, config: &ApiConfig) -> Self {
        Self {
            http,
            endpoint: config.endpoint.clone(),
        }
    }

    async fn post_scan(&self, url: &str) -> Result<ScanResult, ScanError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&ScanRequest { url })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::Status(status));
        }

        let body = response.bytes().await?;
        let mut result: ScanResult =
            serde_json::from_slice(&body).map_err(|err| ScanError::Decode(err.to_string()))?;
        if result.url.is_empty() {
            result.url = url.to_string();
        }
        Ok(result)
    }
}

impl ClassificationApi for HttpClassificationApi {
    fn classify<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<ScanResult, ScanError>> {
        Box::pin(self.post_scan(url))
    }
}
