//! Order-extraction collaborator.
//!
//! A free-form client message goes out, a draw plus `(cell, amount)` orders
//! come back. Results are untrusted: intake re-validates every cell and
//! amount before anything reaches the ledger.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use nbk_config::{ExtractorConfig, ResolvedSecrets};
use nbk_schemas::ExtractedOrders;
use serde::Serialize;

#[async_trait::async_trait]
pub trait OrderExtractor: Send + Sync {
    fn source_name(&self) -> &'static str;

    async fn extract(&self, message: &str, client_id: &str) -> Result<ExtractedOrders>;
}

/// Used when no endpoint is configured; every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledExtractor;

#[async_trait::async_trait]
impl OrderExtractor for DisabledExtractor {
    fn source_name(&self) -> &'static str {
        "disabled"
    }

    async fn extract(&self, _message: &str, _client_id: &str) -> Result<ExtractedOrders> {
        Err(anyhow!("EXTRACTOR_DISABLED: no extractor endpoint configured"))
    }
}

/// HTTP extractor: POSTs `{message, client_id}` as JSON with a bearer key and
/// expects an [`ExtractedOrders`] body.
///
/// The key is resolved by the caller; do not log it.
#[derive(Debug, Clone)]
pub struct HttpOrderExtractor {
    api_key: String,
    http: reqwest::Client,
    endpoint: String,
}

#[derive(Serialize)]
struct ExtractRequest<'a> {
    message: &'a str,
    client_id: &'a str,
}

impl HttpOrderExtractor {
    pub fn new(api_key: String, endpoint: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("extractor http client build failed")?;
        Ok(Self {
            api_key,
            http,
            endpoint,
        })
    }

    /// `None` when the config has no endpoint.
    pub fn from_config(cfg: &ExtractorConfig, secrets: &ResolvedSecrets) -> Result<Option<Self>> {
        let Some(endpoint) = cfg.endpoint.clone() else {
            return Ok(None);
        };
        let api_key = secrets
            .extractor_api_key
            .clone()
            .with_context(|| format!("SECRETS_MISSING: env var '{}' is not set", cfg.api_key_env))?;
        Self::new(api_key, endpoint, Duration::from_secs(cfg.timeout_secs)).map(Some)
    }
}

#[async_trait::async_trait]
impl OrderExtractor for HttpOrderExtractor {
    fn source_name(&self) -> &'static str {
        "http"
    }

    async fn extract(&self, message: &str, client_id: &str) -> Result<ExtractedOrders> {
        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&ExtractRequest { message, client_id })
            .send()
            .await
            .context("extractor request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!(
                "extractor http error status={} body={}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            ));
        }

        resp.json::<ExtractedOrders>()
            .await
            .context("extractor response json decode failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_endpoint_means_no_http_extractor() {
        let cfg = ExtractorConfig::default();
        let secrets = ResolvedSecrets {
            extractor_api_key: None,
        };
        assert!(HttpOrderExtractor::from_config(&cfg, &secrets).unwrap().is_none());
    }

    #[test]
    fn endpoint_without_key_is_an_error() {
        let cfg = ExtractorConfig {
            endpoint: Some("http://127.0.0.1:9/extract".to_string()),
            ..ExtractorConfig::default()
        };
        let secrets = ResolvedSecrets {
            extractor_api_key: None,
        };
        let err = HttpOrderExtractor::from_config(&cfg, &secrets).unwrap_err();
        assert!(format!("{err:#}").contains("SECRETS_MISSING"));
    }

    #[tokio::test]
    async fn disabled_extractor_fails() {
        let err = DisabledExtractor.extract("12(10)", "c1").await.unwrap_err();
        assert!(err.to_string().contains("EXTRACTOR_DISABLED"));
    }
}
