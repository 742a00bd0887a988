use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use log::warn;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::{
    http::ClearSummary,
    metrics::MetricsSnapshot,
    models::SpinRecord,
    recorder::{RecordSpinRequest, SpinSink},
};

/// HTTP client for the spin history and metrics service.
#[derive(Clone)]
pub struct WheelClient {
    http: reqwest::Client,
    base_url: String,
}

impl WheelClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build wheel service HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.base_url))
    }

    pub async fn record_spin(&self, request: &RecordSpinRequest) -> Result<SpinRecord> {
        let response = self
            .request(Method::POST, "/spins")
            .json(request)
            .send()
            .await
            .context("failed to send spin record")?;
        decode(response, "POST /spins").await
    }

    pub async fn list_spins(
        &self,
        limit: Option<usize>,
        entry_type: Option<&str>,
    ) -> Result<Vec<SpinRecord>> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(entry_type) = entry_type {
            query.push(("type", entry_type.to_string()));
        }

        let response = self
            .request(Method::GET, "/spins")
            .query(&query)
            .send()
            .await
            .context("failed to fetch spin history")?;
        decode(response, "GET /spins").await
    }

    pub async fn metrics(&self) -> Result<MetricsSnapshot> {
        let response = self
            .request(Method::GET, "/metrics")
            .send()
            .await
            .context("failed to fetch metrics")?;
        decode(response, "GET /metrics").await
    }

    /// Metrics for display. Failures are logged and yield `None` so the
    /// caller can simply render nothing.
    pub async fn metrics_or_none(&self) -> Option<MetricsSnapshot> {
        match self.metrics().await {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                warn!("metrics unavailable: {err:#}");
                None
            }
        }
    }

    pub async fn clear_spins(&self) -> Result<ClearSummary> {
        let response = self
            .request(Method::DELETE, "/spins")
            .send()
            .await
            .context("failed to clear spin history")?;
        decode(response, "DELETE /spins").await
    }
}

async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("{what} failed with {status}: {body}");
    }
    response
        .json::<T>()
        .await
        .with_context(|| format!("failed to decode {what} response"))
}

#[async_trait]
impl SpinSink for WheelClient {
    async fn submit(&self, request: RecordSpinRequest) -> Result<SpinRecord> {
        self.record_spin(&request).await
    }
}
