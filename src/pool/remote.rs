use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;

use super::EntryPool;
use crate::models::Entry;

/// Entry pool served by the pool service over HTTP (`GET {base}/entries`).
#[derive(Clone)]
pub struct RemoteEntryPool {
    http: reqwest::Client,
    base_url: String,
}

impl RemoteEntryPool {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build entry pool HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl EntryPool for RemoteEntryPool {
    async fn list_entries(&self) -> Result<Vec<Entry>> {
        let url = format!("{}/entries", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("failed to reach entry pool at {url}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("entry pool returned {status}: {body}");
        }

        response
            .json::<Vec<Entry>>()
            .await
            .context("failed to decode entry pool response")
    }
}
